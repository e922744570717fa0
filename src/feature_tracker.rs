use crate::all::*;

// Points of one face followed from frame to frame. The centroid and variance
// always describe the current point set.
pub struct FeatureTracker {
  frame: Arc<Frame>,
  points: PointSet,
  centroid: Option<Point>,
  // Mean squared distance to the centroid.
  variance: f64,
  prune_factor: f64,
}

impl FeatureTracker {
  pub fn new(frame: Arc<Frame>, features: PointSet, prune_factor: f64) -> FeatureTracker {
    let (centroid, variance) = statistics(&features);
    FeatureTracker {
      frame,
      points: features,
      centroid,
      variance,
      prune_factor,
    }
  }

  // Moves the points into `frame`, then drops the ones the flow lost and the
  // ones that drifted far from the others.
  pub fn track(&mut self, frame: &Arc<Frame>, flow: &mut dyn OpticalFlow) -> &PointSet {
    let advanced = flow.advance(&self.frame, frame, &self.points);
    let survivors: PointSet = if advanced.len() == self.points.len() {
      advanced.into_iter()
        .filter(|(_, ok)| *ok)
        .map(|(p, _)| p)
        .collect()
    }
    else {
      // Without a one-to-one answer the points cannot be told apart.
      warn!("Optical flow returned {} results for {} points, dropping all.", advanced.len(), self.points.len());
      vec![]
    };
    let lost = self.points.len() - survivors.len();

    let (centroid, variance) = statistics(&survivors);
    self.points = match centroid {
      Some(c) => {
        let limit = self.prune_factor * variance;
        survivors.into_iter().filter(|p| (p - c).norm_squared() <= limit).collect()
      },
      None => survivors,
    };
    let (centroid, variance) = statistics(&self.points);
    self.centroid = centroid;
    self.variance = variance;
    self.frame = frame.clone();
    debug!("Tracked {} points, {} lost by flow, variance {:.2}.", self.points.len(), lost, variance);
    &self.points
  }

  pub fn points(&self) -> &PointSet {
    &self.points
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn centroid(&self) -> Option<Point> {
    self.centroid
  }

  pub fn variance(&self) -> f64 {
    self.variance
  }

  pub fn prune_factor(&self) -> f64 {
    self.prune_factor
  }

  pub fn bounding_box(&self) -> Option<Rectangle> {
    Rectangle::bounding(&self.points)
  }

  // The frame the points currently refer to.
  pub fn frame(&self) -> &Arc<Frame> {
    &self.frame
  }
}

fn statistics(points: &[Point]) -> (Option<Point>, f64) {
  if points.is_empty() { return (None, 0.) }
  let n = points.len() as f64;
  let centroid = points.iter().fold(Point::zeros(), |sum, p| sum + p) / n;
  let variance = points.iter().map(|p| (p - centroid).norm_squared()).sum::<f64>() / n;
  (Some(centroid), variance)
}
