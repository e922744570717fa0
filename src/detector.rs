use crate::all::*;

// Face detection capabilities provided by the surrounding application.
pub trait FaceDetector: Send + Sync {
  // Candidate face rectangles in a grayscale image.
  fn detect(&self, image: &Image) -> Vec<Rectangle>;

  // Trackable points inside `face`, in a stable order.
  fn landmarks(&self, image: &Image, face: &Rectangle) -> PointSet;

  // Left and right eye centers in the coordinates of the face region, `None`
  // if either eye cannot be found.
  fn eyes(&self, face: &Image) -> Option<(Point, Point)>;
}

// Values 9 and 12 are popular, allowing quick rejection logic.
const FAST_VARIANT_N: usize = 12;

// A Bresenham circle.
const CIRCLE_RADIUS: usize = 3;
const CIRCLE: [[i32; 2]; 16] = [
  [ 0, -3], [ 1, -3], [ 2, -2], [ 3, -1], [ 3,  0], [ 3,  1], [ 2,  2], [ 1,  3],
  [ 0,  3], [-1,  3], [-2,  2], [-3,  1], [-3,  0], [-3, -1], [-2, -2], [-1, -3],
];

// Picks FAST corners inside a face rectangle as tracking landmarks. A
// `FaceDetector` implementation can delegate `landmarks()` here.
pub struct LandmarkDetector {
  pub threshold: i16,
  pub count: usize,
  pub min_distance: usize,
}

struct Corner {
  score: i32,
  x: i32,
  y: i32,
}

impl LandmarkDetector {
  pub fn new() -> LandmarkDetector {
    let p = parameters();
    LandmarkDetector::with_parameters(&p)
  }

  pub fn with_parameters(p: &ParameterSet) -> LandmarkDetector {
    LandmarkDetector {
      threshold: p.fast_threshold,
      count: p.landmark_count,
      min_distance: p.landmark_min_distance,
    }
  }

  // Strongest corners first, at most `count`, none closer than `min_distance`
  // to a stronger one. Ties are ordered by row, then column.
  pub fn landmarks(&self, image: &Image, face: &Rectangle) -> PointSet {
    let r = CIRCLE_RADIUS as i32;
    let area = match face.clamp(image.width, image.height) {
      Some(area) => area,
      None => return vec![],
    };
    let x0 = i32::max(area.x, r);
    let y0 = i32::max(area.y, r);
    let x1 = i32::min(area.right(), image.width as i32 - r);
    let y1 = i32::min(area.bottom(), image.height as i32 - r);

    let mut corners = vec![];
    for y in y0..y1 {
      for x in x0..x1 {
        if !self.detect_at_pixel(x, y, image) { continue }
        corners.push(Corner { score: score(x, y, image), x, y });
      }
    }
    corners.sort_by(|a, b| b.score.cmp(&a.score).then(a.y.cmp(&b.y)).then(a.x.cmp(&b.x)));

    let min_d2 = (self.min_distance * self.min_distance) as i32;
    let mut picked: Vec<[i32; 2]> = vec![];
    for c in &corners {
      if picked.len() >= self.count { break }
      let far = picked.iter().all(|p| {
        let dx = p[0] - c.x;
        let dy = p[1] - c.y;
        dx * dx + dy * dy >= min_d2
      });
      if far { picked.push([c.x, c.y]) }
    }
    picked.iter().map(|p| Point::new(p[0] as f64, p[1] as f64)).collect()
  }

  fn detect_at_pixel(&self, x: i32, y: i32, image: &Image) -> bool {
    let center_value = value(x, y, image);
    if continuous(x, y, image, |v| v < center_value - self.threshold) { return true }
    if continuous(x, y, image, |v| v > center_value + self.threshold) { return true }
    false
  }
}

fn continuous<F: Fn(i16) -> bool>(x: i32, y: i32, image: &Image, f: F) -> bool {
  // Quick rejection for 9 and 12 variants.
  if !f(value(x + 3, y, image)) && !f(value(x - 3, y, image)) { return false }

  let it = CircleIterator::new(x, y);
  let mut n = 0;
  for p in it {
    let v = value(p[0], p[1], image);
    if f(v) {
      n += 1;
      if n >= FAST_VARIANT_N { return true }
    }
    // Could quit early if n + remaining is too small.
    else {
      n = 0;
    }
  }
  false
}

// Sum of absolute differences between the circle and its center.
fn score(x: i32, y: i32, image: &Image) -> i32 {
  let center_value = value(x, y, image) as i32;
  CIRCLE.iter()
    .map(|c| (value(x + c[0], y + c[1], image) as i32 - center_value).abs())
    .sum()
}

// Goes around the circle and continues past the start so that arcs crossing
// the first position are counted whole.
struct CircleIterator {
  center: [i32; 2],
  ind: usize,
}

impl CircleIterator {
  pub fn new(x: i32, y:i32) -> CircleIterator {
    CircleIterator {
      center: [x, y],
      ind: 0,
    }
  }
}

impl Iterator for CircleIterator {
  type Item = [i32; 2];

  fn next(&mut self) -> Option<Self::Item> {
    if self.ind >= CIRCLE.len() + FAST_VARIANT_N - 1 { return None }
    let c = CIRCLE[self.ind % CIRCLE.len()];
    self.ind += 1;
    Some([
      self.center[0] + c[0],
      self.center[1] + c[1],
    ])
  }
}

fn value(x: i32, y: i32, image: &Image) -> i16 {
  image.value_i32(x, y) as i16
}
