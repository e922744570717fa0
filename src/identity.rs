use crate::all::*;
use serde::Serialize;

pub const UNKNOWN_NAME: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IdentityId(pub usize);

impl fmt::Display for IdentityId {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Mode {
  Lost,
  Tracking,
}

// Outcome of one `Identity::recognize()` call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RecognitionEvent {
  // An anonymous identity took the name of a trained person.
  Recognized { name: String, confidence: f64 },
  // Anonymous and nobody trained looks close enough.
  Unrecognized,
  Enrolled(EnrollStatus),
  // The name is already trained, nothing to do.
  Known,
  // No face crop to work with.
  NoFace,
}

// One physical face followed over time.
pub struct Identity {
  id: IdentityId,
  name: String,
  mode: Mode,
  bounding_box: Option<Rectangle>,
  tracker: FeatureTracker,
  // Tracker centroid minus the box top-left when the face was last localized.
  offset: Vector2d,
  recognizer: Arc<Recognizer>,
  trained: bool,
}

impl Identity {
  pub fn new(
    id: IdentityId,
    name: &str,
    frame: Arc<Frame>,
    rect: Rectangle,
    recognizer: Arc<Recognizer>,
    detector: &dyn FaceDetector,
    prune_factor: f64,
  ) -> Identity {
    let landmarks = detector.landmarks(&frame.image, &rect);
    let tracker = FeatureTracker::new(frame, landmarks, prune_factor);
    let offset = anchor_offset(&tracker, &rect);
    debug!("Identity {} ({}) starts with {} landmarks.", id, name, tracker.len());
    Identity {
      id,
      name: name.to_string(),
      mode: Mode::Tracking,
      bounding_box: Some(rect),
      tracker,
      offset,
      recognizer,
      trained: false,
    }
  }

  // Whether a detection overlaps the current face box.
  pub fn is_myself(&self, rect: &Rectangle) -> bool {
    match &self.bounding_box {
      Some(b) => b.intersection(rect).map_or(false, |i| i.area() > 0),
      None => false,
    }
  }

  // Restarts tracking from fresh landmarks inside a new detection.
  pub fn relocalize_face(&mut self, frame: Arc<Frame>, rect: Rectangle, detector: &dyn FaceDetector) {
    let landmarks = detector.landmarks(&frame.image, &rect);
    self.tracker = FeatureTracker::new(frame, landmarks, self.tracker.prune_factor());
    self.offset = anchor_offset(&self.tracker, &rect);
    self.bounding_box = Some(rect);
    self.mode = Mode::Tracking;
  }

  pub fn update(&mut self, frame: &Arc<Frame>, flow: &mut dyn OpticalFlow, min_features: usize) -> Mode {
    let count = self.tracker.track(frame, flow).len();
    self.bounding_box = self.tracker.bounding_box();
    if count < min_features {
      if self.mode == Mode::Tracking {
        warn!("Not enough features for {} ({}/{})! Going back to detection.", self.name, count, min_features);
      }
      self.mode = Mode::Lost;
    }
    self.mode
  }

  // Box contents of the frame last tracked in, clamped to the image.
  pub fn face_crop(&self) -> Option<Image> {
    let rect = self.bounding_box?;
    self.tracker.frame().image.crop(&rect)
  }

  // Names an anonymous identity from the recognizer, or teaches the
  // recognizer the face of a named one until it has learned it.
  pub fn recognize(&mut self, threshold: f64) -> RecognitionEvent {
    if self.is_anonymous() {
      let crop = match self.face_crop() {
        Some(crop) => crop,
        None => return RecognitionEvent::NoFace,
      };
      let result = self.recognizer.classify(&crop);
      if result.is_empty() || result.confidence > threshold {
        return RecognitionEvent::Unrecognized;
      }
      info!("Identity {} recognized as {} ({:.1}).", self.id, result.name, result.confidence);
      self.name = result.name.clone();
      self.trained = true;
      return RecognitionEvent::Recognized { name: result.name, confidence: result.confidence };
    }

    if self.trained { return RecognitionEvent::Known }
    let crop = match self.face_crop() {
      Some(crop) => crop,
      None => return RecognitionEvent::NoFace,
    };
    let status = self.recognizer.enroll(&crop, &self.name);
    if matches!(status, EnrollStatus::Trained | EnrollStatus::AlreadyKnown) {
      self.trained = true;
    }
    RecognitionEvent::Enrolled(status)
  }

  pub fn rename(&mut self, name: &str) {
    self.name = name.to_string();
    self.trained = self.recognizer.is_trained(name);
  }

  pub fn is_anonymous(&self) -> bool {
    self.name == UNKNOWN_NAME
  }

  pub fn id(&self) -> IdentityId { self.id }
  pub fn name(&self) -> &str { &self.name }
  pub fn mode(&self) -> Mode { self.mode }
  pub fn bounding_box(&self) -> Option<Rectangle> { self.bounding_box }
  pub fn offset(&self) -> Vector2d { self.offset }
  pub fn is_trained(&self) -> bool { self.trained }

  pub fn feature_count(&self) -> usize {
    self.tracker.len()
  }

  pub fn features(&self) -> &PointSet {
    self.tracker.points()
  }
}

fn anchor_offset(tracker: &FeatureTracker, rect: &Rectangle) -> Vector2d {
  match tracker.centroid() {
    Some(c) => c - rect.top_left(),
    None => Vector2d::zeros(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::*;
  use proptest::prelude::*;

  fn parameters() -> ParameterSet {
    let mut p = ParameterSet::default();
    p.max_exemplars = 2;
    p.face_size = 32;
    p
  }

  fn identity(name: &str, image: Image, rect: Rectangle) -> (Identity, Arc<TestDetector>) {
    let detector = Arc::new(TestDetector::new());
    let recognizer = Arc::new(Recognizer::with_parameters(detector.clone(), Arc::new(EigenFaces::new()), &parameters()));
    let frame = Arc::new(Frame::new(image, 1));
    let identity = Identity::new(IdentityId(0), name, frame, rect, recognizer, detector.as_ref(), 4.);
    (identity, detector)
  }

  #[test]
  fn test_is_myself() {
    let (identity, _) = identity(UNKNOWN_NAME, Image::new(128, 128, 0), Rectangle::new(10, 10, 50, 50));
    assert!(identity.is_myself(&Rectangle::new(55, 55, 20, 20)));
    assert!(!identity.is_myself(&Rectangle::new(100, 100, 10, 10)));
    // Touching edges do not count.
    assert!(!identity.is_myself(&Rectangle::new(60, 10, 10, 10)));
    assert!(identity.is_anonymous());
  }

  #[test]
  fn test_update_follows_points() {
    let rect = Rectangle::new(20, 20, 40, 40);
    let (mut identity, _) = identity("alice", dotted(100, 100, &dot_grid(&rect, 8)), rect);
    assert_eq!(identity.feature_count(), 20);
    assert_eq!(identity.mode(), Mode::Tracking);
    let offset = identity.offset();
    let before = identity.features().clone();

    let frame = Arc::new(Frame::new(Image::new(100, 100, 0), 1));
    assert_eq!(identity.update(&frame, &mut ShiftFlow::new(3., 2.), 10), Mode::Tracking);
    let after = identity.features();
    assert_eq!(after.len(), 20);
    assert_eq!(identity.bounding_box(), Rectangle::bounding(after));
    assert_eq!(after[0], before[0] + Vector2d::new(3., 2.));
    // The anchor offset only changes on relocalization.
    assert_eq!(identity.offset(), offset);
  }

  #[test]
  fn test_too_few_features_is_lost() {
    let rect = Rectangle::new(20, 20, 40, 40);
    let (mut identity, detector) = identity("alice", dotted(100, 100, &dot_grid(&rect, 8)), rect);
    let frame = Arc::new(Frame::new(Image::new(100, 100, 0), 1));
    let mut flow = ShiftFlow::new(0., 0.);
    flow.lost = (0..15).collect();
    assert_eq!(identity.update(&frame, &mut flow, 10), Mode::Lost);
    assert_eq!(identity.feature_count(), 5);

    let image = dotted(100, 100, &dot_grid(&Rectangle::new(30, 30, 40, 40), 8));
    let frame = Arc::new(Frame::new(image, 1));
    identity.relocalize_face(frame, Rectangle::new(30, 30, 40, 40), detector.as_ref());
    assert_eq!(identity.mode(), Mode::Tracking);
    assert_eq!(identity.bounding_box(), Some(Rectangle::new(30, 30, 40, 40)));
    assert_eq!(identity.feature_count(), 20);
  }

  #[test]
  fn test_everything_lost() {
    let rect = Rectangle::new(20, 20, 40, 40);
    let (mut identity, _) = identity("alice", dotted(100, 100, &dot_grid(&rect, 8)), rect);
    let frame = Arc::new(Frame::new(Image::new(100, 100, 0), 1));
    let mut flow = ShiftFlow::new(0., 0.);
    flow.lost = (0..20).collect();
    assert_eq!(identity.update(&frame, &mut flow, 10), Mode::Lost);
    assert_eq!(identity.bounding_box(), None);
    assert!(identity.face_crop().is_none());
    assert!(!identity.is_myself(&rect));
    assert_eq!(identity.recognize(5000.), RecognitionEvent::NoFace);
  }

  #[test]
  fn test_face_crop_is_clamped() {
    let (identity, _) = identity(UNKNOWN_NAME, Image::new(50, 40, 7), Rectangle::new(30, 20, 40, 40));
    let crop = identity.face_crop().unwrap();
    assert_eq!((crop.width, crop.height), (20, 20));
    assert!(crop.data.iter().all(|v| *v == 7));
  }

  #[test]
  fn test_enroll_until_trained() {
    let rect = Rectangle::new(0, 0, 64, 64);
    let (mut identity, _) = identity("bob", striped(64, 64, true, 3), rect);
    assert_eq!(identity.recognize(5000.), RecognitionEvent::Enrolled(EnrollStatus::Collecting { count: 1, cap: 2 }));
    assert_eq!(identity.recognize(5000.), RecognitionEvent::Enrolled(EnrollStatus::Trained));
    assert!(identity.is_trained());
    assert_eq!(identity.recognize(5000.), RecognitionEvent::Known);
  }

  #[test]
  fn test_anonymous_takes_trained_name() {
    let detector = Arc::new(TestDetector::new());
    let recognizer = Arc::new(Recognizer::with_parameters(detector.clone(), Arc::new(EigenFaces::new()), &parameters()));
    recognizer.enroll(&striped(64, 64, true, 1), "bob");
    recognizer.enroll(&striped(64, 64, true, 2), "bob");
    assert!(recognizer.is_trained("bob"));

    let frame = Arc::new(Frame::new(striped(64, 64, true, 3), 1));
    let rect = Rectangle::new(0, 0, 64, 64);
    let mut identity = Identity::new(IdentityId(4), UNKNOWN_NAME, frame, rect, recognizer, detector.as_ref(), 4.);
    // Nothing is close enough with a zero threshold.
    assert_eq!(identity.recognize(0.), RecognitionEvent::Unrecognized);
    assert!(identity.is_anonymous());
    match identity.recognize(f64::INFINITY) {
      RecognitionEvent::Recognized { name, .. } => assert_eq!(name, "bob"),
      event => panic!("unexpected {:?}", event),
    }
    assert_eq!(identity.name(), "bob");
    assert_eq!(identity.recognize(5000.), RecognitionEvent::Known);
  }

  #[test]
  fn test_rename() {
    let (mut identity, _) = identity(UNKNOWN_NAME, Image::new(64, 64, 0), Rectangle::new(0, 0, 64, 64));
    identity.rename("person-0");
    assert_eq!(identity.name(), "person-0");
    assert!(!identity.is_anonymous());
    assert!(!identity.is_trained());
  }

  proptest! {
    #[test]
    fn prop_is_myself_is_overlap(
      x in -20i32..120, y in -20i32..120, w in 1i32..60, h in 1i32..60,
    ) {
      let (identity, _) = identity(UNKNOWN_NAME, Image::new(16, 16, 0), Rectangle::new(10, 10, 50, 50));
      let rect = Rectangle::new(x, y, w, h);
      let overlap = x < 60 && x + w > 10 && y < 60 && y + h > 10;
      prop_assert_eq!(identity.is_myself(&rect), overlap);
    }
  }
}
