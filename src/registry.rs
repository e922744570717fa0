use crate::all::*;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentityReport {
  pub id: IdentityId,
  pub name: String,
  pub mode: Mode,
  pub bounding_box: Option<Rectangle>,
  pub feature_count: usize,
}

// What happened while processing one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameReport {
  pub frame_number: usize,
  pub detection: bool,
  pub identities: Vec<IdentityReport>,
  pub created: Vec<IdentityId>,
  pub retired: Vec<IdentityId>,
}

// Table of the identities currently followed, and the per-frame loop that
// alternates between detection and optical flow tracking.
pub struct IdentityRegistry {
  detector: Arc<dyn FaceDetector>,
  flow: Box<dyn OpticalFlow>,
  recognizer: Arc<Recognizer>,
  parameters: ParameterSet,
  identities: BTreeMap<IdentityId, Identity>,
  next_id: usize,
  frame_number: usize,
}

impl IdentityRegistry {
  pub fn new(
    detector: Arc<dyn FaceDetector>,
    flow: Box<dyn OpticalFlow>,
    recognizer: Arc<Recognizer>,
    parameters: ParameterSet,
  ) -> Result<IdentityRegistry> {
    parameters.validate()?;
    Ok(IdentityRegistry {
      detector,
      flow,
      recognizer,
      parameters,
      identities: BTreeMap::new(),
      next_id: 0,
      frame_number: 0,
    })
  }

  pub fn process(&mut self, image: Image) -> FrameReport {
    let frame = Arc::new(Frame::new(image, self.parameters.lk_levels));
    let mut report = FrameReport {
      frame_number: self.frame_number,
      ..Default::default()
    };
    report.detection = self.frame_number % self.parameters.detection_interval == 0
      || self.identities.is_empty()
      || self.identities.values().any(|i| i.mode() == Mode::Lost);

    if report.detection {
      self.detect(&frame, &mut report);
    }
    else {
      self.track(&frame);
    }

    report.identities = self.identities.values()
      .map(|i| IdentityReport {
        id: i.id(),
        name: i.name().to_string(),
        mode: i.mode(),
        bounding_box: i.bounding_box(),
        feature_count: i.feature_count(),
      })
      .collect();
    debug!("Frame {}: {} identities, detection {}.", self.frame_number, report.identities.len(), report.detection);
    self.frame_number += 1;
    report
  }

  fn detect(&mut self, frame: &Arc<Frame>, report: &mut FrameReport) {
    let faces = self.detector.detect(&frame.image);
    let mut matched = BTreeSet::new();
    for rect in faces {
      let id = self.identities.iter()
        .find(|(id, identity)| !matched.contains(*id) && identity.is_myself(&rect))
        .map(|(id, _)| *id);
      match id {
        Some(id) => {
          if let Some(identity) = self.identities.get_mut(&id) {
            identity.relocalize_face(frame.clone(), rect, self.detector.as_ref());
          }
          matched.insert(id);
        },
        None => {
          let id = self.create(frame.clone(), rect);
          report.created.push(id);
          matched.insert(id);
        },
      }
    }

    let unmatched: Vec<IdentityId> = self.identities.keys()
      .filter(|id| !matched.contains(*id))
      .copied()
      .collect();
    for id in unmatched {
      let lost = self.identities.get(&id).map_or(false, |i| i.mode() == Mode::Lost);
      if lost {
        self.retire(id);
        report.retired.push(id);
      }
      else if let Some(identity) = self.identities.get_mut(&id) {
        identity.update(frame, self.flow.as_mut(), self.parameters.min_features);
      }
    }
  }

  fn track(&mut self, frame: &Arc<Frame>) {
    let recognize = self.frame_number % self.parameters.recognition_interval == 0;
    for identity in self.identities.values_mut() {
      let mode = identity.update(frame, self.flow.as_mut(), self.parameters.min_features);
      if !recognize || mode != Mode::Tracking { continue }
      let event = identity.recognize(self.parameters.recognition_threshold);
      debug!("Identity {} ({}): {:?}", identity.id(), identity.name(), event);
    }
  }

  // Starts following a face. It takes the name of a trained person if the
  // recognizer knows it, otherwise a fresh name under which it is enrolled.
  pub fn create(&mut self, frame: Arc<Frame>, rect: Rectangle) -> IdentityId {
    let id = IdentityId(self.next_id);
    self.next_id += 1;
    let mut identity = Identity::new(
      id,
      UNKNOWN_NAME,
      frame,
      rect,
      self.recognizer.clone(),
      self.detector.as_ref(),
      self.parameters.prune_factor,
    );
    match identity.recognize(self.parameters.recognition_threshold) {
      RecognitionEvent::Recognized { .. } => {},
      _ => {
        identity.rename(&format!("person-{}", id));
        identity.recognize(self.parameters.recognition_threshold);
      },
    }
    info!("New identity {} named {} at {:?}.", id, identity.name(), rect);
    self.identities.insert(id, identity);
    id
  }

  pub fn retire(&mut self, id: IdentityId) -> Option<Identity> {
    let identity = self.identities.remove(&id)?;
    info!("Retired identity {} ({}).", id, identity.name());
    Some(identity)
  }

  pub fn get(&self, id: IdentityId) -> Option<&Identity> {
    self.identities.get(&id)
  }

  // In id order.
  pub fn identities(&self) -> impl Iterator<Item = &Identity> {
    self.identities.values()
  }

  pub fn len(&self) -> usize {
    self.identities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.identities.is_empty()
  }

  pub fn recognizer(&self) -> &Arc<Recognizer> {
    &self.recognizer
  }

  pub fn frame_number(&self) -> usize {
    self.frame_number
  }
}
