// Incremental face recognition. Exemplars are collected per name until the cap
// is reached, then the whole model is refitted and the name becomes
// recognizable. Once trained a name receives no further exemplars.

use crate::all::*;
use crossbeam::channel::{unbounded, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

pub const MAX_VISUALIZATIONS: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
  // Empty when the recognizer has no opinion.
  pub name: String,
  pub confidence: f64,
}

impl ClassificationResult {
  pub fn none() -> ClassificationResult {
    ClassificationResult { name: String::new(), confidence: 0. }
  }

  pub fn is_empty(&self) -> bool {
    self.name.is_empty()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EnrollStatus {
  Collecting { count: usize, cap: usize },
  // Eyes were not found, nothing was stored.
  Skipped,
  Trained,
  TrainingQueued,
  TrainingFailed,
  AlreadyKnown,
}

struct Published {
  model: Arc<dyn TrainedModel>,
  // Size of the snapshot the model was fitted on. Exemplars are never removed,
  // so a larger snapshot is a newer one.
  exemplars: usize,
}

// State reachable from both the recognizer and its training worker.
struct Shared {
  model: Arc<dyn StatisticalModel>,
  store: Mutex<TrainingSetStore>,
  published: RwLock<Option<Published>>,
  version: AtomicU64,
}

impl Shared {
  // Refits from every label's exemplars. The store is only locked to take the
  // snapshot and to flag the result, never during fitting.
  fn train(&self, label: Label) -> FaceResult<()> {
    let (images, labels) = self.store.lock().unwrap().snapshot();
    let fitted = match self.model.fit(&images, &labels) {
      Ok(fitted) => fitted,
      Err(err) => {
        self.store.lock().unwrap().set_pending(label, false);
        return Err(err.into());
      },
    };
    {
      // A slower fit of an older snapshot must not replace a newer model.
      let mut published = self.published.write().unwrap();
      if published.as_ref().map_or(true, |p| p.exemplars <= images.len()) {
        *published = Some(Published { model: fitted, exemplars: images.len() });
        self.version.fetch_add(1, Ordering::SeqCst);
      }
    }
    let mut store = self.store.lock().unwrap();
    store.mark_trained(label);
    info!("I can now recognize {} in new images (model version {}).", store.name(label).unwrap_or("?"), self.model_version());
    Ok(())
  }

  fn model_version(&self) -> u64 {
    self.version.load(Ordering::SeqCst)
  }
}

struct TrainingWorker {
  requests: Sender<Label>,
  handle: JoinHandle<()>,
}

impl TrainingWorker {
  fn spawn(shared: Arc<Shared>) -> Result<TrainingWorker> {
    let (requests, receiver) = unbounded::<Label>();
    let handle = thread::Builder::new()
      .name("face-training".to_string())
      .spawn(move || {
        debug!("Training worker started.");
        while let Ok(label) = receiver.recv() {
          if let Err(err) = shared.train(label) {
            warn!("Background training of label {} failed: {}", label, err);
          }
        }
        debug!("Training worker stopped.");
      })
      .context("Failed to start the training worker.")?;
    Ok(TrainingWorker { requests, handle })
  }
}

pub struct Recognizer {
  detector: Arc<dyn FaceDetector>,
  aligner: GeometricAligner,
  cap: usize,
  shared: Arc<Shared>,
  worker: Option<TrainingWorker>,
}

impl Recognizer {
  pub fn new(detector: Arc<dyn FaceDetector>, model: Arc<dyn StatisticalModel>) -> Recognizer {
    let p = parameters();
    Recognizer::with_parameters(detector, model, &p)
  }

  pub fn with_parameters(
    detector: Arc<dyn FaceDetector>,
    model: Arc<dyn StatisticalModel>,
    p: &ParameterSet,
  ) -> Recognizer {
    let shared = Arc::new(Shared {
      model,
      store: Mutex::new(TrainingSetStore::new(p.max_exemplars)),
      published: RwLock::new(None),
      version: AtomicU64::new(0),
    });
    let worker = if p.background_training {
      match TrainingWorker::spawn(shared.clone()) {
        Ok(worker) => Some(worker),
        Err(err) => {
          warn!("{:#}, training synchronously instead.", err);
          None
        },
      }
    }
    else {
      None
    };
    Recognizer {
      detector,
      aligner: GeometricAligner::new(p.face_size),
      cap: p.max_exemplars,
      shared,
      worker,
    }
  }

  pub fn face_size(&self) -> usize {
    self.aligner.face_size
  }

  // Locates the eyes in a grayscale face region and aligns it.
  pub fn align(&self, image: &Image) -> FaceResult<Image> {
    let eyes = self.detector.eyes(image);
    self.aligner.align(image, eyes)
  }

  // Adds one exemplar for `name` and starts training when the name has
  // collected enough of them.
  pub fn enroll(&self, image: &Image, name: &str) -> EnrollStatus {
    let (label, full) = {
      let mut store = self.shared.store.lock().unwrap();
      let label = store.resolve(name);
      if store.is_trained(label) { return EnrollStatus::AlreadyKnown }
      (label, store.is_full(label))
    };

    if !full {
      let aligned = match self.align(image) {
        Ok(aligned) => aligned,
        Err(err) => {
          debug!("Skipping exemplar for {}: {}", name, err);
          return EnrollStatus::Skipped;
        },
      };
      let count = {
        let mut store = self.shared.store.lock().unwrap();
        store.push(label, aligned);
        store.exemplar_count(label)
      };
      info!("Acquired {}/{} images for {}.", count, self.cap, name);
      if count < self.cap {
        return EnrollStatus::Collecting { count, cap: self.cap };
      }
    }
    self.start_training(label, name)
  }

  fn start_training(&self, label: Label, name: &str) -> EnrollStatus {
    {
      let mut store = self.shared.store.lock().unwrap();
      if store.is_trained(label) { return EnrollStatus::AlreadyKnown }
      if store.is_pending(label) { return EnrollStatus::TrainingQueued }
      store.set_pending(label, true);
    }
    info!("Enough data for {}! Training the recognizer...", name);
    if let Some(worker) = &self.worker {
      if worker.requests.send(label).is_ok() {
        return EnrollStatus::TrainingQueued;
      }
      warn!("Training worker is gone, training {} synchronously.", name);
    }
    match self.shared.train(label) {
      Ok(()) => EnrollStatus::Trained,
      Err(err) => {
        warn!("Training for {} failed: {}", name, err);
        EnrollStatus::TrainingFailed
      },
    }
  }

  // Refits the model from all exemplars and marks `label` trained.
  pub fn train(&self, label: Label) -> FaceResult<()> {
    self.shared.train(label)
  }

  // Like `classify()` but tells why there is no opinion.
  pub fn try_classify(&self, image: &Image) -> FaceResult<ClassificationResult> {
    if !self.shared.store.lock().unwrap().any_trained() {
      return Err(FaceError::ModelUntrained);
    }
    let model = self.published().ok_or(FaceError::ModelUntrained)?;
    let aligned = self.align(image)?;
    let (label, confidence) = model.predict(&aligned)?;
    let store = self.shared.store.lock().unwrap();
    if !store.is_trained(label) {
      return Ok(ClassificationResult::none());
    }
    let name = store.name(label).unwrap_or_default().to_string();
    Ok(ClassificationResult { name, confidence })
  }

  // Name and model confidence for a grayscale face region, or the empty
  // result. Deciding whether the confidence is good enough is up to the caller.
  pub fn classify(&self, image: &Image) -> ClassificationResult {
    match self.try_classify(image) {
      Ok(result) => result,
      Err(err) => {
        debug!("No classification: {}", err);
        ClassificationResult::none()
      },
    }
  }

  // Best-effort back-projection of an aligned face through the model subspace.
  pub fn reconstruct(&self, aligned: &Image) -> FaceResult<Image> {
    let model = self.published().ok_or(FaceError::ReconstructionUnsupported)?;
    model.project_and_reconstruct(aligned).ok_or(FaceError::ReconstructionUnsupported)
  }

  // The leading basis images of the model, each stretched to full contrast
  // and false-colored.
  pub fn eigen_visualizations(&self) -> Vec<ColorImage> {
    let model = match self.published() {
      Some(model) => model,
      None => return vec![],
    };
    model.basis().iter()
      .take(MAX_VISUALIZATIONS)
      .map(|b| false_color(&normalize_min_max(b)))
      .collect()
  }

  // Bumped every time a refitted model is published.
  pub fn model_version(&self) -> u64 {
    self.shared.model_version()
  }

  pub fn label_of(&self, name: &str) -> Option<Label> {
    self.shared.store.lock().unwrap().label_of(name)
  }

  pub fn exemplar_count(&self, name: &str) -> usize {
    let store = self.shared.store.lock().unwrap();
    store.label_of(name).map_or(0, |label| store.exemplar_count(label))
  }

  pub fn is_trained(&self, name: &str) -> bool {
    let store = self.shared.store.lock().unwrap();
    store.label_of(name).map_or(false, |label| store.is_trained(label))
  }

  fn published(&self) -> Option<Arc<dyn TrainedModel>> {
    self.shared.published.read().unwrap().as_ref().map(|p| p.model.clone())
  }
}

impl Drop for Recognizer {
  fn drop(&mut self) {
    if let Some(worker) = self.worker.take() {
      let TrainingWorker { requests, handle } = worker;
      drop(requests);
      if handle.join().is_err() {
        error!("Training worker panicked.");
      }
    }
  }
}
