use crate::all::*;

// Aligned exemplars per label. Labels are handed out densely in the order
// names are first seen and a name keeps its label for the lifetime of the
// store.
pub struct TrainingSetStore {
  cap: usize,
  labels: HashMap<String, Label>,
  names: Vec<String>,
  exemplars: Vec<Vec<Image>>,
  trained: Vec<bool>,
  // Retrain requested but not yet published.
  pending: Vec<bool>,
}

impl TrainingSetStore {
  pub fn new(cap: usize) -> TrainingSetStore {
    TrainingSetStore {
      cap,
      labels: HashMap::new(),
      names: vec![],
      exemplars: vec![],
      trained: vec![],
      pending: vec![],
    }
  }

  pub fn cap(&self) -> usize { self.cap }

  pub fn label_of(&self, name: &str) -> Option<Label> {
    self.labels.get(name).copied()
  }

  // Existing label for the name, or the next free one.
  pub fn resolve(&mut self, name: &str) -> Label {
    if let Some(label) = self.label_of(name) { return label }
    let label = self.names.len();
    self.labels.insert(name.to_string(), label);
    self.names.push(name.to_string());
    self.exemplars.push(vec![]);
    self.trained.push(false);
    self.pending.push(false);
    label
  }

  pub fn name(&self, label: Label) -> Option<&str> {
    self.names.get(label).map(|n| n.as_str())
  }

  pub fn label_count(&self) -> usize {
    self.names.len()
  }

  pub fn exemplar_count(&self, label: Label) -> usize {
    self.exemplars.get(label).map_or(0, |e| e.len())
  }

  pub fn is_full(&self, label: Label) -> bool {
    self.exemplar_count(label) >= self.cap
  }

  // Returns false and drops the image if the label already has `cap` exemplars.
  pub fn push(&mut self, label: Label, image: Image) -> bool {
    if self.is_full(label) { return false }
    match self.exemplars.get_mut(label) {
      Some(exemplars) => {
        exemplars.push(image);
        true
      },
      None => false,
    }
  }

  pub fn is_trained(&self, label: Label) -> bool {
    self.trained.get(label).copied().unwrap_or(false)
  }

  pub fn any_trained(&self) -> bool {
    self.trained.iter().any(|t| *t)
  }

  pub fn mark_trained(&mut self, label: Label) {
    if let Some(t) = self.trained.get_mut(label) { *t = true }
    if let Some(p) = self.pending.get_mut(label) { *p = false }
  }

  pub fn is_pending(&self, label: Label) -> bool {
    self.pending.get(label).copied().unwrap_or(false)
  }

  pub fn set_pending(&mut self, label: Label, pending: bool) {
    if let Some(p) = self.pending.get_mut(label) { *p = pending }
  }

  // Every exemplar of every label, flattened for fitting.
  pub fn snapshot(&self) -> (Vec<Image>, Vec<Label>) {
    let mut images = vec![];
    let mut labels = vec![];
    for (label, exemplars) in self.exemplars.iter().enumerate() {
      for image in exemplars {
        images.push(image.clone());
        labels.push(label);
      }
    }
    (images, labels)
  }
}
