use crate::all::*;

// Internal identifier of a named individual in the training set.
pub type Label = usize;

// Statistical face-space solver. Fitting always starts from scratch, there is
// no incremental update of an existing model.
pub trait StatisticalModel: Send + Sync {
  fn fit(&self, images: &[Image], labels: &[Label]) -> Result<Arc<dyn TrainedModel>>;
}

// Result of `StatisticalModel::fit`. Immutable, shared by every classifier.
pub trait TrainedModel: Send + Sync {
  // Closest label and a distance-like confidence in the model's own units,
  // smaller meaning more similar.
  fn predict(&self, image: &Image) -> Result<(Label, f64)>;

  // Projects into the learned subspace and back. `None` if the model has no
  // subspace.
  fn project_and_reconstruct(&self, _image: &Image) -> Option<Image> {
    None
  }

  // Basis vectors of the subspace shaped like the training images, most
  // significant first. Empty if the model has no subspace.
  fn basis(&self) -> Vec<Matrixd> {
    vec![]
  }
}
