use thiserror::Error;

// Recoverable failures of the recognition path. A registry logs these per
// identity and carries on with the next frame.
#[derive(Error, Debug)]
pub enum FaceError {
  #[error("both eyes could not be located in the face region")]
  AlignmentUnavailable,

  #[error("no label has been trained yet")]
  ModelUntrained,

  #[error("the current model cannot project into a subspace")]
  ReconstructionUnsupported,

  #[error("the face region is empty or outside the image")]
  EmptyRegion,

  #[error(transparent)]
  Model(#[from] anyhow::Error),
}

pub type FaceResult<T> = std::result::Result<T, FaceError>;
