// Geometric and photometric normalization of face regions. Every exemplar and
// every classified face goes through here, so the recognizer only ever sees
// images with the eyes at the same place.

use crate::all::*;

// Where the eyes end up, as fractions of the aligned image size. Controls how
// much of the face is visible.
pub const DESIRED_LEFT_EYE_X: f64 = 0.16;
pub const DESIRED_LEFT_EYE_Y: f64 = 0.14;
pub const DESIRED_RIGHT_EYE_X: f64 = 1. - DESIRED_LEFT_EYE_X;

// Elliptical mask that hides hair, ears and background.
pub const FACE_ELLIPSE_CY: f64 = 0.40;
pub const FACE_ELLIPSE_W: f64 = 0.50;
pub const FACE_ELLIPSE_H: f64 = 0.80;

pub const BACKGROUND_GRAY: u8 = 128;

const BILATERAL_SIGMA_COLOR: f64 = 20.;
const BILATERAL_SIGMA_SPACE: f64 = 2.;

#[derive(Clone, Debug)]
pub struct GeometricAligner {
  pub face_size: usize,
}

impl GeometricAligner {
  pub fn new(face_size: usize) -> GeometricAligner {
    GeometricAligner { face_size }
  }

  // Produces the square canonical face from a grayscale face region and the
  // eye centers found in it.
  pub fn align(&self, face: &Image, eyes: Option<(Point, Point)>) -> FaceResult<Image> {
    let (left, right) = eyes.ok_or(FaceError::AlignmentUnavailable)?;
    if face.is_empty() { return Err(FaceError::EmptyRegion) }
    let m = eye_transform(left, right, self.face_size).ok_or(FaceError::AlignmentUnavailable)?;
    let size = self.face_size;

    let warped = warp_affine(face, &m, size, size, BACKGROUND_GRAY);
    let equalized = equalize_histogram(&warped);
    let mut filtered = bilateral_filter(&equalized, BILATERAL_SIGMA_COLOR, BILATERAL_SIGMA_SPACE);
    let center = Vector2d::new((size / 2) as f64, (size as f64 * FACE_ELLIPSE_CY).round());
    let axes = Vector2d::new((size as f64 * FACE_ELLIPSE_W).round(), (size as f64 * FACE_ELLIPSE_H).round());
    mask_ellipse(&mut filtered, center, axes, BACKGROUND_GRAY);
    Ok(filtered)
  }
}

// Rotation, uniform scale and translation that levels the eye line, makes the
// eyes `(DESIRED_RIGHT_EYE_X - DESIRED_LEFT_EYE_X) * face_size` apart and puts
// their midpoint at `(0.5, DESIRED_LEFT_EYE_Y) * face_size`.
//
// `None` when the eyes coincide.
pub fn eye_transform(left: Point, right: Point, face_size: usize) -> Option<Matrix23d> {
  let center = (left + right) * 0.5;
  let d = right - left;
  let len = d.norm();
  if !(len > 1e-6) || !len.is_finite() { return None }
  let angle = d[1].atan2(d[0]);

  let size = face_size as f64;
  let scale = (DESIRED_RIGHT_EYE_X - DESIRED_LEFT_EYE_X) * size / len;
  let alpha = scale * angle.cos();
  let beta = scale * angle.sin();
  // Rotation about the eye center, followed by a shift of the center to its
  // desired place.
  let tx = (1. - alpha) * center[0] - beta * center[1] + size * 0.5 - center[0];
  let ty = beta * center[0] + (1. - alpha) * center[1] + size * DESIRED_LEFT_EYE_Y - center[1];
  Some(Matrix23d::new(
    alpha, beta, tx,
    -beta, alpha, ty,
  ))
}

pub fn apply_transform(m: &Matrix23d, p: Point) -> Point {
  m.fixed_columns::<2>(0) * p + m.column(2)
}
