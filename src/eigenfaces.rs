// Eigenfaces: principal component analysis of the training images followed by
// nearest neighbour search among the projected training samples.
//
// The covariance eigenvectors are computed from the small sample-by-sample Gram
// matrix, which is much cheaper than the pixel-by-pixel one when there are
// fewer images than pixels.

use crate::all::*;
use nalgebra::SymmetricEigen;

// Relative size below which eigenvalues are treated as zero.
const EIGENVALUE_EPS: f64 = 1e-9;

pub struct EigenFaces {
  // Zero keeps every component with a non-zero eigenvalue.
  pub num_components: usize,
}

impl EigenFaces {
  pub fn new() -> EigenFaces {
    EigenFaces { num_components: 0 }
  }
}

pub struct EigenFaceModel {
  width: usize,
  height: usize,
  mean: Vectord,
  // One column per component.
  eigenvectors: Matrixd,
  eigenvalues: Vec<f64>,
  projections: Vec<Vectord>,
  labels: Vec<Label>,
}

impl StatisticalModel for EigenFaces {
  fn fit(&self, images: &[Image], labels: &[Label]) -> Result<Arc<dyn TrainedModel>> {
    Ok(Arc::new(EigenFaceModel::fit(images, labels, self.num_components)?))
  }
}

impl EigenFaceModel {
  pub fn fit(images: &[Image], labels: &[Label], num_components: usize) -> Result<EigenFaceModel> {
    if images.is_empty() {
      bail!("Cannot fit a face model without images.");
    }
    if images.len() != labels.len() {
      bail!("Got {} images but {} labels.", images.len(), labels.len());
    }
    let width = images[0].width;
    let height = images[0].height;
    if images.iter().any(|i| i.width != width || i.height != height) {
      bail!("All training images must be {}x{}.", width, height);
    }
    let d = width * height;
    let n = images.len();

    let mut data = Matrixd::zeros(d, n);
    for (j, image) in images.iter().enumerate() {
      data.set_column(j, &to_vector(image));
    }
    let mean = data.column_mean();
    for mut column in data.column_iter_mut() {
      column -= &mean;
    }

    let gram = data.transpose() * &data;
    let eigen = SymmetricEigen::new(gram);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| eigen.eigenvalues[*b].total_cmp(&eigen.eigenvalues[*a]));
    let largest = f64::max(eigen.eigenvalues[order[0]], 0.);
    let mut kept: Vec<usize> = order.into_iter()
      .filter(|i| eigen.eigenvalues[*i] > EIGENVALUE_EPS * f64::max(largest, 1.))
      .collect();
    if num_components > 0 { kept.truncate(num_components) }

    let mut eigenvectors = Matrixd::zeros(d, kept.len());
    let mut eigenvalues = vec![];
    for (k, i) in kept.iter().enumerate() {
      let lambda = eigen.eigenvalues[*i];
      let u = &data * eigen.eigenvectors.column(*i) / lambda.sqrt();
      eigenvectors.set_column(k, &u);
      eigenvalues.push(lambda);
    }

    let projections = (0..n)
      .map(|j| eigenvectors.tr_mul(&data.column(j)))
      .collect();
    debug!("Fitted eigenfaces with {} components from {} images.", kept.len(), n);
    Ok(EigenFaceModel {
      width,
      height,
      mean,
      eigenvectors,
      eigenvalues,
      projections,
      labels: labels.to_vec(),
    })
  }

  pub fn component_count(&self) -> usize {
    self.eigenvectors.ncols()
  }

  pub fn eigenvalues(&self) -> &[f64] {
    &self.eigenvalues
  }

  fn centered(&self, image: &Image) -> Result<Vectord> {
    if image.width != self.width || image.height != self.height {
      bail!("Expected a {}x{} face, got {}x{}.", self.width, self.height, image.width, image.height);
    }
    Ok(to_vector(image) - &self.mean)
  }

  pub fn project(&self, image: &Image) -> Result<Vectord> {
    Ok(self.eigenvectors.tr_mul(&self.centered(image)?))
  }
}

impl TrainedModel for EigenFaceModel {
  fn predict(&self, image: &Image) -> Result<(Label, f64)> {
    let x = self.centered(image)?;
    // Without components all training images were identical.
    if self.component_count() == 0 {
      return Ok((self.labels[0], x.norm()));
    }
    let y = self.eigenvectors.tr_mul(&x);
    let mut best = (self.labels[0], f64::INFINITY);
    for (p, label) in self.projections.iter().zip(&self.labels) {
      let distance = (p - &y).norm();
      if distance < best.1 { best = (*label, distance) }
    }
    Ok(best)
  }

  fn project_and_reconstruct(&self, image: &Image) -> Option<Image> {
    let y = self.project(image).ok()?;
    let x = &self.eigenvectors * y + &self.mean;
    Some(Image {
      data: x.iter().map(|v| v.round().clamp(0., 255.) as u8).collect(),
      width: self.width,
      height: self.height,
    })
  }

  fn basis(&self) -> Vec<Matrixd> {
    self.eigenvectors.column_iter()
      .map(|c| {
        let values: Vec<f64> = c.iter().cloned().collect();
        Matrixd::from_row_slice(self.height, self.width, &values)
      })
      .collect()
  }
}

fn to_vector(image: &Image) -> Vectord {
  Vectord::from_iterator(image.data.len(), image.data.iter().map(|v| *v as f64))
}
