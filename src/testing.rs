// Synthetic images and mock capabilities shared by the unit tests.

use crate::all::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

pub fn gaussian_blob(width: usize, height: usize, center: Point, sigma: f64, amplitude: f64) -> Image {
  let mut image = Image::new(width, height, 20);
  for y in 0..height {
    for x in 0..width {
      let d = Point::new(x as f64, y as f64) - center;
      let v = 20. + amplitude * (-d.norm_squared() / (2. * sigma * sigma)).exp();
      image.set_value(x, y, v.round().clamp(0., 255.) as u8);
    }
  }
  image
}

// Dark background with bright 2x2 dots, each of which is one FAST corner.
pub fn dotted(width: usize, height: usize, dots: &[[usize; 2]]) -> Image {
  let mut image = Image::new(width, height, 30);
  for d in dots {
    for dy in 0..2 {
      for dx in 0..2 {
        image.set_value(d[0] + dx, d[1] + dy, 220);
      }
    }
  }
  image
}

// Regular grid of dots covering `rect`, spaced `step` apart.
pub fn dot_grid(rect: &Rectangle, step: usize) -> Vec<[usize; 2]> {
  let mut dots = vec![];
  let mut y = rect.y as usize + step / 2;
  while y + 2 < rect.bottom() as usize {
    let mut x = rect.x as usize + step / 2;
    while x + 2 < rect.right() as usize {
      dots.push([x, y]);
      x += step;
    }
    y += step;
  }
  dots
}

// Bright background with a dark square around each eye.
pub fn face_with_eyes(width: usize, height: usize, left: Point, right: Point, radius: i32) -> Image {
  let mut image = Image::new(width, height, 200);
  for eye in [left, right] {
    let cx = eye[0].round() as i32;
    let cy = eye[1].round() as i32;
    for y in cy - radius ..= cy + radius {
      for x in cx - radius ..= cx + radius {
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 { continue }
        image.set_value(x as usize, y as usize, 20);
      }
    }
  }
  image
}

// Stripes with period 8 and a little seeded noise. Horizontal and vertical
// stripes play two different people.
pub fn striped(width: usize, height: usize, horizontal: bool, seed: u64) -> Image {
  let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
  let mut image = Image::new(width, height, 0);
  for y in 0..height {
    for x in 0..width {
      let t = if horizontal { y } else { x };
      let base: i32 = if (t / 4) % 2 == 0 { 60 } else { 190 };
      let v = base + rng.gen_range(-8..=8);
      image.set_value(x, y, v.clamp(0, 255) as u8);
    }
  }
  image
}

// Reports preset faces and places the eyes at fixed fractions of any region
// that is large and bright enough.
pub struct TestDetector {
  pub faces: Mutex<Vec<Rectangle>>,
  landmark_detector: LandmarkDetector,
}

impl TestDetector {
  pub fn new() -> TestDetector {
    TestDetector::with_faces(vec![])
  }

  pub fn with_faces(faces: Vec<Rectangle>) -> TestDetector {
    TestDetector {
      faces: Mutex::new(faces),
      landmark_detector: LandmarkDetector::with_parameters(&ParameterSet::default()),
    }
  }

  pub fn set_faces(&self, faces: Vec<Rectangle>) {
    *self.faces.lock().unwrap() = faces;
  }
}

impl FaceDetector for TestDetector {
  fn detect(&self, _image: &Image) -> Vec<Rectangle> {
    self.faces.lock().unwrap().clone()
  }

  fn landmarks(&self, image: &Image, face: &Rectangle) -> PointSet {
    self.landmark_detector.landmarks(image, face)
  }

  fn eyes(&self, face: &Image) -> Option<(Point, Point)> {
    if face.width < 16 || face.height < 16 || face.mean() < 10. { return None }
    let w = face.width as f64;
    let h = face.height as f64;
    Some((Point::new(0.3 * w, 0.4 * h), Point::new(0.7 * w, 0.4 * h)))
  }
}

// Moves every point by `shift`. Points whose index is in `lost` fail.
pub struct ShiftFlow {
  pub shift: Vector2d,
  pub lost: Vec<usize>,
}

impl ShiftFlow {
  pub fn new(dx: f64, dy: f64) -> ShiftFlow {
    ShiftFlow { shift: Vector2d::new(dx, dy), lost: vec![] }
  }
}

impl OpticalFlow for ShiftFlow {
  fn advance(&mut self, _frame0: &Frame, _frame1: &Frame, points: &[Point]) -> Vec<(Point, bool)> {
    points.iter().enumerate()
      .map(|(i, p)| {
        if self.lost.contains(&i) { (*p, false) } else { (p + self.shift, true) }
      })
      .collect()
  }
}

// Always predicts the first label it was fitted with and has no subspace.
pub struct ConstantModel;

struct ConstantPrediction(Label);

impl StatisticalModel for ConstantModel {
  fn fit(&self, _images: &[Image], labels: &[Label]) -> Result<Arc<dyn TrainedModel>> {
    let label = *labels.first().ok_or(anyhow!("No labels."))?;
    Ok(Arc::new(ConstantPrediction(label)))
  }
}

impl TrainedModel for ConstantPrediction {
  fn predict(&self, _image: &Image) -> Result<(Label, f64)> {
    Ok((self.0, 1.))
  }
}

pub struct FailingModel;

impl StatisticalModel for FailingModel {
  fn fit(&self, _images: &[Image], _labels: &[Label]) -> Result<Arc<dyn TrainedModel>> {
    bail!("Solver refused to converge.")
  }
}
