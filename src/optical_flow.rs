// Pyramidal Lucas-Kanade tracker based on:
// <http://robots.stanford.edu/cs223b04/algo_tracking.pdf>
// “Pyramidal Implementation of the Lucas Kanade Feature Tracker
//   Description of the algorithm” by Jean-Yves Bouguet

use crate::all::*;

type Range = [[i16; 2]; 2];

// Moves points from one frame to the next.
pub trait OpticalFlow {
  // Returns one `(new_position, success)` pair per input point, in order.
  // Failed points keep their old position.
  fn advance(
    &mut self,
    frame0: &Frame,
    frame1: &Frame,
    points: &[Point],
  ) -> Vec<(Point, bool)>;
}

#[allow(non_snake_case)]
pub struct LucasKanade {
  lk_iters: usize,
  lk_levels: usize,
  lk_win_size: usize,
  Ix: Matrixd,
  Iy: Matrixd,
  It: Matrixd,
  // Workspace.
  grid0: Matrixd,
}

impl LucasKanade {
  pub fn new() -> Result<LucasKanade> {
    let p = parameters();
    LucasKanade::with_parameters(&p)
  }

  pub fn with_parameters(p: &ParameterSet) -> Result<LucasKanade> {
    if p.lk_win_size % 2 != 1 {
      bail!("Lucas-Kanade window size must be odd number.");
    }
    if p.lk_win_size < 3 {
      bail!("Lucas-Kanade window size must be at least 3.");
    }
    Ok(LucasKanade {
      lk_iters: p.lk_iters,
      lk_levels: p.lk_levels,
      lk_win_size: p.lk_win_size,
      Ix: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
      Iy: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
      It: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
      grid0: DMatrix::zeros(p.lk_win_size, p.lk_win_size),
    })
  }

  // Highest pyramid level that still fits a whole integration window in both frames.
  #[allow(non_snake_case)]
  fn top_level(&self, frame0: &Frame, frame1: &Frame) -> usize {
    let mut top = 0;
    for L in 1..=self.lk_levels {
      if L >= frame0.level_count() || L >= frame1.level_count() { break }
      let level0 = frame0.get_level(L);
      let level1 = frame1.get_level(L);
      let w = self.lk_win_size;
      if level0.width < w || level0.height < w || level1.width < w || level1.height < w { break }
      top = L;
    }
    top
  }

  #[allow(non_snake_case)]
  fn process_feature(
    &mut self,
    frame0: &Frame,
    frame1: &Frame,
    top_level: usize,
    feature0: Vector2d,
  ) -> Option<Vector2d> {
    let r = (self.lk_win_size - 1) / 2;
    let mut g = Vector2d::zeros();
    let mut d = Vector2d::zeros();
    for L in (0..top_level + 1).rev() {
      let level0 = frame0.get_level(L);
      let level1 = frame1.get_level(L);
      let u = feature0 / u32::pow(2, L as u32) as f64;
      let range = integration_range(level0, u, r, 1)?;
      scharr(level0, u, range, &mut self.Ix, &mut self.Iy, &mut self.grid0);
      let G = spatial_gradient(&self.Ix, &self.Iy);
      let mut nu = Vector2d::zeros();
      for _ in 0..self.lk_iters {
        image_difference(range, &self.grid0, &mut self.It, level1, u + g + nu)?;
        let eta = flow_vector(&G, &self.Ix, &self.Iy, &self.It)?;
        nu += eta;
        if eta.norm_squared() < 1e-6 { break }
      }
      d = nu;
      if L > 0 { g = 2. * (g + d) }
    }
    Some(feature0 + g + d)
  }
}

impl OpticalFlow for LucasKanade {
  fn advance(
    &mut self,
    frame0: &Frame,
    frame1: &Frame,
    points: &[Point],
  ) -> Vec<(Point, bool)> {
    let top_level = self.top_level(frame0, frame1);
    let mut out = Vec::with_capacity(points.len());
    for feature0 in points {
      match self.process_feature(frame0, frame1, top_level, *feature0) {
        Some(feature1) => out.push((feature1, true)),
        None => out.push((*feature0, false)),
      }
    }
    out
  }
}

// Unlike the gradients, the difference is sampled around the moving center
// using the source window, so it only fails when that window leaves the image.
#[allow(non_snake_case)]
fn image_difference(
  range: Range,
  I0: &Matrixd,
  mut It: &mut Matrixd,
  level: &Image,
  center: Vector2d,
) -> Option<()> {
  if !range_fits(level, center, range) {
    return None;
  }
  fill_grid(level, range, center, &mut It);
  *It *= -1.;
  *It += I0.slice((1, 1), (It.nrows(), It.ncols()));
  Some(())
}

#[allow(non_snake_case)]
fn flow_vector(
  G: &Matrix2d,
  Ix: &Matrixd,
  Iy: &Matrixd,
  It: &Matrixd,
) -> Option<Vector2d> {
  let mut b = Vector2d::zeros();
  for y in 0..Ix.nrows() {
    for x in 0..Ix.ncols() {
      b[0] += It[(y, x)] * Ix[(y, x)];
      b[1] += It[(y, x)] * Iy[(y, x)];
    }
  }
  // Could instead solve the linear equation?
  G.try_inverse().map(|invG| invG * b)
}

#[allow(non_snake_case)]
fn spatial_gradient(
  Ix: &Matrixd,
  Iy: &Matrixd,
) -> Matrix2d {
  assert_eq!(Ix.nrows(), Iy.nrows());
  assert_eq!(Ix.ncols(), Iy.ncols());
  let mut x2 = 0.;
  let mut y2 = 0.;
  let mut xy = 0.;
  for y in 0..Ix.nrows() {
    for x in 0..Ix.ncols() {
      x2 += Ix[(y, x)] * Ix[(y, x)];
      y2 += Iy[(y, x)] * Iy[(y, x)];
      xy += Ix[(y, x)] * Iy[(y, x)];
    }
  }
  Matrix2d::new(x2, xy, xy, y2)
}

// Returns closed range of integer steps that can be takes without going outside
// the image borders. Returns None if the center point is outside the level
// boundaries or no step fits.
fn integration_range(
  level: &Image,
  center: Vector2d,
  r: usize,
  padding: i16,
) -> Option<Range> {
  let r = r as i16;
  let mut range = [[0, 0], [0, 0]];
  for i in 0..2 {
    let s = level.size(i);
    if center[i] < 0. || center[i] > (s - 1) as f64 { return None; }
    let n = center[i] as i16;
    range[i] = [i16::max(-r, -n + padding), i16::min(r, s as i16 - n - padding - 2)];
    if range[i][0] > range[i][1] { return None; }
  }
  Some(range)
}

fn range_fits(level: &Image, center: Vector2d, range: Range) -> bool {
  for i in 0..2 {
    let s = level.size(i) as f64;
    if center[i] + (range[i][0] as f64) < 0. { return false }
    if center[i] + (range[i][1] as f64) > s - 1. { return false }
  }
  true
}

fn fill_grid(
  level: &Image,
  range: Range,
  center: Vector2d,
  grid: &mut Matrixd,
) {
  *grid = DMatrix::zeros((range[1][1] - range[1][0] + 1) as usize, (range[0][1] - range[0][0] + 1) as usize);
  for (y_ind, y) in (range[1][0]..=range[1][1]).enumerate() {
    for (x_ind, x) in (range[0][0]..=range[0][1]).enumerate() {
      grid[(y_ind, x_ind)] = bilinear(level, center + Vector2d::new(x as f64, y as f64));
    }
  }
}

fn scharr(
  level: &Image,
  center: Vector2d,
  range: Range,
  out_x: &mut Matrixd,
  out_y: &mut Matrixd,
  // Workspace.
  mut grid: &mut Matrixd,
) {
  let grange = [[range[0][0] - 1, range[0][1] + 1], [range[1][0] - 1, range[1][1] + 1]];
  fill_grid(level, grange, center, &mut grid);
  *out_x = Matrixd::zeros(grid.nrows() - 2, grid.ncols() - 2);
  *out_y = Matrixd::zeros(grid.nrows() - 2, grid.ncols() - 2);
  for y in 1..(grid.nrows() - 1) {
    for x in 1..(grid.ncols() - 1) {
      out_x[(y - 1, x - 1)] = (10. * grid[(y, x + 1)]
        + 3. * grid[(y + 1, x + 1)]
        + 3. * grid[(y - 1, x + 1)]
        - 10. * grid[(y, x - 1)]
        - 3. * grid[(y + 1, x - 1)]
        - 3. * grid[(y - 1, x - 1)]
      ) / 32.;
      out_y[(y - 1, x - 1)] = (10. * grid[(y + 1, x)]
        + 3. * grid[(y + 1, x + 1)]
        + 3. * grid[(y + 1, x - 1)]
        - 10. * grid[(y - 1, x)]
        - 3. * grid[(y - 1, x + 1)]
        - 3. * grid[(y - 1, x - 1)]
      ) / 32.;
    }
  }
}

#[inline(always)]
pub fn bilinear(image: &Image, u: Vector2d) -> f64 {
  assert!(u[0] >= 0.0 && u[0] <= image.width as f64 - 1.);
  assert!(u[1] >= 0.0 && u[1] <= image.height as f64 - 1.);
  let x0 = u[0] as usize;
  let y0 = u[1] as usize;
  let x1 = x0 + 1;
  let y1 = y0 + 1;
  let xa = u[0].fract();
  let ya = u[1].fract();
  // Besides improving computation speed, these allow to work one pixel
  // closer to the right and bottom edges when coordinates are integers.
  let eps = 1e-5;
  let w = image.width;
  if xa < eps && ya < eps {
    image.data[y0 * w + x0] as f64
  }
  else if xa < eps {
    (1. - ya) * image.data[y0 * w + x0] as f64
      + ya * image.data[y1 * w + x0] as f64
  }
  else if ya < eps {
    (1. - xa) * image.data[y0 * w + x0] as f64
      + xa * image.data[y0 * w + x1] as f64
  }
  else {
    (1. - xa) * (1. - ya) * image.data[y0 * w + x0] as f64
      + xa * (1. - ya) * image.data[y0 * w + x1] as f64
      + (1. - xa) * ya * image.data[y1 * w + x0] as f64
      + xa * ya * image.data[y1 * w + x1] as f64
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::gaussian_blob;

  #[test]
  fn test_scharr() {
    let mut level = Image::new(5, 5, 0);

    let mut out_x = dmatrix!();
    let mut out_y = dmatrix!();
    let mut grid = dmatrix!();
    let center = Vector2d::new(2.0, 2.0);
    let range = [[-1, 1], [-1, 1]];
    scharr(&level, center, range, &mut out_x, &mut out_y, &mut grid);
    assert_eq!(out_x, DMatrix::zeros(3, 3));
    assert_eq!(out_y, DMatrix::zeros(3, 3));

    level.data = vec![
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
      0, 1, 2, 3, 4,
    ];
    scharr(&level, center, range, &mut out_x, &mut out_y, &mut grid);
    assert_eq!(out_x, DMatrix::repeat(3, 3, 1.));
    assert_eq!(out_y, DMatrix::zeros(3, 3));

    level.data = vec![
      0, 1, 2, 3, 4,
      1, 2, 3, 4, 5,
      2, 3, 4, 5, 6,
      3, 4, 5, 6, 7,
      4, 5, 6, 7, 8,
    ];
    scharr(&level, center, range, &mut out_x, &mut out_y, &mut grid);
    assert_eq!(out_x, DMatrix::repeat(3, 3, 1.));
    assert_eq!(out_y, DMatrix::repeat(3, 3, 1.));

    level.data = vec![
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
      0, 0, 5, 0, 0,
    ];
    scharr(&level, center, range, &mut out_x, &mut out_y, &mut grid);
    let answer_x = dmatrix!(
      2.5, 0., -2.5;
      2.5, 0., -2.5;
      2.5, 0., -2.5;
    );
    assert_eq!(out_x, answer_x);
    assert_eq!(out_y, DMatrix::zeros(3, 3));
  }

  #[test]
  fn test_integration_range() {
    // Width and height are pixels. Coordinate (0, 0) means center of top-left
    // pixel. Thus (9, 9) is the center of the bottom-right pixel for 10x10
    // image.
    let level = Image::new(10, 10, 0);
    assert_eq!(integration_range(&level, Vector2d::new(4.5, 4.5), 3, 0).unwrap(), [[-3, 3], [-3, 3]]);
    assert_eq!(integration_range(&level, Vector2d::new(1.5, 2.5), 3, 0).unwrap(), [[-1, 3], [-2, 3]]);
    assert_eq!(integration_range(&level, Vector2d::new(1.0, 2.0), 3, 0).unwrap(), [[-1, 3], [-2, 3]]);
    assert_eq!(integration_range(&level, Vector2d::new(0.9, 1.9), 3, 0).unwrap(), [[0, 3], [-1, 3]]);
    assert_eq!(integration_range(&level, Vector2d::new(0.9, 1.9), 3, 1).unwrap(), [[1, 3], [0, 3]]);
    assert_eq!(integration_range(&level, Vector2d::new(8.5, 2.0), 3, 0).unwrap(), [[-3, 0], [-2, 3]]);
    assert_eq!(integration_range(&level, Vector2d::new(9.5, 2.0), 3, 0), None);
    assert_eq!(integration_range(&level, Vector2d::new(-0.5, 2.0), 3, 0), None);

    // A single pixel wide level leaves no room for a window.
    assert_eq!(integration_range(&Image::new(1, 10, 0), Vector2d::new(0., 4.), 3, 1), None);
  }

  #[test]
  fn test_tracks_translated_blob() {
    let image0 = gaussian_blob(64, 64, Point::new(30., 30.), 6., 200.);
    let image1 = gaussian_blob(64, 64, Point::new(32., 31.), 6., 200.);
    let frame0 = Frame::new(image0, 3);
    let frame1 = Frame::new(image1, 3);
    let mut flow = LucasKanade::with_parameters(&ParameterSet::default()).unwrap();
    let out = flow.advance(&frame0, &frame1, &[Point::new(30., 30.), Point::new(26., 33.)]);
    assert_eq!(out.len(), 2);
    for ((p1, ok), p0) in out.iter().zip([Point::new(30., 30.), Point::new(26., 33.)]) {
      assert!(ok);
      let expected = p0 + Vector2d::new(2., 1.);
      assert!((p1 - expected).norm() < 0.5, "{} vs {}", p1, expected);
    }
  }

  #[test]
  fn test_flat_region_fails() {
    let frame0 = Frame::new(Image::new(32, 32, 90), 2);
    let frame1 = Frame::new(Image::new(32, 32, 90), 2);
    let mut flow = LucasKanade::with_parameters(&ParameterSet::default()).unwrap();
    let p = Point::new(16., 16.);
    assert_eq!(flow.advance(&frame0, &frame1, &[p]), vec![(p, false)]);
    // Outside the image.
    let q = Point::new(40., 3.);
    assert_eq!(flow.advance(&frame0, &frame1, &[q]), vec![(q, false)]);
  }
}
