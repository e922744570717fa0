// Pixel operations behind face alignment.

use crate::all::*;

// Resamples `src` into a `width`x`height` image through the forward affine
// transform `m` (source to destination coordinates). Pixels whose source falls
// outside `src` get `fill`; bilinear interpolation treats missing neighbors the
// same way.
pub fn warp_affine(src: &Image, m: &Matrix23d, width: usize, height: usize, fill: u8) -> Image {
  let mut out = Image::new(width, height, fill);
  let a = m.fixed_columns::<2>(0).into_owned();
  let t = m.column(2).into_owned();
  let inv = match a.try_inverse() {
    Some(inv) => inv,
    None => return out,
  };
  let sample = |x: i64, y: i64| -> f64 {
    if x >= 0 && y >= 0 && (x as usize) < src.width && (y as usize) < src.height {
      src.value(x as usize, y as usize) as f64
    }
    else {
      fill as f64
    }
  };
  for oy in 0..height {
    for ox in 0..width {
      let s = inv * (Vector2d::new(ox as f64, oy as f64) - t);
      if s[0] <= -1. || s[1] <= -1. || s[0] >= src.width as f64 || s[1] >= src.height as f64 {
        continue;
      }
      let x0 = s[0].floor();
      let y0 = s[1].floor();
      let fx = s[0] - x0;
      let fy = s[1] - y0;
      let (x0, y0) = (x0 as i64, y0 as i64);
      let v = sample(x0, y0) * (1. - fx) * (1. - fy)
        + sample(x0 + 1, y0) * fx * (1. - fy)
        + sample(x0, y0 + 1) * (1. - fx) * fy
        + sample(x0 + 1, y0 + 1) * fx * fy;
      out.set_value(ox, oy, v.round().clamp(0., 255.) as u8);
    }
  }
  out
}

// Spreads the gray levels over the whole 0..255 range using the cumulative
// histogram. The darkest occurring level maps to 0.
pub fn equalize_histogram(image: &Image) -> Image {
  let mut hist = [0usize; 256];
  for v in &image.data {
    hist[*v as usize] += 1;
  }
  let total = image.data.len();
  let i0 = match hist.iter().position(|n| *n > 0) {
    Some(i0) => i0,
    None => return image.clone(),
  };
  if hist[i0] == total {
    return image.clone();
  }
  let scale = 255. / (total - hist[i0]) as f64;
  let mut lut = [0u8; 256];
  let mut sum = 0;
  for i in (i0 + 1)..256 {
    sum += hist[i];
    lut[i] = (sum as f64 * scale).round().clamp(0., 255.) as u8;
  }
  Image {
    data: image.data.iter().map(|v| lut[*v as usize]).collect(),
    width: image.width,
    height: image.height,
  }
}

// Edge preserving smoothing. The window is a disc of radius
// `round(1.5 * sigma_space)`, borders replicate the edge pixels.
pub fn bilateral_filter(image: &Image, sigma_color: f64, sigma_space: f64) -> Image {
  let radius = (1.5 * sigma_space).round() as i32;
  let mut space = vec![];
  for dy in -radius..=radius {
    for dx in -radius..=radius {
      let r2 = (dx * dx + dy * dy) as f64;
      if r2 > (radius * radius) as f64 { continue }
      space.push((dx, dy, (-r2 / (2. * sigma_space * sigma_space)).exp()));
    }
  }
  let mut color = [0f64; 256];
  for (d, w) in color.iter_mut().enumerate() {
    let d = d as f64;
    *w = (-d * d / (2. * sigma_color * sigma_color)).exp();
  }

  let mut out = Image::new(image.width, image.height, 0);
  for y in 0..image.height {
    for x in 0..image.width {
      let center = image.value(x, y) as i32;
      let mut sum = 0.;
      let mut weight_sum = 0.;
      for (dx, dy, ws) in &space {
        let v = image.value_clamped(x as i32 + dx, y as i32 + dy) as i32;
        let w = ws * color[(v - center).unsigned_abs() as usize];
        sum += w * v as f64;
        weight_sum += w;
      }
      out.set_value(x, y, (sum / weight_sum).round().clamp(0., 255.) as u8);
    }
  }
  out
}

// Replaces everything outside the axis-aligned ellipse with `fill`.
pub fn mask_ellipse(image: &mut Image, center: Vector2d, axes: Vector2d, fill: u8) {
  if axes[0] <= 0. || axes[1] <= 0. {
    image.data.iter_mut().for_each(|v| *v = fill);
    return;
  }
  for y in 0..image.height {
    for x in 0..image.width {
      let dx = (x as f64 - center[0]) / axes[0];
      let dy = (y as f64 - center[1]) / axes[1];
      if dx * dx + dy * dy > 1. {
        image.set_value(x, y, fill);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_warp_identity_and_shift() {
    let src = Image::from_raw(3, 2, vec![
      10, 20, 30,
      40, 50, 60,
    ]).unwrap();
    let identity = Matrix23d::new(1., 0., 0., 0., 1., 0.);
    assert_eq!(warp_affine(&src, &identity, 3, 2, 128), src);

    // Destination pixel (x, y) shows source pixel (x - 1, y).
    let shift = Matrix23d::new(1., 0., 1., 0., 1., 0.);
    let out = warp_affine(&src, &shift, 4, 3, 128);
    assert_eq!(out.data, vec![
      128, 10, 20, 30,
      128, 40, 50, 60,
      128, 128, 128, 128,
    ]);
  }

  #[test]
  fn test_warp_degenerate_is_filled() {
    let src = Image::new(4, 4, 0);
    let zero = Matrix23d::zeros();
    assert!(warp_affine(&src, &zero, 5, 5, 128).data.iter().all(|v| *v == 128));
  }

  #[test]
  fn test_equalize() {
    let image = Image::from_raw(4, 1, vec![100, 100, 101, 103]).unwrap();
    assert_eq!(equalize_histogram(&image).data, vec![0, 0, 128, 255]);
    let flat = Image::new(3, 3, 77);
    assert_eq!(equalize_histogram(&flat), flat);
  }

  #[test]
  fn test_bilateral_keeps_edges() {
    let mut image = Image::new(12, 12, 20);
    for y in 0..12 {
      for x in 6..12 {
        image.set_value(x, y, 220);
      }
    }
    let out = bilateral_filter(&image, 20., 2.);
    // The step is far above the color sigma, so both sides stay put.
    assert_eq!(out.value(5, 6), 20);
    assert_eq!(out.value(6, 6), 220);
    assert_eq!(bilateral_filter(&Image::new(5, 5, 90), 20., 2.), Image::new(5, 5, 90));
  }

  #[test]
  fn test_mask_ellipse() {
    let mut image = Image::new(10, 10, 0);
    mask_ellipse(&mut image, Vector2d::new(5., 5.), Vector2d::new(3., 2.), 128);
    assert_eq!(image.value(5, 5), 0);
    assert_eq!(image.value(8, 5), 0);
    assert_eq!(image.value(5, 8), 128);
    assert_eq!(image.value(0, 0), 128);
  }
}
