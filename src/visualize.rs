use crate::all::*;

#[inline(always)]
fn pack(r: u8, g: u8, b: u8) -> u32 {
  (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
}

// Linear stretch of the values to 0..255. Constant input maps to 0.
pub fn normalize_min_max(values: &Matrixd) -> Image {
  let (height, width) = values.shape();
  let mut image = Image::new(width, height, 0);
  if values.is_empty() { return image }
  let min = values.min();
  let max = values.max();
  if !(max > min) { return image }
  let scale = 255. / (max - min);
  for y in 0..height {
    for x in 0..width {
      image.set_value(x, y, ((values[(y, x)] - min) * scale).round().clamp(0., 255.) as u8);
    }
  }
  image
}

// Blue for low values through green to red for high values.
pub fn jet(v: u8) -> u32 {
  let t = v as f64 / 255.;
  let channel = |offset: f64| -> u8 {
    ((1.5 - (4. * t - offset).abs()).clamp(0., 1.) * 255.).round() as u8
  };
  pack(channel(3.), channel(2.), channel(1.))
}

pub fn false_color(image: &Image) -> ColorImage {
  ColorImage {
    data: image.data.iter().map(|v| jet(*v)).collect(),
    width: image.width,
    height: image.height,
  }
}
