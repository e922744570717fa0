use crate::all::*;

// Row-major grayscale image storage.
// Could also have used nalebgra::DMatrix, but the added complexity
// only seems to help with algorithms like the optical flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

impl Image {
  pub fn new(width: usize, height: usize, fill: u8) -> Image {
    Image {
      data: vec![fill; width * height],
      width,
      height,
    }
  }

  pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Image> {
    if data.len() != width * height {
      bail!("Image buffer has {} bytes, expected {}x{}.", data.len(), width, height);
    }
    Ok(Image { data, width, height })
  }

  pub fn is_empty(&self) -> bool {
    self.width == 0 || self.height == 0
  }

  pub fn size(&self, dim: usize) -> usize {
    if dim == 0 { self.width } else { self.height }
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }

  #[inline(always)]
  pub fn value_i32(&self, x: i32, y: i32) -> u8 {
    self.data[y as usize * self.width + x as usize]
  }

  // Out of bounds reads return the nearest edge pixel.
  #[inline(always)]
  pub fn value_clamped(&self, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, self.width as i32 - 1);
    let y = y.clamp(0, self.height as i32 - 1);
    self.value_i32(x, y)
  }

  #[inline(always)]
  pub fn set_value(&mut self, x: usize, y: usize, value: u8) {
    self.data[y * self.width + x] = value;
  }

  pub fn get_sub_image(
    &self,
    ax: usize,
    ay: usize,
    width: usize,
    height: usize,
  ) -> Image {
    let mut image = Image::new(width, height, 0);
    for y in 0..height {
      let row = (ay + y) * self.width + ax;
      image.data[y * width .. (y + 1) * width].copy_from_slice(&self.data[row .. row + width]);
    }
    image
  }

  // Copies the part of `rect` that lies inside the image. `None` if nothing does.
  pub fn crop(&self, rect: &Rectangle) -> Option<Image> {
    let r = rect.clamp(self.width, self.height)?;
    Some(self.get_sub_image(r.x as usize, r.y as usize, r.width as usize, r.height as usize))
  }

  pub fn mean(&self) -> f64 {
    if self.data.is_empty() { return 0. }
    self.data.iter().map(|v| *v as f64).sum::<f64>() / self.data.len() as f64
  }
}

// False-color image, pixels packed as 0x00RRGGBB like a window buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorImage {
  pub data: Vec<u32>,
  pub width: usize,
  pub height: usize,
}

impl ColorImage {
  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u32 {
    self.data[y * self.width + x]
  }

  pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
    let v = self.value(x, y);
    [(v >> 16) as u8, (v >> 8) as u8, v as u8]
  }
}
