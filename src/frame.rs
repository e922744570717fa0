use crate::all::*;

// Data derived from a single grayscale input image. Immutable once built and
// shared between the identities tracking in it.
pub struct Frame {
  pub image: Image,
  pub pyramid: Pyramid,
}

impl Frame {
  pub fn new(image: Image, level_count: usize) -> Frame {
    Frame {
      pyramid: Pyramid::new(&image, level_count),
      image,
    }
  }

  pub fn width(&self) -> usize { self.image.width }
  pub fn height(&self) -> usize { self.image.height }

  // Number of levels including the full resolution one.
  pub fn level_count(&self) -> usize {
    self.pyramid.levels.len() + 1
  }

  pub fn get_level(&self, level: usize) -> &Image {
    if level == 0 { &self.image } else { &self.pyramid.levels[level - 1] }
  }
}
