use crate::all::*;

// Successively halved copies of an image, level 1 first. The full resolution
// image itself is level 0 and lives in `Frame`.
pub struct Pyramid {
  pub levels: Vec<Image>,
}

impl Pyramid {
  pub fn new(image: &Image, level_count: usize) -> Pyramid {
    let mut levels: Vec<Image> = Vec::with_capacity(level_count);
    for level_ind in 0..level_count {
      let parent = if level_ind > 0 { &levels[level_ind - 1] } else { image };
      if parent.width < 2 || parent.height < 2 { break }
      let child = downscale(parent);
      levels.push(child);
    }
    Pyramid { levels }
  }

  pub fn size(&self, level: usize) -> [usize; 2] {
    let image = &self.levels[level - 1];
    [image.width, image.height]
  }
}

// 2x2 box filter.
fn downscale(parent: &Image) -> Image {
  let width = parent.width / 2;
  let height = parent.height / 2;
  let mut child = Image::new(width, height, 0);
  for y in 0..height {
    for x in 0..width {
      let sum = parent.value(2 * x, 2 * y) as u16
        + parent.value(2 * x + 1, 2 * y) as u16
        + parent.value(2 * x, 2 * y + 1) as u16
        + parent.value(2 * x + 1, 2 * y + 1) as u16;
      child.set_value(x, y, ((sum + 2) / 4) as u8);
    }
  }
  child
}
