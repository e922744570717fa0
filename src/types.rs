use serde::{Deserialize, Serialize};

// Eigen-like aliases.
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Matrix2d = nalgebra::Matrix2::<f64>;
pub type Matrix23d = nalgebra::Matrix2x3::<f64>;
pub type Matrixd = nalgebra::DMatrix::<f64>;
pub type Vectord = nalgebra::DVector::<f64>;

// Image space coordinates. (0, 0) is the center of the top-left pixel.
pub type Point = Vector2d;
pub type PointSet = Vec<Point>;

// Axis-aligned box in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl Rectangle {
  pub fn new(x: i32, y: i32, width: i32, height: i32) -> Rectangle {
    Rectangle { x, y, width, height }
  }

  // Exclusive.
  pub fn right(&self) -> i32 { self.x + self.width }
  pub fn bottom(&self) -> i32 { self.y + self.height }

  pub fn is_empty(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }

  pub fn area(&self) -> i64 {
    if self.is_empty() { return 0 }
    self.width as i64 * self.height as i64
  }

  pub fn top_left(&self) -> Point {
    Point::new(self.x as f64, self.y as f64)
  }

  // Overlapping part of the two rectangles, `None` if they only touch or are
  // disjoint.
  pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
    let x0 = i32::max(self.x, other.x);
    let y0 = i32::max(self.y, other.y);
    let x1 = i32::min(self.right(), other.right());
    let y1 = i32::min(self.bottom(), other.bottom());
    if x1 <= x0 || y1 <= y0 { return None }
    Some(Rectangle::new(x0, y0, x1 - x0, y1 - y0))
  }

  // Restricts the rectangle to an image of the given size.
  pub fn clamp(&self, width: usize, height: usize) -> Option<Rectangle> {
    self.intersection(&Rectangle::new(0, 0, width as i32, height as i32))
  }

  // Tight box around the points, computed the same way for integer and
  // sub-pixel coordinates: floor of the minimum up to and including the
  // floor of the maximum.
  pub fn bounding(points: &[Point]) -> Option<Rectangle> {
    let first = points.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in points {
      min = min.inf(p);
      max = max.sup(p);
    }
    let x0 = min[0].floor() as i32;
    let y0 = min[1].floor() as i32;
    let x1 = max[0].floor() as i32 + 1;
    let y1 = max[1].floor() as i32 + 1;
    Some(Rectangle::new(x0, y0, x1 - x0, y1 - y0))
  }
}
