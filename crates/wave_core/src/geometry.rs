//! Geometry value types
//!
//! Minimal point, size and rect types so hosts can animate frames and
//! positions without pulling in a layout crate.

use serde::{Deserialize, Serialize};

use crate::animatable::{component, Animatable};
use crate::vector::AnimationVector;

/// A 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Center point of the rectangle
    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }
}

impl Animatable for Point {
    fn to_vector(&self) -> AnimationVector {
        smallvec::smallvec![self.x, self.y]
    }

    fn from_vector(vector: &[f64]) -> Self {
        Point::new(component(vector, 0), component(vector, 1))
    }
}

impl Animatable for Size {
    fn to_vector(&self) -> AnimationVector {
        smallvec::smallvec![self.width, self.height]
    }

    fn from_vector(vector: &[f64]) -> Self {
        Size::new(component(vector, 0), component(vector, 1))
    }
}

/// Rects vectorize as `[x, y, width, height]`, so a two-component gesture
/// velocity injected into a rect animation moves its origin.
impl Animatable for Rect {
    fn to_vector(&self) -> AnimationVector {
        smallvec::smallvec![
            self.origin.x,
            self.origin.y,
            self.size.width,
            self.size.height
        ]
    }

    fn from_vector(vector: &[f64]) -> Self {
        Rect::new(
            component(vector, 0),
            component(vector, 1),
            component(vector, 2),
            component(vector, 3),
        )
    }
}
