//! Wave Core
//!
//! Value primitives shared by the Wave animation engine:
//!
//! - **Animation vectors**: every animatable property reduces to a small vector of `f64`
//! - **Animatable trait**: conversion to and from the vector form, plus per-type
//!   endpoint reconciliation (e.g. transparent colors)
//! - **Geometry and color values**: `Point`, `Size`, `Rect`, `Rgba`
//! - **Errors**: validation errors reported by configuration entry points
//!
//! # Example
//!
//! ```rust
//! use wave_core::{Animatable, Point};
//!
//! let point = Point::new(3.0, 4.0);
//! let vector = point.to_vector();
//! assert_eq!(vector.as_slice(), &[3.0, 4.0]);
//! assert_eq!(Point::from_vector(&vector), point);
//! ```

pub mod animatable;
pub mod color;
pub mod error;
pub mod geometry;
pub mod vector;

pub use animatable::Animatable;
pub use color::Rgba;
pub use error::{Result, WaveError};
pub use geometry::{Point, Rect, Size};
pub use vector::AnimationVector;
