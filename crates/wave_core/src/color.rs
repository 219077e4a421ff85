//! RGBA color value
//!
//! Colors animate channel-wise in whatever space the host stores them in.
//! The only color-specific rule the engine applies is the transparency
//! reconciliation in [`Animatable::reconcile`].

use serde::{Deserialize, Serialize};

use crate::animatable::{component, Animatable};
use crate::vector::AnimationVector;

/// RGBA color with channels in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Rgba = Rgba::rgb(0.0, 0.0, 0.0);
    pub const RED: Rgba = Rgba::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Rgba = Rgba::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Rgba = Rgba::rgb(0.0, 0.0, 1.0);
    pub const CLEAR: Rgba = Rgba::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
        }
    }

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub fn from_hex(hex: u32) -> Self {
        let red = ((hex >> 16) & 0xFF) as f64 / 255.0;
        let green = ((hex >> 8) & 0xFF) as f64 / 255.0;
        let blue = (hex & 0xFF) as f64 / 255.0;
        Self::rgb(red, green, blue)
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Whether any of the color shows through
    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }

    fn take_channels(&mut self, other: &Rgba) {
        self.red = other.red;
        self.green = other.green;
        self.blue = other.blue;
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::CLEAR
    }
}

impl Animatable for Rgba {
    fn to_vector(&self) -> AnimationVector {
        smallvec::smallvec![self.red, self.green, self.blue, self.alpha]
    }

    fn from_vector(vector: &[f64]) -> Self {
        Rgba::rgba(
            component(vector, 0),
            component(vector, 1),
            component(vector, 2),
            component(vector, 3),
        )
    }

    /// Fading in from (or out to) a fully transparent color only animates
    /// alpha: the invisible endpoint borrows the visible endpoint's channels
    /// so no intermediate hue shows up.
    fn reconcile(from: &mut Self, target: &mut Self) {
        match (from.is_visible(), target.is_visible()) {
            (false, _) => from.take_channels(target),
            (true, false) => target.take_channels(from),
            (true, true) => {}
        }
    }
}
