//! Wave error types

use thiserror::Error;

/// Configuration and validation errors
///
/// The per-frame path never produces these; they come from constructors and
/// `validate` methods that check user-supplied parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveError {
    /// Spring parameters out of range
    #[error("Invalid spring: {0}")]
    InvalidSpring(String),

    /// Easing duration must be positive and finite
    #[error("Invalid easing duration: {0}")]
    InvalidDuration(f64),

    /// Decay rate must lie strictly between 0 and 1
    #[error("Invalid decay rate: {0} (expected 0 < rate < 1)")]
    InvalidDecayRate(f64),

    /// A scheduler setting out of range
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// A value that must be finite was NaN or infinite
    #[error("Non-finite value for {0}")]
    NonFinite(&'static str),
}

/// Result type for Wave configuration operations
pub type Result<T> = std::result::Result<T, WaveError>;
