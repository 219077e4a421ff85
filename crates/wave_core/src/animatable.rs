//! Animatable value trait
//!
//! Provides the conversion between property values and their vector form,
//! with implementations for scalars, fixed arrays and growable collections.

use crate::vector::AnimationVector;

/// Trait for values that can be animated
///
/// Interpolation and physics integration only ever see the vector form.
/// `from_vector` must accept vectors of any length: missing components read
/// as zero and surplus components are ignored, except for collections whose
/// length is the vector length.
pub trait Animatable: Clone + PartialEq + 'static {
    /// Convert to the vector representation
    fn to_vector(&self) -> AnimationVector;

    /// Rebuild a value from its vector representation
    fn from_vector(vector: &[f64]) -> Self;

    /// The neutral (all zero) value
    fn zero() -> Self {
        Self::from_vector(&[])
    }

    /// Adjust both endpoints of a transition before they are vectorized.
    ///
    /// Called once per transition with the live value and the requested
    /// target. The default leaves both untouched.
    fn reconcile(_from: &mut Self, _target: &mut Self) {}
}

/// Read component `index`, treating missing components as zero
#[inline]
pub fn component(vector: &[f64], index: usize) -> f64 {
    vector.get(index).copied().unwrap_or(0.0)
}

impl Animatable for f64 {
    fn to_vector(&self) -> AnimationVector {
        smallvec::smallvec![*self]
    }

    fn from_vector(vector: &[f64]) -> Self {
        component(vector, 0)
    }
}

impl Animatable for f32 {
    fn to_vector(&self) -> AnimationVector {
        smallvec::smallvec![*self as f64]
    }

    fn from_vector(vector: &[f64]) -> Self {
        component(vector, 0) as f32
    }
}

impl<const N: usize> Animatable for [f64; N] {
    fn to_vector(&self) -> AnimationVector {
        self.iter().copied().collect()
    }

    fn from_vector(vector: &[f64]) -> Self {
        std::array::from_fn(|i| component(vector, i))
    }
}

/// Growable collections keep every component, so a transition between
/// collections of different lengths ends with the target's length once the
/// animation trims its final value.
impl Animatable for Vec<f64> {
    fn to_vector(&self) -> AnimationVector {
        self.iter().copied().collect()
    }

    fn from_vector(vector: &[f64]) -> Self {
        vector.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        assert_eq!(f64::from_vector(&2.5_f64.to_vector()), 2.5);
        assert_eq!(f32::from_vector(&[1.5]), 1.5);
        assert_eq!(f64::zero(), 0.0);
    }

    #[test]
    fn test_array_reads_missing_as_zero() {
        let value = <[f64; 3]>::from_vector(&[1.0]);
        assert_eq!(value, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_collection_takes_vector_length() {
        let grown = Vec::<f64>::from_vector(&[1.0, 2.0, 3.0]);
        assert_eq!(grown.len(), 3);
        assert!(Vec::<f64>::zero().is_empty());
    }
}
