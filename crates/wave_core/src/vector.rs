//! Vector form of animatable values
//!
//! Drivers integrate and interpolate only on this representation. Vectors of
//! different lengths (growing or shrinking collections) are reconciled by
//! zero-padding the shorter one.

use smallvec::SmallVec;

/// The vector representation of an animatable value.
///
/// Four inline components cover scalars, points, sizes, rects and colors
/// without a heap allocation.
pub type AnimationVector = SmallVec<[f64; 4]>;

/// A zero vector with `len` components
pub fn zeros(len: usize) -> AnimationVector {
    smallvec::smallvec![0.0; len]
}

/// Pad the shorter vector with zeros so both have the same length.
///
/// The longer vector is left intact.
pub fn reconcile_lengths(from: &mut AnimationVector, target: &mut AnimationVector) {
    let len = from.len().max(target.len());
    from.resize(len, 0.0);
    target.resize(len, 0.0);
}

/// Squared euclidean length
pub fn magnitude_squared(vector: &[f64]) -> f64 {
    vector.iter().map(|c| c * c).sum()
}

/// Whether every component is finite (no NaN or infinity)
pub fn is_finite(vector: &[f64]) -> bool {
    vector.iter().all(|c| c.is_finite())
}

/// Component-wise linear interpolation. Missing components read as zero.
pub fn lerp(from: &[f64], to: &[f64], t: f64) -> AnimationVector {
    let len = from.len().max(to.len());
    (0..len)
        .map(|i| {
            let a = from.get(i).copied().unwrap_or(0.0);
            let b = to.get(i).copied().unwrap_or(0.0);
            a + (b - a) * t
        })
        .collect()
}

/// Check if two vectors are approximately equal (component-wise)
pub fn approx_eq(a: &[f64], b: &[f64], epsilon: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < epsilon)
}

/// Round every component to the pixel grid of a display with the given scale.
pub fn integralize(vector: &mut [f64], scale: f64) {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    for component in vector.iter_mut() {
        *component = (*component * scale).round() / scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_reconcile_pads_shorter_vector() {
        let mut from: AnimationVector = smallvec![1.0, 2.0];
        let mut target: AnimationVector = smallvec![3.0, 4.0, 5.0, 6.0, 7.0];
        reconcile_lengths(&mut from, &mut target);

        assert_eq!(from.as_slice(), &[1.0, 2.0, 0.0, 0.0, 0.0]);
        assert_eq!(target.as_slice(), &[3.0, 4.0, 5.0, 6.0, 7.0]);

        let mut from: AnimationVector = smallvec![1.0, 2.0, 3.0];
        let mut target: AnimationVector = smallvec![9.0];
        reconcile_lengths(&mut from, &mut target);
        assert_eq!(from.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(target.as_slice(), &[9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_lerp_handles_missing_components() {
        let mid = lerp(&[0.0, 10.0], &[10.0], 0.5);
        assert_eq!(mid.as_slice(), &[5.0, 5.0]);
    }

    #[test]
    fn test_approx_eq_requires_same_shape() {
        assert!(approx_eq(&[1.0, 2.0], &[1.0 + 1e-12, 2.0], 1e-9));
        assert!(!approx_eq(&[1.0, 2.0], &[1.0, 2.1], 1e-9));
        assert!(!approx_eq(&[1.0], &[1.0, 0.0], 1e-9));
    }

    #[test]
    fn test_integralize_scaled_grid() {
        let mut v = [1.26, 3.74, -0.2];
        integralize(&mut v, 2.0);
        assert_eq!(v, [1.5, 3.5, 0.0]);
    }

    #[test]
    fn test_is_finite() {
        assert!(is_finite(&[0.0, 1.0]));
        assert!(!is_finite(&[0.0, f64::NAN]));
        assert!(!is_finite(&[f64::INFINITY]));
    }
}
