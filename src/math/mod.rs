//! Math utilities for scene simulation.
//!
//! This module provides the [`Vec3`] type used for every entity position, edge path
//! and mesh point, plus a handful of scalar helpers shared by the update rules.
//!
//! # Module Organization
//!
//! - [`vec`] module contains the vector type (re-exported at root level)
//! - Scalar helpers (easing, clamping with floors) are provided at root level

pub mod vec;

pub use vec::Vec3;

/// Smallest denominator any rule is allowed to divide by.
pub const MIN_DENOMINATOR: f32 = 1e-3;

/// Cubic ease-in: `p³` with `p` clamped to `[0, 1]`.
///
/// # Example
/// ```ignore
/// assert_eq!(ease_cubic(1.0), 1.0);
/// assert_eq!(ease_cubic(0.5), 0.125);
/// ```
pub fn ease_cubic(progress: f32) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    p * p * p
}

/// Floors the magnitude of a denominator while keeping its sign.
///
/// Used anywhere a distance or radius ends up under a division.
pub fn floor_denominator(value: f32, floor: f32) -> f32 {
    let floor = floor.max(MIN_DENOMINATOR);
    if value.abs() < floor {
        if value.is_sign_negative() { -floor } else { floor }
    } else {
        value
    }
}

/// Sign that treats zero as negative, matching the lensing warp direction.
pub fn sign_nonzero(value: f32) -> f32 {
    if value > 0.0 { 1.0 } else { -1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_cubic_bounds() {
        assert_eq!(ease_cubic(-1.0), 0.0);
        assert_eq!(ease_cubic(2.0), 1.0);
        assert!((ease_cubic(0.5) - 0.125).abs() < f32::EPSILON);
    }

    /// Zero and tiny values are pushed out to the floor.
    #[test]
    fn test_floor_denominator() {
        assert_eq!(floor_denominator(0.0, 1.0), 1.0);
        assert_eq!(floor_denominator(-0.2, 1.0), -1.0);
        assert_eq!(floor_denominator(5.0, 1.0), 5.0);
    }
}
