//! Per-scene update rules operating on an [`EntityStore`].
//!
//! Each scene registers the rules it needs and invokes them once per unpaused tick.
//! Rules receive a `step` multiplier rather than raw seconds: `1.0` means one
//! nominal frame at rate 1, so a rule integrating `position += velocity * step`
//! moves by `velocity` per frame at normal speed.
//!
//! Every rule tolerates an empty store and floors its denominators through
//! [`crate::math::floor_denominator`] before dividing.

pub mod attraction;
pub mod interpolation;
pub mod orbit;
pub mod radial;
pub mod wave;

use rand::rngs::StdRng;

use crate::entity::EntityStore;

pub use attraction::{InflationScale, PairwiseAttraction};
pub use interpolation::CollapseInterpolation;
pub use orbit::OrbitalAdvance;
pub use radial::{Accretion, RadialCollapse};
pub use wave::{WaveField, WaveSource};

/// A physics rule applied to a scene's entities once per tick.
pub trait UpdateRule {
    /// Advances the entities by one tick scaled by `step`.
    fn apply(&mut self, entities: &mut EntityStore, step: f32, rng: &mut StdRng);
}
