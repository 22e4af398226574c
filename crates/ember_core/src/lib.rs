//! # EMBER Core
//!
//! Structure-of-arrays particle attribute storage and the pure mathematics
//! that drive the EMBER simulation:
//!
//! - Resizable, strongly-typed attribute buffers ready for bulk GPU upload
//! - Partial-buffer dirty-range accumulation
//! - Value-over-lifetime keyframe stretching and evaluation
//! - Stochastic spatial distribution sampling (box, sphere, disc)
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in the tick path** - buffers grow only when an
//!    emitter is registered, never while the simulation advances
//! 2. **Data-oriented design** - one flat `f32` array per attribute, shared
//!    by every particle in a group
//! 3. **Deterministic sampling** - every random routine takes the caller's
//!    [`rand::Rng`], so a seeded generator reproduces a simulation exactly
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_core::{AttributeBuffer, AttributeKind};
//!
//! let mut positions = AttributeBuffer::new(AttributeKind::Vec3);
//! positions.set_size(10_000);
//! // All memory pre-allocated, zero allocations during simulation
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod lifetime;
pub mod math;
pub mod range;
pub mod sampler;

pub use buffer::{AttributeBuffer, AttributeKind};
pub use lifetime::{
    color_over_lifetime, stretch_color_keyframes, stretch_keyframes, value_over_lifetime,
    LifetimeSteps,
};
pub use math::{Color, Vec3};
pub use range::UpdateRange;
pub use sampler::{
    packed_rotation_axis, random_float, random_packed_colors, round_to_nearest_multiple,
    sample_box, sample_direction, sample_disc, sample_sphere, Distribution, RadiusParams,
};
