//! # EMBER Sim
//!
//! The CPU-side particle simulation: advances large pools of independent
//! particles each frame, manages their lifecycle (birth, aging, death,
//! rebirth), and keeps dense structure-of-arrays attribute buffers ready
//! for bulk consumption by a renderer.
//!
//! ## Architecture Rules
//!
//! 1. **Single-threaded, frame-driven** - the caller invokes
//!    [`Group::tick`] once per render frame; nothing blocks or yields
//! 2. **Append-only slice allocation** - emitters receive contiguous,
//!    never-overlapping views into the group's shared buffers
//! 3. **Validated once** - settings are checked at construction and
//!    produce a [`ConfigError`] instead of coercing bad values later
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_sim::{Emitter, EmitterSettings, Group, GroupSettings};
//!
//! let mut group = Group::new(GroupSettings::default())?;
//! let emitter = Emitter::new(&EmitterSettings::default(), group.lifetime_steps())?;
//! group.add_emitter(emitter)?;
//!
//! // Per frame:
//! group.tick(delta_seconds);
//! // Renderer: consume group.attributes() + group.update_range(..)
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod attributes;
pub mod config;
pub mod emitter;
pub mod error;
pub mod group;

pub use attributes::{
    AttributeId, AttributeSet, UpdateRanges, PARAMS_WIDTH, PARAM_AGE, PARAM_ALIVE, PARAM_MAX_AGE,
    PARAM_WIGGLE,
};
pub use config::{
    ColorSettings, EmitterSettings, GroupSettings, KeyframeSettings, RotationSettings,
    ScalarSettings, SpatialSettings,
};
pub use emitter::{BufferSlice, Emitter, EmitterId};
pub use error::{ConfigError, GroupError, SimResult};
pub use group::{FeatureFlags, Group};
