//! # Simulation Error Types
//!
//! All errors that can occur while configuring or driving a particle
//! group. Nothing here is fatal to the host: configuration errors are
//! reported at construction, operational misuse aborts the single
//! operation and leaves the simulation state untouched.

use thiserror::Error;

use crate::emitter::EmitterId;

/// Construction-time validation failures for settings structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The value-over-lifetime keyframe count is outside `1..=4`.
    #[error("lifetime keyframe count must be in 1..=4, got {0}")]
    InvalidLifetimeSteps(usize),

    /// An emitter was configured with no particles to manage.
    #[error("particle count must be at least 1")]
    ZeroParticleCount,

    /// The configured maximum particle age cannot produce a lifetime.
    #[error("max age must be positive, got {0}")]
    NonPositiveMaxAge(String),

    /// A finite emitter duration must be a positive number of seconds.
    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(String),

    /// The activation-rate multiplier cannot be negative.
    #[error("active multiplier must be non-negative, got {0}")]
    NegativeActiveMultiplier(String),

    /// The fixed fallback time step must advance the simulation.
    #[error("fixed time step must be positive, got {0}")]
    NonPositiveTimeStep(String),

    /// A settings file could not be parsed.
    #[error("invalid settings document: {0}")]
    InvalidDocument(String),
}

/// Errors reported by group operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    /// The emitter is already registered with this group.
    #[error("emitter {0:?} is already registered with this group")]
    AlreadyRegistered(EmitterId),

    /// The emitter is not registered with this group.
    #[error("emitter {0:?} is not registered with this group")]
    NotRegistered(EmitterId),

    /// The emitter was built for a different keyframe count than the
    /// group's attribute buffers carry.
    #[error("emitter keyframe count {emitter} does not match group keyframe count {group}")]
    LifetimeStepsMismatch {
        /// Keyframe count the emitter was constructed with.
        emitter: usize,
        /// Keyframe count the group was constructed with.
        group: usize,
    },

    /// The pool is empty and growth is disabled.
    #[error("emitter pool exhausted and growth is disabled")]
    PoolExhausted,

    /// Pool settings failed validation.
    #[error("invalid pool settings")]
    InvalidPoolSettings(#[source] ConfigError),
}

/// Result type for group operations.
pub type SimResult<T> = Result<T, GroupError>;
