//! # Simulation Configuration
//!
//! Statically-typed settings for groups and emitters. Every field is
//! enumerated with a documented default; validation happens once, at
//! construction, and produces a [`ConfigError`] instead of silently
//! coercing bad values at each access.
//!
//! Settings deserialize from TOML, so emitter presets can live in
//! external files loaded once at startup.

use serde::{Deserialize, Serialize};

use ember_core::{Color, Distribution, RadiusParams, Vec3};

use crate::error::ConfigError;

/// A spatially distributed vector property (position, velocity,
/// acceleration).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialSettings {
    /// Base value. Default: zero vector.
    pub value: Vec3,
    /// Random spread around the base. Default: zero vector.
    pub spread: Vec3,
    /// Per-axis snap grid for box sampling. Default: zero vector (off).
    pub spread_clamp: Vec3,
    /// Distribution override; `None` inherits the emitter's distribution.
    pub distribution: Option<Distribution>,
    /// Whether dead slots resample this property on rebirth; `None`
    /// derives the flag from whether the spread is nonzero.
    pub randomize: Option<bool>,
}

/// A scalar property with random spread.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarSettings {
    /// Base value.
    pub value: f32,
    /// Random spread around the base. Default: 0.
    pub spread: f32,
}

impl ScalarSettings {
    /// Creates a scalar setting with the given base and no spread.
    #[must_use]
    pub const fn fixed(value: f32) -> Self {
        Self { value, spread: 0.0 }
    }
}

/// A scalar value-over-lifetime property (size, angle, opacity).
///
/// `value` and `spread` may carry between 1 and 4 keyframes; both are
/// stretched to the group's keyframe count at emitter construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframeSettings {
    /// Keyframe base values. Default: `[1.0]`.
    pub value: Vec<f32>,
    /// Per-keyframe random spread. Default: `[0.0]`.
    pub spread: Vec<f32>,
}

impl Default for KeyframeSettings {
    fn default() -> Self {
        Self {
            value: vec![1.0],
            spread: vec![0.0],
        }
    }
}

impl KeyframeSettings {
    /// Creates keyframe settings with the given base curve and no spread.
    #[must_use]
    pub fn from_values(values: &[f32]) -> Self {
        Self {
            value: values.to_vec(),
            spread: vec![0.0],
        }
    }
}

/// A color value-over-lifetime property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    /// Keyframe base colors. Default: `[white]`.
    pub value: Vec<Color>,
    /// Per-keyframe channel spread. Default: `[zero]`.
    pub spread: Vec<Vec3>,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            value: vec![Color::WHITE],
            spread: vec![Vec3::ZERO],
        }
    }
}

/// Per-particle rotation about an arbitrary axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Rotation axis. Default: +Y.
    pub axis: Vec3,
    /// Random per-axis perturbation of the axis. Default: zero vector.
    pub axis_spread: Vec3,
    /// Rotation angle in radians. Default: 0.
    pub angle: f32,
    /// Random spread on the angle. Default: 0.
    pub angle_spread: f32,
    /// When `true`, the angle is fixed instead of ramping over the
    /// particle's lifetime. Default: `false`.
    pub is_static: bool,
    /// Rotation center; `None` uses the emitter's base position.
    pub center: Option<Vec3>,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            axis: Vec3::Y,
            axis_spread: Vec3::ZERO,
            angle: 0.0,
            angle_spread: 0.0,
            is_static: false,
            center: None,
        }
    }
}

/// Complete configuration for one emitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterSettings {
    /// Default spatial distribution for position/velocity/acceleration.
    /// Default: [`Distribution::Box`].
    pub distribution: Distribution,
    /// Number of particle slots this emitter owns. Default: 100.
    pub particle_count: usize,
    /// Seconds of active spawning; `None` spawns forever. Default: `None`.
    pub duration: Option<f32>,
    /// Static emitters skip ticking entirely; kinematics are fixed at
    /// creation. Default: `false`.
    pub is_static: bool,
    /// Multiplier on the per-tick activation window. Default: 1.
    pub active_multiplier: f32,
    /// Particle spawn position.
    pub position: SpatialSettings,
    /// Particle initial velocity.
    pub velocity: SpatialSettings,
    /// Particle acceleration (the 4th stored component is drag).
    pub acceleration: SpatialSettings,
    /// Radius parameters for sphere/disc distributions.
    pub radius: RadiusParams,
    /// Drag coefficient sample, clamped to `[0, 1]`.
    pub drag: ScalarSettings,
    /// Wiggle amplitude.
    pub wiggle: ScalarSettings,
    /// Particle lifetime in seconds. Default: value 2, spread 0.
    pub max_age: ScalarSettings,
    /// Per-particle rotation.
    pub rotation: RotationSettings,
    /// Color over lifetime.
    pub color: ColorSettings,
    /// Opacity over lifetime.
    pub opacity: KeyframeSettings,
    /// Size over lifetime.
    pub size: KeyframeSettings,
    /// Texture angle over lifetime.
    pub angle: KeyframeSettings,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            distribution: Distribution::Box,
            particle_count: 100,
            duration: None,
            is_static: false,
            active_multiplier: 1.0,
            position: SpatialSettings::default(),
            velocity: SpatialSettings::default(),
            acceleration: SpatialSettings::default(),
            radius: RadiusParams::default(),
            drag: ScalarSettings::default(),
            wiggle: ScalarSettings::default(),
            max_age: ScalarSettings::fixed(2.0),
            rotation: RotationSettings::default(),
            color: ColorSettings::default(),
            opacity: KeyframeSettings::default(),
            size: KeyframeSettings::default(),
            angle: KeyframeSettings::from_values(&[0.0]),
        }
    }
}

impl EmitterSettings {
    /// Validates the settings, reporting the first offending field.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the field that cannot drive a
    /// simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::ZeroParticleCount);
        }
        if self.max_age.value <= 0.0 {
            return Err(ConfigError::NonPositiveMaxAge(self.max_age.value.to_string()));
        }
        if let Some(duration) = self.duration {
            if duration <= 0.0 {
                return Err(ConfigError::NonPositiveDuration(duration.to_string()));
            }
        }
        if self.active_multiplier < 0.0 {
            return Err(ConfigError::NegativeActiveMultiplier(
                self.active_multiplier.to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDocument`] for parse failures, or
    /// the validation error for well-formed but unusable settings.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(document)
            .map_err(|err| ConfigError::InvalidDocument(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Configuration for a particle group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    /// Keyframe count for every value-over-lifetime attribute; must be
    /// in `1..=4`. Default: 4.
    pub lifetime_steps: usize,
    /// Fallback delta time when `tick` is driven with zero. Default:
    /// 0.016 (one 60 FPS frame).
    pub fixed_time_step: f32,
    /// Seed for the group's deterministic RNG. Default: `0x5EED`.
    pub seed: u64,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            lifetime_steps: 4,
            fixed_time_step: 0.016,
            seed: 0x5EED,
        }
    }
}

impl GroupSettings {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the keyframe count or time step is
    /// unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if ember_core::LifetimeSteps::new(self.lifetime_steps).is_none() {
            return Err(ConfigError::InvalidLifetimeSteps(self.lifetime_steps));
        }
        if self.fixed_time_step <= 0.0 {
            return Err(ConfigError::NonPositiveTimeStep(
                self.fixed_time_step.to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDocument`] for parse failures, or
    /// the validation error for well-formed but unusable settings.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(document)
            .map_err(|err| ConfigError::InvalidDocument(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}
