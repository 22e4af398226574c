//! # Emitter
//!
//! Owns the lifecycle of a fixed-size slice of particles: spawn-rate
//! computation, per-tick activation and aging, death and rebirth, and
//! dirty-range bookkeeping for the slice's kinematic attributes.
//!
//! An emitter owns no buffer memory itself. It becomes buffer-backed
//! when a [`crate::group::Group`] registers it and assigns it a
//! contiguous slice of the shared attribute buffers; all writes stay
//! inside that slice.

use std::sync::atomic::{AtomicU32, Ordering};

use rand::Rng;
use tracing::trace;

use ember_core::{
    packed_rotation_axis, random_float, random_packed_colors, sample_box, sample_direction,
    sample_disc, sample_sphere, stretch_color_keyframes, stretch_keyframes, Color, Distribution,
    LifetimeSteps, Vec3,
};

use crate::attributes::{
    AttributeSet, UpdateRanges, PARAMS_WIDTH, PARAM_AGE, PARAM_ALIVE, PARAM_MAX_AGE,
};
use crate::config::{EmitterSettings, SpatialSettings};
use crate::error::ConfigError;

/// Unique identity of an emitter, stable across pooling and re-use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EmitterId(u32);

impl EmitterId {
    fn next() -> Self {
        static NEXT_ID: AtomicU32 = AtomicU32::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A non-owning view into the group's shared buffers: the contiguous
/// particle index range this emitter owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSlice {
    /// First global particle index owned.
    pub offset: usize,
    /// Number of particle slots owned.
    pub count: usize,
}

impl BufferSlice {
    /// One past the last owned index.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.count
    }

    /// Whether two slices share any particle index.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// A scalar value-over-lifetime property, stretched to the group's
/// keyframe count.
#[derive(Clone, Debug)]
struct Keyframes {
    values: Vec<f32>,
    spreads: Vec<f32>,
}

impl Keyframes {
    fn stretch(values: &[f32], spreads: &[f32], steps: LifetimeSteps) -> Self {
        Self {
            values: stretch_keyframes(values, steps),
            spreads: stretch_keyframes(spreads, steps),
        }
    }

    /// Samples all keyframes into a 4-wide element, optionally forcing
    /// magnitudes non-negative. Unused tail components stay zero.
    fn sample<R: Rng>(&self, rng: &mut R, absolute: bool) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (i, slot) in out.iter_mut().enumerate().take(self.values.len()) {
            let sampled = random_float(rng, self.values[i], self.spreads[i]);
            *slot = if absolute { sampled.abs() } else { sampled };
        }
        out
    }
}

/// Which kinematic attributes are re-randomized when a dead slot is
/// reborn. Derived from the spreads unless configured explicitly.
#[derive(Clone, Copy, Debug)]
struct ResetFlags {
    position: bool,
    velocity: bool,
    acceleration: bool,
}

impl ResetFlags {
    fn from_settings(settings: &EmitterSettings) -> Self {
        let derive = |prop: &SpatialSettings| {
            prop.randomize
                .unwrap_or_else(|| prop.spread.length_squared() != 0.0)
        };
        Self {
            position: derive(&settings.position),
            velocity: derive(&settings.velocity),
            acceleration: derive(&settings.acceleration),
        }
    }
}

/// The per-particle lifecycle driver for one slice of a group.
///
/// Emitter-level states: alive (actively spawning) or expired (past its
/// duration; existing particles still age out). Static emitters skip
/// ticking entirely.
#[derive(Clone, Debug)]
pub struct Emitter {
    id: EmitterId,
    steps: LifetimeSteps,
    settings: EmitterSettings,
    size_keyframes: Keyframes,
    angle_keyframes: Keyframes,
    opacity_keyframes: Keyframes,
    color_values: Vec<Color>,
    color_spreads: Vec<Vec3>,
    reset_flags: ResetFlags,
    particles_per_second: f32,
    activation_index: f32,
    alive: bool,
    age: f32,
    slice: Option<BufferSlice>,
    ranges: UpdateRanges,
}

impl Emitter {
    /// Builds an emitter from validated settings.
    ///
    /// Value-over-lifetime properties are stretched onto exactly
    /// `steps` keyframes here, once, so the tick path never resamples.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] the settings fail on.
    pub fn new(settings: &EmitterSettings, steps: LifetimeSteps) -> Result<Self, ConfigError> {
        settings.validate()?;

        Ok(Self {
            id: EmitterId::next(),
            steps,
            size_keyframes: Keyframes::stretch(&settings.size.value, &settings.size.spread, steps),
            angle_keyframes: Keyframes::stretch(
                &settings.angle.value,
                &settings.angle.spread,
                steps,
            ),
            opacity_keyframes: Keyframes::stretch(
                &settings.opacity.value,
                &settings.opacity.spread,
                steps,
            ),
            color_values: stretch_color_keyframes(&settings.color.value, steps),
            color_spreads: stretch_spread_vectors(&settings.color.spread, steps),
            reset_flags: ResetFlags::from_settings(settings),
            settings: settings.clone(),
            particles_per_second: 0.0,
            activation_index: 0.0,
            alive: true,
            age: 0.0,
            slice: None,
            ranges: UpdateRanges::new(),
        })
    }

    /// This emitter's unique identity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EmitterId {
        self.id
    }

    /// The keyframe count this emitter was built for.
    #[inline]
    #[must_use]
    pub const fn lifetime_steps(&self) -> LifetimeSteps {
        self.steps
    }

    /// Number of particle slots this emitter manages.
    #[inline]
    #[must_use]
    pub const fn particle_count(&self) -> usize {
        self.settings.particle_count
    }

    /// The slice of the shared buffers this emitter owns, if registered.
    #[inline]
    #[must_use]
    pub const fn slice(&self) -> Option<BufferSlice> {
        self.slice
    }

    /// Whether this emitter is actively spawning.
    #[inline]
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Seconds this emitter has been spawning for.
    #[inline]
    #[must_use]
    pub const fn age(&self) -> f32 {
        self.age
    }

    /// The spawn rate computed at registration.
    #[inline]
    #[must_use]
    pub const fn particles_per_second(&self) -> f32 {
        self.particles_per_second
    }

    /// Worst-case particle lifetime: `max_age.value + max_age.spread`.
    #[inline]
    #[must_use]
    pub fn worst_case_age(&self) -> f32 {
        self.settings.max_age.value + self.settings.max_age.spread
    }

    /// The settings this emitter was built from.
    #[inline]
    #[must_use]
    pub const fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    /// Resumes spawning.
    pub fn enable(&mut self) {
        self.alive = true;
    }

    /// Stops spawning; already-alive particles continue aging out.
    pub fn disable(&mut self) {
        self.alive = false;
    }

    /// Moves the emitter's base spawn position (pool triggering).
    ///
    /// Only affects particles sampled from this point on.
    pub fn set_base_position(&mut self, position: Vec3) {
        self.settings.position.value = position;
    }

    /// Recomputes the spawn rate from a worst-case particle lifetime.
    ///
    /// `particle_count / min(duration, worst_case_age)` when a finite
    /// duration is set, else `particle_count / worst_case_age`. Called on
    /// every (re)registration.
    pub fn compute_spawn_rate(&mut self, worst_case_age: f32) {
        let count = self.settings.particle_count as f32;
        self.particles_per_second = match self.settings.duration {
            Some(duration) => count / duration.min(worst_case_age),
            None => count / worst_case_age,
        };
    }

    /// Binds this emitter to its slice of the shared buffers.
    pub(crate) fn bind(&mut self, offset: usize) {
        self.slice = Some(BufferSlice {
            offset,
            count: self.settings.particle_count,
        });
        self.activation_index = offset as f32;
    }

    /// Releases the buffer binding on unregistration.
    pub(crate) fn unbind(&mut self) {
        self.slice = None;
    }

    /// Pending dirty ranges accumulated since the group last drained.
    #[inline]
    #[must_use]
    pub const fn ranges(&self) -> &UpdateRanges {
        &self.ranges
    }

    /// Takes and clears the pending dirty ranges.
    pub(crate) fn drain_ranges(&mut self) -> UpdateRanges {
        let drained = self.ranges;
        self.ranges.clear();
        drained
    }

    /// Synchronously initializes every attribute of every slot in the
    /// slice. Particles are born dead; `tick` activates them.
    pub(crate) fn initialize_particles<R: Rng>(&self, attrs: &mut AttributeSet, rng: &mut R) {
        let Some(slice) = self.slice else {
            return;
        };

        let rotation = &self.settings.rotation;
        let rotation_center = rotation.center.unwrap_or(self.settings.position.value);
        let rotation_static_flag = if rotation.is_static { 0.0 } else { 1.0 };

        for i in slice.offset..slice.end() {
            self.assign_position(i, attrs, rng);
            self.assign_velocity(i, attrs, rng);
            self.assign_acceleration(i, attrs, rng);

            attrs.size.set_vec4(i, self.size_keyframes.sample(rng, true));
            attrs
                .angle
                .set_vec4(i, self.angle_keyframes.sample(rng, false));
            attrs
                .opacity
                .set_vec4(i, self.opacity_keyframes.sample(rng, true));

            // Born dead: (alive, age, max_age, wiggle).
            attrs.params.set_vec4(
                i,
                [
                    0.0,
                    0.0,
                    random_float(rng, self.settings.max_age.value, self.settings.max_age.spread)
                        .abs(),
                    random_float(rng, self.settings.wiggle.value, self.settings.wiggle.spread),
                ],
            );

            attrs.color.set_vec4(
                i,
                random_packed_colors(rng, &self.color_values, &self.color_spreads),
            );

            attrs.rotation.set_components(
                i,
                &[
                    packed_rotation_axis(rng, rotation.axis, rotation.axis_spread),
                    random_float(rng, rotation.angle, rotation.angle_spread),
                    rotation_static_flag,
                ],
            );
            attrs.rotation_center.set_vec3(i, rotation_center);
        }
    }

    /// Advances the emitter's slice by `dt` seconds.
    ///
    /// Executes, in order: the age-and-death pass, the emitter-lifetime
    /// early-out, the duration check, the activation window pass, the
    /// emitter age advance, and the dirty-range flush.
    pub fn tick<R: Rng>(&mut self, dt: f32, attrs: &mut AttributeSet, rng: &mut R) {
        if self.settings.is_static {
            return;
        }
        let Some(slice) = self.slice else {
            trace!(emitter = ?self.id, "tick on unregistered emitter skipped");
            return;
        };

        let start = slice.offset;
        let end = slice.end();

        // 1. Age & death pass, newest slots first.
        for i in (start..end).rev() {
            let element = attrs.params.element(i);
            if element[PARAM_ALIVE] != 1.0 {
                continue;
            }

            let mut age = element[PARAM_AGE] + dt;
            let max_age = element[PARAM_MAX_AGE];
            let mut alive = 1.0;

            if age > max_age {
                age = 0.0;
                alive = 0.0;
                self.reset_particle(i, attrs, rng);
            }

            self.ranges.params.mark(i * PARAMS_WIDTH);
            attrs.params.set_components(i, &[alive, age]);
        }

        // 2. A dead emitter only ages its remaining particles out.
        if !self.alive {
            self.age = 0.0;
            return;
        }

        // 3. Past the configured duration, stop spawning.
        if let Some(duration) = self.settings.duration {
            if self.age > duration {
                self.alive = false;
                self.age = 0.0;
            }
        }

        // 4. Activation window pass.
        let pps_dt = self.particles_per_second * self.settings.active_multiplier * dt;
        let activation_start = self.activation_index.floor();
        let activation_end = activation_start + pps_dt;
        let activation_count = (activation_end - self.activation_index + 1.0).floor();
        // Empty window: no division by zero.
        let dt_per_particle = if activation_count > 0.0 {
            dt / activation_count
        } else {
            0.0
        };

        let mut i = activation_start as usize;
        while (i as f32) < activation_end && i < end {
            if attrs.params.element(i)[PARAM_ALIVE] == 0.0 {
                // Spread same-frame births across the elapsed time so
                // low or uneven frame rates don't clump particles.
                let birth_age = dt_per_particle * (i as f32 - activation_start);
                attrs.params.set_components(i, &[1.0, birth_age]);
                self.ranges.params.mark(i * PARAMS_WIDTH);
            }
            i += 1;
        }

        self.activation_index += pps_dt;
        if self.activation_index > end as f32 {
            self.activation_index = start as f32;
        }

        // 5. Advance the emitter's own age.
        self.age += dt;
    }

    /// Resets the emitter to its just-constructed lifecycle state.
    ///
    /// With `force`, additionally hard-kills every slot in the slice and
    /// marks the whole params range dirty (used when returning an
    /// emitter to the pool).
    pub fn reset(&mut self, force: bool, attrs: &mut AttributeSet) {
        self.age = 0.0;
        self.alive = false;

        if !force {
            return;
        }
        let Some(slice) = self.slice else {
            return;
        };

        for i in slice.offset..slice.end() {
            attrs.params.set_components(i, &[0.0, 0.0]);
        }
        self.ranges.params.mark(slice.offset * PARAMS_WIDTH);
        self.ranges.params.mark((slice.end() - 1) * PARAMS_WIDTH);
        self.activation_index = slice.offset as f32;
    }

    fn distribution_of(&self, prop: &SpatialSettings) -> Distribution {
        prop.distribution.unwrap_or(self.settings.distribution)
    }

    fn assign_position<R: Rng>(&self, index: usize, attrs: &mut AttributeSet, rng: &mut R) {
        let prop = &self.settings.position;
        let value = match self.distribution_of(prop) {
            Distribution::Box => sample_box(rng, prop.value, prop.spread, prop.spread_clamp),
            Distribution::Sphere => sample_sphere(rng, prop.value, &self.settings.radius),
            Distribution::Disc => sample_disc(rng, prop.value, &self.settings.radius),
        };
        attrs.position.set_vec3(index, value);
    }

    fn assign_velocity<R: Rng>(&self, index: usize, attrs: &mut AttributeSet, rng: &mut R) {
        let prop = &self.settings.velocity;
        let value = match self.distribution_of(prop) {
            Distribution::Box => sample_box(rng, prop.value, prop.spread, Vec3::ZERO),
            Distribution::Sphere | Distribution::Disc => {
                let p = attrs.position.element(index);
                let position = Vec3::new(p[0], p[1], p[2]);
                sample_direction(
                    rng,
                    position,
                    self.settings.position.value,
                    prop.value.x,
                    prop.spread.x,
                )
            }
        };
        attrs.velocity.set_vec3(index, value);
    }

    fn assign_acceleration<R: Rng>(&self, index: usize, attrs: &mut AttributeSet, rng: &mut R) {
        let prop = &self.settings.acceleration;
        let value = match self.distribution_of(prop) {
            Distribution::Box => sample_box(rng, prop.value, prop.spread, Vec3::ZERO),
            Distribution::Sphere | Distribution::Disc => {
                let p = attrs.position.element(index);
                let position = Vec3::new(p[0], p[1], p[2]);
                sample_direction(
                    rng,
                    position,
                    self.settings.position.value,
                    prop.value.x,
                    prop.spread.x,
                )
            }
        };

        let drag = random_float(rng, self.settings.drag.value, self.settings.drag.spread)
            .clamp(0.0, 1.0);
        attrs
            .acceleration
            .set_vec4(index, [value.x, value.y, value.z, drag]);
    }

    /// Re-seeds a dead slot's kinematics per the reset flags, recording
    /// the touched range per attribute.
    fn reset_particle<R: Rng>(&mut self, index: usize, attrs: &mut AttributeSet, rng: &mut R) {
        if self.reset_flags.position {
            self.assign_position(index, attrs, rng);
            self.ranges.position.mark(index * 3);
        }
        if self.reset_flags.velocity {
            self.assign_velocity(index, attrs, rng);
            self.ranges.velocity.mark(index * 3);
        }
        if self.reset_flags.acceleration {
            self.assign_acceleration(index, attrs, rng);
            self.ranges.acceleration.mark(index * 4);
        }
    }
}

fn stretch_spread_vectors(spreads: &[Vec3], steps: LifetimeSteps) -> Vec<Vec3> {
    // Stretch each axis independently with the scalar rule.
    let axis = |pick: fn(&Vec3) -> f32| -> Vec<f32> {
        stretch_keyframes(&spreads.iter().map(pick).collect::<Vec<_>>(), steps)
    };
    let xs = axis(|v| v.x);
    let ys = axis(|v| v.y);
    let zs = axis(|v| v.z);

    xs.iter()
        .zip(&ys)
        .zip(&zs)
        .map(|((&x, &y), &z)| Vec3::new(x, y, z))
        .collect()
}
