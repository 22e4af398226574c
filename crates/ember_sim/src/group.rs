//! # Group
//!
//! The aggregate container of the simulation: owns one attribute buffer
//! per declared attribute, allocates contiguous slices to registered
//! emitters, ticks them every frame, and merges their dirty ranges into
//! one group-level window per attribute for the renderer to consume.
//!
//! Single-threaded and frame-driven: the caller invokes [`Group::tick`]
//! once per render frame. The only deferred work is the pool's
//! auto-return mechanism, modeled as explicit scheduled records owned by
//! the group and executed inside `tick`; dropping the group cancels all
//! of them as a unit, so no callback can touch freed buffers.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use ember_core::{LifetimeSteps, Vec3};

use crate::attributes::{AttributeId, AttributeSet, UpdateRanges, PARAMS_WIDTH};
use crate::config::{EmitterSettings, GroupSettings};
use crate::emitter::{Emitter, EmitterId};
use crate::error::{ConfigError, GroupError, SimResult};

/// Renderer work toggles recorded while emitters register.
///
/// Sticky: once any registered emitter needs a feature, the flag stays
/// set so the downstream consumer can skip work only when no emitter
/// ever asked for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Some emitter animates the texture angle over lifetime.
    pub texture_rotation: bool,
    /// Some emitter rotates particles about an axis.
    pub particle_rotation: bool,
    /// Some emitter applies wiggle displacement.
    pub wiggle: bool,
}

impl FeatureFlags {
    fn absorb(&mut self, emitter: &Emitter) {
        let settings = emitter.settings();
        self.texture_rotation |= settings.angle.value.iter().any(|&v| v != 0.0)
            || settings.angle.spread.iter().any(|&v| v != 0.0);
        self.particle_rotation |=
            settings.rotation.angle != 0.0 || settings.rotation.angle_spread != 0.0;
        self.wiggle |= settings.wiggle.value != 0.0 || settings.wiggle.spread != 0.0;
    }
}

/// A pending pool auto-return, due at a point in simulation time.
#[derive(Clone, Copy, Debug)]
struct ScheduledReturn {
    due: f32,
    emitter: EmitterId,
}

/// The shared-buffer container coordinating many emitters.
///
/// Owns the attribute buffers exclusively; emitters hold non-owning
/// `[offset, count)` views. Slice assignment is strictly append-only and
/// index ranges are never reused while an emitter is registered, so no
/// two emitters ever write overlapping ranges.
pub struct Group {
    settings: GroupSettings,
    steps: LifetimeSteps,
    attributes: AttributeSet,
    emitters: Vec<Emitter>,
    rng: StdRng,
    run_time: f32,
    delta_time: f32,
    ranges: UpdateRanges,
    flags: FeatureFlags,
    pool_settings: Option<EmitterSettings>,
    pool_grow: bool,
    pool_free: Vec<EmitterId>,
    scheduled_returns: Vec<ScheduledReturn>,
}

impl Group {
    /// Creates a group from validated settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] the settings fail on.
    pub fn new(settings: GroupSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let steps = LifetimeSteps::new(settings.lifetime_steps)
            .ok_or(ConfigError::InvalidLifetimeSteps(settings.lifetime_steps))?;

        Ok(Self {
            steps,
            rng: StdRng::seed_from_u64(settings.seed),
            settings,
            attributes: AttributeSet::new(),
            emitters: Vec::new(),
            run_time: 0.0,
            delta_time: 0.0,
            ranges: UpdateRanges::new(),
            flags: FeatureFlags::default(),
            pool_settings: None,
            pool_grow: false,
            pool_free: Vec::new(),
            scheduled_returns: Vec::new(),
        })
    }

    /// The keyframe count every emitter in this group must carry.
    #[inline]
    #[must_use]
    pub const fn lifetime_steps(&self) -> LifetimeSteps {
        self.steps
    }

    /// Renderer read surface: the attribute buffers.
    ///
    /// Buffer growth reallocates storage, so any reference taken from
    /// here is invalidated by the next [`Group::add_emitter`] call.
    #[inline]
    #[must_use]
    pub const fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Total particle slots allocated across all registered emitters.
    #[inline]
    #[must_use]
    pub const fn particle_count(&self) -> usize {
        self.attributes.particle_count()
    }

    /// Number of registered emitters.
    #[inline]
    #[must_use]
    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Borrows a registered emitter.
    #[must_use]
    pub fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.iter().find(|e| e.id() == id)
    }

    /// Mutably borrows a registered emitter.
    pub fn emitter_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.emitters.iter_mut().find(|e| e.id() == id)
    }

    /// Seconds of simulation time accumulated across all ticks.
    #[inline]
    #[must_use]
    pub const fn run_time(&self) -> f32 {
        self.run_time
    }

    /// The delta time of the most recent tick.
    #[inline]
    #[must_use]
    pub const fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// The renderer work toggles recorded so far.
    #[inline]
    #[must_use]
    pub const fn feature_flags(&self) -> FeatureFlags {
        self.flags
    }

    /// The merged `(offset, count)` upload window for a dynamic
    /// attribute, or `None` when it has not changed since the last
    /// [`Group::clear_update_ranges`].
    #[must_use]
    pub fn update_range(&self, id: AttributeId) -> Option<(usize, usize)> {
        self.ranges
            .get(id)
            .and_then(|range| range.as_upload(id.kind().width()))
    }

    /// Resets the merged upload windows after the renderer consumed
    /// them.
    pub fn clear_update_ranges(&mut self) {
        self.ranges.clear();
    }

    /// Registers an emitter, growing every attribute buffer and
    /// synchronously initializing the new slots.
    ///
    /// The emitter's slice starts at the current total particle count:
    /// assignment is append-only and never compacts on removal, which is
    /// what guarantees no two emitters overlap.
    ///
    /// # Errors
    ///
    /// [`GroupError::AlreadyRegistered`] when the emitter identity is
    /// already present, [`GroupError::LifetimeStepsMismatch`] when it
    /// was built for a different keyframe count. No state is mutated on
    /// error.
    pub fn add_emitter(&mut self, mut emitter: Emitter) -> SimResult<EmitterId> {
        let id = emitter.id();
        if self.emitters.iter().any(|e| e.id() == id) {
            warn!(emitter = ?id, "emitter already registered, not adding again");
            return Err(GroupError::AlreadyRegistered(id));
        }
        if emitter.lifetime_steps() != self.steps {
            warn!(emitter = ?id, "emitter keyframe count does not match group");
            return Err(GroupError::LifetimeStepsMismatch {
                emitter: emitter.lifetime_steps().get(),
                group: self.steps.get(),
            });
        }

        emitter.compute_spawn_rate(emitter.worst_case_age());

        let offset = self.attributes.particle_count();
        let total = offset + emitter.particle_count();
        self.attributes.resize(total);

        emitter.bind(offset);
        debug_assert!(
            self.emitters.iter().all(|existing| {
                match (existing.slice(), emitter.slice()) {
                    (Some(a), Some(b)) => !a.overlaps(&b),
                    _ => true,
                }
            }),
            "append-only slice assignment produced an overlap"
        );

        emitter.initialize_particles(&mut self.attributes, &mut self.rng);
        self.flags.absorb(&emitter);

        debug!(
            emitter = ?id,
            offset,
            particles = emitter.particle_count(),
            total,
            "emitter registered"
        );
        self.emitters.push(emitter);
        Ok(id)
    }

    /// Unregisters an emitter, killing its particles in place.
    ///
    /// The slice's alive/age state is zeroed and the full params range
    /// marked dirty; the index range itself is never compacted or
    /// reused. Any scheduled pool return for the emitter is cancelled.
    ///
    /// # Errors
    ///
    /// [`GroupError::NotRegistered`] when the emitter is not present.
    pub fn remove_emitter(&mut self, id: EmitterId) -> SimResult<Emitter> {
        let Some(index) = self.emitters.iter().position(|e| e.id() == id) else {
            warn!(emitter = ?id, "emitter not registered, nothing to remove");
            return Err(GroupError::NotRegistered(id));
        };

        let mut emitter = self.emitters.remove(index);
        if let Some(slice) = emitter.slice() {
            for i in slice.offset..slice.end() {
                self.attributes.params.set_components(i, &[0.0, 0.0]);
            }
            self.ranges.params.mark(slice.offset * PARAMS_WIDTH);
            self.ranges.params.mark((slice.end() - 1) * PARAMS_WIDTH);
        }
        emitter.unbind();

        self.scheduled_returns.retain(|s| s.emitter != id);
        self.pool_free.retain(|&pooled| pooled != id);

        debug!(emitter = ?id, "emitter removed");
        Ok(emitter)
    }

    /// Advances the whole simulation by `dt` seconds.
    ///
    /// No-op with zero registered emitters. A non-positive `dt` falls
    /// back to the configured fixed time step. Emitters tick in
    /// registration order; their dirty ranges merge into the group-level
    /// windows afterwards.
    pub fn tick(&mut self, dt: f32) {
        if self.emitters.is_empty() {
            return;
        }

        let dt = if dt > 0.0 {
            dt
        } else {
            self.settings.fixed_time_step
        };
        self.run_time += dt;
        self.delta_time = dt;

        self.process_scheduled_returns();

        for emitter in &mut self.emitters {
            emitter.tick(dt, &mut self.attributes, &mut self.rng);
            let drained = emitter.drain_ranges();
            self.ranges.merge(&drained);
        }
    }

    /// Pre-creates `count` pooled emitters from `settings`, registering
    /// each and parking it on the free list.
    ///
    /// `allow_growth` permits [`Group::get_from_pool`] to construct a
    /// fresh emitter from the stored settings when the list runs dry.
    ///
    /// # Errors
    ///
    /// [`GroupError::InvalidPoolSettings`] when the settings fail
    /// validation.
    pub fn add_pool(
        &mut self,
        count: usize,
        settings: &EmitterSettings,
        allow_growth: bool,
    ) -> SimResult<&mut Self> {
        settings
            .validate()
            .map_err(GroupError::InvalidPoolSettings)?;

        self.pool_settings = Some(settings.clone());
        self.pool_grow = allow_growth;

        for _ in 0..count {
            let emitter = Emitter::new(settings, self.steps)
                .map_err(GroupError::InvalidPoolSettings)?;
            let id = self.add_emitter(emitter)?;
            self.release_into_pool(id)?;
        }
        Ok(self)
    }

    /// Number of emitters currently parked in the pool.
    #[inline]
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_free.len()
    }

    /// Fetches an emitter from the pool.
    ///
    /// Pops the free list (most recently released first). When the list
    /// is empty and growth is allowed, a new emitter is built from the
    /// stored pool settings and registered. Returns `None` when no
    /// emitter is available.
    pub fn get_from_pool(&mut self) -> Option<EmitterId> {
        if let Some(id) = self.pool_free.pop() {
            return Some(id);
        }
        if !self.pool_grow {
            return None;
        }

        let settings = self.pool_settings.clone()?;
        match Emitter::new(&settings, self.steps) {
            Ok(emitter) => match self.add_emitter(emitter) {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(error = %err, "failed to grow emitter pool");
                    None
                }
            },
            Err(err) => {
                warn!(error = %err, "stored pool settings no longer construct an emitter");
                None
            }
        }
    }

    /// Returns an emitter to the pool.
    ///
    /// The emitter is force-reset (slice hard-killed, full params range
    /// marked dirty) and pushed onto the free list, LIFO.
    ///
    /// # Errors
    ///
    /// [`GroupError::NotRegistered`] when the emitter is not registered
    /// with this group.
    pub fn release_into_pool(&mut self, id: EmitterId) -> SimResult<()> {
        let Some(index) = self.emitters.iter().position(|e| e.id() == id) else {
            warn!(emitter = ?id, "will not pool an unregistered emitter");
            return Err(GroupError::NotRegistered(id));
        };
        if self.pool_free.contains(&id) {
            warn!(emitter = ?id, "emitter already pooled, not releasing again");
            return Ok(());
        }

        self.emitters[index].reset(true, &mut self.attributes);
        self.pool_free.push(id);
        Ok(())
    }

    /// Triggers up to `count` pooled emitters, optionally relocating
    /// them to `position` first.
    ///
    /// Each triggered emitter is enabled and scheduled to return to the
    /// pool automatically once its worst-case particle lifetime has
    /// elapsed in simulation time. Exhausting the pool stops early and
    /// reports [`GroupError::PoolExhausted`] as a warning; the
    /// simulation is never interrupted.
    pub fn trigger_pool_emitter(&mut self, count: usize, position: Option<Vec3>) -> &mut Self {
        for _ in 0..count.max(1) {
            let Some(id) = self.get_from_pool() else {
                warn!(error = %GroupError::PoolExhausted, "pool trigger stopped early");
                break;
            };

            let worst_case_age = {
                let Some(emitter) = self.emitter_mut(id) else {
                    continue;
                };
                if let Some(position) = position {
                    emitter.set_base_position(position);
                }
                emitter.enable();
                emitter.worst_case_age()
            };
            let due = self.run_time + worst_case_age;
            self.scheduled_returns.push(ScheduledReturn { due, emitter: id });
        }
        self
    }

    /// Executes scheduled pool returns that have come due.
    fn process_scheduled_returns(&mut self) {
        loop {
            let due = self
                .scheduled_returns
                .iter()
                .position(|s| self.run_time >= s.due);
            let Some(index) = due else {
                return;
            };

            let scheduled = self.scheduled_returns.swap_remove(index);
            if let Some(emitter) = self.emitter_mut(scheduled.emitter) {
                emitter.disable();
            }
            if let Err(err) = self.release_into_pool(scheduled.emitter) {
                warn!(error = %err, "scheduled pool return skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalarSettings;

    fn small_emitter(count: usize, max_age: f32) -> EmitterSettings {
        EmitterSettings {
            particle_count: count,
            max_age: ScalarSettings::fixed(max_age),
            ..EmitterSettings::default()
        }
    }

    fn group() -> Group {
        Group::new(GroupSettings::default()).unwrap()
    }

    #[test]
    fn test_group_rejects_bad_settings() {
        let err = Group::new(GroupSettings {
            lifetime_steps: 9,
            ..GroupSettings::default()
        });
        assert_eq!(err.err(), Some(ConfigError::InvalidLifetimeSteps(9)));
    }

    #[test]
    fn test_add_emitter_appends_slices() {
        let mut group = group();
        let steps = group.lifetime_steps();

        let a = group
            .add_emitter(Emitter::new(&small_emitter(10, 1.0), steps).unwrap())
            .unwrap();
        let b = group
            .add_emitter(Emitter::new(&small_emitter(20, 1.0), steps).unwrap())
            .unwrap();

        assert_eq!(group.particle_count(), 30);
        let slice_a = group.emitter(a).unwrap().slice().unwrap();
        let slice_b = group.emitter(b).unwrap().slice().unwrap();
        assert_eq!(slice_a.offset, 0);
        assert_eq!(slice_b.offset, 10);
        assert!(!slice_a.overlaps(&slice_b));

        // Every buffer grew to cover the new total.
        for id in AttributeId::ALL {
            assert_eq!(group.attributes().buffer(id).element_count(), 30);
        }
    }

    #[test]
    fn test_add_emitter_rejects_duplicate() {
        let mut group = group();
        let steps = group.lifetime_steps();
        let emitter = Emitter::new(&small_emitter(5, 1.0), steps).unwrap();
        let clone = emitter.clone();

        group.add_emitter(emitter).unwrap();
        let err = group.add_emitter(clone);
        assert!(matches!(err, Err(GroupError::AlreadyRegistered(_))));
        // The failed registration mutated nothing.
        assert_eq!(group.particle_count(), 5);
        assert_eq!(group.emitter_count(), 1);
    }

    #[test]
    fn test_add_emitter_rejects_steps_mismatch() {
        let mut group = Group::new(GroupSettings {
            lifetime_steps: 3,
            ..GroupSettings::default()
        })
        .unwrap();

        let emitter = Emitter::new(
            &small_emitter(5, 1.0),
            LifetimeSteps::new(4).unwrap(),
        )
        .unwrap();
        let err = group.add_emitter(emitter);
        assert_eq!(
            err.err(),
            Some(GroupError::LifetimeStepsMismatch { emitter: 4, group: 3 })
        );
    }

    #[test]
    fn test_remove_emitter_kills_slice() {
        let mut group = group();
        let steps = group.lifetime_steps();
        let id = group
            .add_emitter(Emitter::new(&small_emitter(10, 1.0), steps).unwrap())
            .unwrap();

        group.tick(0.5);
        assert!((0..10).any(|i| group.attributes().is_alive(i)));
        group.clear_update_ranges();

        let removed = group.remove_emitter(id).unwrap();
        assert!(removed.slice().is_none());
        assert_eq!(group.emitter_count(), 0);
        assert!((0..10).all(|i| !group.attributes().is_alive(i)));
        // The whole params slice is flagged for re-upload; the index
        // range itself is not reclaimed.
        assert_eq!(group.update_range(AttributeId::Params), Some((0, 40)));
        assert_eq!(group.particle_count(), 10);

        let err = group.remove_emitter(id);
        assert!(matches!(err, Err(GroupError::NotRegistered(_))));
    }

    #[test]
    fn test_tick_without_emitters_is_noop() {
        let mut group = group();
        group.tick(1.0);
        assert_eq!(group.run_time(), 0.0);
    }

    #[test]
    fn test_tick_zero_dt_uses_fixed_step() {
        let mut group = group();
        let steps = group.lifetime_steps();
        group
            .add_emitter(Emitter::new(&small_emitter(10, 1.0), steps).unwrap())
            .unwrap();

        group.tick(0.0);
        assert_eq!(group.run_time(), 0.016);
        assert_eq!(group.delta_time(), 0.016);
    }

    #[test]
    fn test_ranges_merge_across_emitters() {
        let mut group = group();
        let steps = group.lifetime_steps();
        group
            .add_emitter(Emitter::new(&small_emitter(10, 1.0), steps).unwrap())
            .unwrap();
        group
            .add_emitter(Emitter::new(&small_emitter(10, 1.0), steps).unwrap())
            .unwrap();

        group.tick(0.25);

        // Both emitters activated particles, so the merged params window
        // spans both slices.
        let (offset, count) = group.update_range(AttributeId::Params).unwrap();
        assert_eq!(offset, 0);
        assert!(count > 10 * PARAMS_WIDTH);

        group.clear_update_ranges();
        assert_eq!(group.update_range(AttributeId::Params), None);
    }

    #[test]
    fn test_feature_flags_sticky() {
        let mut group = group();
        let steps = group.lifetime_steps();
        assert_eq!(group.feature_flags(), FeatureFlags::default());

        let mut settings = small_emitter(5, 1.0);
        settings.wiggle = ScalarSettings { value: 2.0, spread: 0.0 };
        settings.rotation.angle = 1.0;
        group
            .add_emitter(Emitter::new(&settings, steps).unwrap())
            .unwrap();

        let flags = group.feature_flags();
        assert!(flags.wiggle);
        assert!(flags.particle_rotation);
        assert!(!flags.texture_rotation);

        // A later plain emitter does not clear recorded flags.
        group
            .add_emitter(Emitter::new(&small_emitter(5, 1.0), steps).unwrap())
            .unwrap();
        assert_eq!(group.feature_flags(), flags);
    }

    #[test]
    fn test_pool_lifo() {
        let mut group = group();
        group.add_pool(3, &small_emitter(4, 1.0), false).unwrap();
        assert_eq!(group.pool_size(), 3);
        assert_eq!(group.emitter_count(), 3);

        let first = group.get_from_pool().unwrap();
        assert_eq!(group.pool_size(), 2);

        // Most recently released comes back first.
        group.release_into_pool(first).unwrap();
        assert_eq!(group.get_from_pool(), Some(first));

        let _ = group.get_from_pool().unwrap();
        let _ = group.get_from_pool().unwrap();
        assert_eq!(group.get_from_pool(), None);
    }

    #[test]
    fn test_pool_growth() {
        let mut group = group();
        group.add_pool(1, &small_emitter(4, 1.0), true).unwrap();

        let a = group.get_from_pool().unwrap();
        let b = group.get_from_pool().unwrap();
        assert_ne!(a, b);
        assert_eq!(group.emitter_count(), 2);
        assert_eq!(group.particle_count(), 8);
    }

    #[test]
    fn test_trigger_pool_emitter_schedules_return() {
        let mut group = group();
        group.add_pool(2, &small_emitter(4, 0.5), false).unwrap();

        group.trigger_pool_emitter(1, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(group.pool_size(), 1);
        assert_eq!(group.scheduled_returns.len(), 1);

        // Worst-case lifetime is 0.5s: after 0.4s nothing returns.
        group.tick(0.4);
        assert_eq!(group.pool_size(), 1);

        // Crossing the due time returns the emitter, force-reset.
        group.tick(0.2);
        assert_eq!(group.pool_size(), 2);
        assert!(group.scheduled_returns.is_empty());
        assert!(group.emitters.iter().all(|e| !e.is_alive()));
    }

    #[test]
    fn test_remove_cancels_scheduled_return() {
        let mut group = group();
        group.add_pool(1, &small_emitter(4, 0.5), false).unwrap();

        group.trigger_pool_emitter(1, None);
        let id = group.scheduled_returns[0].emitter;

        let _ = group.remove_emitter(id).unwrap();
        assert!(group.scheduled_returns.is_empty());
        assert_eq!(group.pool_size(), 0);

        // The cancelled return never fires.
        group.tick(1.0);
        assert_eq!(group.pool_size(), 0);
    }

    #[test]
    fn test_trigger_relocates_emitter() {
        let mut group = group();
        group.add_pool(1, &small_emitter(4, 1.0), false).unwrap();

        let target = Vec3::new(10.0, 0.0, -4.0);
        group.trigger_pool_emitter(1, Some(target));

        let triggered = group
            .emitters
            .iter()
            .find(|e| e.is_alive())
            .expect("triggered emitter is alive");
        assert_eq!(triggered.settings().position.value, target);
    }
}
