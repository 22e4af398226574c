//! End-to-end simulation scenarios driving a [`Group`] the way a host
//! application would: register emitters, tick once per frame, consume
//! the attribute buffers and merged dirty ranges.

use ember_core::Vec3;
use ember_sim::{
    AttributeId, Emitter, EmitterSettings, Group, GroupSettings, ScalarSettings, PARAMS_WIDTH,
};

fn settings(particle_count: usize, max_age: f32) -> EmitterSettings {
    EmitterSettings {
        particle_count,
        max_age: ScalarSettings::fixed(max_age),
        ..EmitterSettings::default()
    }
}

fn alive_count(group: &Group) -> usize {
    (0..group.particle_count())
        .filter(|&i| group.attributes().is_alive(i))
        .count()
}

/// Ten particles at a 10/s spawn rate: one activation per 0.1s tick,
/// none dead inside the first second, and the earliest-activated
/// particle is reset in the same tick its age crosses the maximum.
#[test]
fn ten_particle_spawn_and_death_schedule() {
    let mut group = Group::new(GroupSettings::default()).unwrap();
    let id = group
        .add_emitter(Emitter::new(&settings(10, 1.0), group.lifetime_steps()).unwrap())
        .unwrap();

    assert_eq!(group.emitter(id).unwrap().particles_per_second(), 10.0);

    for tick in 1..=10 {
        group.tick(0.1);
        assert_eq!(alive_count(&group), tick, "one activation per tick");
    }

    // The earliest-activated particle has aged through nine ticks.
    assert!((group.attributes().age(0) - 0.9).abs() < 1e-5);

    // Stop spawning so the upcoming death is observable instead of the
    // slot being recycled by the activation window.
    group.emitter_mut(id).unwrap().disable();

    // One 0.05s tick keeps every particle under its maximum age.
    group.tick(0.05);
    assert_eq!(alive_count(&group), 10);
    assert!((group.attributes().age(0) - 0.95).abs() < 1e-5);

    // The tick that pushes the earliest particle past 1.0s resets it to
    // dead within that same tick.
    group.tick(0.05);
    assert!(!group.attributes().is_alive(0));
    assert_eq!(group.attributes().age(0), 0.0);
    assert_eq!(alive_count(&group), 9);
}

/// Over many ticks, dead-to-alive transitions per unit time converge on
/// the configured spawn rate (within activation-window rounding).
#[test]
fn lifecycle_conservation_matches_spawn_rate() {
    let mut group = Group::new(GroupSettings::default()).unwrap();
    group
        .add_emitter(Emitter::new(&settings(50, 1.0), group.lifetime_steps()).unwrap())
        .unwrap();

    let mut previous: Vec<bool> = vec![false; 50];
    let mut births = 0usize;

    let dt = 0.016;
    let ticks = 100; // 1.6 simulated seconds
    for _ in 0..ticks {
        group.tick(dt);
        for i in 0..50 {
            let alive = group.attributes().is_alive(i);
            if alive && !previous[i] {
                births += 1;
            }
            previous[i] = alive;
        }
    }

    // 50 particles/s over 1.6s: about 80 births.
    let expected = 50.0 * dt * ticks as f32;
    let lower = (expected * 0.85) as usize;
    let upper = (expected * 1.15) as usize;
    assert!(
        (lower..=upper).contains(&births),
        "births {births} outside [{lower}, {upper}]"
    );
}

/// Registering more emitters grows the shared buffers without
/// disturbing data already written for earlier slices.
#[test]
fn registration_preserves_existing_slices() {
    let mut group = Group::new(GroupSettings::default()).unwrap();
    let steps = group.lifetime_steps();

    let mut spread_out = settings(8, 2.0);
    spread_out.position.spread = Vec3::new(50.0, 50.0, 50.0);
    group
        .add_emitter(Emitter::new(&spread_out, steps).unwrap())
        .unwrap();

    let before: Vec<f32> = group.attributes().position.storage().to_vec();

    group
        .add_emitter(Emitter::new(&settings(16, 2.0), steps).unwrap())
        .unwrap();

    assert_eq!(group.particle_count(), 24);
    let after = group.attributes().position.storage();
    assert_eq!(&after[..before.len()], &before[..], "prefix preserved");
}

/// The append-only slice invariant holds across an arbitrary
/// registration sequence, including removals in the middle.
#[test]
fn slices_never_overlap() {
    let mut group = Group::new(GroupSettings::default()).unwrap();
    let steps = group.lifetime_steps();

    let mut ids = Vec::new();
    for count in [10, 25, 5, 40] {
        ids.push(
            group
                .add_emitter(Emitter::new(&settings(count, 1.0), steps).unwrap())
                .unwrap(),
        );
    }

    // Removal does not compact: the next registration appends after the
    // dead range.
    group.remove_emitter(ids[1]).unwrap();
    ids.remove(1);
    ids.push(
        group
            .add_emitter(Emitter::new(&settings(7, 1.0), steps).unwrap())
            .unwrap(),
    );
    assert_eq!(group.particle_count(), 87);

    let slices: Vec<_> = ids
        .iter()
        .map(|&id| group.emitter(id).unwrap().slice().unwrap())
        .collect();
    for (i, a) in slices.iter().enumerate() {
        for b in &slices[i + 1..] {
            assert!(!a.overlaps(b), "slices {a:?} and {b:?} overlap");
        }
    }
}

/// The renderer-facing contract: merged dirty windows stay inside the
/// buffer, cover everything that changed, and clear on demand.
#[test]
fn dirty_windows_cover_mutations() {
    let mut group = Group::new(GroupSettings::default()).unwrap();
    let steps = group.lifetime_steps();
    group
        .add_emitter(Emitter::new(&settings(30, 0.5), steps).unwrap())
        .unwrap();

    for _ in 0..20 {
        group.tick(0.05);

        if let Some((offset, count)) = group.update_range(AttributeId::Params) {
            let len = group.attributes().params.component_len();
            assert_eq!(offset % PARAMS_WIDTH, 0);
            assert!(offset + count <= len, "window runs past the buffer");
        }
        group.clear_update_ranges();
        assert_eq!(group.update_range(AttributeId::Params), None);
    }
}

/// An emitter preset loaded from TOML drives the simulation the same
/// way a hand-built settings value does.
#[test]
fn toml_preset_round_trip() {
    let preset = EmitterSettings::from_toml_str(
        r#"
        particle_count = 12
        distribution = "Sphere"

        [max_age]
        value = 1.0

        [radius]
        value = 4.0

        [velocity]
        value = { x = 2.0, y = 0.0, z = 0.0 }
        "#,
    )
    .unwrap();

    let mut group = Group::new(GroupSettings::default()).unwrap();
    group
        .add_emitter(Emitter::new(&preset, group.lifetime_steps()).unwrap())
        .unwrap();

    // Sphere-distributed spawn positions sit on the configured radius.
    for i in 0..12 {
        let p = group.attributes().position.element(i);
        let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert!((len - 4.0).abs() < 1e-3, "sample off the sphere: {len}");
    }

    group.tick(0.1);
    assert!(alive_count(&group) > 0);
}

/// Same seed, same settings: bit-identical buffers after many frames.
#[test]
fn deterministic_across_runs() {
    let run = || {
        let mut group = Group::new(GroupSettings {
            seed: 99,
            ..GroupSettings::default()
        })
        .unwrap();
        let mut preset = settings(64, 0.4);
        preset.position.spread = Vec3::new(3.0, 3.0, 3.0);
        group
            .add_emitter(Emitter::new(&preset, group.lifetime_steps()).unwrap())
            .unwrap();
        for _ in 0..50 {
            group.tick(0.02);
        }
        (
            group.attributes().position.storage().to_vec(),
            group.attributes().params.storage().to_vec(),
        )
    };

    let (positions_a, params_a) = run();
    let (positions_b, params_b) = run();
    assert_eq!(positions_a, positions_b);
    assert_eq!(params_a, params_b);
}

/// Global uniforms advance with the simulation clock.
#[test]
fn uniforms_track_time() {
    let mut group = Group::new(GroupSettings::default()).unwrap();
    group
        .add_emitter(Emitter::new(&settings(4, 1.0), group.lifetime_steps()).unwrap())
        .unwrap();

    group.tick(0.25);
    group.tick(0.5);
    assert!((group.run_time() - 0.75).abs() < 1e-6);
    assert!((group.delta_time() - 0.5).abs() < 1e-6);
}
