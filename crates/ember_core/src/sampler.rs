//! # Spatial Distribution Sampling
//!
//! Pure sampling routines that initialize particle kinematics from a
//! configured distribution. Every function takes the caller's RNG so a
//! seeded generator reproduces a simulation exactly.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::math::{Color, Vec3};

/// The spatial shape particles are sampled from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    /// Axis-aligned box around the base position.
    #[default]
    Box,
    /// Surface of a sphere around the base position.
    Sphere,
    /// Circle in the XY plane around the base position.
    Disc,
}

/// Radius parameters for the sphere and disc distributions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusParams {
    /// Base radius.
    pub value: f32,
    /// Random spread added to the base radius.
    pub spread: f32,
    /// When nonzero, sampled radii snap to the nearest multiple of this.
    pub spread_clamp: f32,
    /// Per-axis scale applied to the sampled point before translation.
    pub scale: Vec3,
}

impl Default for RadiusParams {
    fn default() -> Self {
        Self {
            value: 10.0,
            spread: 0.0,
            spread_clamp: 0.0,
            scale: Vec3::ONE,
        }
    }
}

/// `base + spread * U(-0.5, 0.5)`.
#[inline]
pub fn random_float<R: Rng>(rng: &mut R, base: f32, spread: f32) -> f32 {
    base + spread * (rng.gen::<f32>() - 0.5)
}

/// Rounds `n` to a multiple of `multiple`.
///
/// Positive inputs round up to the next multiple; negative inputs round
/// toward zero. A zero `multiple` passes the value through unchanged.
/// Combined with the `-clamp / 2` offset in [`sample_box`], this centers
/// the snap grid on the base position.
#[must_use]
pub fn round_to_nearest_multiple(n: f32, multiple: f32) -> f32 {
    if multiple == 0.0 {
        return n;
    }

    let remainder = n.abs() % multiple;
    if remainder == 0.0 {
        return n;
    }

    if n < 0.0 {
        -(n.abs() - remainder)
    } else {
        n + multiple - remainder
    }
}

/// Samples a point from an axis-aligned box.
///
/// Each axis independently draws `base + U(-0.5, 0.5) * spread`. A
/// nonzero per-axis `spread_clamp` snaps that axis onto a grid of
/// multiples of the clamp value, centered on the base.
pub fn sample_box<R: Rng>(rng: &mut R, base: Vec3, spread: Vec3, spread_clamp: Vec3) -> Vec3 {
    let snap = |value: f32, clamp: f32| -> f32 {
        if clamp == 0.0 {
            value
        } else {
            -clamp * 0.5 + round_to_nearest_multiple(value, clamp)
        }
    };

    Vec3::new(
        snap(random_float(rng, base.x, spread.x), spread_clamp.x),
        snap(random_float(rng, base.y, spread.y), spread_clamp.y),
        snap(random_float(rng, base.z, spread.z), spread_clamp.z),
    )
}

fn sampled_radius<R: Rng>(rng: &mut R, radius: &RadiusParams) -> f32 {
    let mut r = random_float(rng, radius.value, radius.spread);
    if radius.spread_clamp != 0.0 {
        r = (r / radius.spread_clamp).round() * radius.spread_clamp;
    }
    r
}

/// Samples a point uniformly on the surface of a sphere.
///
/// Draws `depth = U(-1, 1)` and `theta = U(0, 2pi)`, places the point on
/// the unit sphere, scales by the sampled radius and the per-axis radius
/// scale, then translates to `base`.
pub fn sample_sphere<R: Rng>(rng: &mut R, base: Vec3, radius: &RadiusParams) -> Vec3 {
    let depth = 2.0 * rng.gen::<f32>() - 1.0;
    let theta = TAU * rng.gen::<f32>();
    let ring = (1.0 - depth * depth).sqrt();
    let rand = sampled_radius(rng, radius);

    Vec3::new(
        ring * theta.cos() * rand * radius.scale.x,
        ring * theta.sin() * rand * radius.scale.y,
        depth * rand * radius.scale.z,
    ) + base
}

/// Samples a point on a circle in the XY plane.
///
/// The sampled radius magnitude is forced non-negative before the same
/// clamp-quantization and scale/translate steps as the sphere case; the
/// Z component comes from the translation alone.
pub fn sample_disc<R: Rng>(rng: &mut R, base: Vec3, radius: &RadiusParams) -> Vec3 {
    let theta = TAU * rng.gen::<f32>();
    let mut rand = random_float(rng, radius.value, radius.spread).abs();
    if radius.spread_clamp != 0.0 {
        rand = (rand / radius.spread_clamp).round() * radius.spread_clamp;
    }

    Vec3::new(
        theta.cos() * rand * radius.scale.x,
        theta.sin() * rand * radius.scale.y,
        0.0,
    ) + base
}

/// Samples a velocity-style vector pointing away from `origin`.
///
/// The unit direction from `from` toward `origin` is scaled by the
/// negated sampled speed, so positive speeds push outward from the
/// center. Used for "outward from center" kinematics on the sphere and
/// disc distributions.
pub fn sample_direction<R: Rng>(
    rng: &mut R,
    from: Vec3,
    origin: Vec3,
    speed: f32,
    speed_spread: f32,
) -> Vec3 {
    (origin - from).normalized() * -random_float(rng, speed, speed_spread)
}

/// Perturbs a rotation axis and packs it into one color-hex float.
///
/// The base axis is normalized, each component jittered by
/// `U(-0.5, 0.5) * spread`, folded into the positive octant via absolute
/// value, renormalized, and encoded with the packed-color scheme for
/// compact storage in a single attribute component.
pub fn packed_rotation_axis<R: Rng>(rng: &mut R, axis: Vec3, axis_spread: Vec3) -> f32 {
    let jittered = axis.normalized()
        + Vec3::new(
            random_float(rng, 0.0, axis_spread.x),
            random_float(rng, 0.0, axis_spread.y),
            random_float(rng, 0.0, axis_spread.z),
        );
    let folded = jittered.abs().normalized();
    Color::new(folded.x, folded.y, folded.z).to_packed()
}

/// Samples one packed color per keyframe.
///
/// Each keyframe's channels are jittered by `U(-0.5, 0.5)` times the
/// matching spread vector, clamped to `[0, 1]`, and packed. Unused tail
/// keyframes stay zero.
pub fn random_packed_colors<R: Rng>(rng: &mut R, values: &[Color], spreads: &[Vec3]) -> [f32; 4] {
    let mut packed = [0.0; 4];
    for (i, slot) in packed.iter_mut().enumerate().take(values.len()) {
        let base = values[i];
        let spread = spreads.get(i).copied().unwrap_or(Vec3::ZERO);
        *slot = Color::new(
            base.r + random_float(rng, 0.0, spread.x),
            base.g + random_float(rng, 0.0, spread.y),
            base.b + random_float(rng, 0.0, spread.z),
        )
        .to_packed();
    }
    packed
}
