//! # Value-Over-Lifetime Interpolation
//!
//! A lifetime-varying attribute carries a fixed number of keyframes; a
//! particle's effective value is interpolated between them as its
//! normalized age runs from 0 to 1.
//!
//! The keyframe count is a per-group constant between 1 and 4, threaded
//! explicitly through construction as [`LifetimeSteps`]. Attributes
//! declared with a different number of keyframes are stretched onto
//! exactly that many via piecewise-linear resampling before the
//! simulation starts.

use crate::math::{lerp, lerp_color, Color};

/// The number of keyframes every lifetime-varying attribute carries.
///
/// Validated once at group construction; everything downstream can then
/// rely on the value being in `1..=4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifetimeSteps(usize);

impl LifetimeSteps {
    /// The largest supported keyframe count.
    pub const MAX: usize = 4;

    /// The default keyframe count.
    pub const DEFAULT: Self = Self(4);

    /// Creates a validated keyframe count, or `None` outside `1..=4`.
    #[must_use]
    pub const fn new(steps: usize) -> Option<Self> {
        if steps >= 1 && steps <= Self::MAX {
            Some(Self(steps))
        } else {
            None
        }
    }

    /// The keyframe count as a plain integer.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for LifetimeSteps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Resamples `source` onto exactly `steps` evenly spaced keyframes.
///
/// Endpoints are exact: the first destination keyframe equals
/// `source[0]` and the last equals the source's final element. Interior
/// keyframes are linearly interpolated from the fractional source
/// position `i * (n-1) / (L-1)`.
///
/// An empty source yields a zero-filled result; a single-step
/// destination collapses to the first source keyframe.
#[must_use]
pub fn stretch_keyframes(source: &[f32], steps: LifetimeSteps) -> Vec<f32> {
    resample(source, steps, 0.0, lerp)
}

/// Color variant of [`stretch_keyframes`]; channels interpolate
/// independently with the same scalar rule.
#[must_use]
pub fn stretch_color_keyframes(source: &[Color], steps: LifetimeSteps) -> Vec<Color> {
    resample(source, steps, Color::WHITE, lerp_color)
}

fn resample<T: Copy>(source: &[T], steps: LifetimeSteps, fill: T, mix: fn(T, T, f32) -> T) -> Vec<T> {
    let len = steps.get();
    let Some(&first) = source.first() else {
        return vec![fill; len];
    };
    let Some(&last) = source.last() else {
        return vec![fill; len];
    };

    if len == 1 {
        return vec![first];
    }

    let mut out = Vec::with_capacity(len);
    out.push(first);

    let factor = (source.len() - 1) as f32 / (len - 1) as f32;
    for i in 1..len - 1 {
        let f = i as f32 * factor;
        let before = f.floor() as usize;
        let after = f.ceil() as usize;
        out.push(mix(source[before], source[after], f - f.floor()));
    }

    out.push(last);
    out
}

/// Evaluates a scalar value-over-lifetime attribute.
///
/// `p` is the particle's normalized age in `[0, 1]` (clamped). With `L`
/// keyframes there are `L - 1` segments; `p` maps onto `delta_age =
/// p * (L - 1)` and exactly one segment contributes:
/// `mix(kf[i], kf[i+1], delta_age - i)` for `delta_age` in `[i, i+1)`.
/// The boundaries are exact: `p = 0` yields the first keyframe and
/// `p = 1` the last.
#[must_use]
pub fn value_over_lifetime(p: f32, keyframes: &[f32]) -> f32 {
    evaluate(p, keyframes, lerp)
}

/// Evaluates a color value-over-lifetime attribute, channel by channel.
#[must_use]
pub fn color_over_lifetime(p: f32, keyframes: &[Color]) -> Color {
    evaluate(p, keyframes, lerp_color)
}

fn evaluate<T: Copy + Default>(p: f32, keyframes: &[T], mix: fn(T, T, f32) -> T) -> T {
    match keyframes.len() {
        0 => T::default(),
        1 => keyframes[0],
        len => {
            let delta_age = p.clamp(0.0, 1.0) * (len - 1) as f32;
            let segment = (delta_age.floor() as usize).min(len - 2);
            mix(
                keyframes[segment],
                keyframes[segment + 1],
                delta_age - segment as f32,
            )
        }
    }
}
