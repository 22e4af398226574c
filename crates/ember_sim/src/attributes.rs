//! # The Group's Attribute Layout
//!
//! A group declares a fixed set of per-particle attributes, each stored
//! as one flat structure-of-arrays buffer shared by every particle the
//! group owns. Emitters hold non-owning `[offset, count)` views into
//! these buffers; the group is the only owner.

use ember_core::{AttributeBuffer, AttributeKind, UpdateRange};

/// Component index of the alive flag inside a `params` element.
pub const PARAM_ALIVE: usize = 0;
/// Component index of the particle age inside a `params` element.
pub const PARAM_AGE: usize = 1;
/// Component index of the particle max age inside a `params` element.
pub const PARAM_MAX_AGE: usize = 2;
/// Component index of the wiggle amplitude inside a `params` element.
pub const PARAM_WIGGLE: usize = 3;
/// Component width of the `params` attribute.
pub const PARAMS_WIDTH: usize = 4;

/// Identifies one of the group's declared attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeId {
    /// Spawn position (vec3).
    Position,
    /// Initial velocity (vec3).
    Velocity,
    /// Acceleration; the 4th component is the drag coefficient (vec4).
    Acceleration,
    /// Packed rotation axis, angle, and static flag (vec4).
    Rotation,
    /// Rotation center (vec3).
    RotationCenter,
    /// `(alive, age, max_age, wiggle)` lifecycle state (vec4).
    Params,
    /// Size-over-lifetime keyframes (vec4).
    Size,
    /// Texture-angle-over-lifetime keyframes (vec4).
    Angle,
    /// Packed color-over-lifetime keyframes (vec4).
    Color,
    /// Opacity-over-lifetime keyframes (vec4).
    Opacity,
}

impl AttributeId {
    /// Every declared attribute, in buffer-declaration order.
    pub const ALL: [Self; 10] = [
        Self::Position,
        Self::Velocity,
        Self::Acceleration,
        Self::Rotation,
        Self::RotationCenter,
        Self::Params,
        Self::Size,
        Self::Angle,
        Self::Color,
        Self::Opacity,
    ];

    /// The component shape of this attribute.
    #[must_use]
    pub const fn kind(self) -> AttributeKind {
        match self {
            Self::Position | Self::Velocity | Self::RotationCenter => AttributeKind::Vec3,
            Self::Acceleration
            | Self::Rotation
            | Self::Params
            | Self::Size
            | Self::Angle
            | Self::Color
            | Self::Opacity => AttributeKind::Vec4,
        }
    }
}

/// The full set of attribute buffers owned by a group.
///
/// Fields are public so the simulation's hot loops can address a buffer
/// without an enum dispatch per write.
#[derive(Clone, Debug)]
pub struct AttributeSet {
    /// Spawn positions.
    pub position: AttributeBuffer,
    /// Initial velocities.
    pub velocity: AttributeBuffer,
    /// Accelerations plus drag.
    pub acceleration: AttributeBuffer,
    /// Packed rotation axis/angle/static flag.
    pub rotation: AttributeBuffer,
    /// Rotation centers.
    pub rotation_center: AttributeBuffer,
    /// Lifecycle state.
    pub params: AttributeBuffer,
    /// Size keyframes.
    pub size: AttributeBuffer,
    /// Angle keyframes.
    pub angle: AttributeBuffer,
    /// Packed color keyframes.
    pub color: AttributeBuffer,
    /// Opacity keyframes.
    pub opacity: AttributeBuffer,
}

impl AttributeSet {
    /// Creates the empty attribute set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: AttributeBuffer::new(AttributeId::Position.kind()),
            velocity: AttributeBuffer::new(AttributeId::Velocity.kind()),
            acceleration: AttributeBuffer::new(AttributeId::Acceleration.kind()),
            rotation: AttributeBuffer::new(AttributeId::Rotation.kind()),
            rotation_center: AttributeBuffer::new(AttributeId::RotationCenter.kind()),
            params: AttributeBuffer::new(AttributeId::Params.kind()),
            size: AttributeBuffer::new(AttributeId::Size.kind()),
            angle: AttributeBuffer::new(AttributeId::Angle.kind()),
            color: AttributeBuffer::new(AttributeId::Color.kind()),
            opacity: AttributeBuffer::new(AttributeId::Opacity.kind()),
        }
    }

    /// Number of particle slots currently allocated across the set.
    #[inline]
    #[must_use]
    pub const fn particle_count(&self) -> usize {
        self.params.element_count()
    }

    /// Grows (or shrinks, on reset paths) every buffer to `particles`
    /// elements.
    pub fn resize(&mut self, particles: usize) {
        self.position.set_size(particles);
        self.velocity.set_size(particles);
        self.acceleration.set_size(particles);
        self.rotation.set_size(particles);
        self.rotation_center.set_size(particles);
        self.params.set_size(particles);
        self.size.set_size(particles);
        self.angle.set_size(particles);
        self.color.set_size(particles);
        self.opacity.set_size(particles);
    }

    /// Borrows the buffer behind an [`AttributeId`].
    #[must_use]
    pub const fn buffer(&self, id: AttributeId) -> &AttributeBuffer {
        match id {
            AttributeId::Position => &self.position,
            AttributeId::Velocity => &self.velocity,
            AttributeId::Acceleration => &self.acceleration,
            AttributeId::Rotation => &self.rotation,
            AttributeId::RotationCenter => &self.rotation_center,
            AttributeId::Params => &self.params,
            AttributeId::Size => &self.size,
            AttributeId::Angle => &self.angle,
            AttributeId::Color => &self.color,
            AttributeId::Opacity => &self.opacity,
        }
    }

    /// Reads a particle's alive flag.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        self.params.element(index)[PARAM_ALIVE] == 1.0
    }

    /// Reads a particle's age.
    #[inline]
    #[must_use]
    pub fn age(&self, index: usize) -> f32 {
        self.params.element(index)[PARAM_AGE]
    }

    /// A particle's effective maximum age.
    ///
    /// Read as `max(age, configured)` so rounding can never report a
    /// zero-length lifetime to a consumer computing a normalized age.
    #[inline]
    #[must_use]
    pub fn max_age(&self, index: usize) -> f32 {
        let element = self.params.element(index);
        element[PARAM_MAX_AGE].max(element[PARAM_AGE])
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-attribute dirty ranges for the four buffers the simulation
/// rewrites while running.
///
/// The remaining attributes only change when an emitter is registered,
/// which reallocates storage and forces a full upload anyway.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateRanges {
    /// Touched span of the position buffer.
    pub position: UpdateRange,
    /// Touched span of the velocity buffer.
    pub velocity: UpdateRange,
    /// Touched span of the acceleration buffer.
    pub acceleration: UpdateRange,
    /// Touched span of the params buffer.
    pub params: UpdateRange,
}

impl UpdateRanges {
    /// Creates empty accumulators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Widens every range to cover `other`.
    pub fn merge(&mut self, other: &Self) {
        self.position.merge(&other.position);
        self.velocity.merge(&other.velocity);
        self.acceleration.merge(&other.acceleration);
        self.params.merge(&other.params);
    }

    /// Clears every accumulator.
    pub fn clear(&mut self) {
        self.position.clear();
        self.velocity.clear();
        self.acceleration.clear();
        self.params.clear();
    }

    /// The accumulator for a dynamic attribute, or `None` for attributes
    /// that never change during simulation.
    #[must_use]
    pub const fn get(&self, id: AttributeId) -> Option<&UpdateRange> {
        match id {
            AttributeId::Position => Some(&self.position),
            AttributeId::Velocity => Some(&self.velocity),
            AttributeId::Acceleration => Some(&self.acceleration),
            AttributeId::Params => Some(&self.params),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_match_layout() {
        assert_eq!(AttributeId::Position.kind().width(), 3);
        assert_eq!(AttributeId::Velocity.kind().width(), 3);
        assert_eq!(AttributeId::RotationCenter.kind().width(), 3);
        for id in [
            AttributeId::Acceleration,
            AttributeId::Rotation,
            AttributeId::Params,
            AttributeId::Size,
            AttributeId::Angle,
            AttributeId::Color,
            AttributeId::Opacity,
        ] {
            assert_eq!(id.kind().width(), 4);
        }
    }

    #[test]
    fn test_resize_all() {
        let mut set = AttributeSet::new();
        set.resize(16);
        assert_eq!(set.particle_count(), 16);
        for id in AttributeId::ALL {
            assert_eq!(set.buffer(id).element_count(), 16);
        }
    }

    #[test]
    fn test_max_age_clamps_to_age() {
        let mut set = AttributeSet::new();
        set.resize(1);
        set.params.set_vec4(0, [1.0, 3.0, 2.0, 0.0]);

        // Age already past the configured max: report the larger value.
        assert_eq!(set.max_age(0), 3.0);
        assert_eq!(set.age(0), 3.0);
        assert!(set.is_alive(0));
    }

    #[test]
    fn test_ranges_get_dynamic_only() {
        let ranges = UpdateRanges::new();
        assert!(ranges.get(AttributeId::Params).is_some());
        assert!(ranges.get(AttributeId::Position).is_some());
        assert!(ranges.get(AttributeId::Size).is_none());
        assert!(ranges.get(AttributeId::Rotation).is_none());
    }
}
