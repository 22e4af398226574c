//! # Attribute Storage
//!
//! Resizable structure-of-arrays buffers for per-particle attributes.
//!
//! Every attribute a group declares is one flat `f32` array shared by all
//! of its particles:
//! - All slots for a particle attribute live at `index * component_width`
//! - Access is O(1) via particle index
//! - The whole array can be handed to a renderer as one contiguous upload

use bytemuck::cast_slice;

use crate::math::Vec3;

/// The component shape of one attribute element.
///
/// Restricting widths to this set keeps the renderer-facing contract
/// exhaustive: adding a new shape is a compile-time-checked change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// One `f32` per element.
    Scalar,
    /// Two components per element.
    Vec2,
    /// Three components per element.
    Vec3,
    /// Four components per element.
    Vec4,
    /// Nine components per element (3x3 matrix).
    Mat3,
    /// Sixteen components per element (4x4 matrix).
    Mat4,
}

impl AttributeKind {
    /// Number of `f32` components each element of this kind occupies.
    #[inline]
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// A resizable, strongly-typed structure-of-arrays attribute buffer.
///
/// Invariant: `storage.len() == element_count * component_width` after any
/// resize. Growth preserves the previously written prefix bit-for-bit;
/// shrinking truncates trailing data.
///
/// # Example
///
/// ```rust,ignore
/// let mut buf = AttributeBuffer::new(AttributeKind::Vec3);
/// buf.set_size(100);
/// buf.set_vec3(42, Vec3::new(1.0, 2.0, 3.0));
/// ```
#[derive(Clone, Debug)]
pub struct AttributeBuffer {
    /// Flat component storage.
    storage: Vec<f32>,
    /// Component shape of each element.
    kind: AttributeKind,
    /// Number of elements currently allocated.
    element_count: usize,
    /// Component index at which element 0 starts.
    element_offset: usize,
}

impl AttributeBuffer {
    /// Creates an empty buffer for the given component shape.
    #[must_use]
    pub const fn new(kind: AttributeKind) -> Self {
        Self {
            storage: Vec::new(),
            kind,
            element_count: 0,
            element_offset: 0,
        }
    }

    /// Creates an empty buffer whose element 0 starts `offset` components
    /// into the storage array.
    #[must_use]
    pub const fn with_offset(kind: AttributeKind, offset: usize) -> Self {
        Self {
            storage: Vec::new(),
            kind,
            element_count: 0,
            element_offset: offset,
        }
    }

    /// The component shape of this buffer.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Number of `f32` components per element.
    #[inline]
    #[must_use]
    pub const fn component_width(&self) -> usize {
        self.kind.width()
    }

    /// Number of elements currently allocated.
    #[inline]
    #[must_use]
    pub const fn element_count(&self) -> usize {
        self.element_count
    }

    /// Total component length of the storage array.
    #[inline]
    #[must_use]
    pub fn component_len(&self) -> usize {
        self.storage.len()
    }

    /// Resizes the buffer to hold `elements` elements.
    ///
    /// No-op when the size is unchanged. Growth allocates fresh storage of
    /// the requested size and copies the existing prefix across; shrinking
    /// truncates, discarding trailing data. Resizing is never partial.
    pub fn set_size(&mut self, elements: usize) {
        let new_len = self.element_offset + elements * self.kind.width();
        let current_len = self.storage.len();

        if new_len > current_len {
            self.grow(new_len);
        } else if new_len < current_len {
            self.shrink(new_len);
        }
        self.element_count = elements;
    }

    fn grow(&mut self, component_len: usize) {
        // Vec::resize keeps the existing prefix and zero-fills the tail,
        // matching the fresh-allocate-and-copy contract.
        self.storage.resize(component_len, 0.0);
    }

    fn shrink(&mut self, component_len: usize) {
        self.storage.truncate(component_len);
    }

    /// Writes up to `component_width` values starting at the element's
    /// first component.
    ///
    /// The caller guarantees `index < element_count` and
    /// `values.len() <= component_width`; both are debug-asserted only, to
    /// keep the hot path down to the slice's own bounds check.
    #[inline]
    pub fn set_components(&mut self, index: usize, values: &[f32]) {
        debug_assert!(index < self.element_count, "element index out of range");
        debug_assert!(values.len() <= self.kind.width(), "too many components");
        let start = self.element_offset + index * self.kind.width();
        self.storage[start..start + values.len()].copy_from_slice(values);
    }

    /// Writes a single scalar at the element's first component.
    #[inline]
    pub fn set_scalar(&mut self, index: usize, value: f32) {
        self.set_components(index, &[value]);
    }

    /// Writes a [`Vec3`] at `index`.
    #[inline]
    pub fn set_vec3(&mut self, index: usize, value: Vec3) {
        self.set_components(index, &value.to_array());
    }

    /// Writes four components at `index`.
    #[inline]
    pub fn set_vec4(&mut self, index: usize, value: [f32; 4]) {
        self.set_components(index, &value);
    }

    /// Bulk-copies `source` into the storage starting at component index
    /// `component_index`, growing the buffer first if the copy would run
    /// past the end.
    pub fn copy_from(&mut self, component_index: usize, source: &[f32]) {
        let needed = self.element_offset + component_index + source.len();
        if needed > self.storage.len() {
            let width = self.kind.width();
            // Round up to whole elements so the size invariant holds.
            let elements = (needed - self.element_offset).div_ceil(width);
            self.set_size(elements);
        }
        let start = self.element_offset + component_index;
        self.storage[start..start + source.len()].copy_from_slice(source);
    }

    /// Reads the single component at `component_index`.
    #[inline]
    #[must_use]
    pub fn value_at(&self, component_index: usize) -> f32 {
        self.storage[self.element_offset + component_index]
    }

    /// Returns the `component_width` components of the element at `index`.
    #[inline]
    #[must_use]
    pub fn element(&self, index: usize) -> &[f32] {
        let width = self.kind.width();
        let start = self.element_offset + index * width;
        &self.storage[start..start + width]
    }

    /// Renderer read surface: the whole flat storage array.
    ///
    /// Growth reallocates, so this reference must be re-fetched after any
    /// emitter registration.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &[f32] {
        &self.storage
    }

    /// Raw mutable storage for the simulation's hot loops.
    ///
    /// Callers must stay inside their own element range; the no-overlap
    /// guarantee between emitters is not re-checked here.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut [f32] {
        &mut self.storage
    }

    /// The storage reinterpreted as bytes, for bulk upload APIs.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        cast_slice(&self.storage)
    }
}
