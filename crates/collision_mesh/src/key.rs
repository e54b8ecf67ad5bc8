//! Packed integer addressing of primitives and polygons.
//!
//! ```text
//! primitive key: [ section index | primitive index (8) ]
//! mesh key:      [ section index | primitive index (8) | polygon (1) ]
//! ```
//!
//! The decoders do not check a key against any particular mesh; only keys
//! handed out by that mesh may be passed back to it.

/// Bits addressing a primitive within a section.
pub const PRIMITIVE_INDEX_BITS: u32 = 8;

/// Bits selecting one half of a triangle pair.
pub const POLYGON_INDEX_BITS: u32 = 1;

/// Highest section count a 32-bit mesh key can address.
pub const MAX_NUM_SECTIONS: usize = 1 << (u32::BITS - PRIMITIVE_INDEX_BITS - POLYGON_INDEX_BITS);

/// Returned alongside `None` once iteration runs out of polygons.
pub const INVALID_MESH_KEY: u32 = u32::MAX;

const PRIMITIVE_INDEX_MASK: u32 = (1 << PRIMITIVE_INDEX_BITS) - 1;

#[must_use]
pub const fn decode_primitive_key(primitive_key: u32) -> (usize, usize) {
    (
        (primitive_key >> PRIMITIVE_INDEX_BITS) as usize,
        (primitive_key & PRIMITIVE_INDEX_MASK) as usize,
    )
}

#[must_use]
pub const fn decode_mesh_key(mesh_key: u32) -> (u32, usize) {
    (mesh_key >> POLYGON_INDEX_BITS, (mesh_key & 1) as usize)
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn encode_primitive_key(section_index: usize, primitive_index: usize) -> u32 {
    ((section_index as u32) << PRIMITIVE_INDEX_BITS) | primitive_index as u32
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn encode_mesh_key(
    section_index: usize,
    primitive_index: usize,
    polygon_index: usize,
) -> u32 {
    let primitive_key = encode_primitive_key(section_index, primitive_index);
    (primitive_key << POLYGON_INDEX_BITS) | polygon_index as u32
}

/// Bits needed to address every polygon of a mesh with `num_sections` sections.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn num_collider_key_bits(num_sections: usize) -> u32 {
    let highest_section = (num_sections as u32).saturating_sub(1);
    (u32::BITS - highest_section.leading_zeros()) + PRIMITIVE_INDEX_BITS + POLYGON_INDEX_BITS
}

/// A path through a collider hierarchy packed into one integer, root first
/// in the high bits. Unused low bits are all ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColliderKey(u32);

impl ColliderKey {
    pub const EMPTY: Self = Self(u32::MAX);

    #[must_use]
    pub fn new(num_sub_key_bits: u32, sub_key: u32) -> Self {
        let mut key = Self::EMPTY;
        key.push_sub_key(num_sub_key_bits, sub_key);
        key
    }

    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == u32::MAX
    }

    /// Prepends `sub_key`, which must fit in `num_sub_key_bits` bits.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_sub_key(&mut self, num_sub_key_bits: u32, sub_key: u32) {
        let parent = (u64::from(sub_key) << (u32::BITS - num_sub_key_bits)) as u32;
        let child = if num_sub_key_bits >= u32::BITS {
            0
        } else {
            self.0 >> num_sub_key_bits
        };
        self.0 = parent | child;
    }

    /// Removes and returns the leading sub key, or `None` for an empty key.
    #[allow(clippy::cast_possible_truncation)]
    pub fn pop_sub_key(&mut self, num_sub_key_bits: u32) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let sub_key = (u64::from(self.0) >> (u32::BITS - num_sub_key_bits)) as u32;
        self.0 = ((u64::from(self.0) + 1) << num_sub_key_bits).wrapping_sub(1) as u32;
        Some(sub_key)
    }
}

impl Default for ColliderKey {
    fn default() -> Self {
        Self::EMPTY
    }
}
