//! Self-relative array references and the aligned byte storage behind them.
//!
//! A [`BlobArray`] never stores an address. Its `offset` is measured from the
//! byte position of the `BlobArray` itself, so a blob full of them can be
//! copied or mapped anywhere and still resolve without a fix-up pass.

use std::fmt;
use std::mem::size_of;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};

/// Alignment of every per-section array.
pub const ARRAY_ALIGNMENT: usize = 4;

/// Alignment of the node array and the section header array.
pub const BLOCK_ALIGNMENT: usize = 16;

#[must_use]
pub const fn next_multiple_of(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct BlobArray {
    offset: i32,
    length: i32,
}

impl BlobArray {
    /// `field_at` is the byte position of this reference within the blob,
    /// `data_at` the position of its first element.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(crate) fn new(field_at: usize, data_at: usize, length: usize) -> Self {
        debug_assert!(i32::try_from(length).is_ok(), "array length {length} overflows i32");
        let offset = data_at as isize - field_at as isize;
        debug_assert!(i32::try_from(offset).is_ok(), "array offset {offset} overflows i32");
        Self {
            offset: offset as i32,
            length: length as i32,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> i32 {
        self.offset
    }

    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn len(&self) -> usize {
        self.length as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub(crate) fn data_start(&self, field_at: usize) -> usize {
        field_at.wrapping_add_signed(self.offset as isize)
    }

    /// Byte range of the elements, or `None` if the reference is malformed
    /// or does not fit in `blob_len` bytes.
    pub(crate) fn checked_range<T>(
        &self,
        field_at: usize,
        blob_len: usize,
    ) -> Option<Range<usize>> {
        if self.length < 0 {
            return None;
        }
        let start = field_at.checked_add_signed(self.offset as isize)?;
        let end = start.checked_add(self.len().checked_mul(size_of::<T>())?)?;
        (end <= blob_len).then_some(start..end)
    }

    /// Views the elements as a typed slice. The reference must belong to
    /// `blob` and sit at `field_at`.
    pub(crate) fn resolve<'a, T: Pod>(&self, blob: &'a [u8], field_at: usize) -> &'a [T] {
        let start = self.data_start(field_at);
        let end = start + self.len() * size_of::<T>();
        bytemuck::cast_slice(&blob[start..end])
    }
}

#[repr(C, align(16))]
#[derive(Copy, Clone)]
struct Block([u8; BLOCK_ALIGNMENT]);

// SAFETY: a 16-byte array with 16-byte alignment has no padding and every bit
// pattern is valid.
unsafe impl Zeroable for Block {}
unsafe impl Pod for Block {}

/// Zero-initialised, 16-byte aligned byte storage for a single blob.
#[derive(Clone)]
pub struct BlobStorage {
    blocks: Vec<Block>,
    len: usize,
}

impl BlobStorage {
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        let blocks = vec![Block::zeroed(); len.div_ceil(BLOCK_ALIGNMENT)];
        Self { blocks, len }
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut storage = Self::zeroed(bytes.len());
        storage.as_bytes_mut().copy_from_slice(bytes);
        storage
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<Block, u8>(&self.blocks)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<Block, u8>(&mut self.blocks)[..self.len]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for BlobStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStorage").field("len", &self.len).finish()
    }
}
