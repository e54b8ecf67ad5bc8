//! Mesh sections: up to 256 shared vertices plus the primitives built from them.

use std::mem::{offset_of, size_of};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::blob::BlobArray;
use crate::error::MeshError;
use crate::filter::{CollisionFilter, Material};
use crate::types::Vec3;

bitflags! {
    /// How a primitive's four vertices are used. Exactly one flag is set.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
    pub struct PrimitiveFlags: u8 {
        /// A single triangle (A,B,C); D repeats C.
        const IS_TRIANGLE = 1 << 0;
        /// Two triangles (A,B,C) and (A,C,D) sharing the diagonal A-C.
        const IS_TRIANGLE_PAIR = 1 << 1;
        /// Two coplanar triangles that form the quad (A,B,C,D).
        const IS_QUAD = 1 << 2;
    }
}

impl PrimitiveFlags {
    #[must_use]
    pub const fn is_set(self, test: Self) -> bool {
        self.bits() & test.bits() != 0
    }

    /// Only triangle pairs are addressed as two polygons; a quad is one.
    #[must_use]
    pub fn num_polygons(self) -> usize {
        if self == Self::IS_TRIANGLE_PAIR {
            2
        } else {
            1
        }
    }

    pub(crate) fn is_valid(self) -> bool {
        self.bits().count_ones() == 1 && Self::all().contains(self)
    }
}

/// Indices of a primitive's vertices in its section's vertex array.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PrimitiveVertexIndices {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
}

impl PrimitiveVertexIndices {
    #[must_use]
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self { a, b, c, d }
    }

    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

/// Stored section header. Each array is addressed relative to its own field.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Section {
    pub(crate) primitive_flags: BlobArray,
    pub(crate) primitive_vertex_indices: BlobArray,
    pub(crate) vertices: BlobArray,
    pub(crate) primitive_filter_indices: BlobArray,
    pub(crate) filters: BlobArray,
    pub(crate) primitive_material_indices: BlobArray,
    pub(crate) materials: BlobArray,
}

impl Section {
    /// Keeps every vertex reference within a byte.
    pub const MAX_NUM_VERTICES: usize = 1 << 8;
    /// Keeps every primitive addressable by the 8 primitive bits of a key.
    pub const MAX_NUM_PRIMITIVES: usize = 1 << 8;
}

/// Read view of one section inside a mesh blob.
#[derive(Copy, Clone, Debug)]
pub struct SectionRef<'a> {
    blob: &'a [u8],
    at: usize,
    header: &'a Section,
}

impl<'a> SectionRef<'a> {
    fn array<T: Pod>(&self, array: &BlobArray, field_offset: usize) -> &'a [T] {
        array.resolve(self.blob, self.at + field_offset)
    }

    #[must_use]
    pub fn num_primitives(&self) -> usize {
        self.header.primitive_flags.len()
    }

    #[must_use]
    pub fn primitive_flags(&self) -> &'a [PrimitiveFlags] {
        self.array(&self.header.primitive_flags, offset_of!(Section, primitive_flags))
    }

    #[must_use]
    pub fn primitive_vertex_indices(&self) -> &'a [PrimitiveVertexIndices] {
        self.array(
            &self.header.primitive_vertex_indices,
            offset_of!(Section, primitive_vertex_indices),
        )
    }

    #[must_use]
    pub fn vertices(&self) -> &'a [Vec3] {
        self.array(&self.header.vertices, offset_of!(Section, vertices))
    }

    #[must_use]
    pub fn primitive_filter_indices(&self) -> &'a [u16] {
        self.array(
            &self.header.primitive_filter_indices,
            offset_of!(Section, primitive_filter_indices),
        )
    }

    #[must_use]
    pub fn filters(&self) -> &'a [CollisionFilter] {
        self.array(&self.header.filters, offset_of!(Section, filters))
    }

    #[must_use]
    pub fn primitive_material_indices(&self) -> &'a [u16] {
        self.array(
            &self.header.primitive_material_indices,
            offset_of!(Section, primitive_material_indices),
        )
    }

    #[must_use]
    pub fn materials(&self) -> &'a [Material] {
        self.array(&self.header.materials, offset_of!(Section, materials))
    }

    /// The four vertices of a primitive in A,B,C,D order.
    #[must_use]
    pub fn primitive_vertices(&self, primitive_index: usize) -> [Vec3; 4] {
        let vertices = self.vertices();
        self.primitive_vertex_indices()[primitive_index]
            .to_array()
            .map(|i| vertices[usize::from(i)])
    }

    #[must_use]
    pub fn primitive_filter(&self, primitive_index: usize) -> CollisionFilter {
        let index = self.primitive_filter_indices()[primitive_index];
        self.filters()[usize::from(index)]
    }

    #[must_use]
    pub fn primitive_material(&self, primitive_index: usize) -> Material {
        let index = self.primitive_material_indices()[primitive_index];
        self.materials()[usize::from(index)]
    }
}

/// Read view of the section header array.
#[derive(Copy, Clone, Debug)]
pub struct Sections<'a> {
    blob: &'a [u8],
    at: usize,
    headers: &'a [Section],
}

impl<'a> Sections<'a> {
    /// `at` is the byte position of the first header in `blob`.
    pub(crate) fn new(blob: &'a [u8], at: usize, headers: &'a [Section]) -> Self {
        Self { blob, at, headers }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Panics if `index` is out of range.
    #[must_use]
    pub fn section(&self, index: usize) -> SectionRef<'a> {
        SectionRef {
            blob: self.blob,
            at: self.at + index * size_of::<Section>(),
            header: &self.headers[index],
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = SectionRef<'a>> + '_ {
        (0..self.len()).map(|i| self.section(i))
    }
}

/// Geometry for one section as handed over by the mesh builder, before layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StagedSection {
    pub vertices: Vec<Vec3>,
    pub primitives: Vec<PrimitiveVertexIndices>,
    pub primitive_flags: Vec<PrimitiveFlags>,
}

impl StagedSection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vertices(vertices: Vec<Vec3>) -> Self {
        Self {
            vertices,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn num_primitives(&self) -> usize {
        self.primitives.len()
    }

    pub fn push_primitive(
        &mut self,
        indices: PrimitiveVertexIndices,
        flags: PrimitiveFlags,
    ) -> usize {
        self.primitives.push(indices);
        self.primitive_flags.push(flags);
        self.primitives.len() - 1
    }

    pub fn push_triangle(&mut self, a: u8, b: u8, c: u8) -> usize {
        self.push_primitive(PrimitiveVertexIndices::new(a, b, c, c), PrimitiveFlags::IS_TRIANGLE)
    }

    pub fn push_triangle_pair(&mut self, a: u8, b: u8, c: u8, d: u8) -> usize {
        self.push_primitive(
            PrimitiveVertexIndices::new(a, b, c, d),
            PrimitiveFlags::IS_TRIANGLE_PAIR,
        )
    }

    pub fn push_quad(&mut self, a: u8, b: u8, c: u8, d: u8) -> usize {
        self.push_primitive(PrimitiveVertexIndices::new(a, b, c, d), PrimitiveFlags::IS_QUAD)
    }

    /// Checks the capacity and reference rules the layout relies on.
    /// `section` only labels the error.
    ///
    /// # Errors
    ///
    /// Returns the first rule the section breaks.
    pub fn validate(&self, section: usize) -> Result<(), MeshError> {
        if self.vertices.len() > Section::MAX_NUM_VERTICES {
            return Err(MeshError::TooManyVertices {
                section,
                count: self.vertices.len(),
                max: Section::MAX_NUM_VERTICES,
            });
        }
        if self.primitives.len() > Section::MAX_NUM_PRIMITIVES {
            return Err(MeshError::TooManyPrimitives {
                section,
                count: self.primitives.len(),
                max: Section::MAX_NUM_PRIMITIVES,
            });
        }
        if self.primitives.len() != self.primitive_flags.len() {
            return Err(MeshError::MismatchedPrimitiveArrays {
                section,
                primitives: self.primitives.len(),
                flags: self.primitive_flags.len(),
            });
        }
        let primitives = self.primitives.iter().zip(&self.primitive_flags);
        for (primitive, (indices, flags)) in primitives.enumerate() {
            if !flags.is_valid() {
                return Err(MeshError::InvalidPrimitiveFlags {
                    section,
                    primitive,
                    bits: flags.bits(),
                });
            }
            if let Some(&index) = indices
                .to_array()
                .iter()
                .find(|&&i| usize::from(i) >= self.vertices.len())
            {
                return Err(MeshError::VertexIndexOutOfRange {
                    section,
                    primitive,
                    index,
                    vertex_count: self.vertices.len(),
                });
            }
        }
        Ok(())
    }
}
