//! Blob layout: size planning, writing and load-time verification.
//!
//! ```text
//! mesh header                               16-byte block
//! bvh nodes                                 16-byte aligned
//! section headers                           rounded to 16 bytes
//! per section, in order, each 4-byte aligned:
//!   flags | vertex indices | vertices | filter indices | filters
//!   | material indices | materials
//! ```
//!
//! [`calculate_mesh_data_size`] and [`init`] walk the staged sections in the
//! same order and must stay in step.

use std::mem::{align_of, offset_of, size_of};
use std::ops::Range;

use bytemuck::Pod;

use crate::blob::{next_multiple_of, BlobArray, ARRAY_ALIGNMENT, BLOCK_ALIGNMENT};
use crate::bvh::BvhNode;
use crate::error::MeshError;
use crate::filter::{CollisionFilter, Material};
use crate::key::MAX_NUM_SECTIONS;
use crate::mesh::MeshHeader;
use crate::section::{PrimitiveFlags, PrimitiveVertexIndices, Section, StagedSection};
use crate::types::Vec3;

/// Bytes reserved for the mesh header ahead of the data.
pub const MESH_HEADER_SIZE: usize = next_multiple_of(size_of::<MeshHeader>(), BLOCK_ALIGNMENT);

fn section_data_size(section: &StagedSection) -> usize {
    let num_primitives = section.num_primitives();
    next_multiple_of(num_primitives * size_of::<PrimitiveFlags>(), ARRAY_ALIGNMENT)
        + next_multiple_of(num_primitives * size_of::<PrimitiveVertexIndices>(), ARRAY_ALIGNMENT)
        + next_multiple_of(section.vertices.len() * size_of::<Vec3>(), ARRAY_ALIGNMENT)
        + next_multiple_of(num_primitives * size_of::<u16>(), ARRAY_ALIGNMENT)
        + next_multiple_of(size_of::<CollisionFilter>(), ARRAY_ALIGNMENT)
        + next_multiple_of(num_primitives * size_of::<u16>(), ARRAY_ALIGNMENT)
        + next_multiple_of(size_of::<Material>(), ARRAY_ALIGNMENT)
}

/// Bytes needed for everything after the mesh header.
#[must_use]
pub fn calculate_mesh_data_size(node_count: usize, sections: &[StagedSection]) -> usize {
    let section_data: usize = sections.iter().map(section_data_size).sum();
    let section_headers = next_multiple_of(sections.len() * size_of::<Section>(), BLOCK_ALIGNMENT);
    let tree = node_count * size_of::<BvhNode>();
    section_data + section_headers + tree
}

/// Bytes needed for the whole blob, header included.
#[must_use]
pub fn calculate_mesh_size(node_count: usize, sections: &[StagedSection]) -> usize {
    MESH_HEADER_SIZE + calculate_mesh_data_size(node_count, sections)
}

struct BlobWriter<'a> {
    blob: &'a mut [u8],
    end: usize,
}

impl BlobWriter<'_> {
    fn put<T: Pod>(&mut self, at: usize, value: &T) {
        self.blob[at..at + size_of::<T>()].copy_from_slice(bytemuck::bytes_of(value));
    }

    /// Claims `len` bytes at the current end, zeroing the alignment padding.
    fn claim(&mut self, len: usize, alignment: usize) -> usize {
        let start = self.end;
        self.end = start + next_multiple_of(len, alignment);
        self.blob[start + len..self.end].fill(0);
        start
    }

    fn write_array<T: Pod>(&mut self, field_at: usize, items: &[T], alignment: usize) -> BlobArray {
        let bytes: &[u8] = bytemuck::cast_slice(items);
        let start = self.claim(bytes.len(), alignment);
        self.blob[start..start + bytes.len()].copy_from_slice(bytes);
        BlobArray::new(field_at, start, items.len())
    }

    fn write_repeated<T: Pod>(
        &mut self,
        field_at: usize,
        value: T,
        count: usize,
        alignment: usize,
    ) -> BlobArray {
        let start = self.claim(count * size_of::<T>(), alignment);
        for i in 0..count {
            self.put(start + i * size_of::<T>(), &value);
        }
        BlobArray::new(field_at, start, count)
    }
}

/// Writes a complete mesh into `blob` and returns the number of bytes used.
///
/// `blob` must hold at least [`calculate_mesh_size`] bytes. Every section
/// gets a single-entry filter and material table that all of its primitives
/// index.
pub fn init(
    blob: &mut [u8],
    nodes: &[BvhNode],
    sections: &[StagedSection],
    filter: CollisionFilter,
    material: Material,
) -> usize {
    let planned = calculate_mesh_size(nodes.len(), sections);
    debug_assert!(blob.len() >= planned, "blob holds {} bytes, layout needs {planned}", blob.len());

    let mut writer = BlobWriter { blob, end: 0 };
    writer.claim(size_of::<MeshHeader>(), BLOCK_ALIGNMENT);

    let bvh_nodes = writer.write_array(offset_of!(MeshHeader, bvh_nodes), nodes, BLOCK_ALIGNMENT);
    let sections_at = writer.claim(sections.len() * size_of::<Section>(), BLOCK_ALIGNMENT);
    let header = MeshHeader {
        bvh_nodes,
        sections: BlobArray::new(offset_of!(MeshHeader, sections), sections_at, sections.len()),
    };
    writer.put(0, &header);

    for (index, staged) in sections.iter().enumerate() {
        let at = sections_at + index * size_of::<Section>();
        let num_primitives = staged.num_primitives();
        debug_assert_eq!(num_primitives, staged.primitive_flags.len());

        let primitive_flags = writer.write_array(
            at + offset_of!(Section, primitive_flags),
            &staged.primitive_flags,
            ARRAY_ALIGNMENT,
        );
        let primitive_vertex_indices = writer.write_array(
            at + offset_of!(Section, primitive_vertex_indices),
            &staged.primitives,
            ARRAY_ALIGNMENT,
        );
        let vertices = writer.write_array(
            at + offset_of!(Section, vertices),
            &staged.vertices,
            ARRAY_ALIGNMENT,
        );

        let primitive_filter_indices = writer.write_repeated(
            at + offset_of!(Section, primitive_filter_indices),
            0u16,
            num_primitives,
            ARRAY_ALIGNMENT,
        );
        let filters =
            writer.write_array(at + offset_of!(Section, filters), &[filter], ARRAY_ALIGNMENT);

        let primitive_material_indices = writer.write_repeated(
            at + offset_of!(Section, primitive_material_indices),
            0u16,
            num_primitives,
            ARRAY_ALIGNMENT,
        );
        let materials =
            writer.write_array(at + offset_of!(Section, materials), &[material], ARRAY_ALIGNMENT);

        writer.put(
            at,
            &Section {
                primitive_flags,
                primitive_vertex_indices,
                vertices,
                primitive_filter_indices,
                filters,
                primitive_material_indices,
                materials,
            },
        );
    }

    debug_assert_eq!(writer.end, planned, "layout wrote a different size than it planned");
    writer.end
}

fn checked_range<T>(
    array: &BlobArray,
    field_at: usize,
    blob_len: usize,
    what: &'static str,
) -> Result<Range<usize>, MeshError> {
    let range = array
        .checked_range::<T>(field_at, blob_len)
        .ok_or(MeshError::ArrayOutOfBounds { what })?;
    if range.start % align_of::<T>() != 0 {
        return Err(MeshError::MisalignedArray { what });
    }
    Ok(range)
}

fn checked_slice<'a, T: Pod>(
    blob: &'a [u8],
    array: &BlobArray,
    field_at: usize,
    what: &'static str,
) -> Result<&'a [T], MeshError> {
    let range = checked_range::<T>(array, field_at, blob.len(), what)?;
    bytemuck::try_cast_slice(&blob[range]).map_err(|_| MeshError::MisalignedArray { what })
}

/// Like [`checked_slice`] for the arrays that must start on a block boundary.
fn checked_block_slice<'a, T: Pod>(
    blob: &'a [u8],
    array: &BlobArray,
    field_at: usize,
    what: &'static str,
) -> Result<&'a [T], MeshError> {
    if array.data_start(field_at) % BLOCK_ALIGNMENT != 0 {
        return Err(MeshError::MisalignedArray { what });
    }
    checked_slice(blob, array, field_at, what)
}

fn check_indices(indices: &[u16], table_len: usize, what: &'static str) -> Result<(), MeshError> {
    if table_len == 0 || indices.iter().any(|&i| usize::from(i) >= table_len) {
        return Err(MeshError::IndexOutOfRange { what });
    }
    Ok(())
}

/// Verifies that every array reference in a 16-byte aligned blob stays in
/// bounds and every stored index resolves, so the unchecked query path can
/// be used on it.
///
/// # Errors
///
/// Returns the first malformed reference or index found.
pub fn validate(blob: &[u8]) -> Result<(), MeshError> {
    if blob.len() < MESH_HEADER_SIZE {
        return Err(MeshError::BlobTooSmall {
            expected: MESH_HEADER_SIZE,
            actual: blob.len(),
        });
    }
    let header: MeshHeader = bytemuck::pod_read_unaligned(&blob[..size_of::<MeshHeader>()]);

    let nodes_field = offset_of!(MeshHeader, bvh_nodes);
    checked_block_slice::<BvhNode>(blob, &header.bvh_nodes, nodes_field, "bvh node array")?;
    let sections_field = offset_of!(MeshHeader, sections);
    let headers =
        checked_block_slice::<Section>(blob, &header.sections, sections_field, "section array")?;
    if headers.is_empty() {
        return Err(MeshError::NoSections);
    }
    if headers.len() > MAX_NUM_SECTIONS {
        return Err(MeshError::TooManySections {
            count: headers.len(),
            max: MAX_NUM_SECTIONS,
        });
    }

    let sections_at = header.sections.data_start(sections_field);
    for (index, section) in headers.iter().enumerate() {
        let at = sections_at + index * size_of::<Section>();
        let flags: &[PrimitiveFlags] = checked_slice(
            blob,
            &section.primitive_flags,
            at + offset_of!(Section, primitive_flags),
            "primitive flags",
        )?;
        let primitives: &[PrimitiveVertexIndices] = checked_slice(
            blob,
            &section.primitive_vertex_indices,
            at + offset_of!(Section, primitive_vertex_indices),
            "primitive vertex indices",
        )?;
        let vertices: &[Vec3] =
            checked_slice(blob, &section.vertices, at + offset_of!(Section, vertices), "vertices")?;
        let filter_indices: &[u16] = checked_slice(
            blob,
            &section.primitive_filter_indices,
            at + offset_of!(Section, primitive_filter_indices),
            "primitive filter indices",
        )?;
        let filters: &[CollisionFilter] =
            checked_slice(blob, &section.filters, at + offset_of!(Section, filters), "filters")?;
        let material_indices: &[u16] = checked_slice(
            blob,
            &section.primitive_material_indices,
            at + offset_of!(Section, primitive_material_indices),
            "primitive material indices",
        )?;
        let materials: &[Material] = checked_slice(
            blob,
            &section.materials,
            at + offset_of!(Section, materials),
            "materials",
        )?;

        if [primitives.len(), filter_indices.len(), material_indices.len()]
            .iter()
            .any(|&len| len != flags.len())
        {
            return Err(MeshError::MismatchedPrimitiveArrays {
                section: index,
                primitives: primitives.len(),
                flags: flags.len(),
            });
        }
        if vertices.len() > Section::MAX_NUM_VERTICES {
            return Err(MeshError::TooManyVertices {
                section: index,
                count: vertices.len(),
                max: Section::MAX_NUM_VERTICES,
            });
        }
        if flags.len() > Section::MAX_NUM_PRIMITIVES {
            return Err(MeshError::TooManyPrimitives {
                section: index,
                count: flags.len(),
                max: Section::MAX_NUM_PRIMITIVES,
            });
        }
        for (primitive, (indices, primitive_flags)) in primitives.iter().zip(flags).enumerate() {
            if !primitive_flags.is_valid() {
                return Err(MeshError::InvalidPrimitiveFlags {
                    section: index,
                    primitive,
                    bits: primitive_flags.bits(),
                });
            }
            let out_of_range =
                indices.to_array().into_iter().find(|&i| usize::from(i) >= vertices.len());
            if let Some(bad) = out_of_range {
                return Err(MeshError::VertexIndexOutOfRange {
                    section: index,
                    primitive,
                    index: bad,
                    vertex_count: vertices.len(),
                });
            }
        }
        check_indices(filter_indices, filters.len(), "primitive filter indices")?;
        check_indices(material_indices, materials.len(), "primitive material indices")?;
    }
    Ok(())
}
