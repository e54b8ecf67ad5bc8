//! The collision mesh: a header over a relocatable blob of BVH nodes and
//! sections, and the per-primitive queries the collision pipeline runs on it.
//!
//! Queries take keys produced by this mesh ([`Mesh::get_first_polygon`],
//! [`Mesh::get_next_polygon`], or the BVH leaves) and do no validation of
//! their own beyond debug assertions. A blob is checked once, when it is
//! built or loaded through [`MeshData`].

use std::iter::FusedIterator;
use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::blob::{BlobArray, BlobStorage};
use crate::bvh::{BoundingVolumeHierarchy, BvhNode};
use crate::error::MeshError;
use crate::filter::{CollisionFilter, Material};
use crate::key::{
    self, decode_mesh_key, decode_primitive_key, encode_mesh_key, INVALID_MESH_KEY,
    MAX_NUM_SECTIONS,
};
use crate::layout;
use crate::polygon::PolygonCollider;
use crate::section::{PrimitiveFlags, SectionRef, Sections, StagedSection};
use crate::settings::MeshSettings;
use crate::types::Vec3;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct MeshHeader {
    pub(crate) bvh_nodes: BlobArray,
    pub(crate) sections: BlobArray,
}

/// A stored primitive: four vertices interpreted through `flags`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primitive {
    pub vertices: [Vec3; 4],
    pub flags: PrimitiveFlags,
    pub filter: CollisionFilter,
}

impl Primitive {
    fn read(section: &SectionRef<'_>, primitive_index: usize) -> Self {
        Self {
            vertices: section.primitive_vertices(primitive_index),
            flags: section.primitive_flags()[primitive_index],
            filter: section.primitive_filter(primitive_index),
        }
    }
}

/// Borrowed view of a mesh blob.
#[derive(Copy, Clone, Debug)]
pub struct Mesh<'a> {
    blob: &'a [u8],
}

impl<'a> Mesh<'a> {
    fn header(&self) -> &'a MeshHeader {
        bytemuck::from_bytes(&self.blob[..size_of::<MeshHeader>()])
    }

    #[must_use]
    pub fn bounding_volume_hierarchy(&self) -> BoundingVolumeHierarchy<'a> {
        let nodes = self
            .header()
            .bvh_nodes
            .resolve::<BvhNode>(self.blob, offset_of!(MeshHeader, bvh_nodes));
        BoundingVolumeHierarchy::new(nodes)
    }

    #[must_use]
    pub fn sections(&self) -> Sections<'a> {
        let field_at = offset_of!(MeshHeader, sections);
        let array = &self.header().sections;
        Sections::new(self.blob, array.data_start(field_at), array.resolve(self.blob, field_at))
    }

    /// Bits needed to store a key to any polygon of this mesh.
    #[must_use]
    pub fn num_collider_key_bits(&self) -> u32 {
        key::num_collider_key_bits(self.header().sections.len())
    }

    fn section_for(&self, primitive_key: u32) -> (SectionRef<'a>, usize) {
        let (section_index, primitive_index) = decode_primitive_key(primitive_key);
        let section = self.sections().section(section_index);
        debug_assert!(
            primitive_index < section.num_primitives(),
            "primitive key {primitive_key:#x} is not part of this mesh"
        );
        (section, primitive_index)
    }

    #[must_use]
    pub fn get_primitive_flags(&self, primitive_key: u32) -> PrimitiveFlags {
        let (section, primitive_index) = self.section_for(primitive_key);
        section.primitive_flags()[primitive_index]
    }

    #[must_use]
    pub fn get_primitive(&self, primitive_key: u32) -> Primitive {
        let (section, primitive_index) = self.section_for(primitive_key);
        Primitive::read(&section, primitive_index)
    }

    #[must_use]
    pub fn get_primitive_with_material(&self, primitive_key: u32) -> (Primitive, Material) {
        let (section, primitive_index) = self.section_for(primitive_key);
        (
            Primitive::read(&section, primitive_index),
            section.primitive_material(primitive_index),
        )
    }

    /// Fills `polygon` with the polygon behind `mesh_key`. Returns `false`,
    /// leaving `polygon` untouched, if `filter` cannot collide with it.
    pub fn get_polygon(
        &self,
        mesh_key: u32,
        filter: &CollisionFilter,
        polygon: &mut PolygonCollider,
    ) -> bool {
        let (primitive_key, polygon_index) = decode_mesh_key(mesh_key);
        let (section, primitive_index) = self.section_for(primitive_key);

        let primitive_filter = section.primitive_filter(primitive_index);
        if !CollisionFilter::is_collision_enabled(filter, &primitive_filter) {
            return false;
        }
        fill_polygon(&section, primitive_index, polygon_index, polygon);
        true
    }

    /// Starts a walk over every polygon. Returns the first key, or `None` if
    /// the mesh has no primitives.
    pub fn get_first_polygon(&self, polygon: &mut PolygonCollider) -> Option<u32> {
        let sections = self.sections();
        let section_index =
            (0..sections.len()).find(|&i| sections.section(i).num_primitives() > 0)?;
        fill_polygon(&sections.section(section_index), 0, 0, polygon);
        Some(encode_mesh_key(section_index, 0, 0))
    }

    /// Advances the walk past `previous_key`: the second half of a triangle
    /// pair, then the next primitive, then the next non-empty section.
    /// Returns `None` once every polygon has been visited.
    pub fn get_next_polygon(
        &self,
        previous_key: u32,
        polygon: &mut PolygonCollider,
    ) -> Option<u32> {
        debug_assert_ne!(previous_key, INVALID_MESH_KEY, "iteration is already exhausted");
        let (primitive_key, mut polygon_index) = decode_mesh_key(previous_key);
        let (mut section_index, mut primitive_index) = decode_primitive_key(primitive_key);

        let sections = self.sections();
        let section = sections.section(section_index);
        let flags = section.primitive_flags()[primitive_index];
        if polygon_index == 0 && flags.is_set(PrimitiveFlags::IS_TRIANGLE_PAIR) {
            polygon_index = 1;
        } else {
            polygon_index = 0;
            primitive_index += 1;
            if primitive_index >= section.num_primitives() {
                primitive_index = 0;
                section_index += 1;
                while section_index < sections.len()
                    && sections.section(section_index).num_primitives() == 0
                {
                    section_index += 1;
                }
            }
        }

        if section_index >= sections.len() {
            return None;
        }
        fill_polygon(&sections.section(section_index), primitive_index, polygon_index, polygon);
        Some(encode_mesh_key(section_index, primitive_index, polygon_index))
    }

    /// Iterator over `(mesh key, polygon)` driven by the key protocol above.
    #[must_use]
    pub fn polygons(&self) -> Polygons<'a> {
        Polygons {
            mesh: *self,
            cursor: Cursor::Start,
        }
    }
}

fn fill_polygon(
    section: &SectionRef<'_>,
    primitive_index: usize,
    polygon_index: usize,
    polygon: &mut PolygonCollider,
) {
    let [a, b, c, d] = section.primitive_vertices(primitive_index);
    if section.primitive_flags()[primitive_index].is_set(PrimitiveFlags::IS_QUAD) {
        polygon.set_as_quad(a, b, c, d);
    } else if polygon_index == 0 {
        polygon.set_as_triangle(a, b, c);
    } else {
        polygon.set_as_triangle(a, c, d);
    }
    polygon.filter = section.primitive_filter(primitive_index);
    polygon.material = section.primitive_material(primitive_index);
}

#[derive(Copy, Clone, Debug)]
enum Cursor {
    Start,
    After(u32),
    Done,
}

#[derive(Clone, Debug)]
pub struct Polygons<'a> {
    mesh: Mesh<'a>,
    cursor: Cursor,
}

impl Iterator for Polygons<'_> {
    type Item = (u32, PolygonCollider);

    fn next(&mut self) -> Option<Self::Item> {
        let mut polygon = PolygonCollider::new();
        let key = match self.cursor {
            Cursor::Start => self.mesh.get_first_polygon(&mut polygon),
            Cursor::After(previous) => self.mesh.get_next_polygon(previous, &mut polygon),
            Cursor::Done => None,
        };
        self.cursor = key.map_or(Cursor::Done, Cursor::After);
        key.map(|key| (key, polygon))
    }
}

impl FusedIterator for Polygons<'_> {}

/// An owned, validated mesh blob.
#[derive(Clone, Debug)]
pub struct MeshData {
    storage: BlobStorage,
}

impl MeshData {
    /// Lays out staged geometry and its BVH into a single blob.
    ///
    /// # Errors
    ///
    /// Fails if there are no sections, too many to key, or a section breaks
    /// [`StagedSection::validate`].
    pub fn build(
        nodes: &[BvhNode],
        sections: &[StagedSection],
        settings: &MeshSettings,
    ) -> Result<Self, MeshError> {
        if sections.is_empty() {
            return Err(MeshError::NoSections);
        }
        if sections.len() > MAX_NUM_SECTIONS {
            return Err(MeshError::TooManySections {
                count: sections.len(),
                max: MAX_NUM_SECTIONS,
            });
        }
        for (index, section) in sections.iter().enumerate() {
            section.validate(index)?;
        }

        let size = layout::calculate_mesh_size(nodes.len(), sections);
        tracing::debug!(
            sections = sections.len(),
            nodes = nodes.len(),
            bytes = size,
            "building collision mesh"
        );
        let mut storage = BlobStorage::zeroed(size);
        let written = layout::init(
            storage.as_bytes_mut(),
            nodes,
            sections,
            settings.filter,
            settings.material,
        );
        debug_assert_eq!(written, size);
        Ok(Self { storage })
    }

    /// Copies a blob produced by [`MeshData::as_bytes`], possibly from another
    /// process or file, into aligned storage and verifies it.
    ///
    /// # Errors
    ///
    /// Fails if any array reference or stored index in the blob is invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MeshError> {
        let storage = BlobStorage::from_bytes(bytes);
        if let Err(err) = layout::validate(storage.as_bytes()) {
            tracing::warn!(%err, bytes = bytes.len(), "rejected collision mesh blob");
            return Err(err);
        }
        Ok(Self { storage })
    }

    #[must_use]
    pub fn as_mesh(&self) -> Mesh<'_> {
        Mesh {
            blob: self.storage.as_bytes(),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.storage.as_bytes()
    }

    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.storage.len()
    }
}
