#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Collision Mesh
//!
//! Compact storage for polygonal collision geometry: triangles, triangle
//! pairs and quads grouped into sections of at most 256 vertices, with the
//! mesh's bounding volume hierarchy embedded in the same blob.
//!
//! ## Key Components
//!
//! -   **Blob layout:** a mesh is one contiguous, 16-byte aligned byte blob.
//!     Every array inside it is a [`BlobArray`] addressed relative to its own
//!     position, so the blob can be copied, written to disk or mapped without
//!     fixing anything up. [`layout`] plans the size and writes the blob.
//! -   **Keys:** primitives and polygons are addressed by packed integers, see
//!     [`key`]. A mesh key is `section << 9 | primitive << 1 | polygon`.
//! -   **Queries:** [`Mesh`] resolves keys into [`Primitive`]s and
//!     [`PolygonCollider`]s and walks all polygons with a stateless
//!     first/next protocol.
//!
//! ## Usage
//!
//! ```rust
//! use collision_mesh::{MeshData, MeshSettings, PolygonCollider, StagedSection, Vec3};
//!
//! let mut section = StagedSection::with_vertices(vec![
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 1.0),
//!     Vec3::new(0.0, 0.0, 1.0),
//! ]);
//! section.push_triangle_pair(0, 1, 2, 3);
//!
//! let data = MeshData::build(&[], &[section], &MeshSettings::default())?;
//! let mesh = data.as_mesh();
//!
//! let mut polygon = PolygonCollider::new();
//! let mut key = mesh.get_first_polygon(&mut polygon);
//! let mut count = 0;
//! while let Some(k) = key {
//!     count += 1;
//!     key = mesh.get_next_polygon(k, &mut polygon);
//! }
//! assert_eq!(count, 2);
//! # Ok::<(), collision_mesh::MeshError>(())
//! ```

pub mod blob;
pub mod bvh;
pub mod error;
pub mod filter;
pub mod key;
pub mod layout;
pub mod mesh;
pub mod polygon;
pub mod section;
pub mod settings;
pub mod types;

pub use blob::BlobArray;
pub use bvh::{BoundingVolumeHierarchy, BvhNode, FourTransposedAabbs};
pub use error::MeshError;
pub use filter::{CollisionFilter, CombinePolicy, Material, MaterialFlags};
pub use key::ColliderKey;
pub use mesh::{Mesh, MeshData, Polygons, Primitive};
pub use polygon::PolygonCollider;
pub use section::{
    PrimitiveFlags, PrimitiveVertexIndices, Section, SectionRef, Sections, StagedSection,
};
pub use settings::MeshSettings;
pub use types::Vec3;
