//! Bounding volume hierarchy node records.
//!
//! Building and querying the tree lives elsewhere; the mesh only stores the
//! node array verbatim and hands out a read accessor over it.

use bytemuck::{Pod, Zeroable};

/// Four axis-aligned boxes stored lane-wise, one lane per child.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FourTransposedAabbs {
    pub lx: [f32; 4],
    pub hx: [f32; 4],
    pub ly: [f32; 4],
    pub hy: [f32; 4],
    pub lz: [f32; 4],
    pub hz: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    pub bounds: FourTransposedAabbs,
    /// Child node indices for internal nodes, primitive keys for leaves.
    pub data: [i32; 4],
    pub flags: u32,
    pub _pad: [u32; 3],
}

impl BvhNode {
    pub const LEAF: u32 = 1 << 0;

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.flags & Self::LEAF != 0
    }

    #[must_use]
    pub const fn is_internal(&self) -> bool {
        !self.is_leaf()
    }
}

/// Read accessor over a stored node array. Node 0 is the reserved empty
/// node; the root, if any, is node 1.
#[derive(Copy, Clone, Debug)]
pub struct BoundingVolumeHierarchy<'a> {
    nodes: &'a [BvhNode],
}

impl<'a> BoundingVolumeHierarchy<'a> {
    #[must_use]
    pub const fn new(nodes: &'a [BvhNode]) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub const fn nodes(&self) -> &'a [BvhNode] {
        self.nodes
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn root(&self) -> Option<&'a BvhNode> {
        self.nodes.get(1)
    }
}
