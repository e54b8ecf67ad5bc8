//! Output shape filled in by the mesh polygon queries.

use crate::filter::{CollisionFilter, Material};
use crate::types::Vec3;

/// A triangle or planar quad, reused across queries by the caller.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PolygonCollider {
    vertices: [Vec3; 4],
    vertex_count: u8,
    pub filter: CollisionFilter,
    pub material: Material,
}

impl PolygonCollider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertices: [Vec3::ZERO; 4],
            vertex_count: 3,
            filter: CollisionFilter::DEFAULT,
            material: Material::default(),
        }
    }

    #[must_use]
    pub fn triangle(
        a: Vec3,
        b: Vec3,
        c: Vec3,
        filter: CollisionFilter,
        material: Material,
    ) -> Self {
        let mut polygon = Self {
            filter,
            material,
            ..Self::new()
        };
        polygon.set_as_triangle(a, b, c);
        polygon
    }

    #[must_use]
    pub fn quad(
        a: Vec3,
        b: Vec3,
        c: Vec3,
        d: Vec3,
        filter: CollisionFilter,
        material: Material,
    ) -> Self {
        let mut polygon = Self {
            filter,
            material,
            ..Self::new()
        };
        polygon.set_as_quad(a, b, c, d);
        polygon
    }

    pub fn set_as_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        self.vertices = [a, b, c, Vec3::ZERO];
        self.vertex_count = 3;
    }

    pub fn set_as_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        self.vertices = [a, b, c, d];
        self.vertex_count = 4;
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices[..usize::from(self.vertex_count)]
    }

    #[must_use]
    pub const fn is_triangle(&self) -> bool {
        self.vertex_count == 3
    }

    #[must_use]
    pub const fn is_quad(&self) -> bool {
        self.vertex_count == 4
    }

    /// Triangle `index` of the fan around the first vertex: (A,B,C) then (A,C,D).
    #[must_use]
    pub fn fan_triangle(&self, index: usize) -> Option<[Vec3; 3]> {
        let v = &self.vertices;
        match (index, self.vertex_count) {
            (0, _) => Some([v[0], v[1], v[2]]),
            (1, 4) => Some([v[0], v[2], v[3]]),
            _ => None,
        }
    }

    /// Unit normal of the plane through the first three vertices.
    #[must_use]
    pub fn plane_normal(&self) -> Vec3 {
        let [a, b, c, _] = self.vertices;
        (b - a).cross(c - a).normalize()
    }
}

impl Default for PolygonCollider {
    fn default() -> Self {
        Self::new()
    }
}
