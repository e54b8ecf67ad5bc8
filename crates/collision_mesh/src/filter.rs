//! Collision filter and physics material records.
//!
//! The mesh stores these in small per-section tables and only ever copies
//! them; the helpers here are for the narrow phase that consumes them.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct CollisionFilter {
    /// Layers this body lives in.
    pub belongs_to: u32,
    /// Layers this body can collide with.
    pub collides_with: u32,
    /// Non-zero group overrides the layer masks: equal positive groups always
    /// collide, equal negative groups never do.
    #[serde(default)]
    pub group_index: i32,
}

impl CollisionFilter {
    pub const DEFAULT: Self = Self {
        belongs_to: u32::MAX,
        collides_with: u32::MAX,
        group_index: 0,
    };

    pub const ZERO: Self = Self {
        belongs_to: 0,
        collides_with: 0,
        group_index: 0,
    };

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.belongs_to == 0 || self.collides_with == 0
    }

    #[must_use]
    pub const fn is_collision_enabled(a: &Self, b: &Self) -> bool {
        if a.group_index > 0 && a.group_index == b.group_index {
            return true;
        }
        if a.group_index < 0 && a.group_index == b.group_index {
            return false;
        }
        (a.belongs_to & b.collides_with) != 0 && (b.belongs_to & a.collides_with) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How two materials' coefficients are merged. Higher variants win when the
/// two sides disagree.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    #[default]
    GeometricMean = 0,
    Minimum = 1,
    Maximum = 2,
    ArithmeticMean = 3,
}

impl CombinePolicy {
    /// Unknown values fall back to the geometric mean.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Minimum,
            2 => Self::Maximum,
            3 => Self::ArithmeticMean,
            _ => Self::GeometricMean,
        }
    }

    #[must_use]
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            Self::GeometricMean => (a * b).sqrt(),
            Self::Minimum => a.min(b),
            Self::Maximum => a.max(b),
            Self::ArithmeticMean => (a + b) * 0.5,
        }
    }
}

bitflags! {
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
    pub struct MaterialFlags: u8 {
        const ENABLE_COLLISION_EVENTS = 1 << 0;
        const ENABLE_MASS_FACTORS = 1 << 1;
        const ENABLE_SURFACE_VELOCITY = 1 << 2;
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
    pub friction_combine: u8,
    pub restitution_combine: u8,
    pub flags: u8,
    pub custom_tags: u8,
}

impl Material {
    #[must_use]
    pub const fn friction_policy(&self) -> CombinePolicy {
        CombinePolicy::from_u8(self.friction_combine)
    }

    #[must_use]
    pub const fn restitution_policy(&self) -> CombinePolicy {
        CombinePolicy::from_u8(self.restitution_combine)
    }

    #[must_use]
    pub const fn material_flags(&self) -> MaterialFlags {
        MaterialFlags::from_bits_truncate(self.flags)
    }

    #[must_use]
    pub fn combine_friction(a: &Self, b: &Self) -> f32 {
        a.friction_policy()
            .max(b.friction_policy())
            .combine(a.friction, b.friction)
    }

    #[must_use]
    pub fn combine_restitution(a: &Self, b: &Self) -> f32 {
        a.restitution_policy()
            .max(b.restitution_policy())
            .combine(a.restitution, b.restitution)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            friction_combine: CombinePolicy::GeometricMean as u8,
            restitution_combine: CombinePolicy::Maximum as u8,
            flags: 0,
            custom_tags: 0,
        }
    }
}
