//! Collider shapes and descriptions

use crate::error::{PhysicsError, Result};
use crate::layers::{CollisionGroups, CollisionLayer};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude as rapier;
use serde::{Deserialize, Serialize};

/// Handle to a collider in the occlusion world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub(crate) rapier::ColliderHandle);

/// Collision shape type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Sphere with radius
    Sphere { radius: f32 },
    /// Box with half-extents
    Box { half_extents: [f32; 3] },
    /// Capsule aligned along Y axis (character bodies)
    CapsuleY { half_height: f32, radius: f32 },
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::Box {
            half_extents: [0.5, 0.5, 0.5],
        }
    }
}

impl ColliderShape {
    /// Create a sphere shape
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Create a box shape from half-extents
    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::Box {
            half_extents: [hx, hy, hz],
        }
    }

    /// Create a capsule shape (Y-aligned)
    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self::CapsuleY { half_height, radius }
    }

    /// Reject degenerate dimensions
    pub fn validate(&self) -> Result<()> {
        let ok = match self {
            Self::Sphere { radius } => *radius > 0.0,
            Self::Box { half_extents } => half_extents.iter().all(|e| *e > 0.0),
            Self::CapsuleY { half_height, radius } => *half_height >= 0.0 && *radius > 0.0,
        };

        if ok {
            Ok(())
        } else {
            Err(PhysicsError::InvalidShape(format!("{:?}", self)))
        }
    }

    /// Build a Rapier shared shape
    pub(crate) fn to_rapier(&self) -> rapier::SharedShape {
        match self {
            Self::Sphere { radius } => rapier::SharedShape::ball(*radius),
            Self::Box { half_extents } => {
                rapier::SharedShape::cuboid(half_extents[0], half_extents[1], half_extents[2])
            }
            Self::CapsuleY { half_height, radius } => {
                rapier::SharedShape::capsule_y(*half_height, *radius)
            }
        }
    }
}

/// Description for creating a collider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColliderDesc {
    /// Collision shape
    pub shape: ColliderShape,
    /// World position
    pub position: [f32; 3],
    /// World rotation (quaternion xyzw)
    pub rotation: [f32; 4],
    /// Layer membership and filter
    pub collision_groups: CollisionGroups,
    /// Sensors never block sight
    pub is_sensor: bool,
    /// Owner tag reported back by queries
    pub user_data: u128,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self {
            shape: ColliderShape::default(),
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            collision_groups: CollisionGroups::ALL,
            is_sensor: false,
            user_data: 0,
        }
    }
}

impl ColliderDesc {
    /// Create a new collider description
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    /// Set world position
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = [x, y, z];
        self
    }

    /// Set world rotation (quaternion xyzw)
    pub fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Place the collider on a single layer
    pub fn with_layer(mut self, layer: CollisionLayer) -> Self {
        self.collision_groups = CollisionGroups::member_of(layer);
        self
    }

    /// Set collision groups directly
    pub fn with_collision_groups(mut self, groups: CollisionGroups) -> Self {
        self.collision_groups = groups;
        self
    }

    /// Mark as sensor
    pub fn as_sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    /// Set owner tag
    pub fn with_user_data(mut self, data: u128) -> Self {
        self.user_data = data;
        self
    }

    /// Build a Rapier collider builder
    pub(crate) fn to_rapier_builder(&self) -> rapier::ColliderBuilder {
        rapier::ColliderBuilder::new(self.shape.to_rapier())
            .position(isometry(self.position, self.rotation))
            .sensor(self.is_sensor)
            .collision_groups(rapier::InteractionGroups::new(
                rapier::Group::from_bits_truncate(self.collision_groups.memberships),
                rapier::Group::from_bits_truncate(self.collision_groups.filter),
            ))
            .user_data(self.user_data)
    }
}

/// Build a nalgebra isometry from a position and an xyzw quaternion
pub(crate) fn isometry(position: [f32; 3], rotation: [f32; 4]) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(position[0], position[1], position[2]),
        UnitQuaternion::from_quaternion(Quaternion::new(
            rotation[3],
            rotation[0],
            rotation[1],
            rotation[2],
        )),
    )
}
