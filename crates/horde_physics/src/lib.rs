//! Horde Physics - occlusion world for perception queries
//!
//! This crate keeps the collision geometry that can block or receive sight
//! lines and answers "what does a ray from A towards B hit first" questions.
//! It does not simulate dynamics: colliders are static or moved kinematically
//! by whoever owns them.
//!
//! # Features
//!
//! - Static and kinematically moved colliders (sphere, box, capsule)
//! - Collision layers with membership/filter masks
//! - First-hit raycasts and segment queries
//! - Owner tagging so a hit can be traced back to the entity that owns it
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              OcclusionWorld               │
//! │  ┌─────────────┐  ┌───────────────────┐  │
//! │  │ ColliderSet │  │   QueryPipeline   │  │
//! │  └─────────────┘  └───────────────────┘  │
//! └──────────────────────────────────────────┘
//!                      │
//!                      ▼
//!              ┌───────────────┐
//!              │  LineOfSight  │  (trait consumed by perception)
//!              └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use horde_physics::prelude::*;
//!
//! let mut world = OcclusionWorld::new();
//!
//! // A wall on the buildings layer
//! world.add_collider(
//!     ColliderDesc::new(ColliderShape::cuboid(5.0, 3.0, 0.5))
//!         .with_position(0.0, 1.5, 10.0)
//!         .with_layer(CollisionLayer::BUILDINGS),
//! );
//!
//! let mask = CollisionLayer::BUILDINGS.as_mask() | CollisionLayer::PLAYERS.as_mask();
//! let hit = world.first_hit([0.0, 1.6, 0.0], [0.0, 1.0, 20.0], mask);
//! ```

pub mod collider;
pub mod error;
pub mod layers;
pub mod query;
pub mod world;

pub mod prelude {
    //! Common imports for occlusion queries
    pub use crate::collider::{ColliderDesc, ColliderHandle, ColliderShape};
    pub use crate::error::{PhysicsError, Result};
    pub use crate::layers::{CollisionGroups, CollisionLayer, SightMasks};
    pub use crate::query::{LineOfSight, OcclusionQuery, RaycastHit, RaycastOptions, SightHit};
    pub use crate::world::OcclusionWorld;
}

pub use prelude::*;
