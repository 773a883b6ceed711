//! Collision layers and sight masks

use serde::{Deserialize, Serialize};

/// A collision layer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionLayer(pub u32);

impl CollisionLayer {
    /// Default layer
    pub const DEFAULT: Self = Self(0);
    /// Player characters
    pub const PLAYERS: Self = Self(1);
    /// Friendly or neutral NPCs
    pub const NPCS: Self = Self(2);
    /// Hostile humans
    pub const HUMAN_ENEMIES: Self = Self(3);
    /// Zombies (the usual observer category)
    pub const ZOMBIES: Self = Self(4);
    /// Buildings and walls
    pub const BUILDINGS: Self = Self(5);
    /// Props and clutter that block sight
    pub const OBSTACLES: Self = Self(6);
    /// Vehicles
    pub const VEHICLES: Self = Self(7);

    /// Create a custom layer
    pub const fn custom(id: u32) -> Self {
        Self(id)
    }

    /// Get the layer as a bitmask
    pub fn as_mask(&self) -> u32 {
        if self.0 >= 32 {
            0
        } else {
            1 << self.0
        }
    }

    /// Look up a built-in layer by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Self::DEFAULT),
            "players" => Some(Self::PLAYERS),
            "npcs" => Some(Self::NPCS),
            "human_enemies" => Some(Self::HUMAN_ENEMIES),
            "zombies" => Some(Self::ZOMBIES),
            "buildings" => Some(Self::BUILDINGS),
            "obstacles" => Some(Self::OBSTACLES),
            "vehicles" => Some(Self::VEHICLES),
            _ => None,
        }
    }

    /// Combine several layers into one mask
    pub fn mask_of(layers: &[CollisionLayer]) -> u32 {
        layers.iter().fold(0u32, |acc, l| acc | l.as_mask())
    }
}

impl Default for CollisionLayer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Collision groups for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionGroups {
    /// Which groups this object belongs to (membership)
    pub memberships: u32,
    /// Which groups this object can interact with (filter)
    pub filter: u32,
}

impl CollisionGroups {
    /// Groups that interact with everything
    pub const ALL: Self = Self {
        memberships: u32::MAX,
        filter: u32::MAX,
    };

    /// Groups that interact with nothing
    pub const NONE: Self = Self {
        memberships: 0,
        filter: 0,
    };

    /// Create new collision groups
    pub fn new(memberships: u32, filter: u32) -> Self {
        Self { memberships, filter }
    }

    /// A collider living on a single layer, visible to every query
    pub fn member_of(layer: CollisionLayer) -> Self {
        Self {
            memberships: layer.as_mask(),
            filter: u32::MAX,
        }
    }

    /// A query that only reports colliders whose membership intersects `mask`
    pub fn query(mask: u32) -> Self {
        Self {
            memberships: u32::MAX,
            filter: mask,
        }
    }

    /// Check if two groups can interact
    pub fn can_collide(&self, other: &CollisionGroups) -> bool {
        (self.memberships & other.filter) != 0 && (other.memberships & self.filter) != 0
    }
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self::ALL
    }
}

/// The two masks a sight line is tested against.
///
/// `blocking` holds the layers that occlude vision (buildings, obstacles,
/// vehicles); `targets` holds the layers that can be sensed. Sight rays use
/// the union of both so that the first thing hit is either an occluder or a
/// target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SightMasks {
    /// Layers that block sight
    pub blocking: u32,
    /// Layers that can be sensed
    pub targets: u32,
}

impl SightMasks {
    /// Create masks from layer lists
    pub fn new(blocking: &[CollisionLayer], targets: &[CollisionLayer]) -> Self {
        Self {
            blocking: CollisionLayer::mask_of(blocking),
            targets: CollisionLayer::mask_of(targets),
        }
    }

    /// Mask used for sight rays
    pub fn combined(&self) -> u32 {
        self.blocking | self.targets
    }
}

impl Default for SightMasks {
    fn default() -> Self {
        Self::new(
            &[
                CollisionLayer::BUILDINGS,
                CollisionLayer::OBSTACLES,
                CollisionLayer::VEHICLES,
            ],
            &[
                CollisionLayer::PLAYERS,
                CollisionLayer::NPCS,
                CollisionLayer::HUMAN_ENEMIES,
            ],
        )
    }
}
