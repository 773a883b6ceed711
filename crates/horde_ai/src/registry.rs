//! Sensable targets and the shared registry perception reads from
//!
//! Targets are owned by whoever spawned them (player controllers, NPC
//! spawners). The registry only keeps weak handles, so a target that is
//! dropped simply stops resolving and perception skips it.

use crate::error::{AiError, Result};
use glam::{Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

/// Identifier of a sensable target. Also used as the owner tag of its colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl TargetId {
    /// Owner tag for occlusion world colliders
    pub fn collider_tag(&self) -> u128 {
        u128::from(self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// A named anchor point on a target, relative to its root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPart {
    /// Part name (e.g. "head")
    pub name: String,
    /// Offset from the target root in target space
    pub offset: Vec3,
}

/// A group of body parts that must all be visible for a detection to count
#[derive(Debug, Clone, PartialEq)]
pub struct HitCombination {
    /// Combination name (e.g. "silhouette")
    pub name: String,
    /// Observer categories (layer bits) this combination applies to
    pub detector_mask: u32,
    /// Indices into the target's body parts, never empty
    pub parts: Vec<usize>,
}

impl HitCombination {
    /// Whether this combination applies to an observer of the given category mask
    pub fn applies_to(&self, observer_mask: u32) -> bool {
        self.detector_mask & observer_mask != 0
    }
}

/// A target that observers may sense
#[derive(Debug, Clone)]
pub struct Target {
    id: TargetId,
    position: Vec3,
    rotation: Quat,
    parts: Vec<BodyPart>,
    combinations: Vec<HitCombination>,
}

impl Target {
    /// Start describing a target
    pub fn builder(id: TargetId) -> TargetBuilder {
        TargetBuilder::new(id)
    }

    /// Target id
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Root position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Root rotation
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Move the target root
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Set the full pose
    pub fn set_pose(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
    }

    /// Body parts
    pub fn parts(&self) -> &[BodyPart] {
        &self.parts
    }

    /// Hit combinations
    pub fn combinations(&self) -> &[HitCombination] {
        &self.combinations
    }

    /// World position of a body part
    pub fn part_position(&self, index: usize) -> Option<Vec3> {
        self.parts
            .get(index)
            .map(|part| self.position + self.rotation * part.offset)
    }

    /// World position of a body part by name
    pub fn part_position_by_name(&self, name: &str) -> Option<Vec3> {
        self.parts
            .iter()
            .position(|part| part.name == name)
            .and_then(|index| self.part_position(index))
    }
}

/// Builder for [`Target`]
#[derive(Debug, Clone)]
pub struct TargetBuilder {
    id: TargetId,
    position: Vec3,
    rotation: Quat,
    parts: Vec<BodyPart>,
    combinations: Vec<(String, u32, Vec<String>)>,
}

impl TargetBuilder {
    /// Create a builder
    pub fn new(id: TargetId) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            parts: Vec::new(),
            combinations: Vec::new(),
        }
    }

    /// Set root position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set root rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Add a body part
    pub fn with_part(mut self, name: &str, offset: Vec3) -> Self {
        self.parts.push(BodyPart {
            name: name.to_string(),
            offset,
        });
        self
    }

    /// Add a hit combination referencing parts by name
    pub fn with_combination(mut self, name: &str, detector_mask: u32, parts: &[&str]) -> Self {
        self.combinations.push((
            name.to_string(),
            detector_mask,
            parts.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    /// Resolve part names and build the target
    pub fn build(self) -> Result<Target> {
        let id = self.id;
        let invalid = |reason: String| AiError::InvalidTarget {
            target: id.0,
            reason,
        };

        let mut combinations = Vec::with_capacity(self.combinations.len());
        for (name, detector_mask, part_names) in self.combinations {
            if part_names.is_empty() {
                return Err(invalid(format!("combination '{}' has no body parts", name)));
            }

            let mut parts = Vec::with_capacity(part_names.len());
            for part_name in &part_names {
                let index = self
                    .parts
                    .iter()
                    .position(|p| &p.name == part_name)
                    .ok_or_else(|| {
                        invalid(format!(
                            "combination '{}' references unknown part '{}'",
                            name, part_name
                        ))
                    })?;
                parts.push(index);
            }

            combinations.push(HitCombination {
                name,
                detector_mask,
                parts,
            });
        }

        if combinations.is_empty() {
            log::warn!("{} has no hit combinations and can never be detected", id);
        }

        Ok(Target {
            id,
            position: self.position,
            rotation: self.rotation,
            parts: self.parts,
            combinations,
        })
    }
}

/// A target shared between its owner and the registry
pub type SharedTarget = Arc<RwLock<Target>>;

/// Non-owning reference to a registered target
#[derive(Debug, Clone)]
pub struct TargetHandle {
    id: TargetId,
    target: Weak<RwLock<Target>>,
}

impl TargetHandle {
    /// Create a handle to a shared target
    pub fn new(target: &SharedTarget) -> Self {
        Self {
            id: target.read().id(),
            target: Arc::downgrade(target),
        }
    }

    /// Target id
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Resolve the handle, `None` if the owner dropped the target
    pub fn upgrade(&self) -> Option<SharedTarget> {
        self.target.upgrade()
    }

    /// Current root position, if the target is still alive
    pub fn position(&self) -> Option<Vec3> {
        self.upgrade().map(|target| target.read().position())
    }

    /// Whether the target is still alive
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    targets: Vec<TargetHandle>,
    revision: u64,
}

/// Process-wide list of sensable targets.
///
/// Cloning the registry clones the handle, not the contents. Every change
/// bumps a revision counter that readers poll to know when to refresh their
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl TargetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared target, replacing any entry with the same id
    pub fn register(&self, target: &SharedTarget) -> TargetHandle {
        let handle = TargetHandle::new(target);
        let mut state = self.state.write();
        state.targets.retain(|t| t.id != handle.id);
        state.targets.push(handle.clone());
        state.revision += 1;
        log::debug!("Registered {}", handle.id);
        handle
    }

    /// Wrap a target, register it and hand ownership back to the caller
    pub fn spawn(&self, target: Target) -> SharedTarget {
        let shared = Arc::new(RwLock::new(target));
        self.register(&shared);
        shared
    }

    /// Remove a target; returns whether it was registered
    pub fn unregister(&self, id: TargetId) -> bool {
        let mut state = self.state.write();
        let before = state.targets.len();
        state.targets.retain(|t| t.id != id);
        let removed = state.targets.len() != before;
        if removed {
            state.revision += 1;
            log::debug!("Unregistered {}", id);
        }
        removed
    }

    /// Drop entries whose owners have gone away
    pub fn prune(&self) -> usize {
        let mut state = self.state.write();
        let before = state.targets.len();
        state.targets.retain(|t| t.is_alive());
        let pruned = before - state.targets.len();
        if pruned > 0 {
            state.revision += 1;
        }
        pruned
    }

    /// Copy of the current handle list
    pub fn snapshot(&self) -> Vec<TargetHandle> {
        self.state.read().targets.clone()
    }

    /// Handle for a target id
    pub fn get(&self, id: TargetId) -> Option<TargetHandle> {
        self.state
            .read()
            .targets
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Change counter
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Number of registered targets
    pub fn len(&self) -> usize {
        self.state.read().targets.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
