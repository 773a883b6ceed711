//! Occlusion world - collider container with a synced query pipeline

use crate::collider::{ColliderDesc, ColliderHandle};
use crate::error::{PhysicsError, Result};
use crate::query::{LineOfSight, OcclusionQuery, SightHit};
use rapier3d::prelude as rapier;
use std::collections::HashMap;

/// Colliders that can occlude or receive sight lines.
///
/// Every mutation resyncs the query pipeline, so queries always see the
/// latest geometry.
pub struct OcclusionWorld {
    /// Island manager (needed by collider removal)
    islands: rapier::IslandManager,

    /// Query pipeline
    query_pipeline: rapier::QueryPipeline,

    /// Rigid body set (always empty, required by Rapier queries)
    bodies: rapier::RigidBodySet,

    /// Collider set
    colliders: rapier::ColliderSet,

    /// Owner tag -> colliders
    owner_to_colliders: HashMap<u128, Vec<ColliderHandle>>,
}

impl OcclusionWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            islands: rapier::IslandManager::new(),
            query_pipeline: rapier::QueryPipeline::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            owner_to_colliders: HashMap::new(),
        }
    }

    // ==================== Colliders ====================

    /// Add a collider
    pub fn add_collider(&mut self, desc: ColliderDesc) -> Result<ColliderHandle> {
        desc.shape.validate()?;

        let handle = ColliderHandle(self.colliders.insert(desc.to_rapier_builder()));
        if desc.user_data != 0 {
            self.owner_to_colliders
                .entry(desc.user_data)
                .or_default()
                .push(handle);
        }

        self.sync_query_pipeline();
        Ok(handle)
    }

    /// Add a collider tagged with an owner id
    pub fn add_collider_for_owner(
        &mut self,
        owner: u128,
        desc: ColliderDesc,
    ) -> Result<ColliderHandle> {
        self.add_collider(desc.with_user_data(owner))
    }

    /// Remove a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) -> Result<()> {
        self.colliders
            .remove(handle.0, &mut self.islands, &mut self.bodies, false)
            .ok_or(PhysicsError::ColliderNotFound(handle))?;

        for colliders in self.owner_to_colliders.values_mut() {
            colliders.retain(|h| *h != handle);
        }
        self.owner_to_colliders.retain(|_, colliders| !colliders.is_empty());

        self.sync_query_pipeline();
        Ok(())
    }

    /// Remove every collider tagged with `owner`
    pub fn remove_owner(&mut self, owner: u128) {
        if let Some(handles) = self.owner_to_colliders.remove(&owner) {
            for handle in handles {
                self.colliders
                    .remove(handle.0, &mut self.islands, &mut self.bodies, false);
            }
            self.sync_query_pipeline();
        }
    }

    /// Translate every collider of an owner by the same offset
    pub fn translate_owner(&mut self, owner: u128, offset: [f32; 3]) -> Result<()> {
        let handles = self
            .owner_to_colliders
            .get(&owner)
            .ok_or(PhysicsError::OwnerNotFound(owner))?;

        for handle in handles {
            if let Some(collider) = self.colliders.get_mut(handle.0) {
                let t = collider.translation();
                let moved = rapier::Vector::new(t.x + offset[0], t.y + offset[1], t.z + offset[2]);
                collider.set_translation(moved);
            }
        }

        self.sync_query_pipeline();
        Ok(())
    }

    /// Rebuild the query acceleration structure
    fn sync_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    // ==================== Queries ====================

    /// Get query interface
    pub fn query(&self) -> OcclusionQuery<'_> {
        OcclusionQuery {
            query_pipeline: &self.query_pipeline,
            colliders: &self.colliders,
            bodies: &self.bodies,
        }
    }

    /// Number of colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

impl Default for OcclusionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl LineOfSight for OcclusionWorld {
    fn first_hit(&self, from: [f32; 3], to: [f32; 3], mask: u32) -> Option<SightHit> {
        self.query().first_hit(from, to, mask)
    }
}
