//! Raycasts and line-of-sight queries

use crate::collider::ColliderHandle;
use crate::layers::CollisionGroups;
use rapier3d::prelude as rapier;

/// Segments shorter than this are treated as "already there"
const MIN_SEGMENT_LENGTH: f32 = 1e-5;

/// Result of a raycast query
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// Hit point in world space
    pub point: [f32; 3],
    /// Distance from ray origin
    pub distance: f32,
    /// Owner tag of the collider
    pub user_data: u128,
}

/// The part of a hit that sight checks care about
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightHit {
    /// Owner tag of the first collider on the segment
    pub user_data: u128,
    /// Distance from the segment start
    pub distance: f32,
}

/// Options for raycast queries
#[derive(Debug, Clone)]
pub struct RaycastOptions {
    /// Maximum distance for the ray
    pub max_distance: f32,
    /// Only hit solid colliders (not sensors)
    pub solid_only: bool,
    /// Collision groups filter
    pub filter: CollisionGroups,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            max_distance: f32::MAX,
            solid_only: true,
            filter: CollisionGroups::ALL,
        }
    }
}

impl RaycastOptions {
    /// Set maximum distance
    pub fn with_max_distance(mut self, distance: f32) -> Self {
        self.max_distance = distance;
        self
    }

    /// Set collision filter
    pub fn with_filter(mut self, filter: CollisionGroups) -> Self {
        self.filter = filter;
        self
    }
}

/// Answers "what is the first thing between these two points".
///
/// Perception only needs this one question, so anything that can answer it
/// (a Rapier world, a navmesh occlusion grid, a test double) can stand in.
pub trait LineOfSight {
    /// First collider whose membership intersects `mask` on the segment
    /// `from -> to`, or `None` if the segment is clear.
    fn first_hit(&self, from: [f32; 3], to: [f32; 3], mask: u32) -> Option<SightHit>;
}

/// Query interface over a synced occlusion world
pub struct OcclusionQuery<'a> {
    pub(crate) query_pipeline: &'a rapier::QueryPipeline,
    pub(crate) colliders: &'a rapier::ColliderSet,
    pub(crate) bodies: &'a rapier::RigidBodySet,
}

impl<'a> OcclusionQuery<'a> {
    /// Cast a ray and get the first hit
    pub fn raycast(
        &self,
        origin: [f32; 3],
        direction: [f32; 3],
        options: &RaycastOptions,
    ) -> Option<RaycastHit> {
        let ray = rapier::Ray::new(
            rapier::Point::new(origin[0], origin[1], origin[2]),
            rapier::Vector::new(direction[0], direction[1], direction[2]),
        );

        let mut filter = rapier::QueryFilter::new().groups(rapier::InteractionGroups::new(
            rapier::Group::from_bits_truncate(options.filter.memberships),
            rapier::Group::from_bits_truncate(options.filter.filter),
        ));

        if options.solid_only {
            filter = filter.exclude_sensors();
        }

        self.query_pipeline
            .cast_ray(
                self.bodies,
                self.colliders,
                &ray,
                options.max_distance,
                true,
                filter,
            )
            .map(|(handle, toi)| {
                let point = ray.point_at(toi);
                let user_data = self
                    .colliders
                    .get(handle)
                    .map(|collider| collider.user_data)
                    .unwrap_or(0);

                RaycastHit {
                    collider: ColliderHandle(handle),
                    point: [point.x, point.y, point.z],
                    distance: toi,
                    user_data,
                }
            })
    }

    /// Cast along the segment `from -> to` and report the first hit
    pub fn segment(&self, from: [f32; 3], to: [f32; 3], filter: CollisionGroups) -> Option<RaycastHit> {
        let delta = [to[0] - from[0], to[1] - from[1], to[2] - from[2]];
        let length = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
        if length < MIN_SEGMENT_LENGTH {
            return None;
        }

        let direction = [delta[0] / length, delta[1] / length, delta[2] / length];
        let options = RaycastOptions::default()
            .with_max_distance(length)
            .with_filter(filter);

        self.raycast(from, direction, &options)
    }
}

impl<'a> LineOfSight for OcclusionQuery<'a> {
    fn first_hit(&self, from: [f32; 3], to: [f32; 3], mask: u32) -> Option<SightHit> {
        self.segment(from, to, CollisionGroups::query(mask))
            .map(|hit| SightHit {
                user_data: hit.user_data,
                distance: hit.distance,
            })
    }
}
