//! Geometry helpers for sight checks and movement
//!
//! Conventions: +Y is up, an identity rotation faces +Z, and a positive yaw
//! turns towards +X (the agent's right).

use glam::{Quat, Vec3};

/// World up axis
pub const UP: Vec3 = Vec3::Y;

const EPSILON: f32 = 1e-6;

/// Squared distance between two points
#[inline]
pub fn sqr_distance(a: Vec3, b: Vec3) -> f32 {
    a.distance_squared(b)
}

/// Forward direction of a rotation
#[inline]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Z
}

/// Right direction of a rotation
#[inline]
pub fn right(rotation: Quat) -> Vec3 {
    rotation * Vec3::X
}

/// Drop the vertical component
#[inline]
pub fn planar(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Project `v` onto the plane with normal `normal`
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    v - n * v.dot(n)
}

/// Angle between two vectors in degrees, 0 if either is degenerate
pub fn angle_deg(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Yaw-only rotation facing along `direction`, if it has a planar component
pub fn yaw_rotation(direction: Vec3) -> Option<Quat> {
    let flat = planar(direction);
    if flat.length_squared() < EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Yaw-only rotation from `from` facing towards `to`
pub fn look_at(from: Vec3, to: Vec3) -> Option<Quat> {
    yaw_rotation(to - from)
}

/// Horizontal/vertical split of the angle between a view direction and a
/// direction to a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeAngles {
    /// Angle in the observer's up-plane (degrees)
    pub horizontal: f32,
    /// Remaining elevation angle (degrees)
    pub vertical: f32,
}

impl ConeAngles {
    /// Measure `direction` against a view with the given forward/up axes.
    ///
    /// The vertical part is derived from the total and horizontal angles as
    /// `sqrt(total² - horizontal²)`.
    pub fn measure(view_forward: Vec3, view_up: Vec3, direction: Vec3) -> Self {
        let total = angle_deg(view_forward, direction);
        let horizontal = angle_deg(
            project_on_plane(view_forward, view_up),
            project_on_plane(direction, view_up),
        );
        let vertical = (total * total - horizontal * horizontal).max(0.0).sqrt();

        Self {
            horizontal,
            vertical,
        }
    }

    /// Whether the angles fall inside a cone of the given full widths
    pub fn within(&self, horizontal_cone: f32, vertical_cone: f32) -> bool {
        self.horizontal <= horizontal_cone * 0.5 && self.vertical <= vertical_cone * 0.5
    }
}
