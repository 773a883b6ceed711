//! The agent's body as seen by the behaviour core
//!
//! Behaviour states never own a transform. They move the agent through
//! [`Locomotion`], and hand pathfinding off to a [`Navigator`] when the body
//! has one.

use crate::geometry::{self, look_at};
use glam::{Quat, Vec3};

/// Where the observer looks from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePose {
    /// Eye position in world space
    pub position: Vec3,
    /// Eye orientation (identity faces +Z)
    pub rotation: Quat,
}

impl EyePose {
    /// Create a pose
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// View direction
    pub fn forward(&self) -> Vec3 {
        geometry::forward(self.rotation)
    }

    /// Up axis of the view
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

/// Pathfinding capability
pub trait Navigator {
    /// Steer towards `point` at `speed`; returns `true` once arrived
    fn move_toward(&mut self, point: Vec3, speed: f32) -> bool;
    /// Cancel the current destination
    fn stop(&mut self);
}

/// Transform and movement surface of an agent
pub trait Locomotion {
    /// Root position
    fn position(&self) -> Vec3;
    /// Root rotation
    fn rotation(&self) -> Quat;
    /// Teleport the root
    fn set_position(&mut self, position: Vec3);
    /// Set the root rotation
    fn set_rotation(&mut self, rotation: Quat);

    /// Eye pose, `None` if it cannot be resolved this frame
    fn eye_pose(&self) -> Option<EyePose>;

    /// Whether the body stands on something it can walk on
    fn is_grounded(&self) -> bool {
        true
    }

    /// Pathfinding, if this body has it
    fn navigator(&mut self) -> Option<&mut dyn Navigator> {
        None
    }

    /// Turn (yaw only) to face a point
    fn face(&mut self, point: Vec3) {
        if let Some(rotation) = look_at(self.position(), point) {
            self.set_rotation(rotation);
        }
    }

    /// Halt any navigation in progress
    fn stop(&mut self) {
        if let Some(navigator) = self.navigator() {
            navigator.stop();
        }
    }
}

/// A plain transform with an eye offset and no pathfinding
#[derive(Debug, Clone)]
pub struct KinematicBody {
    position: Vec3,
    rotation: Quat,
    /// Eye offset in body space; `None` models a rig with no eye bone
    eye_offset: Option<Vec3>,
    grounded: bool,
}

impl KinematicBody {
    /// Create a body at `position` facing +Z with eyes at 1.7
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            eye_offset: Some(Vec3::new(0.0, 1.7, 0.0)),
            grounded: true,
        }
    }

    /// Set initial rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set eye offset (or remove the eye entirely)
    pub fn with_eye_offset(mut self, offset: Option<Vec3>) -> Self {
        self.eye_offset = offset;
        self
    }

    /// Set grounded flag
    pub fn set_grounded(&mut self, grounded: bool) {
        self.grounded = grounded;
    }
}

impl Locomotion for KinematicBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn eye_pose(&self) -> Option<EyePose> {
        self.eye_offset
            .map(|offset| EyePose::new(self.position + self.rotation * offset, self.rotation))
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }
}
