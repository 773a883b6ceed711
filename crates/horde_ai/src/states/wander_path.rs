//! Relative wander steps and their resolution into world waypoints

use crate::geometry::{self, yaw_rotation};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Angle used by angled steps unless configured otherwise (degrees)
pub const DEFAULT_STEP_ANGLE: f32 = 45.0;

/// Largest angle an angled step may turn (degrees)
pub const MAX_STEP_ANGLE: f32 = 89.0;

fn default_angle() -> f32 {
    DEFAULT_STEP_ANGLE
}

/// Direction of one wander step, relative to the current heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WanderDirection {
    Forward,
    Right,
    Left,
    Backward,
    /// Forward, turned by the step angle (positive turns right)
    ForwardWithAngle,
    /// Backward, turned by the step angle
    BackwardWithAngle,
}

/// One leg of a wander path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WanderStep {
    /// Where to go relative to the heading
    pub direction: WanderDirection,
    /// How far
    pub distance: f32,
    /// Turn for angled steps (degrees)
    #[serde(default = "default_angle")]
    pub angle: f32,
}

impl WanderStep {
    /// Create a step with the default angle
    pub fn new(direction: WanderDirection, distance: f32) -> Self {
        Self {
            direction,
            distance,
            angle: DEFAULT_STEP_ANGLE,
        }
    }

    /// Set the angle of an angled step
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// World direction of this step for a given heading
    pub fn direction_from(&self, heading: Quat) -> Vec3 {
        let forward = geometry::forward(heading);
        let right = geometry::right(heading);
        let turn = || Quat::from_rotation_y(self.angle.clamp(-MAX_STEP_ANGLE, MAX_STEP_ANGLE).to_radians());

        match self.direction {
            WanderDirection::Forward => forward,
            WanderDirection::Right => right,
            WanderDirection::Left => -right,
            WanderDirection::Backward => -forward,
            WanderDirection::ForwardWithAngle => turn() * forward,
            WanderDirection::BackwardWithAngle => turn() * -forward,
        }
    }
}

/// Resolved waypoints with a cursor
///
/// The last waypoint is always the anchor, so walking the path in a loop
/// keeps the agent around where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct WanderPath {
    waypoints: Vec<Vec3>,
    index: usize,
}

impl WanderPath {
    /// Resolve `steps` from `anchor`. Each step turns the running heading to
    /// face the direction it walked.
    pub fn resolve(anchor: Vec3, rotation: Quat, steps: &[WanderStep]) -> Self {
        let mut waypoints = Vec::with_capacity(steps.len() + 1);
        let mut position = anchor;
        let mut heading = rotation;

        for step in steps {
            let direction = step.direction_from(heading);
            position += direction * step.distance;
            waypoints.push(position);
            heading = yaw_rotation(direction).unwrap_or(heading);
        }
        waypoints.push(anchor);

        Self { waypoints, index: 0 }
    }

    /// All waypoints, anchor last
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Index of the waypoint being walked to
    pub fn index(&self) -> usize {
        self.index
    }

    /// Waypoint being walked to
    pub fn current(&self) -> Option<Vec3> {
        self.waypoints.get(self.index).copied()
    }

    /// Move on to the next waypoint, wrapping after the anchor
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.waypoints.len().max(1);
    }

    /// Where the path starts and ends
    pub fn anchor(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }
}
