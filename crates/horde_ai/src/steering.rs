//! Direct movement for bodies without pathfinding

use crate::body::Locomotion;
use crate::geometry::{planar, yaw_rotation};
use glam::Vec3;

/// Outcome of a single movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still on the way
    Moving,
    /// Reached the point this step
    Arrived,
    /// Movement was not possible (zero speed or not grounded)
    Blocked,
}

/// Walk straight towards `point` on the ground plane, facing the direction
/// of travel. If the point is reachable this step the body snaps onto it.
pub fn seek(body: &mut dyn Locomotion, point: Vec3, speed: f32, dt: f32) -> StepOutcome {
    if speed <= 0.0 || !body.is_grounded() {
        return StepOutcome::Blocked;
    }

    let position = body.position();
    let offset = planar(point - position);
    let distance = offset.length();
    let max_travel = speed * dt;

    if max_travel >= distance {
        body.set_position(point);
        return StepOutcome::Arrived;
    }

    let direction = offset / distance;
    if let Some(rotation) = yaw_rotation(direction) {
        body.set_rotation(rotation);
    }
    body.set_position(position + direction * max_travel);
    StepOutcome::Moving
}

/// Like [`seek`] but keeps the body's height and never snaps, used when
/// pursuing a moving point.
pub fn pursue(body: &mut dyn Locomotion, point: Vec3, speed: f32, dt: f32) -> StepOutcome {
    if speed <= 0.0 || !body.is_grounded() {
        return StepOutcome::Blocked;
    }

    let position = body.position();
    let offset = planar(point - position);
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return StepOutcome::Arrived;
    }

    let direction = offset / distance;
    if let Some(rotation) = yaw_rotation(direction) {
        body.set_rotation(rotation);
    }
    body.set_position(position + direction * (speed * dt).min(distance));
    StepOutcome::Moving
}

/// Move towards `point`, through the navigator when the body has one.
/// Arrival is reported when the navigator says so or the body is within
/// `arrive_distance` on the ground plane.
pub fn move_toward(
    body: &mut dyn Locomotion,
    point: Vec3,
    speed: f32,
    dt: f32,
    arrive_distance: f32,
) -> bool {
    if planar(point - body.position()).length() <= arrive_distance {
        return true;
    }

    if let Some(navigator) = body.navigator() {
        return navigator.move_toward(point, speed);
    }

    pursue(body, point, speed, dt);
    planar(point - body.position()).length() <= arrive_distance
}
