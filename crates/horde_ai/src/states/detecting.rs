//! Investigating a far sighting
//!
//! On entry the agent turns towards the last known position. After a short
//! delay it walks there, waits a while and reports
//! [`StateOutcome::InvestigationComplete`]. A timeout runs alongside the
//! whole sequence and wins if it is reached first.

use super::{StateContext, StateOutcome};
use crate::animation::ResolvedAnimation;
use crate::config::DetectingConfig;
use crate::steering;
use crate::timer::Accumulator;
use glam::Vec3;

/// Where the investigation sequence is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvestigationPhase {
    /// Facing the point before moving
    Facing,
    /// Walking to the point
    Moving,
    /// Looking around at the point
    Waiting,
    /// Not investigating
    Done,
}

/// Detecting behaviour
#[derive(Debug, Clone)]
pub struct DetectingState {
    config: DetectingConfig,
    walk: ResolvedAnimation,
    idle: ResolvedAnimation,
    active: bool,
    point: Vec3,
    phase: InvestigationPhase,
    timeout: Accumulator,
    face_delay: Accumulator,
    wait: Accumulator,
}

impl DetectingState {
    pub fn new(config: DetectingConfig, walk: ResolvedAnimation, idle: ResolvedAnimation) -> Self {
        Self {
            timeout: Accumulator::new("detection-timeout", config.detection_timeout),
            face_delay: Accumulator::new("face-delay", config.face_delay),
            wait: Accumulator::new("investigation", config.investigation_time),
            config,
            walk,
            idle,
            active: false,
            point: Vec3::ZERO,
            phase: InvestigationPhase::Done,
        }
    }

    /// Start investigating `last_known`. No-op while already investigating.
    pub fn enter(&mut self, ctx: &mut StateContext<'_>, last_known: Vec3) {
        if self.active {
            log::debug!("{} already investigating, ignoring new point", ctx.agent);
            return;
        }

        self.active = true;
        self.point = last_known;
        self.phase = InvestigationPhase::Facing;
        self.timeout.start();
        self.face_delay.start();

        ctx.body.face(last_known);
        self.idle.play(ctx.animator);
        log::debug!("{} investigating {:?}", ctx.agent, last_known);
    }

    pub fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> StateOutcome {
        if !self.active {
            return StateOutcome::Running;
        }

        if self.timeout.tick(dt) {
            self.exit(ctx);
            return StateOutcome::TimedOut;
        }

        match self.phase {
            InvestigationPhase::Facing => {
                if self.face_delay.tick(dt) {
                    self.phase = InvestigationPhase::Moving;
                    self.walk.play(ctx.animator);
                }
            }
            InvestigationPhase::Moving => {
                let arrived = steering::move_toward(
                    ctx.body,
                    self.point,
                    self.config.investigation_speed,
                    dt,
                    self.config.investigation_distance,
                );
                if arrived {
                    ctx.body.stop();
                    self.phase = InvestigationPhase::Waiting;
                    self.wait.start();
                    self.idle.play(ctx.animator);
                }
            }
            InvestigationPhase::Waiting => {
                if self.wait.tick(dt) {
                    self.exit(ctx);
                    return StateOutcome::InvestigationComplete;
                }
            }
            InvestigationPhase::Done => {}
        }

        StateOutcome::Running
    }

    /// The target this investigation was about has been lost
    pub fn on_target_lost(&mut self, ctx: &mut StateContext<'_>) -> StateOutcome {
        if !self.active {
            return StateOutcome::Running;
        }
        self.exit(ctx);
        StateOutcome::LostTarget
    }

    pub fn exit(&mut self, ctx: &mut StateContext<'_>) {
        if !self.active {
            return;
        }
        self.active = false;
        self.phase = InvestigationPhase::Done;
        self.timeout.stop();
        self.face_delay.stop();
        self.wait.stop();
        ctx.body.stop();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the agent is past the facing delay
    pub fn is_investigating(&self) -> bool {
        matches!(self.phase, InvestigationPhase::Moving | InvestigationPhase::Waiting)
    }

    pub fn phase(&self) -> InvestigationPhase {
        self.phase
    }

    /// Point being investigated
    pub fn investigation_target(&self) -> Vec3 {
        self.point
    }

    /// Fraction of the timeout used up
    pub fn timeout_progress(&self) -> f32 {
        self.timeout.value() / self.config.detection_timeout
    }
}
