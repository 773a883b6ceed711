//! Walking a fixed loop around the spawn point

use super::wander_path::{WanderPath, WanderStep};
use super::{StateContext, StateOutcome};
use crate::animation::ResolvedAnimation;
use crate::config::WanderConfig;
use crate::steering::{self, StepOutcome};
use crate::timer::Accumulator;
use glam::Vec3;

/// Wandering behaviour
#[derive(Debug, Clone)]
pub struct WanderingState {
    steps: Vec<WanderStep>,
    walk: ResolvedAnimation,
    idle: ResolvedAnimation,
    active: bool,
    path: Option<WanderPath>,
    step_delay: Accumulator,
    interrupted: bool,
}

impl WanderingState {
    pub fn new(config: WanderConfig, walk: ResolvedAnimation, idle: ResolvedAnimation) -> Self {
        Self {
            steps: config.steps,
            walk,
            idle,
            active: false,
            path: None,
            step_delay: Accumulator::new("step-delay", config.step_delay),
            interrupted: false,
        }
    }

    /// Start wandering. After a chase interruption the preserved path is
    /// resumed at its current waypoint; otherwise a new path is resolved
    /// from the current position and heading.
    pub fn enter(&mut self, ctx: &mut StateContext<'_>) {
        if self.active {
            return;
        }
        self.active = true;

        let resume = std::mem::take(&mut self.interrupted) && self.path.is_some();
        if resume {
            log::debug!(
                "{} resuming wander at waypoint {}",
                ctx.agent,
                self.waypoint_index().unwrap_or(0)
            );
        } else {
            self.path = Some(WanderPath::resolve(
                ctx.body.position(),
                ctx.body.rotation(),
                &self.steps,
            ));
        }

        self.step_delay.stop();
        self.walk.play(ctx.animator);
    }

    pub fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> StateOutcome {
        if !self.active {
            return StateOutcome::Running;
        }

        if self.step_delay.is_running() {
            if self.step_delay.tick(dt) {
                self.walk.play(ctx.animator);
            }
            return StateOutcome::Running;
        }

        let Some(path) = self.path.as_mut() else {
            return StateOutcome::Running;
        };
        let Some(waypoint) = path.current() else {
            return StateOutcome::Running;
        };

        if steering::seek(ctx.body, waypoint, self.walk.movement_speed, dt) == StepOutcome::Arrived {
            path.advance();
            self.step_delay.start();
            self.idle.play(ctx.animator);
        }

        StateOutcome::Running
    }

    /// Keep the path so the next `enter` resumes it
    pub fn mark_chase_interruption(&mut self) {
        self.interrupted = true;
    }

    /// Drop a path preserved by a chase so the next `enter` resolves anew
    pub fn discard_interruption(&mut self) {
        if std::mem::take(&mut self.interrupted) && !self.active {
            self.path = None;
        }
    }

    pub fn exit(&mut self, ctx: &mut StateContext<'_>) {
        if !self.active {
            return;
        }
        self.active = false;
        self.step_delay.stop();
        ctx.body.stop();
        if !self.interrupted {
            self.path = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the current exit was caused by a chase
    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Whether the agent is pausing between steps
    pub fn is_waiting(&self) -> bool {
        self.step_delay.is_running()
    }

    /// Index of the waypoint being walked to
    pub fn waypoint_index(&self) -> Option<usize> {
        self.path.as_ref().map(WanderPath::index)
    }

    /// Waypoint being walked to
    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.path.as_ref().and_then(WanderPath::current)
    }

    /// Resolved path, if any
    pub fn path(&self) -> Option<&WanderPath> {
        self.path.as_ref()
    }
}
