//! Pursuing a bound target
//!
//! The chase point is refreshed on an interval rather than every frame.
//! Between refreshes a navigator walks to the stored point, while direct
//! movement follows the target's live position.

use super::{ChaseEndReason, StateContext, StateOutcome};
use crate::animation::{AnimationSet, ResolvedAnimation};
use crate::config::ChasingConfig;
use crate::registry::{TargetHandle, TargetId};
use crate::steering;
use crate::timer::{Accumulator, Interval};
use glam::Vec3;

/// Chasing behaviour
#[derive(Debug, Clone)]
pub struct ChasingState {
    config: ChasingConfig,
    gait: ResolvedAnimation,
    target: Option<TargetHandle>,
    chase_point: Option<Vec3>,
    refresh: Interval,
    persistence: Accumulator,
}

impl ChasingState {
    /// Create the state; the gait follows `use_walk_for_chasing`
    pub fn new(config: ChasingConfig, animations: &AnimationSet) -> Self {
        let gait = if config.use_walk_for_chasing {
            animations.chase_walk.clone()
        } else {
            animations.chase_run.clone()
        };

        Self {
            refresh: Interval::due_now(config.target_update_interval),
            persistence: Accumulator::new("chase-persistence", config.chase_persistence_time),
            config,
            gait,
            target: None,
            chase_point: None,
        }
    }

    /// Start chasing `target`. No-op if already chasing it.
    pub fn enter(&mut self, ctx: &mut StateContext<'_>, target: TargetHandle) {
        if let Some(current) = &self.target {
            if current.id() == target.id() {
                return;
            }
            self.exit(ctx);
        }

        self.reset();
        ctx.tracker.register(ctx.agent, target.id());
        log::debug!("{} chasing {}", ctx.agent, target.id());
        self.target = Some(target);
        self.gait.play(ctx.animator);
    }

    pub fn update(&mut self, ctx: &mut StateContext<'_>, dt: f32) -> StateOutcome {
        let Some(target) = self.target.clone() else {
            return StateOutcome::Running;
        };

        if self.persistence.tick(dt) {
            return self.end(ctx, ChaseEndReason::PersistenceExpired);
        }

        if self.refresh.tick(dt) {
            let Some(position) = target.position() else {
                return self.end(ctx, ChaseEndReason::TargetGone);
            };
            if ctx.body.position().distance(position) > self.config.max_chase_distance {
                return self.end(ctx, ChaseEndReason::OutOfRange);
            }
            self.chase_point = Some(position);
        }

        let Some(point) = self.chase_point else {
            return StateOutcome::Running;
        };
        let speed = self.gait.movement_speed;

        if let Some(navigator) = ctx.body.navigator() {
            navigator.move_toward(point, speed);
        } else {
            let live = target.position().unwrap_or(point);
            steering::pursue(ctx.body, live, speed, dt);
        }

        StateOutcome::Running
    }

    /// The detector lost sight of the target; start the persistence window
    pub fn on_target_lost(&mut self) {
        if self.target.is_none() {
            return;
        }
        self.persistence.start();
    }

    /// The target is visible again; cancel the persistence window
    pub fn on_target_reappear(&mut self) {
        if self.target.is_none() {
            return;
        }
        self.persistence.stop();
    }

    /// Continue the chase with a different target
    pub fn retarget(&mut self, ctx: &mut StateContext<'_>, target: TargetHandle) {
        let Some(previous) = self.target.take() else {
            return;
        };
        if previous.id() == target.id() {
            self.target = Some(previous);
            return;
        }

        ctx.tracker.unregister(ctx.agent, previous.id());
        log::info!(
            "{} chase of {} ended: {:?}",
            ctx.agent,
            previous.id(),
            ChaseEndReason::Retargeted
        );

        self.reset();
        ctx.tracker.register(ctx.agent, target.id());
        log::info!("{} chasing {}", ctx.agent, target.id());
        self.target = Some(target);
    }

    /// Stop chasing. Safe to call when not chasing.
    pub fn exit(&mut self, ctx: &mut StateContext<'_>) {
        let Some(target) = self.target.take() else {
            return;
        };
        ctx.tracker.unregister(ctx.agent, target.id());
        ctx.body.stop();
        self.reset();
    }

    fn end(&mut self, ctx: &mut StateContext<'_>, reason: ChaseEndReason) -> StateOutcome {
        if let Some(target) = &self.target {
            log::info!("{} chase of {} ended: {:?}", ctx.agent, target.id(), reason);
        }
        self.exit(ctx);
        StateOutcome::ChaseEnded(reason)
    }

    fn reset(&mut self) {
        self.chase_point = None;
        self.persistence.stop();
        self.refresh = Interval::due_now(self.config.target_update_interval);
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Target being chased
    pub fn target(&self) -> Option<TargetId> {
        self.target.as_ref().map(TargetHandle::id)
    }

    /// Last refreshed chase point
    pub fn chase_point(&self) -> Option<Vec3> {
        self.chase_point
    }

    /// Whether the persistence window is running
    pub fn is_persisting(&self) -> bool {
        self.persistence.is_running()
    }

    /// Fraction of the persistence window used up
    pub fn persistence_progress(&self) -> f32 {
        if !self.persistence.is_running() {
            return 0.0;
        }
        self.persistence.value() / self.config.chase_persistence_time
    }
}
