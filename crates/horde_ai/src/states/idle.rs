//! Standing still

use super::{StateContext, StateOutcome};
use crate::animation::ResolvedAnimation;

/// Idle behaviour: stop and play the idle animation
#[derive(Debug, Clone)]
pub struct IdleState {
    animation: ResolvedAnimation,
    active: bool,
}

impl IdleState {
    pub fn new(animation: ResolvedAnimation) -> Self {
        Self {
            animation,
            active: false,
        }
    }

    pub fn enter(&mut self, ctx: &mut StateContext<'_>) {
        if self.active {
            return;
        }
        self.active = true;
        ctx.body.stop();
        self.animation.play(ctx.animator);
    }

    pub fn update(&mut self, _ctx: &mut StateContext<'_>, _dt: f32) -> StateOutcome {
        StateOutcome::Running
    }

    pub fn exit(&mut self, _ctx: &mut StateContext<'_>) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::KinematicBody;
    use crate::states::testing::{animations, RecordingAnimator};
    use crate::tracking::{AgentId, NullChaseTracker};
    use glam::Vec3;

    #[test]
    fn test_enter_plays_idle_once() {
        let mut body = KinematicBody::new(Vec3::ZERO);
        let mut animator = RecordingAnimator::default();
        let mut ctx = StateContext {
            agent: AgentId(1),
            body: &mut body,
            animator: &mut animator,
            tracker: &NullChaseTracker,
        };

        let mut idle = IdleState::new(animations().idle);
        idle.enter(&mut ctx);
        idle.enter(&mut ctx);
        assert!(idle.is_active());
        assert_eq!(idle.update(&mut ctx, 1.0), StateOutcome::Running);

        idle.exit(&mut ctx);
        idle.exit(&mut ctx);
        assert!(!idle.is_active());
        assert_eq!(animator.played, vec!["Idle".to_string()]);
    }
}
