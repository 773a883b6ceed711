//! Behaviour coordinator
//!
//! Owns the four behaviour states and decides which one runs. It is driven
//! by two inputs: detection events from the vision detector, and the
//! outcome each state returns from its update. Every transition runs the
//! active state's `exit` before the next state's `enter`, so at most one
//! state is ever active.

use crate::animation::AnimationSet;
use crate::config::{AgentConfig, InitialState};
use crate::events::{AgentEvent, DetectionEvent, DetectionLevel};
use crate::registry::{TargetHandle, TargetId, TargetRegistry};
use crate::states::{
    BehaviorState, ChaseEndReason, ChasingState, DetectingState, IdleState, StateContext,
    StateOutcome, WanderingState,
};
use crate::vision::VisionDetector;
use glam::Vec3;

/// A completed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: BehaviorState,
    pub to: BehaviorState,
}

impl From<StateChange> for AgentEvent {
    fn from(change: StateChange) -> Self {
        AgentEvent::StateChanged {
            from: change.from,
            to: change.to,
        }
    }
}

enum Entry {
    Idle,
    Wandering,
    Detecting(Vec3),
    Chasing(TargetHandle),
}

impl Entry {
    fn state(&self) -> BehaviorState {
        match self {
            Self::Idle => BehaviorState::Idle,
            Self::Wandering => BehaviorState::Wandering,
            Self::Detecting(_) => BehaviorState::Detecting,
            Self::Chasing(_) => BehaviorState::Chasing,
        }
    }
}

/// State machine over Idle, Wandering, Detecting and Chasing
pub struct BehaviorCoordinator {
    current: BehaviorState,
    previous: Option<BehaviorState>,
    initial: BehaviorState,
    pre_chase: BehaviorState,
    started: bool,

    idle: IdleState,
    wandering: WanderingState,
    detecting: DetectingState,
    chasing: ChasingState,

    registry: TargetRegistry,
}

impl BehaviorCoordinator {
    /// Build every state from config and the agent's resolved animations
    pub fn new(config: &AgentConfig, animations: &AnimationSet, registry: TargetRegistry) -> Self {
        let initial = match config.initial_state {
            InitialState::Idle => BehaviorState::Idle,
            InitialState::Wandering => BehaviorState::Wandering,
        };

        Self {
            current: initial,
            previous: None,
            initial,
            pre_chase: BehaviorState::Idle,
            started: false,
            idle: IdleState::new(animations.idle.clone()),
            wandering: WanderingState::new(
                config.wander.clone(),
                animations.walk.clone(),
                animations.idle.clone(),
            ),
            detecting: DetectingState::new(
                config.detecting.clone(),
                animations.walk.clone(),
                animations.idle.clone(),
            ),
            chasing: ChasingState::new(config.chasing.clone(), animations),
            registry,
        }
    }

    /// Enter the initial state. Only the first call has an effect.
    pub fn start(&mut self, ctx: &mut StateContext<'_>) {
        if self.started {
            return;
        }
        self.started = true;

        match self.initial {
            BehaviorState::Wandering => self.wandering.enter(ctx),
            _ => self.idle.enter(ctx),
        }
        log::info!("{} starting in {}", ctx.agent, self.initial);
    }

    // ==================== Queries ====================

    /// Active state
    pub fn current_state(&self) -> BehaviorState {
        self.current
    }

    /// State before the last transition
    pub fn previous_state(&self) -> Option<BehaviorState> {
        self.previous
    }

    /// Check if in a specific state
    pub fn is_in(&self, state: BehaviorState) -> bool {
        self.current == state
    }

    pub fn is_idle(&self) -> bool {
        self.is_in(BehaviorState::Idle)
    }

    pub fn is_wandering(&self) -> bool {
        self.is_in(BehaviorState::Wandering)
    }

    pub fn is_detecting(&self) -> bool {
        self.is_in(BehaviorState::Detecting)
    }

    pub fn is_chasing(&self) -> bool {
        self.is_in(BehaviorState::Chasing)
    }

    /// States whose own active flag is set. Always exactly one once started.
    pub fn active_states(&self) -> Vec<BehaviorState> {
        [
            (BehaviorState::Idle, self.idle.is_active()),
            (BehaviorState::Wandering, self.wandering.is_active()),
            (BehaviorState::Detecting, self.detecting.is_active()),
            (BehaviorState::Chasing, self.chasing.is_active()),
        ]
        .into_iter()
        .filter(|(_, active)| *active)
        .map(|(state, _)| state)
        .collect()
    }

    /// State a finished chase will return to
    pub fn pre_chase_state(&self) -> BehaviorState {
        self.pre_chase
    }

    pub fn wandering(&self) -> &WanderingState {
        &self.wandering
    }

    pub fn detecting(&self) -> &DetectingState {
        &self.detecting
    }

    pub fn chasing(&self) -> &ChasingState {
        &self.chasing
    }

    // ==================== Driving ====================

    /// React to a detection event
    pub fn handle_event(
        &mut self,
        event: &DetectionEvent,
        ctx: &mut StateContext<'_>,
        detector: &mut VisionDetector,
    ) -> Option<StateChange> {
        match *event {
            DetectionEvent::NearDetected { target, .. } => {
                if self.is_chasing() {
                    return None;
                }
                self.start_chase(target, ctx, detector)
            }
            DetectionEvent::FarDetected {
                position,
                level: DetectionLevel::Investigate,
                ..
            } => {
                if !self.current.is_passive() {
                    return None;
                }
                Some(self.transition(Entry::Detecting(position), ctx))
            }
            DetectionEvent::FarDetected {
                target,
                level: DetectionLevel::Chase,
                ..
            } => {
                if self.is_chasing() {
                    return None;
                }
                self.start_chase(target, ctx, detector)
            }
            DetectionEvent::Lost { .. } => match self.current {
                BehaviorState::Detecting => {
                    let outcome = self.detecting.on_target_lost(ctx);
                    self.apply_outcome(outcome, ctx, detector)
                }
                BehaviorState::Chasing => {
                    self.chasing.on_target_lost();
                    None
                }
                _ => None,
            },
            DetectionEvent::Reacquired { .. } => {
                if self.is_chasing() {
                    self.chasing.on_target_reappear();
                }
                None
            }
            DetectionEvent::SwitchTarget { from, to } => {
                if !self.is_chasing() || self.chasing.target() != Some(from) {
                    return None;
                }
                let handle = self.resolve(to)?;
                self.chasing.retarget(ctx, handle.clone());
                detector.bind_target(handle);
                None
            }
        }
    }

    /// Run the active state for one frame
    pub fn update(
        &mut self,
        dt: f32,
        ctx: &mut StateContext<'_>,
        detector: &mut VisionDetector,
    ) -> Option<StateChange> {
        let outcome = match self.current {
            BehaviorState::Idle => self.idle.update(ctx, dt),
            BehaviorState::Wandering => self.wandering.update(ctx, dt),
            BehaviorState::Detecting => self.detecting.update(ctx, dt),
            BehaviorState::Chasing => self.chasing.update(ctx, dt),
        };
        self.apply_outcome(outcome, ctx, detector)
    }

    /// Exit whatever is running and fall back to Idle
    pub fn force_exit_current_state(
        &mut self,
        ctx: &mut StateContext<'_>,
        detector: &mut VisionDetector,
    ) -> Option<StateChange> {
        if self.is_chasing() {
            if let Some(target) = self.chasing.target() {
                log::info!(
                    "{} chase of {} ended: {:?}",
                    ctx.agent,
                    target,
                    ChaseEndReason::Forced
                );
            }
            detector.clear_target();
            self.wandering.discard_interruption();
        }
        self.pre_chase = BehaviorState::Idle;

        if self.is_idle() {
            return None;
        }
        Some(self.transition(Entry::Idle, ctx))
    }

    fn apply_outcome(
        &mut self,
        outcome: StateOutcome,
        ctx: &mut StateContext<'_>,
        detector: &mut VisionDetector,
    ) -> Option<StateChange> {
        match outcome {
            StateOutcome::Running => None,
            StateOutcome::InvestigationComplete
            | StateOutcome::TimedOut
            | StateOutcome::LostTarget => {
                log::debug!("{} investigation finished: {:?}", ctx.agent, outcome);
                Some(self.transition(Entry::Idle, ctx))
            }
            StateOutcome::ChaseEnded(_) => {
                detector.clear_target();
                let entry = match std::mem::replace(&mut self.pre_chase, BehaviorState::Idle) {
                    BehaviorState::Wandering => Entry::Wandering,
                    _ => Entry::Idle,
                };
                Some(self.transition(entry, ctx))
            }
        }
    }

    fn start_chase(
        &mut self,
        target: TargetId,
        ctx: &mut StateContext<'_>,
        detector: &mut VisionDetector,
    ) -> Option<StateChange> {
        let handle = self.resolve(target)?;

        self.pre_chase = if self.current.is_passive() {
            self.current
        } else {
            BehaviorState::Idle
        };
        if self.is_wandering() {
            self.wandering.mark_chase_interruption();
        }

        let change = self.transition(Entry::Chasing(handle.clone()), ctx);
        detector.bind_target(handle);
        Some(change)
    }

    fn resolve(&self, target: TargetId) -> Option<TargetHandle> {
        let handle = self.registry.get(target);
        if handle.is_none() {
            log::warn!("Ignoring event for unregistered {}", target);
        }
        handle
    }

    fn transition(&mut self, entry: Entry, ctx: &mut StateContext<'_>) -> StateChange {
        let from = self.current;
        let to = entry.state();

        match from {
            BehaviorState::Idle => self.idle.exit(ctx),
            BehaviorState::Wandering => self.wandering.exit(ctx),
            BehaviorState::Detecting => self.detecting.exit(ctx),
            BehaviorState::Chasing => self.chasing.exit(ctx),
        }

        match entry {
            Entry::Idle => self.idle.enter(ctx),
            Entry::Wandering => self.wandering.enter(ctx),
            Entry::Detecting(point) => self.detecting.enter(ctx, point),
            Entry::Chasing(handle) => self.chasing.enter(ctx, handle),
        }

        self.previous = Some(from);
        self.current = to;
        log::info!("{} {} -> {}", ctx.agent, from, to);

        StateChange { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{KinematicBody, Locomotion};
    use crate::config::VisionConfig;
    use crate::registry::{SharedTarget, Target};
    use crate::states::testing::{animations, RecordingAnimator};
    use crate::tracking::{AgentId, ChaseRegistry};

    struct Rig {
        body: KinematicBody,
        animator: RecordingAnimator,
        tracker: ChaseRegistry,
        registry: TargetRegistry,
        detector: VisionDetector,
        coordinator: BehaviorCoordinator,
        _targets: Vec<SharedTarget>,
    }

    impl Rig {
        fn new(initial: InitialState) -> Self {
            let registry = TargetRegistry::new();
            let targets = (1..=2)
                .map(|id| {
                    registry.spawn(
                        Target::builder(TargetId(id))
                            .with_position(Vec3::new(0.0, 0.0, 5.0 * id as f32))
                            .build()
                            .unwrap(),
                    )
                })
                .collect();
            let config = AgentConfig {
                initial_state: initial,
                ..Default::default()
            };

            let mut rig = Self {
                body: KinematicBody::new(Vec3::ZERO),
                animator: RecordingAnimator::default(),
                tracker: ChaseRegistry::new(),
                detector: VisionDetector::new(VisionConfig::default(), registry.clone()),
                coordinator: BehaviorCoordinator::new(&config, &animations(), registry.clone()),
                registry,
                _targets: targets,
            };
            rig.with(|c, ctx, _| c.start(ctx));
            rig
        }

        fn with<R>(
            &mut self,
            f: impl FnOnce(&mut BehaviorCoordinator, &mut StateContext<'_>, &mut VisionDetector) -> R,
        ) -> R {
            let mut ctx = StateContext {
                agent: AgentId(1),
                body: &mut self.body,
                animator: &mut self.animator,
                tracker: &self.tracker,
            };
            f(&mut self.coordinator, &mut ctx, &mut self.detector)
        }

        fn event(&mut self, event: DetectionEvent) -> Option<StateChange> {
            self.with(|c, ctx, d| c.handle_event(&event, ctx, d))
        }

        fn update(&mut self, dt: f32) -> Option<StateChange> {
            self.with(|c, ctx, d| c.update(dt, ctx, d))
        }

        fn assert_exclusive(&self) {
            assert_eq!(
                self.coordinator.active_states(),
                vec![self.coordinator.current_state()]
            );
        }
    }

    fn near(id: u64) -> DetectionEvent {
        DetectionEvent::NearDetected {
            target: TargetId(id),
            position: Vec3::new(0.0, 0.0, 5.0),
        }
    }

    fn far(id: u64, level: DetectionLevel) -> DetectionEvent {
        DetectionEvent::FarDetected {
            target: TargetId(id),
            position: Vec3::new(0.0, 0.0, 20.0),
            level,
        }
    }

    fn lost(id: u64) -> DetectionEvent {
        DetectionEvent::Lost {
            target: TargetId(id),
            last_known_position: Vec3::new(0.0, 0.0, 5.0),
        }
    }

    #[test]
    fn test_initial_state() {
        let rig = Rig::new(InitialState::Idle);
        assert!(rig.coordinator.is_idle());
        rig.assert_exclusive();

        let rig = Rig::new(InitialState::Wandering);
        assert!(rig.coordinator.is_wandering());
        rig.assert_exclusive();
    }

    #[test]
    fn test_near_detection_starts_chase_and_binds() {
        let mut rig = Rig::new(InitialState::Idle);
        let change = rig.event(near(1));

        assert_eq!(
            change,
            Some(StateChange {
                from: BehaviorState::Idle,
                to: BehaviorState::Chasing
            })
        );
        assert_eq!(rig.detector.bound_target(), Some(TargetId(1)));
        assert!(rig.tracker.is_chased(TargetId(1)));
        rig.assert_exclusive();

        // Ignored while already chasing
        assert_eq!(rig.event(near(2)), None);
        assert_eq!(rig.coordinator.chasing().target(), Some(TargetId(1)));
    }

    #[test]
    fn test_far_investigate_only_from_passive() {
        let mut rig = Rig::new(InitialState::Wandering);
        assert!(rig.event(far(1, DetectionLevel::Investigate)).is_some());
        assert!(rig.coordinator.is_detecting());
        assert_eq!(
            rig.coordinator.detecting().investigation_target(),
            Vec3::new(0.0, 0.0, 20.0)
        );

        assert_eq!(rig.event(far(1, DetectionLevel::Investigate)), None);

        rig.event(far(1, DetectionLevel::Chase));
        assert!(rig.coordinator.is_chasing());
        assert_eq!(rig.event(far(1, DetectionLevel::Investigate)), None);
        rig.assert_exclusive();
    }

    #[test]
    fn test_detecting_times_out_to_idle() {
        let mut rig = Rig::new(InitialState::Wandering);
        rig.event(far(1, DetectionLevel::Investigate));

        let mut changes = Vec::new();
        for _ in 0..60 {
            if let Some(change) = rig.update(0.1) {
                changes.push(change);
            }
            rig.assert_exclusive();
        }
        assert_eq!(
            changes,
            vec![StateChange {
                from: BehaviorState::Detecting,
                to: BehaviorState::Idle
            }]
        );
    }

    #[test]
    fn test_lost_while_detecting_goes_idle() {
        let mut rig = Rig::new(InitialState::Idle);
        rig.event(far(1, DetectionLevel::Investigate));
        let change = rig.event(lost(1));
        assert_eq!(change.map(|c| c.to), Some(BehaviorState::Idle));
        assert!(!rig.coordinator.detecting().is_active());
    }

    #[test]
    fn test_lost_while_chasing_starts_persistence() {
        let mut rig = Rig::new(InitialState::Idle);
        rig.event(near(1));
        assert_eq!(rig.event(lost(1)), None);
        assert!(rig.coordinator.chasing().is_persisting());

        rig.event(DetectionEvent::Reacquired {
            target: TargetId(1),
            position: Vec3::ZERO,
        });
        assert!(!rig.coordinator.chasing().is_persisting());
    }

    #[test]
    fn test_chase_end_restores_wandering() {
        let mut rig = Rig::new(InitialState::Wandering);
        for _ in 0..30 {
            rig.update(0.25);
        }
        let index = rig.coordinator.wandering().waypoint_index();

        rig.event(near(1));
        assert_eq!(rig.coordinator.pre_chase_state(), BehaviorState::Wandering);

        // Target despawns; the chase ends on the next refresh
        rig._targets.clear();
        let change = rig.update(0.1);
        assert_eq!(
            change,
            Some(StateChange {
                from: BehaviorState::Chasing,
                to: BehaviorState::Wandering
            })
        );
        assert_eq!(rig.coordinator.wandering().waypoint_index(), index);
        assert_eq!(rig.detector.bound_target(), None);
        assert!(!rig.tracker.is_chased(TargetId(1)));
        rig.assert_exclusive();
    }

    #[test]
    fn test_chase_end_from_idle_returns_idle() {
        let mut rig = Rig::new(InitialState::Idle);
        rig.event(near(1));
        rig._targets.clear();
        let change = rig.update(0.1);
        assert_eq!(change.map(|c| c.to), Some(BehaviorState::Idle));
    }

    #[test]
    fn test_switch_target_retargets_chase() {
        let mut rig = Rig::new(InitialState::Idle);
        rig.event(near(1));

        // Wrong source is ignored
        rig.event(DetectionEvent::SwitchTarget {
            from: TargetId(2),
            to: TargetId(1),
        });
        assert_eq!(rig.coordinator.chasing().target(), Some(TargetId(1)));

        assert_eq!(
            rig.event(DetectionEvent::SwitchTarget {
                from: TargetId(1),
                to: TargetId(2),
            }),
            None
        );
        assert!(rig.coordinator.is_chasing());
        assert_eq!(rig.coordinator.chasing().target(), Some(TargetId(2)));
        assert_eq!(rig.detector.bound_target(), Some(TargetId(2)));
        assert!(!rig.tracker.is_chased(TargetId(1)));
        assert!(rig.tracker.is_chased(TargetId(2)));
    }

    #[test]
    fn test_force_exit() {
        let mut rig = Rig::new(InitialState::Wandering);
        rig.event(near(1));
        let change = rig.with(|c, ctx, d| c.force_exit_current_state(ctx, d));

        assert_eq!(change.map(|c| c.to), Some(BehaviorState::Idle));
        assert_eq!(rig.detector.bound_target(), None);
        assert_eq!(rig.tracker.chaser_count(TargetId(1)), 0);
        assert_eq!(rig.with(|c, ctx, d| c.force_exit_current_state(ctx, d)), None);
        rig.assert_exclusive();
    }

    #[test]
    fn test_force_exit_forgets_interrupted_wander() {
        let mut rig = Rig::new(InitialState::Wandering);
        for _ in 0..30 {
            rig.update(0.25);
        }
        rig.event(near(1));
        assert!(rig.coordinator.wandering().was_interrupted());
        assert!(rig.coordinator.wandering().path().is_some());

        rig.with(|c, ctx, d| c.force_exit_current_state(ctx, d));
        assert!(!rig.coordinator.wandering().was_interrupted());
        assert!(rig.coordinator.wandering().path().is_none());
        assert_eq!(rig.coordinator.pre_chase_state(), BehaviorState::Idle);
        rig.assert_exclusive();
    }

    #[test]
    fn test_unknown_target_is_ignored() {
        let mut rig = Rig::new(InitialState::Idle);
        assert_eq!(rig.event(near(99)), None);
        assert!(rig.coordinator.is_idle());
        assert!(rig.body.position() == Vec3::ZERO);
    }
}
