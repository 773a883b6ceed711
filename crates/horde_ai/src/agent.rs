//! Agent assembly
//!
//! [`AgentBuilder`] wires one agent's component graph at construction time:
//! detector, coordinator, states, body, animator and chase tracker. Nothing
//! is looked up at runtime.

use crate::animation::{AnimationSet, Animator, NullAnimator};
use crate::body::{KinematicBody, Locomotion};
use crate::config::AgentConfig;
use crate::coordinator::{BehaviorCoordinator, StateChange};
use crate::error::Result;
use crate::events::{AgentEvent, EventHub};
use crate::registry::TargetRegistry;
use crate::states::{BehaviorState, StateContext};
use crate::tracking::{AgentId, ChaseTracker, NullChaseTracker};
use crate::vision::VisionDetector;
use crossbeam_channel::Receiver;
use glam::Vec3;
use horde_physics::query::LineOfSight;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Builder for [`Agent`]
pub struct AgentBuilder {
    id: AgentId,
    config: AgentConfig,
    registry: TargetRegistry,
    tracker: Arc<dyn ChaseTracker>,
    body: Option<Box<dyn Locomotion>>,
    animator: Box<dyn Animator>,
    seed: Option<u64>,
}

impl AgentBuilder {
    /// Start building an agent that senses targets in `registry`
    pub fn new(id: AgentId, registry: TargetRegistry) -> Self {
        Self {
            id,
            config: AgentConfig::default(),
            registry,
            tracker: Arc::new(NullChaseTracker),
            body: None,
            animator: Box::new(NullAnimator),
            seed: None,
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the chase relationship tracker
    pub fn with_chase_tracker(mut self, tracker: Arc<dyn ChaseTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Set the body (defaults to a [`KinematicBody`] at the origin)
    pub fn with_body(mut self, body: impl Locomotion + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// Set the animator
    pub fn with_animator(mut self, animator: impl Animator + 'static) -> Self {
        self.animator = Box::new(animator);
        self
    }

    /// Seed for animation clip selection (defaults to the agent id)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the agent and enter its initial state.
    ///
    /// Behaviour config contradictions are errors. Vision faults are not:
    /// they are logged and the agent is built with detection disabled.
    pub fn build(self) -> Result<Agent> {
        let config = self.config.sanitized();
        config.detecting.validate()?;
        config.chasing.validate()?;
        config.wander.validate()?;

        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or(self.id.0));
        let animations = config.animations.resolve(&mut rng);

        let body = self
            .body
            .unwrap_or_else(|| Box::new(KinematicBody::new(Vec3::ZERO)));

        let mut detector = VisionDetector::new(config.vision.clone(), self.registry.clone());
        if body.eye_pose().is_none() {
            detector.disable("observer has no eye pose");
        }

        let coordinator = BehaviorCoordinator::new(&config, &animations, self.registry);

        let mut agent = Agent {
            id: self.id,
            config,
            animations,
            detector,
            coordinator,
            body,
            animator: self.animator,
            tracker: self.tracker,
            events: EventHub::new(),
        };
        agent.start();

        log::info!(
            "{} ready in {} (detection {:?})",
            agent.id,
            agent.current_state(),
            agent.detector.status()
        );
        Ok(agent)
    }
}

/// One fully wired agent
pub struct Agent {
    id: AgentId,
    config: AgentConfig,
    animations: AnimationSet,
    detector: VisionDetector,
    coordinator: BehaviorCoordinator,
    body: Box<dyn Locomotion>,
    animator: Box<dyn Animator>,
    tracker: Arc<dyn ChaseTracker>,
    events: EventHub,
}

impl Agent {
    /// Start building an agent
    pub fn builder(id: AgentId, registry: TargetRegistry) -> AgentBuilder {
        AgentBuilder::new(id, registry)
    }

    fn start(&mut self) {
        let mut ctx = StateContext {
            agent: self.id,
            body: self.body.as_mut(),
            animator: self.animator.as_mut(),
            tracker: self.tracker.as_ref(),
        };
        self.coordinator.start(&mut ctx);
    }

    /// Advance one frame.
    ///
    /// Order: detector timers, the evaluation pass when due, event handling,
    /// then the active state's update. Everything that happened is returned
    /// and published to subscribers. If the detector is no longer active, a
    /// chase or investigation is force-exited to Idle first.
    pub fn tick(&mut self, dt: f32, sight: &dyn LineOfSight) -> Vec<AgentEvent> {
        let eye = self.body.eye_pose();
        let detections = self.detector.tick(dt, eye, sight);

        let mut ctx = StateContext {
            agent: self.id,
            body: self.body.as_mut(),
            animator: self.animator.as_mut(),
            tracker: self.tracker.as_ref(),
        };

        let mut out = Vec::with_capacity(detections.len() + 1);
        for detection in detections {
            out.push(AgentEvent::Detection(detection));
            if let Some(change) =
                self.coordinator
                    .handle_event(&detection, &mut ctx, &mut self.detector)
            {
                out.push(change.into());
            }
        }

        // A halted or disabled detector leaves the agent inert
        if !self.detector.is_active() && !self.coordinator.current_state().is_passive() {
            log::warn!(
                "{} perception stopped ({:?}) while {}",
                self.id,
                self.detector.status(),
                self.coordinator.current_state()
            );
            if let Some(change) = self
                .coordinator
                .force_exit_current_state(&mut ctx, &mut self.detector)
            {
                out.push(change.into());
            }
        }

        if let Some(change) = self.coordinator.update(dt, &mut ctx, &mut self.detector) {
            out.push(change.into());
        }

        for event in &out {
            self.events.publish(*event);
        }
        out
    }

    /// Exit the current state and go Idle
    pub fn force_exit_current_state(&mut self) -> Option<StateChange> {
        let mut ctx = StateContext {
            agent: self.id,
            body: self.body.as_mut(),
            animator: self.animator.as_mut(),
            tracker: self.tracker.as_ref(),
        };
        let change = self
            .coordinator
            .force_exit_current_state(&mut ctx, &mut self.detector);
        if let Some(change) = change {
            self.events.publish(change.into());
        }
        change
    }

    /// Receive every future event of this agent
    pub fn subscribe(&mut self) -> Receiver<AgentEvent> {
        self.events.subscribe()
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn current_state(&self) -> BehaviorState {
        self.coordinator.current_state()
    }

    pub fn is_idle(&self) -> bool {
        self.coordinator.is_idle()
    }

    pub fn is_wandering(&self) -> bool {
        self.coordinator.is_wandering()
    }

    pub fn is_detecting(&self) -> bool {
        self.coordinator.is_detecting()
    }

    pub fn is_chasing(&self) -> bool {
        self.coordinator.is_chasing()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn animations(&self) -> &AnimationSet {
        &self.animations
    }

    pub fn detector(&self) -> &VisionDetector {
        &self.detector
    }

    /// Mutable detector access (e.g. to switch evaluation mode)
    pub fn detector_mut(&mut self) -> &mut VisionDetector {
        &mut self.detector
    }

    pub fn coordinator(&self) -> &BehaviorCoordinator {
        &self.coordinator
    }

    pub fn body(&self) -> &dyn Locomotion {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> &mut dyn Locomotion {
        self.body.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialState;
    use crate::error::{AiError, ConfigError};
    use crate::events::DetectionEvent;
    use crate::registry::TargetId;
    use crate::tracking::ChaseRegistry;
    use crate::vision::tests::{dummy, SphereSight};
    use crate::vision::{DetectorStatus, MAX_POSE_FAILURES};
    use crate::body::EyePose;
    use glam::Quat;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_build_defaults() {
        let agent = Agent::builder(AgentId(1), TargetRegistry::new()).build().unwrap();
        assert!(agent.is_idle());
        assert_eq!(agent.detector().status(), DetectorStatus::Active);
        assert_eq!(agent.animations().chase_run.state_name, "ChaseRun");
    }

    #[test]
    fn test_missing_eye_disables_detection() {
        let registry = TargetRegistry::new();
        let shared = registry.spawn(dummy(1, Vec3::new(0.0, 1.7, 5.0)));
        let sight = SphereSight {
            targets: vec![shared],
            ..Default::default()
        };

        let mut agent = Agent::builder(AgentId(1), registry)
            .with_body(KinematicBody::new(Vec3::ZERO).with_eye_offset(None))
            .build()
            .unwrap();
        assert_eq!(agent.detector().status(), DetectorStatus::Disabled);

        for _ in 0..20 {
            assert!(agent.tick(0.1, &sight).is_empty());
        }
        assert!(agent.is_idle());
    }

    #[test]
    fn test_invalid_behaviour_config_is_an_error() {
        let mut config = AgentConfig::default();
        config.chasing.max_chase_distance = -1.0;
        let result = Agent::builder(AgentId(1), TargetRegistry::new())
            .with_config(config)
            .build();
        assert!(matches!(
            result,
            Err(AiError::Config(ConfigError::NonPositive { name: "max_chase_distance", .. }))
        ));
    }

    #[test]
    fn test_tick_detects_chases_and_publishes() {
        let registry = TargetRegistry::new();
        let shared = registry.spawn(dummy(1, Vec3::new(0.0, 1.7, 8.0)));
        let sight = SphereSight {
            targets: vec![shared],
            ..Default::default()
        };
        let tracker = ChaseRegistry::new();

        let mut agent = Agent::builder(AgentId(3), registry)
            .with_chase_tracker(Arc::new(tracker.clone()))
            .build()
            .unwrap();
        let rx = agent.subscribe();

        let events = agent.tick(0.1, &sight);
        assert!(matches!(
            events[0],
            AgentEvent::Detection(DetectionEvent::NearDetected { target: TargetId(1), .. })
        ));
        assert_eq!(
            events[1],
            AgentEvent::StateChanged {
                from: BehaviorState::Idle,
                to: BehaviorState::Chasing
            }
        );
        assert!(agent.is_chasing());
        assert!(tracker.is_chased(TargetId(1)));
        assert_eq!(rx.try_iter().count(), 2);

        // Running toward the target
        agent.tick(0.1, &sight);
        assert!(agent.body().position().z > 0.0);
    }

    /// Kinematic body whose eye can be taken away mid-run
    struct FlickeringEye {
        inner: KinematicBody,
        blind: Arc<AtomicBool>,
    }

    impl Locomotion for FlickeringEye {
        fn position(&self) -> Vec3 {
            self.inner.position()
        }

        fn rotation(&self) -> Quat {
            self.inner.rotation()
        }

        fn set_position(&mut self, position: Vec3) {
            self.inner.set_position(position);
        }

        fn set_rotation(&mut self, rotation: Quat) {
            self.inner.set_rotation(rotation);
        }

        fn eye_pose(&self) -> Option<EyePose> {
            if self.blind.load(Ordering::Relaxed) {
                None
            } else {
                self.inner.eye_pose()
            }
        }
    }

    fn chasing_agent(
        blind: &Arc<AtomicBool>,
    ) -> (Agent, SphereSight, ChaseRegistry, crate::registry::SharedTarget) {
        let registry = TargetRegistry::new();
        let shared = registry.spawn(dummy(1, Vec3::new(0.0, 1.7, 12.0)));
        let sight = SphereSight {
            targets: vec![shared.clone()],
            ..Default::default()
        };
        let tracker = ChaseRegistry::new();

        let mut agent = Agent::builder(AgentId(5), registry)
            .with_body(FlickeringEye {
                inner: KinematicBody::new(Vec3::ZERO),
                blind: blind.clone(),
            })
            .with_chase_tracker(Arc::new(tracker.clone()))
            .build()
            .unwrap();
        agent.detector_mut().set_use_frame_updates(true);

        agent.tick(0.02, &sight);
        assert!(agent.is_chasing());
        assert!(tracker.is_chased(TargetId(1)));
        (agent, sight, tracker, shared)
    }

    #[test]
    fn test_halted_perception_ends_chase() {
        let blind = Arc::new(AtomicBool::new(false));
        let (mut agent, sight, tracker, _target) = chasing_agent(&blind);

        blind.store(true, Ordering::Relaxed);
        for _ in 0..MAX_POSE_FAILURES - 1 {
            assert!(agent.tick(0.02, &sight).is_empty());
        }
        assert!(agent.is_chasing());

        let events = agent.tick(0.02, &sight);
        assert_eq!(agent.detector().status(), DetectorStatus::Halted);
        assert_eq!(
            events,
            vec![AgentEvent::StateChanged {
                from: BehaviorState::Chasing,
                to: BehaviorState::Idle
            }]
        );
        assert!(agent.is_idle());
        assert!(!tracker.is_chased(TargetId(1)));

        // Stays inert once the eye comes back
        blind.store(false, Ordering::Relaxed);
        for _ in 0..20 {
            assert!(agent.tick(0.1, &sight).is_empty());
        }
        assert!(agent.is_idle());
    }

    #[test]
    fn test_disabled_detector_ends_chase_on_next_tick() {
        let blind = Arc::new(AtomicBool::new(false));
        let (mut agent, sight, tracker, _target) = chasing_agent(&blind);

        agent.detector_mut().disable("test");
        let events = agent.tick(0.02, &sight);
        assert_eq!(
            events,
            vec![AgentEvent::StateChanged {
                from: BehaviorState::Chasing,
                to: BehaviorState::Idle
            }]
        );
        assert_eq!(agent.detector().bound_target(), None);
        assert!(!tracker.is_chased(TargetId(1)));
    }

    #[test]
    fn test_force_exit_publishes() {
        let mut config = AgentConfig::default();
        config.initial_state = InitialState::Wandering;
        let mut agent = Agent::builder(AgentId(1), TargetRegistry::new())
            .with_config(config)
            .build()
            .unwrap();
        let rx = agent.subscribe();

        assert!(agent.is_wandering());
        let change = agent.force_exit_current_state();
        assert_eq!(change.map(|c| c.to), Some(BehaviorState::Idle));
        assert_eq!(
            rx.try_recv().unwrap(),
            AgentEvent::StateChanged {
                from: BehaviorState::Wandering,
                to: BehaviorState::Idle
            }
        );
    }
}
