//! Horde AI - perception and behaviour core for hostile NPCs
//!
//! This crate decides what an agent sees and what it does about it. Sight is
//! answered by a [`LineOfSight`](horde_physics::LineOfSight) implementation
//! (usually a `horde_physics::OcclusionWorld`); movement and animation are
//! delegated to the host through small traits.
//!
//! # Features
//!
//! - Three-phase vision (range, cone, line of sight) over weakly held targets
//! - Body-part hit combinations filtered by observer category
//! - Hysteresis timers that debounce far sightings into investigate/chase
//! - Lost, reacquired and target-switch signals for a bound target
//! - Idle, Wandering, Detecting and Chasing states under one coordinator
//! - Per-agent animation clip selection with a seeded RNG
//! - Channel-based event fan-out for UI, audio and scripting layers
//!
//! # Architecture
//!
//! ```text
//!   TargetRegistry ──snapshot──▶ VisionDetector ──DetectionEvent──▶ BehaviorCoordinator
//!                                     ▲                                  │
//!                               LineOfSight                 Idle / Wandering / Detecting / Chasing
//!                                                                        │
//!                                                     Locomotion · Animator · ChaseTracker
//! ```
//!
//! # Example
//!
//! ```ignore
//! use horde_ai::prelude::*;
//! use horde_physics::OcclusionWorld;
//!
//! let registry = TargetRegistry::new();
//! let mut agent = Agent::builder(AgentId(1), registry.clone())
//!     .with_config(AgentConfig::load("configs/zombie.json")?)
//!     .build()?;
//!
//! let world = OcclusionWorld::new();
//! for event in agent.tick(1.0 / 60.0, &world) {
//!     log::info!("{:?}", event);
//! }
//! ```

pub mod agent;
pub mod animation;
pub mod body;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod geometry;
pub mod registry;
pub mod states;
pub mod steering;
pub mod timer;
pub mod tracking;
pub mod vision;

pub mod prelude {
    pub use crate::agent::{Agent, AgentBuilder};
    pub use crate::animation::{
        AnimationSet, AnimationSetConfig, AnimationStateConfig, Animator, ClipEntry, NullAnimator,
        ResolvedAnimation,
    };
    pub use crate::body::{EyePose, KinematicBody, Locomotion, Navigator};
    pub use crate::config::{
        AgentConfig, ChasingConfig, DetectingConfig, InitialState, VisionConfig, WanderConfig,
    };
    pub use crate::coordinator::{BehaviorCoordinator, StateChange};
    pub use crate::error::{AiError, ConfigError, Result};
    pub use crate::events::{AgentEvent, DetectionEvent, DetectionLevel, EventHub};
    pub use crate::registry::{
        SharedTarget, Target, TargetBuilder, TargetHandle, TargetId, TargetRegistry,
    };
    pub use crate::states::{
        BehaviorState, ChaseEndReason, StateContext, StateOutcome, WanderDirection, WanderPath,
        WanderStep,
    };
    pub use crate::tracking::{AgentId, ChaseRegistry, ChaseTracker, NullChaseTracker};
    pub use crate::vision::{DetectorStatus, Sighting, VisionDetector};
}

pub use prelude::*;
