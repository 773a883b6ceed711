//! End-to-end scenarios against a real occlusion world

use glam::{Quat, Vec3};
use horde_ai::prelude::*;
use horde_physics::{ColliderDesc, ColliderHandle, ColliderShape, CollisionLayer, OcclusionWorld};

const DT: f32 = 0.1;
const PART_RADIUS: f32 = 0.3;

struct Scene {
    world: OcclusionWorld,
    registry: TargetRegistry,
    targets: Vec<SharedTarget>,
}

impl Scene {
    fn new() -> Self {
        Self {
            world: OcclusionWorld::new(),
            registry: TargetRegistry::new(),
            targets: Vec::new(),
        }
    }

    /// A player with a single chest anchor one metre above its root
    fn spawn_player(&mut self, id: u64, position: Vec3) -> SharedTarget {
        let target = Target::builder(TargetId(id))
            .with_position(position)
            .with_part("chest", Vec3::new(0.0, 1.0, 0.0))
            .with_combination("silhouette", u32::MAX, &["chest"])
            .build()
            .unwrap();
        self.spawn(target)
    }

    /// Register a target and give every body part a tagged collider
    fn spawn(&mut self, target: Target) -> SharedTarget {
        let tag = target.id().collider_tag();
        for index in 0..target.parts().len() {
            let anchor = target.part_position(index).unwrap();
            self.world
                .add_collider_for_owner(
                    tag,
                    ColliderDesc::new(ColliderShape::sphere(PART_RADIUS))
                        .with_position(anchor.x, anchor.y, anchor.z)
                        .with_layer(CollisionLayer::PLAYERS),
                )
                .unwrap();
        }

        let shared = self.registry.spawn(target);
        self.targets.push(shared.clone());
        shared
    }

    /// Remove a target from the world entirely
    fn despawn(&mut self, id: TargetId) {
        self.world.remove_owner(id.collider_tag());
        self.targets.retain(|t| t.read().id() != id);
    }

    fn add_wall(&mut self, center: Vec3, half_extents: Vec3) -> ColliderHandle {
        self.world
            .add_collider(
                ColliderDesc::new(ColliderShape::cuboid(
                    half_extents.x,
                    half_extents.y,
                    half_extents.z,
                ))
                .with_position(center.x, center.y, center.z)
                .with_layer(CollisionLayer::BUILDINGS),
            )
            .unwrap()
    }

    fn agent(&self, initial: InitialState) -> Agent {
        let config = AgentConfig {
            initial_state: initial,
            ..Default::default()
        };
        Agent::builder(AgentId(1), self.registry.clone())
            .with_config(config)
            .build()
            .unwrap()
    }

    /// Tick for `seconds`, returning every event with the time it happened
    fn run(&self, agent: &mut Agent, seconds: f32) -> Vec<(f32, AgentEvent)> {
        let steps = (seconds / DT).round() as usize;
        let mut out = Vec::new();
        for step in 1..=steps {
            for event in agent.tick(DT, &self.world) {
                out.push((step as f32 * DT, event));
            }
        }
        out
    }
}

fn eye() -> EyePose {
    EyePose::new(Vec3::new(0.0, 1.7, 0.0), Quat::IDENTITY)
}

fn entered(events: &[(f32, AgentEvent)], state: BehaviorState) -> Vec<f32> {
    events
        .iter()
        .filter(|(_, e)| matches!(e, AgentEvent::StateChanged { to, .. } if *to == state))
        .map(|(t, _)| *t)
        .collect()
}

#[test]
fn test_near_target_is_chased_immediately() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 10.0));
    let mut agent = scene.agent(InitialState::Idle);

    let events = agent.tick(DT, &scene.world);
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
    assert_eq!(agent.detector().bound_target(), Some(TargetId(1)));
}

#[test]
fn test_wall_hides_near_target() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 10.0));
    scene.add_wall(Vec3::new(0.0, 1.5, 5.0), Vec3::new(3.0, 3.0, 0.2));
    let mut agent = scene.agent(InitialState::Idle);

    assert!(scene.run(&mut agent, 3.0).is_empty());
    assert!(agent.is_idle());
}

#[test]
fn test_far_target_is_investigated_but_not_chased_once_hidden() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 25.0));
    let mut agent = scene.agent(InitialState::Idle);

    let events = scene.run(&mut agent, 5.5);
    let detecting = entered(&events, BehaviorState::Detecting);
    assert_eq!(detecting.len(), 1);
    assert!(
        detecting[0] >= 5.0 && detecting[0] <= 5.4,
        "investigated at {}",
        detecting[0]
    );
    assert!(agent.is_detecting());

    scene.add_wall(Vec3::new(0.0, 1.5, 15.0), Vec3::new(4.0, 3.0, 0.2));
    let events = scene.run(&mut agent, 10.0);

    assert!(!events.iter().any(|(_, e)| matches!(
        e,
        AgentEvent::Detection(DetectionEvent::FarDetected {
            level: DetectionLevel::Chase,
            ..
        })
    )));
    assert!(entered(&events, BehaviorState::Chasing).is_empty());
    // Investigation times out
    assert_eq!(entered(&events, BehaviorState::Idle).len(), 1);
    assert!(agent.is_idle());
    assert_eq!(agent.detector().far_target(), None);
}

#[test]
fn test_far_target_in_view_escalates_to_chase() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 25.0));
    let mut agent = scene.agent(InitialState::Idle);

    let events = scene.run(&mut agent, 9.0);
    assert_eq!(entered(&events, BehaviorState::Detecting).len(), 1);
    let chasing = entered(&events, BehaviorState::Chasing);
    assert_eq!(chasing.len(), 1);
    assert!(chasing[0] >= 8.0 && chasing[0] <= 8.5, "chased at {}", chasing[0]);
}

#[test]
fn test_lost_fires_once_with_last_seen_position() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 10.0));
    let mut detector = VisionDetector::new(VisionConfig::default(), scene.registry.clone());
    detector.bind_target(scene.registry.get(TargetId(1)).unwrap());

    for _ in 0..5 {
        detector.tick(DT, Some(eye()), &scene.world);
    }
    assert!(detector.is_target_visible());

    scene.add_wall(Vec3::new(0.0, 1.5, 5.0), Vec3::new(3.0, 3.0, 0.2));
    let mut lost = Vec::new();
    for _ in 0..160 {
        lost.extend(
            detector
                .tick(DT, Some(eye()), &scene.world)
                .into_iter()
                .filter(DetectionEvent::is_lost),
        );
    }

    assert_eq!(
        lost,
        vec![DetectionEvent::Lost {
            target: TargetId(1),
            last_known_position: Vec3::new(0.0, 0.0, 10.0),
        }]
    );
    assert_eq!(detector.bound_target(), Some(TargetId(1)));
    assert!(!detector.is_lost_timer_armed());
}

#[test]
fn test_priority_target_wins_unless_occluded() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(-2.0, 0.0, 12.0));
    scene.spawn_player(2, Vec3::new(2.0, 0.0, 8.0));
    let mut detector = VisionDetector::new(VisionConfig::default(), scene.registry.clone());

    let nearest = detector.detect_now(&eye(), &scene.world, None).unwrap();
    assert_eq!(nearest.target, TargetId(2));

    let preferred = detector
        .detect_now(&eye(), &scene.world, Some(TargetId(1)))
        .unwrap();
    assert_eq!(preferred.target, TargetId(1));

    // Block the ray to target 1 only
    scene.add_wall(Vec3::new(-1.0, 1.35, 6.0), Vec3::new(0.3, 0.3, 0.1));
    let fallback = detector
        .detect_now(&eye(), &scene.world, Some(TargetId(1)))
        .unwrap();
    assert_eq!(fallback.target, TargetId(2));
}

#[test]
fn test_combination_requires_every_part() {
    let mut scene = Scene::new();
    let target = Target::builder(TargetId(1))
        .with_position(Vec3::new(0.0, 0.0, 10.0))
        .with_part("head", Vec3::new(0.0, 1.6, 0.0))
        .with_part("chest", Vec3::new(0.0, 1.0, 0.0))
        .with_combination("upper body", u32::MAX, &["head", "chest"])
        .build()
        .unwrap();
    scene.spawn(target);
    let mut detector = VisionDetector::new(VisionConfig::default(), scene.registry.clone());

    assert!(detector.detect_now(&eye(), &scene.world, None).is_some());

    // Low wall: blocks the chest ray, the head ray passes over it
    let wall = scene.add_wall(Vec3::new(0.0, 1.2, 5.0), Vec3::new(1.0, 0.25, 0.1));
    assert!(detector.detect_now(&eye(), &scene.world, None).is_none());

    scene.world.remove_collider(wall).unwrap();
    assert!(detector.detect_now(&eye(), &scene.world, None).is_some());
}

#[test]
fn test_chase_returns_to_wandering_and_resumes_path() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 10.0));
    let mut agent = scene.agent(InitialState::Wandering);
    assert!(agent.is_wandering());

    scene.run(&mut agent, DT);
    assert!(agent.is_chasing());
    assert_eq!(agent.coordinator().pre_chase_state(), BehaviorState::Wandering);
    assert!(agent.coordinator().wandering().was_interrupted());
    let waypoint = agent.coordinator().wandering().current_waypoint();

    scene.despawn(TargetId(1));
    let events = scene.run(&mut agent, 1.0);

    assert_eq!(entered(&events, BehaviorState::Wandering).len(), 1);
    assert!(agent.is_wandering());
    assert_eq!(agent.coordinator().wandering().current_waypoint(), waypoint);
    assert_eq!(agent.detector().bound_target(), None);
}

#[test]
fn test_chase_from_idle_returns_to_idle() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 10.0));
    let mut agent = scene.agent(InitialState::Idle);

    scene.run(&mut agent, DT);
    assert!(agent.is_chasing());

    scene.despawn(TargetId(1));
    scene.run(&mut agent, 1.0);
    assert!(agent.is_idle());
    assert_eq!(agent.coordinator().previous_state(), Some(BehaviorState::Chasing));
}

#[test]
fn test_exactly_one_state_active_throughout() {
    let mut scene = Scene::new();
    scene.spawn_player(1, Vec3::new(0.0, 0.0, 25.0));
    let mut agent = scene.agent(InitialState::Wandering);

    let mut wall: Option<ColliderHandle> = None;
    for step in 0..400 {
        // Toggle a wall in front of the target every three seconds
        if step % 30 == 0 {
            match wall.take() {
                Some(handle) => scene.world.remove_collider(handle).unwrap(),
                None => {
                    wall = Some(scene.add_wall(
                        Vec3::new(0.0, 1.5, 20.0),
                        Vec3::new(20.0, 3.0, 0.2),
                    ))
                }
            }
        }
        if step == 250 {
            scene.spawn_player(2, Vec3::new(1.0, 0.0, 6.0));
        }

        agent.tick(DT, &scene.world);
        let active = agent.coordinator().active_states();
        assert_eq!(active, vec![agent.current_state()], "at step {}", step);
    }
}
