//! Horde scenario runner
//!
//! Runs one zombie against two scripted players inside a small walled yard
//! and logs everything the agent senses and decides.
//!
//! Run with: cargo run -p horde_sim
//!       or: cargo run --bin horde-sim -- configs/zombie.json

use std::sync::Arc;

use glam::Vec3;
use horde_ai::prelude::*;
use horde_physics::{ColliderDesc, ColliderShape, CollisionLayer, OcclusionWorld};

const TICK_RATE: f32 = 60.0;
const DURATION: f32 = 45.0;

type SimResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// A scripted player walking a straight line
struct Walker {
    target: SharedTarget,
    velocity: Vec3,
}

impl Walker {
    fn step(&self, world: &mut OcclusionWorld, dt: f32) -> horde_physics::Result<()> {
        let offset = self.velocity * dt;
        let id = {
            let mut target = self.target.write();
            let next = target.position() + offset;
            target.set_position(next);
            target.id()
        };
        world.translate_owner(id.collider_tag(), offset.to_array())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("Simulation failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> SimResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig {
            initial_state: InitialState::Wandering,
            ..Default::default()
        },
    };

    let mut world = OcclusionWorld::new();
    let registry = TargetRegistry::new();
    build_yard(&mut world)?;

    // Crosses the far range behind a wall
    let crossing = Walker {
        target: spawn_player(&mut world, &registry, 1, Vec3::new(-20.0, 0.0, 24.0))?,
        velocity: Vec3::new(1.5, 0.0, 0.0),
    };
    // Walks straight at the zombie from out of range
    let approaching = Walker {
        target: spawn_player(&mut world, &registry, 2, Vec3::new(3.0, 0.0, 45.0))?,
        velocity: Vec3::new(0.0, 0.0, -0.8),
    };
    let walkers = [crossing, approaching];
    log::info!("Yard ready with {} colliders", world.collider_count());

    let chases = ChaseRegistry::new();
    let mut agent = Agent::builder(AgentId(1), registry.clone())
        .with_config(config)
        .with_chase_tracker(Arc::new(chases.clone()))
        .build()?;
    let events = agent.subscribe();

    let dt = 1.0 / TICK_RATE;
    let ticks = (DURATION * TICK_RATE) as usize;
    let mut clock = 0.0f32;

    for _ in 0..ticks {
        for walker in &walkers {
            walker.step(&mut world, dt)?;
        }

        agent.tick(dt, &world);
        clock += dt;

        for event in events.try_iter() {
            match event {
                AgentEvent::Detection(detection) => {
                    log::info!("[{:6.2}s] sensed {:?}", clock, detection)
                }
                AgentEvent::StateChanged { from, to } => {
                    log::info!(
                        "[{:6.2}s] {} -> {} at {:?}",
                        clock,
                        from,
                        to,
                        agent.body().position()
                    )
                }
            }
        }
    }

    for walker in &walkers {
        let id = walker.target.read().id();
        log::info!("{} chased by {:?}", id, chases.chasers_of(id));
    }
    log::info!(
        "Finished in {} at {:?} (detection {:?})",
        agent.current_state(),
        agent.body().position(),
        agent.detector().status()
    );

    Ok(())
}

fn build_yard(world: &mut OcclusionWorld) -> horde_physics::Result<()> {
    let walls = [
        // Screens the middle of the crossing path
        (Vec3::new(0.0, 1.5, 18.0), Vec3::new(4.0, 1.5, 0.3)),
        // Side walls
        (Vec3::new(-25.0, 1.5, 20.0), Vec3::new(0.3, 1.5, 25.0)),
        (Vec3::new(25.0, 1.5, 20.0), Vec3::new(0.3, 1.5, 25.0)),
    ];

    for (center, half) in walls {
        world.add_collider(
            ColliderDesc::new(ColliderShape::cuboid(half.x, half.y, half.z))
                .with_position(center.x, center.y, center.z)
                .with_layer(CollisionLayer::BUILDINGS),
        )?;
    }

    // A parked car that hides the approach for a while
    world.add_collider(
        ColliderDesc::new(ColliderShape::cuboid(1.0, 0.8, 2.2))
            .with_position(3.0, 0.8, 32.0)
            .with_layer(CollisionLayer::VEHICLES),
    )?;
    Ok(())
}

fn spawn_player(
    world: &mut OcclusionWorld,
    registry: &TargetRegistry,
    id: u64,
    position: Vec3,
) -> SimResult<SharedTarget> {
    let target = Target::builder(TargetId(id))
        .with_position(position)
        .with_part("head", Vec3::new(0.0, 1.7, 0.0))
        .with_part("chest", Vec3::new(0.0, 1.2, 0.0))
        .with_part("pelvis", Vec3::new(0.0, 0.9, 0.0))
        .with_combination("upper body", CollisionLayer::ZOMBIES.as_mask(), &["head", "chest"])
        .with_combination("torso", u32::MAX, &["chest", "pelvis"])
        .build()?;

    let tag = target.id().collider_tag();
    for index in 0..target.parts().len() {
        if let Some(anchor) = target.part_position(index) {
            world.add_collider_for_owner(
                tag,
                ColliderDesc::new(ColliderShape::sphere(0.2))
                    .with_position(anchor.x, anchor.y, anchor.z)
                    .with_layer(CollisionLayer::PLAYERS),
            )?;
        }
    }

    Ok(registry.spawn(target))
}
