//! Headless demo -- balls bounce inside a box; balls that touch the floor
//! too often are retired.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example bouncing -p kith-engine

use kith_engine::prelude::*;

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Position {
    x: f32,
    y: f32,
}
impl Component for Position {}

#[derive(Debug, Clone)]
struct Velocity {
    dx: f32,
    dy: f32,
}
impl Component for Velocity {}

#[derive(Debug, Clone)]
struct Bounces(u32);
impl Component for Bounces {}

const WIDTH: f32 = 100.0;
const HEIGHT: f32 = 60.0;
const GRAVITY: f32 = -30.0;
const MAX_BOUNCES: u32 = 5;

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

struct Physics;

impl EntityProcessor for Physics {
    fn process_entity(&mut self, engine: &mut Engine, entity: EntityId, dt: f32) {
        let Some(mut e) = engine.entity_mut(entity) else {
            return;
        };
        let Some(mut vel) = e.get_component::<Velocity>().cloned() else {
            return;
        };
        let Some(mut pos) = e.get_component::<Position>().cloned() else {
            return;
        };

        vel.dy += GRAVITY * dt;
        pos.x += vel.dx * dt;
        pos.y += vel.dy * dt;

        if pos.x < 0.0 || pos.x > WIDTH {
            vel.dx = -vel.dx;
            pos.x = pos.x.clamp(0.0, WIDTH);
        }
        if pos.y > HEIGHT {
            vel.dy = -vel.dy;
            pos.y = HEIGHT;
        }
        let hit_floor = pos.y < 0.0;
        if hit_floor {
            vel.dy = -vel.dy * 0.9;
            pos.y = 0.0;
        }

        e.add(pos).add(vel);
        if hit_floor {
            let count = e.get_component::<Bounces>().map_or(0, |b| b.0) + 1;
            e.add(Bounces(count));
        }
    }
}

/// Retires balls once they have bounced too often.
#[derive(Default)]
struct Retire {
    retired: Vec<EntityId>,
}

impl EntityProcessor for Retire {
    fn process_entity(&mut self, engine: &mut Engine, entity: EntityId, _dt: f32) {
        let worn_out = engine
            .entity(entity)
            .and_then(|e| e.get_component::<Bounces>())
            .is_some_and(|b| b.0 >= MAX_BOUNCES);
        if worn_out {
            self.retired.push(entity);
        }
    }

    fn end_processing(&mut self, engine: &mut Engine) {
        for id in self.retired.drain(..) {
            engine.remove_entity(id);
        }
    }
}

struct RetireLog;

impl EntityListener for RetireLog {
    fn entity_removed(&mut self, entity: &Entity) -> anyhow::Result<()> {
        if entity.is_removing() {
            tracing::info!(entity = %entity.id(), "ball retired");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let mut engine = Engine::with_config(EngineConfig {
        fixed_dt: 1.0 / 120.0,
        entity_capacity: 64,
        collect_diagnostics: true,
    });

    engine.add_system(IteratingSystem::with_priority(
        Family::all::<(Position, Velocity)>(),
        0,
        Physics,
    ));
    engine.add_system(IteratingSystem::with_priority(
        Family::all::<(Bounces,)>(),
        1,
        Retire::default(),
    ));

    let balls = engine.family(Family::all::<(Position,)>());
    engine.add_entity_listener(&balls, 0, Box::new(RetireLog));

    for i in 0..32u32 {
        let id = engine.create_entity();
        if let Some(mut e) = engine.entity_mut(id) {
            e.add(Position {
                x: (i * 3) as f32,
                y: HEIGHT * 0.5 + (i % 7) as f32,
            })
            .add(Velocity {
                dx: 10.0 + (i % 5) as f32,
                dy: 0.0,
            });
        }
        engine.add_entity(id)?;
    }

    let view = engine.get_entities_for(&balls);
    while !engine.view(view).is_empty() && engine.tick_count() < 20_000 {
        engine.tick();
        if engine.tick_count() % 1_000 == 0 {
            let diag = engine.last_diagnostics();
            tracing::info!(
                tick = engine.tick_count(),
                sim_time = engine.sim_time(),
                balls = engine.view(view).len(),
                update_us = diag.total_time.as_micros() as u64,
                "progress"
            );
        }
    }

    println!(
        "{} balls left after {} ticks ({:.1}s simulated)",
        engine.view(view).len(),
        engine.tick_count(),
        engine.sim_time()
    );
    Ok(())
}
