//! Kith Engine -- system scheduling and orchestration on top of [`kith_ecs`].
//!
//! The [`Engine`](engine::Engine) owns the entity arena, the family manager
//! and a priority-ordered list of [`System`](system::System)s. Each call to
//! [`Engine::update`](engine::Engine::update) runs every processing system once
//! in ascending priority order; [`Engine::run_ticks`](engine::Engine::run_ticks)
//! drives fixed-step simulation.
//!
//! # Quick Start
//!
//! ```
//! use kith_engine::prelude::*;
//!
//! #[derive(Debug)]
//! struct Score(u32);
//! impl Component for Score {}
//!
//! struct Scorer;
//! impl EntityProcessor for Scorer {
//!     fn process_entity(&mut self, engine: &mut Engine, entity: EntityId, _dt: f32) {
//!         if let Some(mut e) = engine.entity_mut(entity) {
//!             if let Some(score) = e.get_component_mut::<Score>() {
//!                 score.0 += 1;
//!             }
//!         }
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! let player = engine.create_entity();
//! engine.entity_mut(player).unwrap().add(Score(0));
//! engine.add_entity(player).unwrap();
//! engine.add_system(IteratingSystem::new(Family::all::<(Score,)>(), Scorer));
//!
//! engine.run_ticks(100);
//! assert_eq!(engine.entity(player).unwrap().get_component::<Score>().unwrap().0, 100);
//! ```

#![deny(unsafe_code)]

pub mod engine;
pub mod iterating;
pub mod logging;
pub mod system;
pub mod system_manager;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use kith_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use kith_ecs::prelude::*;

    // Engine-specific exports.
    pub use crate::engine::{Engine, EngineConfig, TickDiagnostics};
    pub use crate::iterating::{EntityProcessor, IteratingSystem};
    pub use crate::logging::init_tracing;
    pub use crate::system::{System, SystemInfo, SystemListener, SystemListenerId};
    pub use crate::system_manager::{SystemEntry, SystemManager};
}
