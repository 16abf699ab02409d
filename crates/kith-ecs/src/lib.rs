//! Kith ECS -- bitset-driven Entity Component System storage.
//!
//! This crate holds the storage and classification half of the Kith runtime.
//! Entities own their components (at most one per kind) and mirror them in a
//! component bit set. Families are immutable `all / one / exclude` queries
//! over component kinds; the [`FamilyManager`](family_manager::FamilyManager)
//! keeps one cached entity list per family and updates it incrementally as
//! entities change, notifying prioritized listeners along the way.
//!
//! # Quick Start
//!
//! ```
//! use kith_ecs::prelude::*;
//! use std::rc::Rc;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//! impl Component for Velocity {}
//!
//! let registry = Rc::new(ComponentRegistry::new());
//! let mut entities = EntityManager::new(Rc::clone(&registry));
//! let mut families = FamilyManager::new();
//!
//! let moving = Family::all::<(Position, Velocity)>().get(&registry);
//! let view = families.get_entities_for(&moving, &mut entities);
//!
//! let e = entities.create();
//! entities.add_entity(e, &mut families).unwrap();
//! entities
//!     .entity_mut(e, &mut families)
//!     .unwrap()
//!     .add(Position { x: 0.0, y: 0.0 })
//!     .add(Velocity { dx: 1.0, dy: 0.0 });
//!
//! assert_eq!(families.entities(view), &[e]);
//! ```

#![deny(unsafe_code)]

pub mod bits;
pub mod component;
pub mod entity;
pub mod entity_manager;
pub mod entity_mut;
pub mod family;
pub mod family_manager;
pub mod handbag;
pub mod hash;
pub mod signal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity is already registered; the registered set is unchanged.
    #[error("entity {entity} is already registered")]
    DuplicateEntity { entity: entity::EntityId },

    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bits::Bitset;
    pub use crate::component::{Component, ComponentInfo, ComponentRegistry, ComponentSet, ComponentType};
    pub use crate::entity::{Entity, EntityAllocator, EntityId};
    pub use crate::entity_manager::EntityManager;
    pub use crate::entity_mut::EntityMut;
    pub use crate::family::{Family, FamilyBuilder};
    pub use crate::family_manager::{EntityListener, EntityView, FamilyManager, ListenerId};
    pub use crate::handbag::Handbag;
    pub use crate::signal::{Signal, SignalHandle};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
