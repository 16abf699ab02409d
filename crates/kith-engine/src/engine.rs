//! The engine: owner of entities, families and systems.
//!
//! [`Engine`] is the single mutation entry point of the runtime. Entity
//! component changes go through [`Engine::entity_mut`], which keeps family
//! membership current. [`Engine::update`] runs every processing system once
//! in priority order; [`Engine::run_ticks`] drives fixed-step simulation.
//!
//! # Example
//!
//! ```
//! use kith_engine::prelude::*;
//!
//! #[derive(Debug)]
//! struct Position(f32);
//! impl Component for Position {}
//!
//! struct Drift;
//! impl System for Drift {
//!     fn update(&mut self, engine: &mut Engine, dt: f32) {
//!         let family = engine.family(Family::all::<(Position,)>());
//!         let view = engine.get_entities_for(&family);
//!         for id in engine.view(view).to_vec() {
//!             if let Some(mut e) = engine.entity_mut(id) {
//!                 if let Some(p) = e.get_component_mut::<Position>() {
//!                     p.0 += dt;
//!                 }
//!             }
//!         }
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! let e = engine.create_entity();
//! engine.entity_mut(e).unwrap().add(Position(0.0));
//! engine.add_entity(e).unwrap();
//! engine.add_system(Drift);
//!
//! engine.run_ticks(60);
//! assert_eq!(engine.tick_count(), 60);
//! ```

use std::any::TypeId;
use std::rc::Rc;
use std::time::{Duration, Instant};

use kith_ecs::component::ComponentRegistry;
use kith_ecs::entity::{Entity, EntityId};
use kith_ecs::entity_manager::EntityManager;
use kith_ecs::entity_mut::EntityMut;
use kith_ecs::family::{Family, FamilyBuilder};
use kith_ecs::family_manager::{EntityListener, EntityView, FamilyManager, ListenerId};
use kith_ecs::EcsError;

use crate::system::{System, SystemInfo, SystemListener, SystemListenerId};
use crate::system_manager::{EntryId, SystemEntry, SystemManager};

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed time step in seconds per tick for [`Engine::tick`]. Must be
    /// positive and finite.
    pub fixed_dt: f64,
    /// Number of entities to preallocate room for.
    pub entity_capacity: usize,
    /// Record per-system wall time on every update.
    pub collect_diagnostics: bool,
}

impl Default for EngineConfig {
    /// Defaults to 60 Hz (1/60 second per tick) with diagnostics on.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            entity_capacity: 0,
            collect_diagnostics: true,
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last update.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system (in order of execution).
    pub system_times: Vec<(String, Duration)>,
    /// Total time for the update.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates entities, families, listeners and systems.
pub struct Engine {
    registry: Rc<ComponentRegistry>,
    entities: EntityManager,
    families: FamilyManager,
    systems: SystemManager,
    system_listeners: Vec<(SystemListenerId, Box<dyn SystemListener>)>,
    next_system_listener: u64,
    system_listener_failures: u64,
    /// Re-entrancy guard for [`update`](Self::update).
    updating: bool,
    config: EngineConfig,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with `config`.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn with_config(config: EngineConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        let registry = Rc::new(ComponentRegistry::new());
        Self {
            entities: EntityManager::with_capacity(Rc::clone(&registry), config.entity_capacity),
            registry,
            families: FamilyManager::new(),
            systems: SystemManager::new(),
            system_listeners: Vec::new(),
            next_system_listener: 0,
            system_listener_failures: 0,
            updating: false,
            config,
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// The component registry shared by this engine's entities.
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- entities -----------------------------------------------------------

    /// Allocate a detached entity. It is not visible to families or systems
    /// until [`add_entity`](Self::add_entity) is called.
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.create()
    }

    /// Build a component value from `args`.
    pub fn create_component<T, A>(&self, args: A) -> T
    where
        T: From<A>,
    {
        T::from(args)
    }

    /// Register an entity and place it in every matching family.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateEntity`] if it is already registered,
    /// [`EcsError::StaleEntity`] if the id is dead.
    pub fn add_entity(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.entities.add_entity(id, &mut self.families)
    }

    /// Deregister an entity. A no-op returning `false` when it is not
    /// registered.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        self.entities.remove_entity(id, &mut self.families)
    }

    /// Deregister every entity.
    pub fn remove_all_entities(&mut self) {
        self.entities.remove_all_entities(&mut self.families);
    }

    /// Deregister if needed and free the entity, handing it back. The id
    /// becomes stale.
    pub fn destroy_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.destroy(id, &mut self.families)
    }

    /// Registered entities in registration order.
    pub fn get_entities(&self) -> &[EntityId] {
        self.entities.registered()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable access to an entity that keeps family membership current.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<EntityMut<'_>> {
        self.entities.entity_mut(id, &mut self.families)
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.entities.is_registered(id)
    }

    // -- families -----------------------------------------------------------

    /// Resolve a family description against this engine's registry.
    pub fn family(&self, builder: FamilyBuilder) -> Family {
        builder.get(&self.registry)
    }

    /// The live view of `family`'s entities, registering the family on
    /// first use.
    pub fn get_entities_for(&mut self, family: &Family) -> EntityView {
        self.families.get_entities_for(family, &mut self.entities)
    }

    /// Resolve a view handle to its current entity list.
    pub fn view(&self, view: EntityView) -> &[EntityId] {
        self.families.entities(view)
    }

    /// Subscribe `listener` to `family` at `priority` (lower runs first).
    ///
    /// `Family::all::<()>()` matches every entity, so a listener on it sees
    /// every registration and deregistration.
    pub fn add_entity_listener(
        &mut self,
        family: &Family,
        priority: i32,
        listener: Box<dyn EntityListener>,
    ) -> ListenerId {
        self.families
            .add_entity_listener(family, priority, listener, &mut self.entities)
    }

    pub fn remove_entity_listener(&mut self, id: ListenerId) -> Option<Box<dyn EntityListener>> {
        self.families.remove_entity_listener(id)
    }

    /// Number of entity and system listener callbacks that returned an error.
    pub fn listener_failures(&self) -> u64 {
        self.families.listener_failures() + self.system_listener_failures
    }

    // -- systems ------------------------------------------------------------

    /// Register `system`, replacing any system of the same type.
    ///
    /// The replaced system's removal hook runs first, then `system`'s
    /// [`added_to_engine`](System::added_to_engine).
    pub fn add_system<S: System>(&mut self, system: S) {
        self.detach_system(TypeId::of::<S>());

        let id = self.systems.add(Box::new(system));
        self.with_lent_system(id, |system, engine| system.added_to_engine(engine));

        if let Some(entry) = self.systems.entries().iter().find(|e| e.id() == id) {
            let info = entry.info();
            tracing::debug!(system = %info.name, priority = info.priority, "system added");
            self.notify_system_listeners(&info, true);
        }
    }

    /// Remove the system of type `S` and hand it back.
    ///
    /// Returns `None` if no such system is registered, or if it is removed
    /// from inside its own `update`; its removal hook then runs once that
    /// `update` returns.
    pub fn remove_system<S: System>(&mut self) -> Option<S> {
        let system = self.detach_system(TypeId::of::<S>())?;
        system.into_any().downcast::<S>().ok().map(|b| *b)
    }

    /// Remove every system, lowest priority first.
    pub fn remove_all_systems(&mut self) {
        while let Some(entry) = self.systems.remove_first() {
            self.finish_removal(entry);
        }
    }

    /// The system of type `S`. `None` while that system is running.
    pub fn get_system<S: System>(&self) -> Option<&S> {
        self.systems.get::<S>()
    }

    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.get_mut::<S>()
    }

    /// Registered systems in execution order.
    pub fn get_systems(&self) -> &[SystemEntry] {
        self.systems.entries()
    }

    pub fn add_system_listener(&mut self, listener: Box<dyn SystemListener>) -> SystemListenerId {
        let id = SystemListenerId(self.next_system_listener);
        self.next_system_listener += 1;
        self.system_listeners.push((id, listener));
        id
    }

    pub fn remove_system_listener(&mut self, id: SystemListenerId) -> Option<Box<dyn SystemListener>> {
        let pos = self.system_listeners.iter().position(|(l, _)| *l == id)?;
        Some(self.system_listeners.remove(pos).1)
    }

    fn detach_system(&mut self, type_id: TypeId) -> Option<Box<dyn System>> {
        let entry = self.systems.remove(type_id)?;
        self.finish_removal(entry)
    }

    /// Run the removal hook and listeners for a detached registration. A
    /// system that is lent out is finished when it comes back.
    fn finish_removal(&mut self, entry: SystemEntry) -> Option<Box<dyn System>> {
        let info = entry.info();
        match entry.into_system() {
            Some(mut system) => {
                system.removed_from_engine(self);
                tracing::debug!(system = %info.name, "system removed");
                self.notify_system_listeners(&info, false);
                Some(system)
            }
            None => {
                tracing::debug!(system = %info.name, "system removed while running, hook deferred");
                None
            }
        }
    }

    /// Lend the system of registration `id` to `f` together with the engine.
    fn with_lent_system(&mut self, id: EntryId, f: impl FnOnce(&mut dyn System, &mut Engine)) {
        let Some(mut system) = self.systems.take(id) else {
            return;
        };
        f(&mut *system, self);
        if let Err(mut orphan) = self.systems.restore(id, system) {
            let info = SystemInfo::of(&*orphan);
            orphan.removed_from_engine(self);
            tracing::debug!(system = %info.name, "deferred system removal finished");
            self.notify_system_listeners(&info, false);
        }
    }

    fn notify_system_listeners(&mut self, info: &SystemInfo, added: bool) {
        for (id, listener) in &mut self.system_listeners {
            let result = if added {
                listener.system_added(info)
            } else {
                listener.system_removed(info)
            };
            if let Err(e) = result {
                self.system_listener_failures += 1;
                tracing::warn!(
                    listener = ?id,
                    system = %info.name,
                    error = %e,
                    "system listener failed"
                );
            }
        }
    }

    // -- update -------------------------------------------------------------

    /// Run every processing system once, in priority order.
    ///
    /// Calling `update` from inside a system's `update` does nothing. The
    /// system list is re-read by index each step, so systems added or
    /// removed during the update are tolerated.
    pub fn update(&mut self, dt: f32) {
        if self.updating {
            tracing::trace!("nested update ignored");
            return;
        }
        self.updating = true;

        let update_start = Instant::now();
        let mut system_times = Vec::new();
        let mut index = 0;
        while let Some(entry) = self.systems.get_entry(index) {
            index += 1;
            if !entry.wants_update() {
                continue;
            }
            let id = entry.id();
            let name = self.config.collect_diagnostics.then(|| entry.name().to_owned());

            let sys_start = Instant::now();
            self.with_lent_system(id, |system, engine| system.update(engine, dt));
            if let Some(name) = name {
                system_times.push((name, sys_start.elapsed()));
            }
        }

        self.updating = false;
        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: update_start.elapsed(),
        };
    }

    /// `true` while [`update`](Self::update) is running.
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Execute one fixed-step tick: `update(fixed_dt)` and advance the tick
    /// counter.
    pub fn tick(&mut self) {
        self.update(self.config.fixed_dt as f32);
        self.tick_counter += 1;
    }

    /// Run `count` ticks in sequence.
    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// The number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// The current simulation time in seconds.
    ///
    /// Computed as `tick_count * fixed_dt` to avoid floating-point drift from
    /// repeated addition.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    /// Diagnostics from the last update (timing per system).
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("entities", &self.entities.len())
            .field("families", &self.families.family_count())
            .field("systems", &self.systems.len())
            .field("tick", &self.tick_counter)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
