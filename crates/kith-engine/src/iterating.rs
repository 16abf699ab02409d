//! A system that processes every entity of one family, one at a time.

use kith_ecs::entity::EntityId;
use kith_ecs::family::FamilyBuilder;
use kith_ecs::family_manager::EntityView;

use crate::engine::Engine;
use crate::system::System;

/// Per-entity logic plugged into an [`IteratingSystem`].
pub trait EntityProcessor: 'static {
    /// Handle one entity of the family.
    fn process_entity(&mut self, engine: &mut Engine, entity: EntityId, dt: f32);

    /// Called before the first entity of an update.
    fn start_processing(&mut self, _engine: &mut Engine) {}

    /// Called after the last entity of an update.
    fn end_processing(&mut self, _engine: &mut Engine) {}
}

/// Runs an [`EntityProcessor`] over the live entity list of a family.
///
/// The family is resolved and its view cached when the system is added to an
/// engine; the cache is dropped on removal. Entities joining or leaving the
/// family while the update runs are picked up from the live list.
pub struct IteratingSystem<P> {
    family: FamilyBuilder,
    priority: i32,
    processing: bool,
    view: Option<EntityView>,
    processor: P,
}

impl<P: EntityProcessor> IteratingSystem<P> {
    pub fn new(family: FamilyBuilder, processor: P) -> Self {
        Self::with_priority(family, 0, processor)
    }

    pub fn with_priority(family: FamilyBuilder, priority: i32, processor: P) -> Self {
        Self {
            family,
            priority,
            processing: true,
            view: None,
            processor,
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Pause or resume processing.
    pub fn set_processing(&mut self, processing: bool) {
        self.processing = processing;
    }

    /// The cached family view, present while the system is in an engine.
    pub fn view(&self) -> Option<EntityView> {
        self.view
    }
}

impl<P: EntityProcessor> System for IteratingSystem<P> {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn check_processing(&self) -> bool {
        self.processing
    }

    fn name(&self) -> &str {
        std::any::type_name::<P>()
    }

    fn added_to_engine(&mut self, engine: &mut Engine) {
        let family = engine.family(self.family);
        self.view = Some(engine.get_entities_for(&family));
    }

    fn removed_from_engine(&mut self, _engine: &mut Engine) {
        self.view = None;
    }

    fn update(&mut self, engine: &mut Engine, dt: f32) {
        let Some(view) = self.view else {
            return;
        };
        self.processor.start_processing(engine);
        let mut i = 0;
        while let Some(&id) = engine.view(view).get(i) {
            self.processor.process_entity(engine, id, dt);
            i += 1;
        }
        self.processor.end_processing(engine);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use kith_ecs::component::Component;
    use kith_ecs::family::Family;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
    }
    impl Component for Position {}

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
    }
    impl Component for Velocity {}

    #[derive(Default)]
    struct Mover {
        starts: u32,
        ends: u32,
        seen: u32,
    }

    impl EntityProcessor for Mover {
        fn start_processing(&mut self, _engine: &mut Engine) {
            self.starts += 1;
        }

        fn process_entity(&mut self, engine: &mut Engine, entity: EntityId, dt: f32) {
            self.seen += 1;
            let Some(mut e) = engine.entity_mut(entity) else {
                return;
            };
            let dx = e.get_component::<Velocity>().map_or(0.0, |v| v.dx);
            if let Some(p) = e.get_component_mut::<Position>() {
                p.x += dx * dt;
            }
        }

        fn end_processing(&mut self, _engine: &mut Engine) {
            self.ends += 1;
        }
    }

    fn spawn(engine: &mut Engine, x: f32, dx: Option<f32>) -> EntityId {
        let id = engine.create_entity();
        {
            let mut e = engine.entity_mut(id).unwrap();
            e.add(Position { x });
            if let Some(dx) = dx {
                e.add(Velocity { dx });
            }
        }
        engine.add_entity(id).unwrap();
        id
    }

    #[test]
    fn processes_only_family_members() {
        let mut engine = Engine::new();
        let moving = spawn(&mut engine, 0.0, Some(2.0));
        let still = spawn(&mut engine, 5.0, None);
        engine.add_system(IteratingSystem::new(
            Family::all::<(Position, Velocity)>(),
            Mover::default(),
        ));

        engine.update(0.5);

        let pos = |id| engine.entity(id).unwrap().get_component::<Position>().cloned();
        assert_eq!(pos(moving), Some(Position { x: 1.0 }));
        assert_eq!(pos(still), Some(Position { x: 5.0 }));

        let system = engine.get_system::<IteratingSystem<Mover>>().unwrap();
        assert_eq!(system.processor().seen, 1);
        assert_eq!(system.processor().starts, 1);
        assert_eq!(system.processor().ends, 1);
    }

    #[test]
    fn view_follows_engine_membership() {
        let mut engine = Engine::new();
        engine.add_system(IteratingSystem::new(Family::all::<(Velocity,)>(), Mover::default()));
        assert!(engine.get_system::<IteratingSystem<Mover>>().unwrap().view().is_some());

        let e = spawn(&mut engine, 0.0, Some(1.0));
        engine.update(1.0);
        engine.entity_mut(e).unwrap().remove::<Velocity>();
        engine.update(1.0);

        let system = engine.get_system::<IteratingSystem<Mover>>().unwrap();
        assert_eq!(system.processor().seen, 1);
        assert_eq!(system.processor().starts, 2);

        let removed = engine.remove_system::<IteratingSystem<Mover>>().unwrap();
        assert!(removed.view().is_none());
    }

    #[test]
    fn paused_system_does_not_process() {
        let mut engine = Engine::new();
        spawn(&mut engine, 0.0, Some(1.0));
        let mut system = IteratingSystem::with_priority(Family::all::<(Velocity,)>(), 4, Mover::default());
        system.set_processing(false);
        engine.add_system(system);
        engine.update(1.0);

        let entry = &engine.get_systems()[0];
        assert_eq!(entry.priority(), 4);
        assert!(entry.name().ends_with("Mover"));
        let system = engine.get_system::<IteratingSystem<Mover>>().unwrap();
        assert_eq!(system.processor().starts, 0);
    }
}
