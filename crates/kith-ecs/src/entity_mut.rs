//! Membership-aware mutable access to an entity.

use std::ops::Deref;

use crate::component::Component;
use crate::entity::{Entity, EntityId};
use crate::family_manager::FamilyManager;
use crate::signal::Signal;

/// Mutable handle to one entity.
///
/// Every component change made through this handle is followed by a family
/// membership update when the entity is registered, so family views and
/// listeners never observe a stale entity. Read access goes through `Deref`.
pub struct EntityMut<'a> {
    entity: &'a mut Entity,
    families: &'a mut FamilyManager,
    registered: bool,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(entity: &'a mut Entity, families: &'a mut FamilyManager, registered: bool) -> Self {
        Self {
            entity,
            families,
            registered,
        }
    }

    fn refresh(&mut self) {
        if self.registered {
            self.families.update_family_membership(self.entity);
        }
    }

    /// See [`Entity::add`].
    pub fn add<T: Component>(&mut self, component: T) -> &mut Self {
        self.replace(component);
        self
    }

    /// See [`Entity::replace`].
    pub fn replace<T: Component>(&mut self, component: T) -> Option<T> {
        let old = self.entity.replace(component);
        self.refresh();
        old
    }

    /// Attach `component` and return a mutable reference to it.
    pub fn add_and_return<T: Component>(&mut self, component: T) -> &mut T {
        self.replace(component);
        self.entity
            .get_component_mut::<T>()
            .expect("component of this kind was attached just above")
    }

    /// See [`Entity::remove`].
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        let removed = self.entity.remove::<T>();
        if removed.is_some() {
            self.refresh();
        }
        removed
    }

    /// Remove every component in insertion order. Membership is updated
    /// after each removal.
    pub fn remove_all(&mut self) {
        while self.entity.remove_first().is_some() {
            self.refresh();
        }
    }

    /// Mutable access to a component. Changing field values never affects
    /// membership, so no update is needed.
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.entity.get_component_mut::<T>()
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.entity.set_key(key);
    }

    pub fn set_flags(&mut self, flags: i32) {
        self.entity.set_flags(flags);
    }

    /// The entity's "component added" signal.
    pub fn component_added(&mut self) -> &mut Signal<EntityId> {
        self.entity.component_added()
    }

    /// The entity's "component removed" signal.
    pub fn component_removed(&mut self) -> &mut Signal<EntityId> {
        self.entity.component_removed()
    }

    /// Whether membership updates are applied (the entity is registered).
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl Deref for EntityMut<'_> {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &*self.entity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, PartialEq)]
    struct A(u8);
    impl Component for A {}
    #[derive(Debug)]
    struct B;
    impl Component for B {}

    #[test]
    fn registered_entity_tracks_family() {
        let registry = Rc::new(ComponentRegistry::new());
        let mut entities = EntityManager::new(Rc::clone(&registry));
        let mut families = FamilyManager::new();
        let family = Family::all::<(A, B)>().get(&registry);
        let view = families.get_entities_for(&family, &mut entities);

        let id = entities.create();
        entities.add_entity(id, &mut families).unwrap();
        {
            let mut e = entities.entity_mut(id, &mut families).unwrap();
            assert!(e.is_registered());
            e.add(A(1)).add(B);
        }
        assert_eq!(families.entities(view), &[id]);

        {
            let mut e = entities.entity_mut(id, &mut families).unwrap();
            e.get_component_mut::<A>().unwrap().0 = 9;
            assert_eq!(e.get_component::<A>(), Some(&A(9)));
            e.remove_all();
            assert_eq!(e.component_count(), 0);
        }
        assert!(families.entities(view).is_empty());
    }

    #[test]
    fn detached_entity_does_not_join_families() {
        let registry = Rc::new(ComponentRegistry::new());
        let mut entities = EntityManager::new(Rc::clone(&registry));
        let mut families = FamilyManager::new();
        let family = Family::all::<(A,)>().get(&registry);
        let view = families.get_entities_for(&family, &mut entities);

        let id = entities.create();
        entities.entity_mut(id, &mut families).unwrap().add(A(0));
        assert!(families.entities(view).is_empty());

        entities.add_entity(id, &mut families).unwrap();
        assert_eq!(families.entities(view), &[id]);
    }

    #[test]
    fn entity_signals_still_fire() {
        let registry = Rc::new(ComponentRegistry::new());
        let mut entities = EntityManager::new(registry);
        let mut families = FamilyManager::new();
        let id = entities.create();
        entities.add_entity(id, &mut families).unwrap();

        let added = Rc::new(Cell::new(0));
        let seen = Rc::clone(&added);
        let mut e = entities.entity_mut(id, &mut families).unwrap();
        e.component_added().add(move |_| seen.set(seen.get() + 1));
        e.add(A(0));
        assert_eq!(*e.add_and_return(A(1)), A(1));
        assert_eq!(added.get(), 2);
        assert_eq!(e.remove::<A>(), Some(A(1)));
    }
}
