//! Entity arena and the ordered set of registered entities.
//!
//! Entities are created detached: they live in the arena and can be given
//! components, but families and systems only see them once they have been
//! registered with [`EntityManager::add_entity`].

use std::rc::Rc;

use crate::bits::Bitset;
use crate::component::ComponentRegistry;
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::entity_mut::EntityMut;
use crate::family_manager::FamilyManager;
use crate::EcsError;

/// Owns every entity and tracks which of them are registered.
#[derive(Debug)]
pub struct EntityManager {
    registry: Rc<ComponentRegistry>,
    allocator: EntityAllocator,
    /// Indexed by `EntityId::index()`.
    slots: Vec<Option<Entity>>,
    /// Registered entities in registration order.
    registered: Vec<EntityId>,
    /// Bit `i` set iff the entity at index `i` is registered.
    registered_bits: Bitset,
}

impl EntityManager {
    /// Create an empty manager whose entities resolve kinds via `registry`.
    pub fn new(registry: Rc<ComponentRegistry>) -> Self {
        Self::with_capacity(registry, 0)
    }

    /// Create an empty manager with room for `capacity` entities.
    pub fn with_capacity(registry: Rc<ComponentRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            allocator: EntityAllocator::new(),
            slots: Vec::with_capacity(capacity),
            registered: Vec::with_capacity(capacity),
            registered_bits: Bitset::with_capacity(capacity),
        }
    }

    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    /// Allocate a new, detached entity.
    pub fn create(&mut self) -> EntityId {
        let id = self.allocator.allocate();
        let index = id.index() as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(Entity::new(id, Rc::clone(&self.registry)));
        id
    }

    /// Whether `id` refers to a live entity (registered or not).
    pub fn contains(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.slots.get(id.index() as usize)?.as_ref()
    }

    /// Direct mutable access, bypassing membership maintenance.
    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.slots.get_mut(id.index() as usize)?.as_mut()
    }

    /// Whether `id` is currently registered.
    pub fn is_registered(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id) && self.registered_bits.get(id.index() as usize)
    }

    /// Mutable access that keeps family membership up to date.
    pub fn entity_mut<'a>(
        &'a mut self,
        id: EntityId,
        families: &'a mut FamilyManager,
    ) -> Option<EntityMut<'a>> {
        let registered = self.is_registered(id);
        let entity = self.get_mut(id)?;
        Some(EntityMut::new(entity, families, registered))
    }

    /// Register a live entity, making it visible to families.
    ///
    /// # Errors
    ///
    /// [`EcsError::StaleEntity`] if `id` is dead, [`EcsError::DuplicateEntity`]
    /// if it is already registered. The registered set is unchanged on error.
    pub fn add_entity(&mut self, id: EntityId, families: &mut FamilyManager) -> Result<(), EcsError> {
        if !self.allocator.is_alive(id) {
            return Err(EcsError::StaleEntity { entity: id });
        }
        if self.registered_bits.get(id.index() as usize) {
            return Err(EcsError::DuplicateEntity { entity: id });
        }

        self.registered.push(id);
        self.registered_bits.set(id.index() as usize);
        let entity = self
            .get_mut(id)
            .ok_or(EcsError::StaleEntity { entity: id })?;
        entity.scheduled_for_removal = false;
        families.update_family_membership(entity);
        tracing::debug!(entity = %id, "entity registered");
        Ok(())
    }

    /// Deregister an entity. Returns `false` if it was not registered.
    ///
    /// The entity leaves every family (listeners see it with
    /// `is_removing() == true`) but stays alive in the arena.
    pub fn remove_entity(&mut self, id: EntityId, families: &mut FamilyManager) -> bool {
        if !self.is_registered(id) {
            return false;
        }

        if let Some(pos) = self.registered.iter().position(|&e| e == id) {
            self.registered.remove(pos);
        }
        self.registered_bits.clear(id.index() as usize);
        if let Some(entity) = self.get_mut(id) {
            entity.scheduled_for_removal = false;
            entity.removing = true;
            families.update_family_membership(entity);
            entity.removing = false;
        }
        tracing::debug!(entity = %id, "entity deregistered");
        true
    }

    /// Deregister every entity, earliest registration first.
    pub fn remove_all_entities(&mut self, families: &mut FamilyManager) {
        while let Some(&first) = self.registered.first() {
            self.remove_entity(first, families);
        }
    }

    /// Deregister if needed, then free the entity and hand it back.
    ///
    /// The id (and every copy of it) becomes stale.
    pub fn destroy(&mut self, id: EntityId, families: &mut FamilyManager) -> Option<Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.remove_entity(id, families);
        let entity = self.slots.get_mut(id.index() as usize)?.take();
        self.allocator.deallocate(id);
        entity
    }

    /// Mark a registered entity as scheduled for removal.
    pub fn schedule_removal(&mut self, id: EntityId) -> bool {
        if !self.is_registered(id) {
            return false;
        }
        match self.get_mut(id) {
            Some(entity) => {
                entity.scheduled_for_removal = true;
                true
            }
            None => false,
        }
    }

    /// Registered entities in registration order.
    pub fn registered(&self) -> &[EntityId] {
        &self.registered
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Number of live entities, registered or not.
    pub fn alive_count(&self) -> usize {
        self.allocator.alive_count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
