//! Incrementally maintained family membership and prioritized listeners.
//!
//! The [`FamilyManager`] keeps one dense entity list per registered
//! [`Family`]. Whenever a registered entity changes, the caller hands it to
//! [`FamilyManager::update_family_membership`], which compares the entity's
//! family bits against a fresh match for every family, patches the lists and
//! notifies interested [`EntityListener`]s.
//!
//! ## Listener ordering
//!
//! Listeners live in one list sorted by ascending priority (ties keep
//! insertion order). Each family keeps a listener mask whose bit `i` means
//! "the listener in slot `i` is subscribed". Inserting or removing a listener
//! shifts every mask so slot numbers stay aligned with the list. A membership
//! update fires all removals first, then all additions, each in ascending
//! slot order.

use std::collections::HashMap;

use crate::bits::Bitset;
use crate::entity::{Entity, EntityId};
use crate::entity_manager::EntityManager;
use crate::family::Family;

// ---------------------------------------------------------------------------
// EntityListener
// ---------------------------------------------------------------------------

/// Observer of entities entering or leaving a family.
///
/// A returned error does not stop dispatch to the remaining listeners; it is
/// logged and counted by the manager.
pub trait EntityListener {
    /// The entity now belongs to the listener's family.
    fn entity_added(&mut self, _entity: &Entity) -> anyhow::Result<()> {
        Ok(())
    }

    /// The entity no longer belongs to the listener's family.
    ///
    /// While an entity is being deregistered, `entity.is_removing()` is true.
    fn entity_removed(&mut self, _entity: &Entity) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handle returned by [`FamilyManager::add_entity_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Copyable handle to a family's live entity list.
///
/// Resolve it with [`FamilyManager::entities`]. The same family always yields
/// an equal handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityView(usize);

struct FamilyRecord {
    family: Family,
    entities: Vec<EntityId>,
    listener_mask: Bitset,
}

struct ListenerData {
    id: ListenerId,
    priority: i32,
    listener: Box<dyn EntityListener>,
}

#[derive(Clone, Copy)]
enum Transition {
    Added,
    Removed,
}

// ---------------------------------------------------------------------------
// FamilyManager
// ---------------------------------------------------------------------------

/// Registry of families, their entity lists and their listeners.
#[derive(Default)]
pub struct FamilyManager {
    records: Vec<FamilyRecord>,
    /// Family index -> position in `records`.
    slots: HashMap<u32, usize>,
    listeners: Vec<ListenerData>,
    notifying: bool,
    listener_failures: u64,
    next_listener_id: u64,
}

impl FamilyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The view for `family`, registering it on first use.
    ///
    /// Registration scans every registered entity of `entities` once and
    /// records the matching ones. No listener is notified for this seeding.
    pub fn get_entities_for(&mut self, family: &Family, entities: &mut EntityManager) -> EntityView {
        if let Some(&slot) = self.slots.get(&family.index()) {
            return EntityView(slot);
        }

        let slot = self.records.len();
        let index = family.index() as usize;
        let mut members = Vec::new();
        for id in entities.registered().to_vec() {
            if let Some(entity) = entities.get_mut(id) {
                if family.matches(entity) {
                    entity.family_bits.set(index);
                    members.push(id);
                }
            }
        }

        tracing::debug!(
            family = family.index(),
            slot,
            members = members.len(),
            "family registered"
        );
        self.records.push(FamilyRecord {
            family: family.clone(),
            entities: members,
            listener_mask: Bitset::new(),
        });
        self.slots.insert(family.index(), slot);
        EntityView(slot)
    }

    /// The live entity list behind `view`. Empty for a foreign handle.
    pub fn entities(&self, view: EntityView) -> &[EntityId] {
        self.records
            .get(view.0)
            .map(|r| r.entities.as_slice())
            .unwrap_or(&[])
    }

    /// The family behind `view`.
    pub fn family(&self, view: EntityView) -> Option<&Family> {
        self.records.get(view.0).map(|r| &r.family)
    }

    /// Number of registered families.
    pub fn family_count(&self) -> usize {
        self.records.len()
    }

    /// Recompute `entity`'s membership in every registered family and
    /// notify listeners of the transitions.
    ///
    /// An entity flagged as removing matches no family.
    pub fn update_family_membership(&mut self, entity: &mut Entity) {
        let mut added = Bitset::new();
        let mut removed = Bitset::new();

        for record in &mut self.records {
            let index = record.family.index() as usize;
            let belongs = entity.family_bits.get(index);
            let matches = record.family.matches(entity) && !entity.removing;
            if belongs == matches {
                continue;
            }

            if matches {
                record.entities.push(entity.id());
                entity.family_bits.set(index);
                added.or(&record.listener_mask);
            } else {
                if let Some(pos) = record.entities.iter().position(|&id| id == entity.id()) {
                    record.entities.remove(pos);
                }
                entity.family_bits.clear(index);
                removed.or(&record.listener_mask);
            }
            tracing::trace!(
                entity = %entity.id(),
                family = index,
                joined = matches,
                "family membership changed"
            );
        }

        if added.is_empty() && removed.is_empty() {
            return;
        }

        self.notifying = true;
        for slot in removed.iter_ones() {
            self.notify(slot, entity, Transition::Removed);
        }
        for slot in added.iter_ones() {
            self.notify(slot, entity, Transition::Added);
        }
        self.notifying = false;
    }

    fn notify(&mut self, slot: usize, entity: &Entity, transition: Transition) {
        let Some(data) = self.listeners.get_mut(slot) else {
            return;
        };
        let result = match transition {
            Transition::Added => data.listener.entity_added(entity),
            Transition::Removed => data.listener.entity_removed(entity),
        };
        if let Err(e) = result {
            self.listener_failures += 1;
            tracing::warn!(
                entity = %entity.id(),
                listener = ?data.id,
                priority = data.priority,
                error = %e,
                "entity listener failed"
            );
        }
    }

    /// Subscribe `listener` to `family` at `priority` (lower runs first).
    ///
    /// Registers the family if needed. A listener inserted at a priority that
    /// is already present runs after the existing ones.
    pub fn add_entity_listener(
        &mut self,
        family: &Family,
        priority: i32,
        listener: Box<dyn EntityListener>,
        entities: &mut EntityManager,
    ) -> ListenerId {
        let view = self.get_entities_for(family, entities);

        let insertion = self.listeners.partition_point(|l| l.priority <= priority);
        let len = self.listeners.len();
        for record in &mut self.records {
            let mask = &mut record.listener_mask;
            for k in (insertion + 1..=len).rev() {
                if mask.get(k - 1) {
                    mask.set(k);
                } else {
                    mask.clear(k);
                }
            }
            mask.clear(insertion);
        }
        self.records[view.0].listener_mask.set(insertion);

        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.insert(
            insertion,
            ListenerData {
                id,
                priority,
                listener,
            },
        );
        tracing::debug!(listener = ?id, priority, slot = insertion, family = family.index(), "entity listener added");
        id
    }

    /// Unsubscribe a listener and hand it back. `None` if the id is unknown.
    pub fn remove_entity_listener(&mut self, id: ListenerId) -> Option<Box<dyn EntityListener>> {
        let slot = self.listeners.iter().position(|l| l.id == id)?;
        let len = self.listeners.len();
        for record in &mut self.records {
            let mask = &mut record.listener_mask;
            for k in slot..len {
                if mask.get(k + 1) {
                    mask.set(k);
                } else {
                    mask.clear(k);
                }
            }
        }
        tracing::debug!(listener = ?id, slot, "entity listener removed");
        Some(self.listeners.remove(slot).listener)
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// `true` while listeners are being called.
    pub fn is_notifying(&self) -> bool {
        self.notifying
    }

    /// How many listener callbacks have returned an error so far.
    pub fn listener_failures(&self) -> u64 {
        self.listener_failures
    }
}

impl std::fmt::Debug for FamilyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyManager")
            .field("families", &self.records.len())
            .field("listeners", &self.listeners.len())
            .field("notifying", &self.notifying)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
