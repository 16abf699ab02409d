//! Priority-ordered registry of systems, one per concrete type.

use std::any::TypeId;

use crate::system::{System, SystemInfo};

/// Stable identity of one registration, distinct from the system's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u64);

// ---------------------------------------------------------------------------
// SystemEntry
// ---------------------------------------------------------------------------

/// A registered system together with its cached scheduling data.
pub struct SystemEntry {
    id: EntryId,
    type_id: TypeId,
    priority: i32,
    name: String,
    /// `None` while the system is lent out (running one of its hooks or its
    /// `update`).
    system: Option<Box<dyn System>>,
}

impl SystemEntry {
    pub(crate) fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority captured when the system was added.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The system, unless it is currently running.
    pub fn system(&self) -> Option<&dyn System> {
        self.system.as_deref()
    }

    /// Whether the system is currently lent out to run.
    pub fn is_running(&self) -> bool {
        self.system.is_none()
    }

    /// Whether the engine should update this system now.
    pub(crate) fn wants_update(&self) -> bool {
        self.system.as_deref().is_some_and(|s| s.check_processing())
    }

    pub fn info(&self) -> SystemInfo {
        SystemInfo {
            name: self.name.clone(),
            priority: self.priority,
            type_id: self.type_id,
        }
    }

    pub(crate) fn into_system(self) -> Option<Box<dyn System>> {
        self.system
    }
}

impl std::fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemEntry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("running", &self.is_running())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SystemManager
// ---------------------------------------------------------------------------

/// Ordered list of systems, sorted by ascending priority.
#[derive(Debug, Default)]
pub struct SystemManager {
    entries: Vec<SystemEntry>,
    next_id: u64,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `system` and re-sort by priority (stable). The caller must have
    /// removed any system of the same type first.
    pub(crate) fn add(&mut self, system: Box<dyn System>) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        // Dispatch through `dyn System`, not the box.
        let type_id = (*system).as_any().type_id();
        self.entries.push(SystemEntry {
            id,
            type_id,
            priority: system.priority(),
            name: system.name().to_owned(),
            system: Some(system),
        });
        self.entries.sort_by_key(|e| e.priority);
        id
    }

    /// Detach the registration for `type_id`.
    pub(crate) fn remove(&mut self, type_id: TypeId) -> Option<SystemEntry> {
        let pos = self.entries.iter().position(|e| e.type_id == type_id)?;
        Some(self.entries.remove(pos))
    }

    /// Detach the first (lowest priority) registration.
    pub(crate) fn remove_first(&mut self) -> Option<SystemEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Lend out the system of registration `id`.
    pub(crate) fn take(&mut self, id: EntryId) -> Option<Box<dyn System>> {
        self.entries.iter_mut().find(|e| e.id == id)?.system.take()
    }

    /// Give a lent system back. Fails, returning the system, when its
    /// registration was removed in the meantime.
    pub(crate) fn restore(&mut self, id: EntryId, system: Box<dyn System>) -> Result<(), Box<dyn System>> {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.system = Some(system);
                Ok(())
            }
            None => Err(system),
        }
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        self.entries
            .iter()
            .find(|e| e.type_id == TypeId::of::<S>())?
            .system
            .as_deref()?
            .downcast_ref::<S>()
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        self.entries
            .iter_mut()
            .find(|e| e.type_id == TypeId::of::<S>())?
            .system
            .as_deref_mut()?
            .downcast_mut::<S>()
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.entries.iter().any(|e| e.type_id == type_id)
    }

    pub(crate) fn get_entry(&self, index: usize) -> Option<&SystemEntry> {
        self.entries.get(index)
    }

    /// All registrations in execution order.
    pub fn entries(&self) -> &[SystemEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    struct Fixed(i32);
    impl System for Fixed {
        fn priority(&self) -> i32 {
            self.0
        }
        fn update(&mut self, _engine: &mut Engine, _dt: f32) {}
    }

    struct Early;
    impl System for Early {
        fn priority(&self) -> i32 {
            -1
        }
        fn update(&mut self, _engine: &mut Engine, _dt: f32) {}
    }

    struct Twin;
    impl System for Twin {
        fn update(&mut self, _engine: &mut Engine, _dt: f32) {}
    }

    fn priorities(manager: &SystemManager) -> Vec<i32> {
        manager.entries().iter().map(|e| e.priority()).collect()
    }

    #[test]
    fn sorted_by_priority_with_stable_ties() {
        let mut manager = SystemManager::new();
        manager.add(Box::new(Fixed(0)));
        manager.add(Box::new(Early));
        let twin = manager.add(Box::new(Twin));
        assert_eq!(priorities(&manager), vec![-1, 0, 0]);
        // Twin (priority 0) was added after Fixed(0), so it runs after it.
        assert_eq!(manager.entries()[2].id(), twin);
    }

    #[test]
    fn lookup_by_type() {
        let mut manager = SystemManager::new();
        manager.add(Box::new(Fixed(7)));
        assert_eq!(manager.get::<Fixed>().map(|s| s.0), Some(7));
        assert!(manager.get::<Twin>().is_none());
        manager.get_mut::<Fixed>().unwrap().0 = 8;
        assert_eq!(manager.get::<Fixed>().unwrap().0, 8);
        // The cached priority is unaffected.
        assert_eq!(manager.entries()[0].priority(), 7);
    }

    #[test]
    fn lent_system_is_invisible_until_restored() {
        let mut manager = SystemManager::new();
        let id = manager.add(Box::new(Twin));
        let system = manager.take(id).unwrap();
        assert!(manager.get::<Twin>().is_none());
        assert!(manager.entries()[0].is_running());
        assert!(manager.restore(id, system).is_ok());
        assert!(manager.get::<Twin>().is_some());
    }

    #[test]
    fn restore_fails_after_removal() {
        let mut manager = SystemManager::new();
        let id = manager.add(Box::new(Twin));
        let system = manager.take(id).unwrap();
        let entry = manager.remove(TypeId::of::<Twin>()).unwrap();
        assert!(entry.into_system().is_none());
        assert!(manager.restore(id, system).is_err());
        assert!(manager.is_empty());
    }
}
