//! Entity identifiers, allocation and the entity record itself.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and an *index* in the low 32 bits. The generation is bumped
//! every time an index is recycled, which allows immediate stale-ID detection.
//!
//! An [`Entity`] owns its components (one per kind), a component bit set that
//! mirrors them, a family bit set maintained by the
//! [`FamilyManager`](crate::family_manager::FamilyManager), and two change
//! signals.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::bits::Bitset;
use crate::component::{unbox, Component, ComponentRegistry, ComponentType};
use crate::handbag::Handbag;
use crate::hash::hash_code;
use crate::signal::Signal;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s with generational tracking.
///
/// Free indices are kept in a FIFO queue so that generations are spread out
/// over time rather than concentrated on a hot index.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation for each index slot.
    generations: Vec<u32>,
    /// Whether the slot is currently alive.
    alive: Vec<bool>,
    /// Free-list of recyclable indices (FIFO queue).
    free_indices: VecDeque<u32>,
    /// Number of alive slots.
    alive_count: usize,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`], reusing a recycled index when one is
    /// available.
    pub fn allocate(&mut self) -> EntityId {
        self.alive_count += 1;
        if let Some(index) = self.free_indices.pop_front() {
            // Generation was already bumped on deallocate.
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Deallocate an entity, bumping the generation for its index so that
    /// outstanding handles become stale.
    ///
    /// Returns `false` if it was already dead or had a stale generation.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        self.alive_count -= 1;
        true
    }

    /// Whether `id` refers to a currently alive entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == id.generation()
    }

    /// Total number of currently alive entities.
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An identity owning zero or more components, at most one per kind.
///
/// Invariant: `component_bits().get(t.index())` is `true` iff the entity holds
/// a component of kind `t`.
pub struct Entity {
    id: EntityId,
    key: String,
    flags: i32,
    registry: Rc<ComponentRegistry>,
    /// Components indexed by component type index.
    components: Handbag<Box<dyn Component>>,
    /// Component kinds in insertion order.
    order: Vec<ComponentType>,
    component_bits: Bitset,
    pub(crate) family_bits: Bitset,
    pub(crate) removing: bool,
    pub(crate) scheduled_for_removal: bool,
    component_added: Signal<EntityId>,
    component_removed: Signal<EntityId>,
}

impl Entity {
    /// Create an empty entity whose component kinds are resolved through
    /// `registry`.
    pub fn new(id: EntityId, registry: Rc<ComponentRegistry>) -> Self {
        Self {
            id,
            key: String::new(),
            flags: 0,
            registry,
            components: Handbag::new(),
            order: Vec::new(),
            component_bits: Bitset::new(),
            family_bits: Bitset::new(),
            removing: false,
            scheduled_for_removal: false,
            component_added: Signal::new(),
            component_removed: Signal::new(),
        }
    }

    /// This entity's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Application-defined key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// Application-defined flags.
    pub fn flags(&self) -> i32 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: i32) {
        self.flags = flags;
    }

    // -- mutation -----------------------------------------------------------

    /// Attach `component`, replacing any component of the same kind, and
    /// dispatch `component_added` once.
    pub fn add<T: Component>(&mut self, component: T) -> &mut Self {
        self.replace(component);
        self
    }

    /// Like [`add`](Self::add) but hands back the replaced component, if any.
    ///
    /// The replaced component is detached silently: no `component_removed`
    /// dispatch happens for it.
    pub fn replace<T: Component>(&mut self, component: T) -> Option<T> {
        let ty = self.registry.get_for::<T>();
        let old = self.detach(ty).and_then(unbox::<T>);
        self.components.set(ty.index(), Box::new(component));
        self.order.push(ty);
        self.component_bits.set(ty.index());
        self.component_added.dispatch(&self.id);
        old
    }

    /// Attach `component` and return a mutable reference to it.
    pub fn add_and_return<T: Component>(&mut self, component: T) -> &mut T {
        self.replace(component);
        self.get_component_mut::<T>()
            .expect("component of this kind was attached just above")
    }

    /// Remove the component of kind `T`, dispatching `component_removed`.
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        let ty = self.registry.lookup::<T>()?;
        self.remove_type(ty).and_then(unbox::<T>)
    }

    /// Remove the component of kind `ty`, dispatching `component_removed`.
    pub fn remove_type(&mut self, ty: ComponentType) -> Option<Box<dyn Component>> {
        let removed = self.detach(ty)?;
        self.component_removed.dispatch(&self.id);
        Some(removed)
    }

    /// Remove the earliest-added component, dispatching `component_removed`.
    pub fn remove_first(&mut self) -> Option<Box<dyn Component>> {
        let ty = *self.order.first()?;
        self.remove_type(ty)
    }

    /// Remove every component in insertion order, one dispatch per removal.
    pub fn remove_all(&mut self) {
        while self.remove_first().is_some() {}
    }

    /// Take the component of kind `ty` out without notifying anyone.
    fn detach(&mut self, ty: ComponentType) -> Option<Box<dyn Component>> {
        let removed = self.components.take(ty.index())?;
        if let Some(pos) = self.order.iter().position(|t| *t == ty) {
            self.order.remove(pos);
        }
        self.component_bits.clear(ty.index());
        Some(removed)
    }

    // -- queries ------------------------------------------------------------

    /// The component of kind `T`, if attached.
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        let ty = self.registry.lookup::<T>()?;
        self.components.get(ty.index())?.downcast_ref::<T>()
    }

    /// Mutable access to the component of kind `T`, if attached.
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        let ty = self.registry.lookup::<T>()?;
        self.components.get_mut(ty.index())?.downcast_mut::<T>()
    }

    /// The component stored under `ty`, as a trait object.
    pub fn get_component_by_type(&self, ty: ComponentType) -> Option<&dyn Component> {
        self.components.get(ty.index()).map(|c| &**c)
    }

    /// Whether a component of kind `T` is attached. Pure bit test.
    pub fn has_component<T: Component>(&self) -> bool {
        self.registry
            .lookup::<T>()
            .is_some_and(|ty| self.component_bits.get(ty.index()))
    }

    /// Whether a component of kind `ty` is attached.
    pub fn has_component_type(&self, ty: ComponentType) -> bool {
        self.component_bits.get(ty.index())
    }

    /// All attached components, in insertion order.
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.order
            .iter()
            .filter_map(|ty| self.components.get(ty.index()).map(|c| &**c))
    }

    /// Attached component kinds, in insertion order.
    pub fn component_types(&self) -> &[ComponentType] {
        &self.order
    }

    /// Number of attached components.
    pub fn component_count(&self) -> usize {
        self.order.len()
    }

    /// Bits of every attached component kind.
    pub fn component_bits(&self) -> &Bitset {
        &self.component_bits
    }

    /// Bits of every family this entity currently belongs to.
    pub fn family_bits(&self) -> &Bitset {
        &self.family_bits
    }

    /// `true` while the entity is being removed from an engine.
    pub fn is_removing(&self) -> bool {
        self.removing
    }

    pub fn is_scheduled_for_removal(&self) -> bool {
        self.scheduled_for_removal
    }

    /// The registry this entity resolves component kinds through.
    pub fn registry(&self) -> &Rc<ComponentRegistry> {
        &self.registry
    }

    // -- signals ------------------------------------------------------------

    /// Signal dispatched after a component is attached.
    pub fn component_added(&mut self) -> &mut Signal<EntityId> {
        &mut self.component_added
    }

    /// Signal dispatched after a component is removed.
    pub fn component_removed(&mut self) -> &mut Signal<EntityId> {
        &mut self.component_removed
    }

    /// Identity hash derived from the entity's textual description.
    pub fn hash_code(&self) -> i32 {
        hash_code(&self.to_string())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity")?;
        for component in self.components() {
            write!(f, "\n  {}: {:?}", component.name(), component)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("components", &self.component_bits)
            .field("families", &self.family_bits)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
