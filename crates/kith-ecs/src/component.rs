//! Component kinds and the registry that assigns their dense indices.
//!
//! Every Rust type used as a component gets a [`ComponentType`] the first time
//! it is seen by a [`ComponentRegistry`]. The index is the bit position used
//! in entity component masks and family masks, so indices are dense and never
//! reassigned for the lifetime of the registry.
//!
//! A registry is owned by an engine and shared with that engine's entities
//! through `Rc`. It uses interior mutability and is confined to one thread.

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::bits::Bitset;

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A plain data bundle attached to at most one entity at a time.
///
/// The component's kind is its Rust type. `name` is used when describing an
/// entity (and therefore in its identity hash).
pub trait Component: AsAny + fmt::Debug {
    /// Human-readable name of the component kind.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl dyn Component {
    /// Whether this component is of kind `T`.
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrow this component as `T` if it is of that kind.
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow this component as `T` if it is of that kind.
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Recover an owned `T` from a boxed component of that kind.
pub(crate) fn unbox<T: Component>(component: Box<dyn Component>) -> Option<T> {
    component.into_any().downcast::<T>().ok().map(|b| *b)
}

// ---------------------------------------------------------------------------
// ComponentType
// ---------------------------------------------------------------------------

/// Dense index identifying one component kind within a registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentType(pub(crate) u32);

impl ComponentType {
    /// The bit index of this component kind.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component kind.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Index assigned on first use.
    pub id: ComponentType,
    /// `std::any::type_name` of the kind.
    pub name: &'static str,
    /// Rust `TypeId` of the kind.
    pub type_id: TypeId,
}

// ---------------------------------------------------------------------------
// ComponentSet -- type lists used by the family builder
// ---------------------------------------------------------------------------

/// A compile-time list of component kinds, written as a tuple.
///
/// `()` is the empty set; `(A,)`, `(A, B)` and so on up to eight kinds.
pub trait ComponentSet: 'static {
    /// Set the bit of every kind in this list, registering kinds on first use.
    fn insert_bits(registry: &ComponentRegistry, bits: &mut Bitset);
}

impl ComponentSet for () {
    fn insert_bits(_registry: &ComponentRegistry, _bits: &mut Bitset) {}
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn insert_bits(registry: &ComponentRegistry, bits: &mut Bitset) {
                $( bits.set(registry.get_index_for::<$name>()); )+
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Shape of a family: `(all, one, exclude)`.
type FamilyShape = (Bitset, Bitset, Bitset);

#[derive(Debug, Default)]
struct RegistryState {
    /// TypeId -> ComponentType for dedup.
    by_type: HashMap<TypeId, ComponentType>,
    /// Indexed by ComponentType.0.
    infos: Vec<ComponentInfo>,
    /// Family shape -> family index, so equal shapes share one index.
    families: HashMap<FamilyShape, u32>,
}

/// Registry mapping Rust types to [`ComponentType`]s.
///
/// A kind is assigned an index the first time it is requested; later requests
/// for the same `TypeId` return the same index. The registry also hands out
/// family indices, deduplicated by family shape.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    state: RefCell<RegistryState>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The [`ComponentType`] for `T`, allocating the next index on first use.
    pub fn get_for<T: Component>(&self) -> ComponentType {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.state.borrow().by_type.get(&type_id) {
            return existing;
        }

        let mut state = self.state.borrow_mut();
        let id = ComponentType(state.infos.len() as u32);
        state.infos.push(ComponentInfo {
            id,
            name: std::any::type_name::<T>(),
            type_id,
        });
        state.by_type.insert(type_id, id);
        tracing::trace!(component = std::any::type_name::<T>(), index = id.0, "component type assigned");
        id
    }

    /// Convenience wrapper returning the bit index for `T`.
    pub fn get_index_for<T: Component>(&self) -> usize {
        self.get_for::<T>().index()
    }

    /// A fresh bit set with exactly the bits of the kinds in `S` set.
    pub fn get_bits_for<S: ComponentSet>(&self) -> Bitset {
        let mut bits = Bitset::new();
        S::insert_bits(self, &mut bits);
        bits
    }

    /// Look up `T` without assigning an index.
    pub fn lookup<T: 'static>(&self) -> Option<ComponentType> {
        self.state.borrow().by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Metadata for a registered component type.
    pub fn get_info(&self, id: ComponentType) -> Option<ComponentInfo> {
        self.state.borrow().infos.get(id.index()).cloned()
    }

    /// Number of component kinds seen so far.
    pub fn len(&self) -> usize {
        self.state.borrow().infos.len()
    }

    /// Whether no component kind has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().infos.is_empty()
    }

    /// Type names of every registered kind, in index order.
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.state.borrow().infos.iter().map(|i| i.name).collect()
    }

    /// The index for a family shape. Equal shapes always get the same index.
    pub(crate) fn family_index(&self, all: &Bitset, one: &Bitset, exclude: &Bitset) -> u32 {
        let key = (all.clone(), one.clone(), exclude.clone());
        let mut state = self.state.borrow_mut();
        let next = state.families.len() as u32;
        *state.families.entry(key).or_insert(next)
    }

    /// Number of distinct family shapes built against this registry.
    pub fn family_count(&self) -> usize {
        self.state.borrow().families.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
