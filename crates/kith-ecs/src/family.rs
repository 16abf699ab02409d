//! Families: immutable component-set queries.
//!
//! A [`Family`] describes which entities it wants through three bit sets:
//! the entity must hold *all* kinds in `all`, at least *one* kind in `one`
//! (when `one` is non-empty) and *none* of the kinds in `exclude`.
//!
//! Families are built through a [`FamilyBuilder`]:
//!
//! ```
//! use kith_ecs::prelude::*;
//!
//! #[derive(Debug)] struct Pos;
//! #[derive(Debug)] struct Vel;
//! #[derive(Debug)] struct Frozen;
//! impl Component for Pos {}
//! impl Component for Vel {}
//! impl Component for Frozen {}
//!
//! let registry = ComponentRegistry::new();
//! let moving = Family::all::<(Pos, Vel)>().exclude::<(Frozen,)>().get(&registry);
//! let again = Family::all::<(Pos, Vel)>().exclude::<(Frozen,)>().get(&registry);
//! assert_eq!(moving.index(), again.index());
//! ```

use std::fmt;

use crate::bits::Bitset;
use crate::component::{ComponentRegistry, ComponentSet};
use crate::entity::Entity;

/// Fills a bit set with the indices of a component-kind list.
type BitsFn = fn(&ComponentRegistry, &mut Bitset);

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

/// An immutable query over component kinds.
///
/// Two families with the same `(all, one, exclude)` content built against the
/// same registry share the same index.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Family {
    index: u32,
    all: Bitset,
    one: Bitset,
    exclude: Bitset,
}

impl Family {
    /// Start a builder requiring every kind in `S`.
    pub fn all<S: ComponentSet>() -> FamilyBuilder {
        FamilyBuilder::new().all::<S>()
    }

    /// Start a builder requiring at least one kind in `S`.
    pub fn one<S: ComponentSet>() -> FamilyBuilder {
        FamilyBuilder::new().one::<S>()
    }

    /// Start a builder rejecting every kind in `S`.
    pub fn exclude<S: ComponentSet>() -> FamilyBuilder {
        FamilyBuilder::new().exclude::<S>()
    }

    /// An empty builder. Built as-is it matches every entity.
    pub fn builder() -> FamilyBuilder {
        FamilyBuilder::new()
    }

    /// Build a family directly from bit sets.
    pub fn from_bits(registry: &ComponentRegistry, all: Bitset, one: Bitset, exclude: Bitset) -> Self {
        let index = registry.family_index(&all, &one, &exclude);
        Self {
            index,
            all,
            one,
            exclude,
        }
    }

    /// Registry-assigned index, shared by structurally equal families.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn all_bits(&self) -> &Bitset {
        &self.all
    }

    pub fn one_bits(&self) -> &Bitset {
        &self.one
    }

    pub fn exclude_bits(&self) -> &Bitset {
        &self.exclude
    }

    /// Whether `entity`'s components satisfy this family.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.matches_bits(entity.component_bits())
    }

    /// Whether a component bit set satisfies this family.
    pub fn matches_bits(&self, bits: &Bitset) -> bool {
        bits.contains_all(&self.all)
            && (self.one.is_empty() || bits.intersects(&self.one))
            && !bits.intersects(&self.exclude)
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("index", &self.index)
            .field("all", &self.all)
            .field("one", &self.one)
            .field("exclude", &self.exclude)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// FamilyBuilder
// ---------------------------------------------------------------------------

fn no_kinds(_registry: &ComponentRegistry, _bits: &mut Bitset) {}

/// Chainable family description. Each chain produces a fresh value; nothing
/// is resolved until [`get`](Self::get) is called with a registry.
#[derive(Clone, Copy)]
pub struct FamilyBuilder {
    all: BitsFn,
    one: BitsFn,
    exclude: BitsFn,
}

impl FamilyBuilder {
    pub fn new() -> Self {
        Self {
            all: no_kinds,
            one: no_kinds,
            exclude: no_kinds,
        }
    }

    /// Require every kind in `S`. Replaces an earlier `all` list.
    pub fn all<S: ComponentSet>(mut self) -> Self {
        self.all = S::insert_bits;
        self
    }

    /// Require at least one kind in `S`. Replaces an earlier `one` list.
    pub fn one<S: ComponentSet>(mut self) -> Self {
        self.one = S::insert_bits;
        self
    }

    /// Reject every kind in `S`. Replaces an earlier `exclude` list.
    pub fn exclude<S: ComponentSet>(mut self) -> Self {
        self.exclude = S::insert_bits;
        self
    }

    /// Resolve the kinds against `registry` and produce the family.
    pub fn get(self, registry: &ComponentRegistry) -> Family {
        let mut all = Bitset::new();
        let mut one = Bitset::new();
        let mut exclude = Bitset::new();
        (self.all)(registry, &mut all);
        (self.one)(registry, &mut one);
        (self.exclude)(registry, &mut exclude);
        Family::from_bits(registry, all, one, exclude)
    }
}

impl Default for FamilyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FamilyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyBuilder").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::entity::EntityId;
    use std::rc::Rc;

    #[derive(Debug)]
    struct X;
    impl Component for X {}
    #[derive(Debug)]
    struct Y;
    impl Component for Y {}
    #[derive(Debug)]
    struct Z;
    impl Component for Z {}

    fn entity(registry: &Rc<ComponentRegistry>) -> Entity {
        Entity::new(EntityId::new(0, 0), Rc::clone(registry))
    }

    #[test]
    fn all_and_exclude() {
        let reg = Rc::new(ComponentRegistry::new());
        let family = Family::all::<(X, Y)>().exclude::<(Z,)>().get(&reg);

        let mut xy = entity(&reg);
        xy.add(X).add(Y);
        assert!(family.matches(&xy));

        let mut xyz = entity(&reg);
        xyz.add(X).add(Y).add(Z);
        assert!(!family.matches(&xyz));

        let mut x = entity(&reg);
        x.add(X);
        assert!(!family.matches(&x));
    }

    #[test]
    fn one_requires_any_member() {
        let reg = Rc::new(ComponentRegistry::new());
        let family = Family::one::<(X, Y)>().get(&reg);

        let mut y = entity(&reg);
        y.add(Y);
        assert!(family.matches(&y));

        let mut z = entity(&reg);
        z.add(Z);
        assert!(!family.matches(&z));
    }

    #[test]
    fn empty_family_matches_everything() {
        let reg = Rc::new(ComponentRegistry::new());
        let everything = Family::all::<()>().get(&reg);
        assert!(everything.matches(&entity(&reg)));
        let mut z = entity(&reg);
        z.add(Z);
        assert!(everything.matches(&z));
        assert_eq!(everything.index(), Family::builder().get(&reg).index());
    }

    #[test]
    fn structural_dedup_shares_index() {
        let reg = ComponentRegistry::new();
        let a = Family::all::<(X, Y)>().get(&reg);
        let b = Family::all::<(Y, X)>().get(&reg);
        let c = Family::all::<(X,)>().one::<(Y,)>().get(&reg);
        assert_eq!(a.index(), b.index());
        assert_eq!(a, b);
        assert_ne!(a.index(), c.index());
    }

    #[test]
    fn builder_is_a_fresh_value_per_chain() {
        let reg = ComponentRegistry::new();
        let base = Family::all::<(X,)>();
        let with_exclude = base.exclude::<(Z,)>().get(&reg);
        let plain = base.get(&reg);
        assert!(plain.exclude_bits().is_empty());
        assert!(!with_exclude.exclude_bits().is_empty());
    }
}
