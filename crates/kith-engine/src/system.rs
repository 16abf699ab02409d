//! Systems: per-tick processing units scheduled by priority.
//!
//! A [`System`] is registered with an [`Engine`] by value; the engine owns it
//! from then on. At most one system per concrete type can be registered, and
//! systems run in ascending [`priority`](System::priority) order (ties keep
//! registration order).

use std::any::TypeId;

use kith_ecs::component::AsAny;

use crate::engine::Engine;

// ---------------------------------------------------------------------------
// System trait
// ---------------------------------------------------------------------------

/// A processing unit run once per [`Engine::update`].
///
/// Every method except [`update`](Self::update) has a no-op default.
pub trait System: AsAny {
    /// Scheduling priority. Lower runs first. Read once when the system is
    /// added.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether the engine should call [`update`](Self::update) this tick.
    fn check_processing(&self) -> bool {
        true
    }

    /// Human-readable name, used in diagnostics and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called after the system has been added to `engine`.
    fn added_to_engine(&mut self, _engine: &mut Engine) {}

    /// Called after the system has been removed from `engine`.
    ///
    /// When a system is removed while its own `update` is running, this hook
    /// runs once that `update` returns.
    fn removed_from_engine(&mut self, _engine: &mut Engine) {}

    /// Advance the system by `dt` seconds.
    fn update(&mut self, engine: &mut Engine, dt: f32);
}

impl dyn System {
    /// Whether this system is of type `S`.
    pub fn is<S: System>(&self) -> bool {
        self.as_any().is::<S>()
    }

    pub fn downcast_ref<S: System>(&self) -> Option<&S> {
        self.as_any().downcast_ref::<S>()
    }

    pub fn downcast_mut<S: System>(&mut self) -> Option<&mut S> {
        self.as_any_mut().downcast_mut::<S>()
    }
}

// ---------------------------------------------------------------------------
// SystemInfo / SystemListener
// ---------------------------------------------------------------------------

/// Description of a system handed to [`SystemListener`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub name: String,
    pub priority: i32,
    pub type_id: TypeId,
}

impl SystemInfo {
    pub(crate) fn of(system: &dyn System) -> Self {
        Self {
            name: system.name().to_owned(),
            priority: system.priority(),
            type_id: system.as_any().type_id(),
        }
    }
}

/// Observer of systems being added to or removed from an engine.
///
/// A returned error is logged and counted; it never aborts the operation.
pub trait SystemListener {
    fn system_added(&mut self, _info: &SystemInfo) -> anyhow::Result<()> {
        Ok(())
    }

    fn system_removed(&mut self, _info: &SystemInfo) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handle returned by [`Engine::add_system_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemListenerId(pub(crate) u64);
