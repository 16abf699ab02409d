//! Synchronous, single-threaded change signals.
//!
//! A [`Signal`] holds closures that are called in registration order every
//! time the signal is dispatched. Entities expose two of them
//! (`component_added` / `component_removed`) for application observers.

use std::fmt;

/// Handle returned by [`Signal::add`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalHandle(u64);

type Slot<T> = Box<dyn FnMut(&T)>;

/// A list of callbacks invoked with a payload of type `T`.
pub struct Signal<T> {
    listeners: Vec<(SignalHandle, Slot<T>)>,
    next_handle: u64,
}

impl<T> Signal<T> {
    /// Create a signal with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_handle: 0,
        }
    }

    /// Subscribe `listener`. Returns the handle to unsubscribe it later.
    pub fn add(&mut self, listener: impl FnMut(&T) + 'static) -> SignalHandle {
        let handle = SignalHandle(self.next_handle);
        self.next_handle += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Unsubscribe the listener behind `handle`. Returns `false` if unknown.
    pub fn remove(&mut self, handle: SignalHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    /// Drop every listener.
    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Call every listener with `value`, in registration order.
    pub fn dispatch(&mut self, value: &T) {
        for (_, listener) in &mut self.listeners {
            listener(value);
        }
    }

    /// Number of subscribed listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
