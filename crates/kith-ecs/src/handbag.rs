//! Sparse, index-addressable slot store.
//!
//! A [`Handbag`] maps a dense index (usually a component type index) to at
//! most one value. Reads out of range return `None`; writes grow the storage.
//! Removal by index swaps the last live slot into the hole, so order is not
//! preserved.

/// Auto-growing slot store with O(1) amortized get/set.
#[derive(Debug, Clone)]
pub struct Handbag<T> {
    data: Vec<Option<T>>,
    size: usize,
}

impl<T> Handbag<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            size: 0,
        }
    }

    /// Create an empty store with `capacity` preallocated slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity);
        data.resize_with(capacity, || None);
        Self { data, size: 0 }
    }

    /// The value at `index`, or `None` if the slot is empty or out of range.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index).and_then(Option::as_ref)
    }

    /// Mutable access to the value at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index).and_then(Option::as_mut)
    }

    /// Store `value` at `index`, growing if needed. Returns the previous value.
    pub fn set(&mut self, index: usize, value: T) -> Option<T> {
        self.ensure_index(index);
        self.size = self.size.max(index + 1);
        self.data[index].replace(value)
    }

    /// Empty the slot at `index` and return its value. The logical size is
    /// left untouched.
    pub fn take(&mut self, index: usize) -> Option<T> {
        self.data.get_mut(index).and_then(Option::take)
    }

    /// Append `value` at the current size.
    pub fn add(&mut self, value: T) {
        if self.size == self.data.len() {
            self.grow(None);
        }
        self.data[self.size] = Some(value);
        self.size += 1;
    }

    /// Remove the value at `index`, moving the last live slot into its place.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.size {
            return None;
        }
        self.size -= 1;
        let removed = self.data[index].take();
        if index != self.size {
            self.data[index] = self.data[self.size].take();
        }
        removed
    }

    /// Remove and return the last value.
    pub fn remove_last(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        self.size -= 1;
        self.data[self.size].take()
    }

    /// The logical size: one past the highest slot ever written (minus removals).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the logical size is zero.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of slots available without growing.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Whether `index` is inside the allocated slots.
    pub fn is_index_within_bounds(&self, index: usize) -> bool {
        index < self.data.len()
    }

    /// Empty every slot and reset the size. Capacity is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.data {
            *slot = None;
        }
        self.size = 0;
    }

    /// Iterate over occupied slots as `(index, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.data[..self.size]
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i, v)))
    }

    fn ensure_index(&mut self, index: usize) {
        if index >= self.data.len() {
            self.grow(Some((index * 2).max(index + 1)));
        }
    }

    /// Grow to `capacity`, or by 1.5x + 1 when no target is given.
    fn grow(&mut self, capacity: Option<usize>) {
        let target = capacity.unwrap_or(self.data.len() * 3 / 2 + 1);
        self.data.resize_with(target, || None);
    }
}

impl<T: PartialEq> Handbag<T> {
    /// Whether any live slot holds a value equal to `value`.
    pub fn contains(&self, value: &T) -> bool {
        self.data[..self.size].iter().any(|v| v.as_ref() == Some(value))
    }

    /// Remove the first slot equal to `value`, swapping the last slot in.
    pub fn remove_value(&mut self, value: &T) -> bool {
        match self.data[..self.size]
            .iter()
            .position(|v| v.as_ref() == Some(value))
        {
            Some(i) => {
                self.remove(i);
                true
            }
            None => false,
        }
    }
}

impl<T> Default for Handbag<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
