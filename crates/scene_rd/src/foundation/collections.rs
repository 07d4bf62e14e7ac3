//! Specialized collection types

pub use slotmap::{new_key_type, Key, SlotMap};

/// Handle-to-object table backing every renderer-owned entity kind
///
/// Keys are generation-tagged: once an entry is freed its handle never
/// resolves again, even after the slot is reused by a later allocation.
/// Lookups are O(1) and inserting never moves the entities other code is
/// currently reading through a shared borrow.
pub struct Registry<K: Key, T> {
    slots: SlotMap<K, T>,
    kind: &'static str,
}

impl<K: Key, T> Registry<K, T> {
    /// Create an empty registry; `kind` names the entity type in diagnostics
    pub fn new(kind: &'static str) -> Self {
        Self {
            slots: SlotMap::with_key(),
            kind,
        }
    }

    /// Name of the entity kind stored in this registry
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Store an object and return its handle
    pub fn allocate(&mut self, object: T) -> K {
        self.slots.insert(object)
    }

    /// Look up an object, `None` for unknown or freed handles
    pub fn resolve(&self, handle: K) -> Option<&T> {
        self.slots.get(handle)
    }

    /// Mutable lookup, `None` for unknown or freed handles
    pub fn resolve_mut(&mut self, handle: K) -> Option<&mut T> {
        self.slots.get_mut(handle)
    }

    /// Whether `handle` refers to a live object
    pub fn contains(&self, handle: K) -> bool {
        self.slots.contains_key(handle)
    }

    /// Remove an object and hand it back to the caller for teardown
    pub fn take(&mut self, handle: K) -> Option<T> {
        self.slots.remove(handle)
    }

    /// Destroy an object, returning `false` if the handle was unknown
    pub fn free(&mut self, handle: K) -> bool {
        self.take(handle).is_some()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry holds no objects
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over live handles and objects
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter()
    }

    /// Iterate mutably over live handles and objects
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> {
        self.slots.iter_mut()
    }

    /// Remove every object, yielding them for teardown
    pub fn drain(&mut self) -> impl Iterator<Item = (K, T)> + '_ {
        self.slots.drain()
    }
}

impl<K: Key, T> std::fmt::Debug for Registry<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Registry<{}> {{ {} live }}", self.kind, self.slots.len())
    }
}
