//! Bounded keyed collections
//!
//! Every cache in the client (sprites, sounds, scenes) is a [`BoundedCache`]:
//! a string key maps to a stable slot index, and slots never move or get
//! evicted. The only way to reclaim space is to build a fresh cache and swap
//! it in, which is why every cache carries a unique generation number.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Generation value meaning "not resolved in any cache".
pub const UNRESOLVED_GENERATION: u32 = 0;

static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

fn next_generation() -> u32 {
    loop {
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        if generation != UNRESOLVED_GENERATION {
            return generation;
        }
    }
}

/// Errors raised by [`BoundedCache`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Registering would place an item at or past the configured capacity
    #[error("cache capacity of {capacity} exceeded while registering '{key}'")]
    CapacityExceeded {
        /// Key that could not be registered
        key: String,
        /// Configured capacity of the cache
        capacity: usize,
    },

    /// Slot index does not refer to a registered item
    #[error("index {index} out of range for cache holding {len} items")]
    IndexOutOfRange {
        /// Requested slot
        index: usize,
        /// Number of registered items
        len: usize,
    },

    /// Key is not registered in this cache
    #[error("key '{0}' is not registered")]
    UnknownKey(String),
}

struct Slots<T> {
    indices: HashMap<String, usize>,
    keys: Vec<String>,
    items: Vec<Arc<T>>,
}

/// Fixed-capacity registry mapping string keys to stable slot indices.
///
/// `register` is deliberately not idempotent: registering the same key twice
/// consumes two slots, and the key then resolves to the newer one. Callers
/// check with [`get_index`](Self::get_index) first, or use
/// [`register_unique`](Self::register_unique) to do both under one lock.
pub struct BoundedCache<T> {
    capacity: usize,
    generation: u32,
    slots: RwLock<Slots<T>>,
}

impl<T> BoundedCache<T> {
    /// Create an empty cache that accepts at most `capacity` registrations
    pub fn new(capacity: usize) -> Self {
        let generation = next_generation();
        log::debug!("Created bounded cache (capacity {capacity}, generation {generation})");
        Self {
            capacity,
            generation,
            slots: RwLock::new(Slots {
                indices: HashMap::new(),
                keys: Vec::new(),
                items: Vec::new(),
            }),
        }
    }

    /// Maximum number of registrations
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Unique, non-zero generation of this cache instance
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.read().items.len()
    }

    /// Whether no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store `value` in the next free slot and return its index
    pub fn register(&self, key: &str, value: T) -> Result<usize, CacheError> {
        let mut slots = self.slots.write();
        self.push(&mut slots, key, value)
    }

    /// Return the existing slot for `key`, or register `value` if absent.
    ///
    /// The lookup and the insert happen under the same write lock, so two
    /// concurrent loaders decoding the same key never consume two slots.
    pub fn register_unique(&self, key: &str, value: T) -> Result<usize, CacheError> {
        let mut slots = self.slots.write();
        if let Some(&index) = slots.indices.get(key) {
            return Ok(index);
        }
        self.push(&mut slots, key, value)
    }

    fn push(&self, slots: &mut Slots<T>, key: &str, value: T) -> Result<usize, CacheError> {
        let index = slots.items.len();
        if index >= self.capacity {
            log::warn!(
                "Cache generation {} exhausted at {} items while registering '{}'",
                self.generation,
                self.capacity,
                key
            );
            return Err(CacheError::CapacityExceeded {
                key: key.to_string(),
                capacity: self.capacity,
            });
        }
        slots.items.push(Arc::new(value));
        slots.keys.push(key.to_string());
        slots.indices.insert(key.to_string(), index);
        Ok(index)
    }

    /// Slot index registered for `key`
    pub fn get_index(&self, key: &str) -> Option<usize> {
        self.slots.read().indices.get(key).copied()
    }

    /// Whether `key` has a slot
    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.read().indices.contains_key(key)
    }

    /// Item stored at `index`
    pub fn get_item(&self, index: usize) -> Result<Arc<T>, CacheError> {
        let slots = self.slots.read();
        slots
            .items
            .get(index)
            .cloned()
            .ok_or(CacheError::IndexOutOfRange {
                index,
                len: slots.items.len(),
            })
    }

    /// Item referenced by a [`CacheLocation`].
    ///
    /// Uses the stored index when it was resolved against this generation,
    /// otherwise falls back to the key and records the fresh index.
    pub fn get_item32(&self, location: &CacheLocation) -> Result<Arc<T>, CacheError> {
        if let Some(index) = location.index_in(self.generation) {
            return self.get_item(index);
        }
        let index = self
            .get_index(location.key())
            .ok_or_else(|| CacheError::UnknownKey(location.key().to_string()))?;
        location.resolve(self.generation, index);
        self.get_item(index)
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> Vec<String> {
        self.slots.read().keys.clone()
    }

    /// Snapshot of every registered item in slot order
    pub fn items(&self) -> Vec<Arc<T>> {
        self.slots.read().items.clone()
    }
}

impl<T> fmt::Debug for BoundedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("generation", &self.generation)
            .field("len", &self.len())
            .finish()
    }
}

/// Symbolic reference to a cached item.
///
/// The resolved slot is only meaningful for the cache generation that
/// produced it, so generation and index are packed into one atomic word and
/// always read and written together.
pub struct CacheLocation {
    key: String,
    slot: AtomicU64,
}

const fn pack(generation: u32, index: u32) -> u64 {
    ((generation as u64) << 32) | index as u64
}

const fn unpack(slot: u64) -> (u32, u32) {
    ((slot >> 32) as u32, slot as u32)
}

impl CacheLocation {
    /// Unresolved location for `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot: AtomicU64::new(pack(UNRESOLVED_GENERATION, 0)),
        }
    }

    /// Location for an unused bundle slot
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Symbolic key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this is an unused slot
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Resolved index, if it was resolved against `generation`
    pub fn index_in(&self, generation: u32) -> Option<usize> {
        let (stored, index) = unpack(self.slot.load(Ordering::Acquire));
        (stored != UNRESOLVED_GENERATION && stored == generation).then_some(index as usize)
    }

    /// Whether the location holds an index from any generation
    pub fn is_resolved(&self) -> bool {
        unpack(self.slot.load(Ordering::Acquire)).0 != UNRESOLVED_GENERATION
    }

    /// Generation the stored index belongs to, if any
    pub fn generation(&self) -> Option<u32> {
        let (generation, _) = unpack(self.slot.load(Ordering::Acquire));
        (generation != UNRESOLVED_GENERATION).then_some(generation)
    }

    /// Record `index` as resolved in `generation`
    pub fn resolve(&self, generation: u32, index: usize) {
        match u32::try_from(index) {
            Ok(index) => self.slot.store(pack(generation, index), Ordering::Release),
            Err(_) => self.reset(),
        }
    }

    /// Forget the stored index so the next use resolves by key
    pub fn reset(&self) {
        self.slot
            .store(pack(UNRESOLVED_GENERATION, 0), Ordering::Release);
    }
}

impl Clone for CacheLocation {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            slot: AtomicU64::new(self.slot.load(Ordering::Acquire)),
        }
    }
}

impl Default for CacheLocation {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for CacheLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (generation, index) = unpack(self.slot.load(Ordering::Acquire));
        f.debug_struct("CacheLocation")
            .field("key", &self.key)
            .field("generation", &generation)
            .field("index", &index)
            .finish()
    }
}
