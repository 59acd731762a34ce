//! Single-flight memoization for similarity results and column statistics.
//!
//! Each key owns a write-once cell. Looking a key up takes the map lock just
//! long enough to fetch (or create) the cell; the computation itself runs
//! outside the map lock, inside the cell's one-time initializer:
//!
//! ```text
//! caller A ── lock map ── get/create cell(k) ── unlock ── get_or_init(f) ── runs f
//! caller B ── lock map ── get cell(k) ───────── unlock ── get_or_init(g) ── waits, sees f
//! ```
//!
//! So for any key the computation runs at most once (barring a panic inside
//! it), racing callers block until it finishes and then observe the same
//! value, and computations for different keys never serialize on each other.
//! A computation may consult other caches; it must not consult its own key.
//!
//! Entries are never evicted. A cache lives as long as the engine session that
//! owns it and is dropped with it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::trace;

use crate::vector::EntityId;

/// Fill-once memo table keyed by `K`.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    name: &'static str,
    slots: Mutex<HashMap<K, Arc<OnceLock<V>>>>,
    computations: AtomicU64,
}

/// Memo table keyed by an ordered `(outer, inner)` id pair.
///
/// `(a, b)` and `(b, a)` are distinct slots.
pub type PairCache<V> = MemoCache<(EntityId, EntityId), V>;

/// Memo table keyed by a single id.
pub type KeyCache<V> = MemoCache<EntityId, V>;

impl<K, V> MemoCache<K, V>
where
    K: Hash + Eq + Copy + std::fmt::Debug,
    V: Clone,
{
    /// Empty cache. `name` only appears in trace output.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(HashMap::new()),
            computations: AtomicU64::new(0),
        }
    }

    /// Return the value stored for `key`, computing and storing it first if
    /// the slot is empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use simcf::cache::PairCache;
    ///
    /// let cache: PairCache<f64> = PairCache::new("demo");
    /// assert_eq!(cache.get_or_compute((1, 2), || 0.5), 0.5);
    /// // Already present: the closure is not called.
    /// assert_eq!(cache.get_or_compute((1, 2), || unreachable!()), 0.5);
    /// // Keys are ordered.
    /// assert_eq!(cache.get_or_compute((2, 1), || 0.25), 0.25);
    /// ```
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        let cell = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key).or_default())
        };
        cell.get_or_init(|| {
            trace!(cache = self.name, ?key, "cache miss");
            self.computations.fetch_add(1, Ordering::Relaxed);
            compute()
        })
        .clone()
    }

    /// Value stored for `key`, without computing anything.
    ///
    /// A slot whose computation is still running reads as empty.
    #[must_use]
    pub fn get(&self, key: K) -> Option<V> {
        let slots = self.slots.lock();
        slots.get(&key).and_then(|cell| cell.get().cloned())
    }

    /// Number of slots (filled or in flight).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// True if no key was ever requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Number of computations run so far.
    #[must_use]
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}
