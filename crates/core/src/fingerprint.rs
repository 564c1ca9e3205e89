//! Request fingerprints and the bounded memoization cache
//!
//! Both hot paths (ASR finalization, coach composition) memoize on a
//! 16-byte digest of their inputs. The cache is a fixed-capacity map plus
//! a usage-order list under a single mutex; entries are immutable after
//! insertion and evicted least-recently-used.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};

/// Fixed-size cache key.
pub type Fingerprint = [u8; 16];

/// Digest a sequence of byte slices into a fingerprint.
///
/// Parts are length-prefixed so that (`"ab"`, `"c"`) and (`"a"`, `"bc"`)
/// do not collide.
pub fn fingerprint(parts: &[&[u8]]) -> Fingerprint {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// Hex encoding of a fingerprint, for logs and version strings.
pub fn to_hex(fp: &Fingerprint) -> String {
    fp.iter().map(|b| format!("{b:02x}")).collect()
}

struct CacheInner<V> {
    map: HashMap<Fingerprint, V>,
    // Usage order, least-recently-used at the front.
    order: VecDeque<Fingerprint>,
}

/// Bounded LRU memoization cache, shared by all sessions.
///
/// The lock is held only across map bookkeeping, never across I/O.
pub struct FingerprintCache<V: Clone> {
    inner: Mutex<CacheInner<V>>,
    capacity: usize,
    name: &'static str,
}

impl<V: Clone> FingerprintCache<V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity: capacity.max(1),
            name,
        }
    }

    /// Look up a fingerprint, refreshing its usage position on hit.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.map.get(key).cloned()?;
        if let Some(pos) = inner.order.iter().position(|k| k == key) {
            inner.order.remove(pos);
        }
        inner.order.push_back(*key);
        Some(value)
    }

    /// Insert a computed value, evicting the least-recently-used entry
    /// at capacity. Re-insertion under an existing key is a no-op: the
    /// first computed artifact stays authoritative.
    pub fn put(&self, key: Fingerprint, value: V) {
        let mut inner = self.inner.lock();
        if inner.map.contains_key(&key) {
            return;
        }
        if inner.map.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
                tracing::trace!(cache = self.name, "evicted LRU entry");
            }
        }
        inner.map.insert(key, value);
        inner.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
