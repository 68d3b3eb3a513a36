//! Chained hash map behind a fixed-footprint handle.
//!
//! Same handle/workspace pattern as the stack: the public [`FixedHashMap`]
//! is an opaque byte region, the bucket array is an exclusively owned boxed
//! slice that resizes by power-of-two steps with quarter-full shrink
//! hysteresis, and every entry point is scoped by the [`Sanity`] detector.
//!
//! Collisions are handled by separate chaining with head insertion. Each
//! node stores the hash computed once at insert, and every resize relinks
//! every live node into the new bucket array by that stored hash; resizing
//! never byte-copies buckets and never re-runs hashing.

use crate::footprint::{Footprint, FOOTPRINT_BYTES};
use crate::resize::{self, ResizeOp, MIN_ELEMS};
use crate::sanity::Sanity;
use crate::stack::OutOfMemory;
use core::fmt;
use core::hash::BuildHasher;
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

/// Insert rejection: the key is already present, or the bucket array could
/// not grow to admit the entry. In both cases the map is unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertError {
    DuplicateKey,
    OutOfMemory(OutOfMemory),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::DuplicateKey => f.write_str("key is already present"),
            InsertError::OutOfMemory(_) => f.write_str("bucket array allocation failed"),
        }
    }
}

impl std::error::Error for InsertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InsertError::DuplicateKey => None,
            InsertError::OutOfMemory(err) => Some(err),
        }
    }
}

impl From<OutOfMemory> for InsertError {
    fn from(err: OutOfMemory) -> Self {
        InsertError::OutOfMemory(err)
    }
}

/// One chain node. `hash` is fixed at insert; lookups and rehashing index
/// by it, never by re-hashing `key`.
struct HashNode<V> {
    key: i64,
    hash: u64,
    value: V,
    next: Option<Box<HashNode<V>>>,
}

type Chain<V> = Option<Box<HashNode<V>>>;

/// Private layout behind the handle. Bucket count is `buckets.len()`,
/// always a power of two so the stored hash masks directly to an index.
struct HashCore<V, S> {
    elems_curr: usize,
    buckets: Box<[Chain<V>]>,
    hasher: S,
    sanity: Sanity,
}

// Tear chains down iteratively. The default drop of a linked Box chain
// recurses per node, and a caller-supplied hasher can make one chain
// arbitrarily long.
impl<V, S> Drop for HashCore<V, S> {
    fn drop(&mut self) {
        for slot in self.buckets.iter_mut() {
            let mut chain = slot.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
            }
        }
    }
}

/// Chained hash map with signed 64-bit keys and a fixed-size, layout-opaque
/// handle.
///
/// Grows when the live-entry count reaches the bucket count (load factor
/// one) and shrinks, best-effort, when it falls below a quarter. Handle
/// size is the same (128 bytes) for every `V`.
pub struct FixedHashMap<V, S = DefaultHashBuilder> {
    raw: Footprint<FOOTPRINT_BYTES>,
    _layout: PhantomData<HashCore<V, S>>,
}

fn empty_buckets<V>(limit: usize) -> Result<Box<[Chain<V>]>, OutOfMemory> {
    let mut fresh: Vec<Chain<V>> = Vec::new();
    fresh.try_reserve_exact(limit)?;
    fresh.resize_with(limit, || None);
    Ok(fresh.into_boxed_slice())
}

#[inline]
fn bucket_index(hash: u64, buckets: usize) -> usize {
    debug_assert!(buckets.is_power_of_two());
    (hash as usize) & (buckets - 1)
}

/// Allocate a bucket array of `limit_new` chains and relink every live node
/// into it by stored hash. On allocation failure the old buckets are
/// untouched.
fn rehash_into<V>(buckets: &mut Box<[Chain<V>]>, limit_new: usize) -> Result<(), OutOfMemory> {
    let mut fresh = empty_buckets::<V>(limit_new)?;

    for slot in buckets.iter_mut() {
        let mut chain = slot.take();
        while let Some(mut node) = chain {
            chain = node.next.take();
            let idx = bucket_index(node.hash, limit_new);
            node.next = fresh[idx].take();
            fresh[idx] = Some(node);
        }
    }

    *buckets = fresh;
    Ok(())
}

/// Detach the node carrying `key` from a chain, keeping the rest linked.
/// Iterative for the same reason chains drop iteratively.
fn unlink<V>(slot: &mut Chain<V>, key: i64) -> Option<Box<HashNode<V>>> {
    let mut cursor = slot;
    loop {
        if matches!(cursor, Some(node) if node.key == key) {
            let mut hit = cursor.take()?;
            *cursor = hit.next.take();
            return Some(hit);
        }
        match cursor {
            Some(node) => cursor = &mut node.next,
            None => return None,
        }
    }
}

fn chain_find<V>(slot: &Chain<V>, key: i64) -> Option<&HashNode<V>> {
    let mut cursor = slot.as_deref();
    while let Some(node) = cursor {
        if node.key == key {
            return Some(node);
        }
        cursor = node.next.as_deref();
    }
    None
}

fn chain_find_mut<V>(slot: &mut Chain<V>, key: i64) -> Option<&mut HashNode<V>> {
    let mut cursor = slot.as_deref_mut();
    while let Some(node) = cursor {
        if node.key == key {
            return Some(node);
        }
        cursor = node.next.as_deref_mut();
    }
    None
}

impl<V> FixedHashMap<V> {
    /// Create a map with the minimum default bucket count (4).
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<V> Default for FixedHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> FixedHashMap<V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        let buckets = core::iter::repeat_with(|| None).take(MIN_ELEMS).collect();
        Self {
            raw: Footprint::emplace(HashCore::<V, S> {
                elems_curr: 0,
                buckets,
                hasher,
                sanity: Sanity::new(),
            }),
            _layout: PhantomData,
        }
    }

    fn core(&self) -> &HashCore<V, S> {
        // Safety: emplaced with HashCore<V, S> in with_hasher; dropped only
        // in Drop.
        unsafe { self.raw.get() }
    }

    fn core_mut(&mut self) -> &mut HashCore<V, S> {
        // Safety: as in core().
        unsafe { self.raw.get_mut() }
    }

    /// Insert a key/value pair. Duplicate keys are rejected; a failed grow
    /// rejects the insert and leaves the map unchanged.
    pub fn insert(&mut self, key: i64, value: V) -> Result<(), InsertError> {
        let core = self.core_mut();
        let _g = core.sanity.enter();

        let hash = core.hasher.hash_one(key);
        let idx = bucket_index(hash, core.buckets.len());
        if chain_find(&core.buckets[idx], key).is_some() {
            return Err(InsertError::DuplicateKey);
        }

        if core.elems_curr == core.buckets.len() {
            let limit_new = resize::next_limit(core.buckets.len(), ResizeOp::Grow);
            rehash_into(&mut core.buckets, limit_new)?;
        }

        let idx = bucket_index(hash, core.buckets.len());
        let next = core.buckets[idx].take();
        core.buckets[idx] = Some(Box::new(HashNode {
            key,
            hash,
            value,
            next,
        }));
        core.elems_curr += 1;
        Ok(())
    }

    /// Remove and return the value for `key`, then give memory back if the
    /// map has become sparse. A failed shrink keeps the remove.
    pub fn remove(&mut self, key: i64) -> Option<V> {
        let core = self.core_mut();
        let _g = core.sanity.enter();

        let hash = core.hasher.hash_one(key);
        let idx = bucket_index(hash, core.buckets.len());
        let node = unlink(&mut core.buckets[idx], key)?;
        core.elems_curr -= 1;

        if let Some(limit_new) = resize::shrink_target(core.elems_curr, core.buckets.len()) {
            // Best-effort reclamation; the removal already succeeded.
            let _ = rehash_into(&mut core.buckets, limit_new);
        }

        Some(node.value)
    }

    /// Borrow the value for `key`, if present.
    pub fn find(&self, key: i64) -> Option<&V> {
        let core = self.core();
        let _g = core.sanity.enter();

        let hash = core.hasher.hash_one(key);
        let idx = bucket_index(hash, core.buckets.len());
        chain_find(&core.buckets[idx], key).map(|node| &node.value)
    }

    /// Mutably borrow the value for `key`, if present.
    pub fn find_mut(&mut self, key: i64) -> Option<&mut V> {
        let core = self.core_mut();
        let _g = core.sanity.enter();

        let hash = core.hasher.hash_one(key);
        let idx = bucket_index(hash, core.buckets.len());
        chain_find_mut(&mut core.buckets[idx], key).map(|node| &mut node.value)
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.find(key).is_some()
    }

    /// Number of live entries.
    pub fn entries(&self) -> usize {
        self.core().elems_curr
    }

    pub fn is_empty(&self) -> bool {
        self.core().elems_curr == 0
    }

    pub fn is_not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// Current bucket count (`elems_limit`). Power of two.
    pub fn capacity(&self) -> usize {
        self.core().buckets.len()
    }
}

impl<V, S> Drop for FixedHashMap<V, S> {
    fn drop(&mut self) {
        // Same teardown contract as the stack: enter the guard, never exit.
        let guard = self.core_raw_sanity().enter();
        core::mem::forget(guard);
        // Safety: matches the emplace in with_hasher; runs exactly once.
        unsafe { self.raw.drop_in_place::<HashCore<V, S>>() };
    }
}

impl<V, S> FixedHashMap<V, S> {
    // Drop cannot require S: BuildHasher, so reach the guard without the
    // bound used by the operational impl block.
    fn core_raw_sanity(&self) -> &Sanity {
        // Safety: the footprint always holds a HashCore<V, S>.
        unsafe { &self.raw.get::<HashCore<V, S>>().sanity }
    }
}

impl<V: fmt::Debug, S> fmt::Debug for FixedHashMap<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Safety: the footprint always holds a HashCore<V, S>.
        let core = unsafe { self.raw.get::<HashCore<V, S>>() };
        f.debug_struct("FixedHashMap")
            .field("elems_curr", &core.elems_curr)
            .field("elems_limit", &core.buckets.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::hash::Hasher;

    /// Forces every key into one bucket so chains, unlinking, and rehash
    /// all get exercised on a single chain.
    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        }
    }

    #[test]
    fn insert_find_remove_roundtrip() {
        let mut m: FixedHashMap<&str> = FixedHashMap::new();
        m.insert(7, "seven").unwrap();
        m.insert(-3, "minus three").unwrap();

        assert_eq!(m.find(7), Some(&"seven"));
        assert_eq!(m.find(-3), Some(&"minus three"));
        assert_eq!(m.find(0), None);
        assert_eq!(m.entries(), 2);

        assert_eq!(m.remove(7), Some("seven"));
        assert_eq!(m.remove(7), None);
        assert_eq!(m.entries(), 1);
    }

    #[test]
    fn duplicate_insert_rejected_and_map_unchanged() {
        let mut m: FixedHashMap<i32> = FixedHashMap::new();
        m.insert(1, 10).unwrap();
        match m.insert(1, 20) {
            Err(InsertError::DuplicateKey) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(m.find(1), Some(&10));
        assert_eq!(m.entries(), 1);
    }

    #[test]
    fn find_mut_updates_in_place() {
        let mut m: FixedHashMap<i32> = FixedHashMap::new();
        m.insert(5, 1).unwrap();
        *m.find_mut(5).unwrap() += 41;
        assert_eq!(m.find(5), Some(&42));
        assert_eq!(m.find_mut(99), None);
    }

    #[test]
    fn colliding_keys_live_on_one_chain() {
        let mut m: FixedHashMap<i64, ConstBuildHasher> =
            FixedHashMap::with_hasher(ConstBuildHasher);
        for k in 0..3 {
            m.insert(k, k * 100).unwrap();
        }
        for k in 0..3 {
            assert_eq!(m.find(k), Some(&(k * 100)));
        }
        // Unlink from the middle of the chain.
        assert_eq!(m.remove(1), Some(100));
        assert_eq!(m.find(0), Some(&0));
        assert_eq!(m.find(2), Some(&200));
        assert_eq!(m.entries(), 2);
    }

    #[test]
    fn grow_rehashes_every_live_key() {
        let mut m: FixedHashMap<i64> = FixedHashMap::new();
        for k in 0..100 {
            m.insert(k, -k).unwrap();
        }
        assert_eq!(m.entries(), 100);
        assert!(m.capacity() >= 100);
        assert!(m.capacity().is_power_of_two());
        for k in 0..100 {
            assert_eq!(m.find(k), Some(&-k));
        }
    }

    #[test]
    fn shrink_rehashes_and_keeps_survivors() {
        let mut m: FixedHashMap<i64> = FixedHashMap::new();
        for k in 0..64 {
            m.insert(k, k).unwrap();
        }
        let grown = m.capacity();
        for k in 4..64 {
            assert_eq!(m.remove(k), Some(k));
        }
        assert!(m.capacity() < grown);
        assert!(m.capacity() >= MIN_ELEMS);
        for k in 0..4 {
            assert_eq!(m.find(k), Some(&k));
        }
    }

    #[test]
    fn extreme_keys_are_ordinary_keys() {
        let mut m: FixedHashMap<&str> = FixedHashMap::new();
        m.insert(i64::MIN, "min").unwrap();
        m.insert(i64::MAX, "max").unwrap();
        m.insert(0, "zero").unwrap();
        assert_eq!(m.find(i64::MIN), Some(&"min"));
        assert_eq!(m.find(i64::MAX), Some(&"max"));
        assert_eq!(m.remove(i64::MIN), Some("min"));
        assert!(m.contains_key(i64::MAX));
    }

    #[test]
    fn default_hasher_is_the_hashbrown_builder() {
        // Pin the default S parameter to the re-exported alias path.
        let mut m: FixedHashMap<u8, DefaultHashBuilder> = FixedHashMap::new();
        m.insert(1, 1).unwrap();
        assert_eq!(m.find(1), Some(&1));
    }

    #[test]
    fn long_single_chain_survives_remove_and_drop() {
        // A tiny thread stack so chain-length recursion would be caught
        // here instead of only on pathological inputs in the field.
        let t = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut m: FixedHashMap<i64, ConstBuildHasher> =
                    FixedHashMap::with_hasher(ConstBuildHasher);
                for k in 0..8_000 {
                    m.insert(k, k).unwrap();
                }
                // Head insertion puts key 0 at the tail, so the unlink
                // walks the entire chain.
                assert_eq!(m.remove(0), Some(0));
                assert_eq!(m.entries(), 7_999);
                assert_eq!(m.find(1), Some(&1));
                assert_eq!(m.find(7_999), Some(&7_999));
                // The whole chain drops on scope exit.
            })
            .unwrap();
        t.join().unwrap();
    }

    #[test]
    fn empty_map_semantics() {
        let m: FixedHashMap<u8> = FixedHashMap::new();
        assert!(m.is_empty());
        assert!(!m.is_not_empty());
        assert_eq!(m.entries(), 0);
        assert_eq!(m.capacity(), MIN_ELEMS);
        assert_eq!(m.find(1), None);
    }
}
