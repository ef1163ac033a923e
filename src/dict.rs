//! An associative map with incremental two-table rehashing and dual
//! safe/unsafe iteration (spec.md §4.2). Grounded in the shape the teacher
//! itself never got around to building: `RedisDB` (`src/redis/db.rs`) just
//! wraps `std::collections::HashMap`, leaving the real chained, rehashing
//! table undescribed in Rust anywhere in the reference pack. This module
//! follows the original's documented algorithm directly rather than any
//! single file in the pack, expressed through the teacher's texture
//! (manual chains, hand-written vtable trait, no derive macros beyond the
//! ones the teacher already leans on).
//!
//! The C original's value is a tagged union of pointer/i64/u64/double with
//! an out-of-band discriminator; a generic `V` type parameter replaces it
//! here; Rust's ownership model means the vtable's `key_dup`/`value_dup`/
//! `key_destructor`/`value_destructor` slots collapse into `K: Clone` plus
//! ordinary `Drop`, so `DictType` only needs to supply `hash` and
//! `key_eq`.

mod iter;

use crate::error::DictError;

pub use iter::{SafeIter, UnsafeIter};

/// Lazily-allocated table starting size (spec.md §6).
pub const DICT_HT_INITIAL_SIZE: usize = 4;

/// Caller-supplied capability for a dictionary's key/value pair (spec.md
/// §6 "Map type vtable"). `key_dup`/`value_dup`/the destructors are not
/// modeled: ownership and `Drop` already give Rust those for free.
pub trait DictType<K, V> {
    fn hash(&self, key: &K) -> u64;
    fn key_eq(&self, a: &K, b: &K) -> bool;
}

/// Per-instance replacement for the teacher's `dictEnableResize`/
/// `dictDisableResize` process-wide globals (spec.md §9 Design Notes,
/// REDESIGN FLAG): carried as state on the dictionary itself instead of
/// hidden global mutable state, so forked-child-style "suspend growth"
/// windows are explicit and scoped to one dictionary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResizePolicy {
    Allowed,
    Suspended,
}

struct Entry<K, V> {
    key: K,
    value: V,
    next: Option<Box<Entry<K, V>>>,
}

struct Table<K, V> {
    buckets: Vec<Option<Box<Entry<K, V>>>>,
    size: usize,
    size_mask: u64,
    used: usize,
}

impl<K, V> Table<K, V> {
    fn empty() -> Self {
        Table { buckets: Vec::new(), size: 0, size_mask: 0, used: 0 }
    }

    fn with_size(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        let mut buckets = Vec::with_capacity(size);
        buckets.resize_with(size, || None);
        Table { buckets, size, size_mask: (size as u64) - 1, used: 0 }
    }
}

/// An incrementally-rehashing hash table (spec.md §3 "Dictionary").
pub struct Dict<K, V, T: DictType<K, V>> {
    vtable: T,
    ht: [Table<K, V>; 2],
    rehash_index: i64,
    iterator_count: u32,
    resize_policy: ResizePolicy,
}

fn next_table_size(n: usize) -> usize {
    n.max(DICT_HT_INITIAL_SIZE).next_power_of_two()
}

impl<K, V, T: DictType<K, V>> Dict<K, V, T> {
    /// Empty dictionary; `ht[0]` is unallocated until the first insert
    /// (spec.md §4.2 `create`).
    pub fn new(vtable: T) -> Self {
        Dict {
            vtable,
            ht: [Table::empty(), Table::empty()],
            rehash_index: -1,
            iterator_count: 0,
            resize_policy: ResizePolicy::Allowed,
        }
    }

    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_rehashing(&self) -> bool {
        self.rehash_index != -1
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize_policy
    }

    pub fn suspend_resize(&mut self) {
        self.resize_policy = ResizePolicy::Suspended;
    }

    pub fn allow_resize(&mut self) {
        self.resize_policy = ResizePolicy::Allowed;
    }

    fn bucket_index(&self, table: usize, key: &K) -> usize {
        (self.vtable.hash(key) & self.ht[table].size_mask) as usize
    }

    fn rehash_step(&mut self) {
        if self.is_rehashing() && self.iterator_count == 0 {
            self.rehash(1);
        }
    }

    /// Migrates up to `steps` non-empty buckets from `ht[0]` to `ht[1]`
    /// (spec.md §4.2 `rehash`). Returns whether more work remains.
    pub fn rehash(&mut self, steps: usize) -> bool {
        if !self.is_rehashing() {
            return false;
        }

        let (ht0_slice, ht1_slice) = self.ht.split_at_mut(1);
        let ht0 = &mut ht0_slice[0];
        let ht1 = &mut ht1_slice[0];
        let empty_visits_budget = 10 * steps.max(1);
        let mut empty_visits = 0usize;
        let mut steps_done = 0usize;

        while steps_done < steps && ht0.used != 0 {
            while (self.rehash_index as usize) < ht0.size && ht0.buckets[self.rehash_index as usize].is_none() {
                self.rehash_index += 1;
                empty_visits += 1;
                if empty_visits >= empty_visits_budget {
                    return true;
                }
            }
            if (self.rehash_index as usize) >= ht0.size {
                break;
            }

            let mut node = ht0.buckets[self.rehash_index as usize].take();
            while let Some(mut entry) = node {
                node = entry.next.take();
                let idx1 = (self.vtable.hash(&entry.key) & ht1.size_mask) as usize;
                entry.next = ht1.buckets[idx1].take();
                ht0.used -= 1;
                ht1.used += 1;
                ht1.buckets[idx1] = Some(entry);
            }
            self.rehash_index += 1;
            steps_done += 1;
        }

        if ht0.used == 0 {
            std::mem::swap(ht0, ht1);
            *ht1 = Table::empty();
            self.rehash_index = -1;
            false
        } else {
            true
        }
    }

    /// Calls `rehash(100)` until `ms` milliseconds have elapsed or
    /// rehashing completes (spec.md §4.2 `rehash_for`).
    pub fn rehash_for_ms(&mut self, ms: i64) {
        let deadline = crate::util::add_ms_to_now(ms);
        while crate::util::now_ms() < deadline {
            if !self.rehash(100) {
                break;
            }
        }
    }

    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        if self.ht[0].size == 0 {
            let _ = self.expand(DICT_HT_INITIAL_SIZE);
            return;
        }
        let size = self.ht[0].size;
        let used = self.ht[0].used;
        if (used >= size && self.resize_policy == ResizePolicy::Allowed) || used >= size * 5 {
            let _ = self.expand(used + 1);
        }
    }

    /// Allocates `ht[1]` sized to the next power of two `≥ max(n, used)`
    /// and begins rehashing (spec.md §4.2 `expand`). If `ht[0]` is not yet
    /// allocated, installs directly into `ht[0]` instead (no rehash
    /// needed for an empty table).
    pub fn expand(&mut self, n: usize) -> Result<(), DictError> {
        if self.is_rehashing() {
            return Ok(());
        }
        let target = next_table_size(n.max(self.ht[0].used));
        if self.ht[0].size == 0 {
            self.ht[0] = Table::with_size(target);
            return Ok(());
        }
        if target == self.ht[0].size {
            return Ok(());
        }
        self.ht[1] = Table::with_size(target);
        self.rehash_index = 0;
        Ok(())
    }

    /// Targets a load factor of 1 against the current `used` count
    /// (spec.md §4.2 `resize`).
    pub fn resize(&mut self) -> Result<(), DictError> {
        if self.resize_policy == ResizePolicy::Suspended || self.is_rehashing() {
            return Ok(());
        }
        let minimal = self.ht[0].used.max(1);
        self.expand(minimal)
    }

    /// Looks up `key`, performing one incremental rehash step first
    /// (spec.md §4.2 "Incremental rehash hook" — lookups step too).
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.rehash_step();
        for t in 0..2 {
            if self.ht[t].size == 0 {
                if t == 0 {
                    continue;
                } else {
                    break;
                }
            }
            let idx = self.bucket_index(t, key);
            let mut node = self.ht[t].buckets[idx].as_mut();
            while let Some(e) = node {
                if self.vtable.key_eq(&e.key, key) {
                    return Some(&mut e.value);
                }
                node = e.next.as_mut();
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    pub fn find(&mut self, key: &K) -> Option<&V> {
        self.find_mut(key).map(|v| &*v)
    }

    /// Same lookup as `find_mut` without the leading rehash step, for
    /// callers that already performed their one step for this operation
    /// (spec.md §4.2 "Incremental rehash hook": one step per mutating
    /// operation, not per internal lookup it happens to make).
    fn find_mut_no_step(&mut self, key: &K) -> Option<&mut V> {
        for t in 0..2 {
            if self.ht[t].size == 0 {
                if t == 0 {
                    continue;
                } else {
                    break;
                }
            }
            let idx = self.bucket_index(t, key);
            let mut node = self.ht[t].buckets[idx].as_mut();
            while let Some(e) = node {
                if self.vtable.key_eq(&e.key, key) {
                    return Some(&mut e.value);
                }
                node = e.next.as_mut();
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Read-only lookup that does not advance the rehash (used by
    /// `UnsafeIter`, which only ever holds a shared borrow).
    pub(crate) fn lookup_immutable(&self, key: &K) -> Option<&V> {
        for t in 0..2 {
            if self.ht[t].size == 0 {
                if t == 0 {
                    continue;
                } else {
                    break;
                }
            }
            let idx = self.bucket_index(t, key);
            let mut node = self.ht[t].buckets[idx].as_deref();
            while let Some(e) = node {
                if self.vtable.key_eq(&e.key, key) {
                    return Some(&e.value);
                }
                node = e.next.as_deref();
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    pub fn fetch_value(&mut self, key: &K) -> Option<&V> {
        self.find(key)
    }

    pub fn contains_key(&mut self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts at the head of its bucket chain and returns a mutable
    /// handle to the installed value; on a duplicate key, hands the
    /// key/value back unconsumed (spec.md §4.2 `add_raw`). The C
    /// original returns the raw entry with an uninitialized value slot
    /// for the caller to fill in later; Rust values are never
    /// uninitialized, so the value is supplied up front instead.
    pub fn add_raw(&mut self, key: K, value: V) -> Result<&mut V, (K, V)> {
        self.rehash_step();
        if self.find_mut_no_step(&key).is_some() {
            return Err((key, value));
        }
        self.expand_if_needed();
        let table = if self.is_rehashing() { 1 } else { 0 };
        let idx = self.bucket_index(table, &key);
        let next = self.ht[table].buckets[idx].take();
        self.ht[table].buckets[idx] = Some(Box::new(Entry { key, value, next }));
        self.ht[table].used += 1;
        Ok(&mut self.ht[table].buckets[idx].as_mut().unwrap().value)
    }

    /// Duplicate-rejecting insert (spec.md §4.2 `add`).
    pub fn add(&mut self, key: K, value: V) -> Result<(), DictError> {
        match self.add_raw(key, value) {
            Ok(_) => Ok(()),
            Err(_) => Err(DictError::KeyExists),
        }
    }

    /// Inserts if absent; otherwise installs the new value before
    /// dropping the old one, so a self-referential update (the new value
    /// borrowed from the old) stays valid until the swap completes
    /// (spec.md §4.2 `replace`).
    pub fn replace(&mut self, key: K, value: V) {
        match self.add_raw(key, value) {
            Ok(_) => {}
            Err((key, value)) => {
                if let Some(slot) = self.find_mut_no_step(&key) {
                    let old = std::mem::replace(slot, value);
                    drop(old);
                }
            }
        }
    }

    /// Detaches the entry from its chain without dropping it, returning
    /// ownership of its key and value (spec.md §4.2 `unlink`).
    pub fn unlink(&mut self, key: &K) -> Option<(K, V)> {
        self.rehash_step();
        for t in 0..2 {
            let table = &mut self.ht[t];
            if table.size == 0 {
                if t == 0 {
                    continue;
                } else {
                    break;
                }
            }
            let idx = (self.vtable.hash(key) & table.size_mask) as usize;
            let mut slot = &mut table.buckets[idx];
            loop {
                let is_match = match slot.as_ref() {
                    Some(e) => self.vtable.key_eq(&e.key, key),
                    None => break,
                };
                if is_match {
                    let mut owned = slot.take().unwrap();
                    *slot = owned.next.take();
                    self.ht[t].used -= 1;
                    return Some((owned.key, owned.value));
                }
                // Reborrow into the chain; `slot` cannot be reused after this
                // point in the same iteration since it's about to be shadowed.
                let next_slot: &mut Option<Box<Entry<K, V>>> = &mut slot.as_mut().unwrap().next;
                slot = next_slot;
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Releases an entry previously detached by `unlink` (spec.md §4.2
    /// `free_unlinked`). Ownership already makes this a no-op beyond the
    /// implicit drop; kept as a named operation for parity with the
    /// two-step unlink/free contract.
    pub fn free_unlinked(&self, entry: (K, V)) {
        drop(entry);
    }

    /// Removes and drops the entry for `key` (spec.md §4.2 `delete`).
    pub fn delete(&mut self, key: &K) -> Result<(), DictError> {
        match self.unlink(key) {
            Some(entry) => {
                self.free_unlinked(entry);
                Ok(())
            }
            None => Err(DictError::NotFound),
        }
    }

    fn random_nonempty_bucket(&self) -> Option<(usize, usize)> {
        if self.len() == 0 {
            return None;
        }
        use rand::Rng;
        let mut rng = rand::thread_rng();
        if self.is_rehashing() {
            let span = (self.ht[0].size as u64 + self.ht[1].size as u64) - self.rehash_index as u64;
            loop {
                let h = self.rehash_index as u64 + rng.gen_range(0..span);
                if h >= self.ht[0].size as u64 {
                    let i1 = (h - self.ht[0].size as u64) as usize;
                    if self.ht[1].buckets[i1].is_some() {
                        return Some((1, i1));
                    }
                } else {
                    let i0 = h as usize;
                    if self.ht[0].buckets[i0].is_some() {
                        return Some((0, i0));
                    }
                }
            }
        } else {
            if self.ht[0].size == 0 {
                return None;
            }
            loop {
                let i0 = rng.gen_range(0..self.ht[0].size);
                if self.ht[0].buckets[i0].is_some() {
                    return Some((0, i0));
                }
            }
        }
    }

    /// Uniformly selects a non-empty bucket and returns its head, without
    /// walking the chain — biased against entries that never sit at the
    /// head of a bucket (spec.md §4.2 `get_random_key`).
    pub fn get_random_key(&self) -> Option<(&K, &V)> {
        let (t, idx) = self.random_nonempty_bucket()?;
        self.ht[t].buckets[idx].as_deref().map(|e| (&e.key, &e.value))
    }

    /// Selects a non-empty bucket, then a uniformly random position
    /// within its chain (spec.md §4.2 `get_fair_random_key`).
    pub fn get_fair_random_key(&self) -> Option<(&K, &V)> {
        use rand::Rng;
        let (t, idx) = self.random_nonempty_bucket()?;
        let head = self.ht[t].buckets[idx].as_deref()?;
        let mut len = 0usize;
        let mut node = Some(head);
        while let Some(e) = node {
            len += 1;
            node = e.next.as_deref();
        }
        let pick = rand::thread_rng().gen_range(0..len);
        let mut node = Some(head);
        for _ in 0..pick {
            node = node.and_then(|e| e.next.as_deref());
        }
        node.map(|e| (&e.key, &e.value))
    }

    /// Approximately-uniform sample of up to `count` keys, gathered by
    /// repeated `scan` calls from a random starting cursor (spec.md §4.2
    /// `get_some_keys`). May return fewer than `count` if the dictionary
    /// is smaller, or if scanning wraps before filling the quota.
    pub fn get_some_keys(&self, count: usize) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut out = Vec::new();
        if self.is_empty() || count == 0 {
            return out;
        }
        use rand::Rng;
        let mut cursor: u64 = rand::thread_rng().gen();
        let max_rounds = count.saturating_mul(10).max(100);
        for _ in 0..max_rounds {
            cursor = self.scan(cursor, |_bucket| {}, |k, v| {
                if out.len() < count {
                    out.push((k.clone(), v.clone()));
                }
            });
            if out.len() >= count || cursor == 0 {
                break;
            }
        }
        out
    }

    /// Reverse-binary-increment cursor scan (spec.md §4.2 `scan`,
    /// GLOSSARY "Cursor"). `bucket_cb` runs once per visited bucket index
    /// (both tables' matching buckets while rehashing); `entry_cb` runs
    /// once per live entry encountered. Returns the next cursor; the scan
    /// is complete once it returns 0.
    pub fn scan(&self, cursor: u64, mut bucket_cb: impl FnMut(usize), mut entry_cb: impl FnMut(&K, &V)) -> u64 {
        if !self.is_rehashing() {
            let t0 = &self.ht[0];
            if t0.size == 0 {
                return 0;
            }
            let mask0 = t0.size_mask;
            let idx = (cursor & mask0) as usize;
            bucket_cb(idx);
            let mut node = t0.buckets[idx].as_deref();
            while let Some(e) = node {
                entry_cb(&e.key, &e.value);
                node = e.next.as_deref();
            }
            reverse_binary_increment(cursor, mask0)
        } else {
            let (small, large) = if self.ht[0].size <= self.ht[1].size {
                (&self.ht[0], &self.ht[1])
            } else {
                (&self.ht[1], &self.ht[0])
            };
            let mask0 = small.size_mask;
            let idx = (cursor & mask0) as usize;
            bucket_cb(idx);
            let mut node = small.buckets[idx].as_deref();
            while let Some(e) = node {
                entry_cb(&e.key, &e.value);
                node = e.next.as_deref();
            }

            let mask1 = large.size_mask;
            let mut idx_l = idx as u64;
            loop {
                bucket_cb(idx_l as usize);
                let mut node = large.buckets[idx_l as usize].as_deref();
                while let Some(e) = node {
                    entry_cb(&e.key, &e.value);
                    node = e.next.as_deref();
                }
                idx_l += mask0 + 1;
                if idx_l > mask1 {
                    break;
                }
            }
            reverse_binary_increment(cursor, mask1)
        }
    }

    /// Opens a cursor that tolerates mutating `self` between calls to its
    /// `next` (spec.md §4.2, §5). Unlike a stock `Iterator`, this does not
    /// borrow `self` for the cursor's whole lifetime — see `SafeIter`.
    pub fn safe_iter(&self) -> SafeIter<K> {
        SafeIter::new()
    }

    pub fn unsafe_iter(&self) -> UnsafeIter<'_, K, V, T> {
        UnsafeIter::new(self)
    }
}

/// Reverse-binary increment of `v` restricted to `mask`'s bit width: the
/// trick that lets `scan` keep covering every bucket across intervening
/// table resizes (GLOSSARY "Cursor").
fn reverse_binary_increment(mut v: u64, mask: u64) -> u64 {
    v |= !mask;
    v = v.reverse_bits();
    v = v.wrapping_add(1);
    v.reverse_bits()
}

pub(crate) fn fingerprint<K, V, T: DictType<K, V>>(dict: &Dict<K, V, T>) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut h = std::collections::hash_map::DefaultHasher::new();
    (dict.ht[0].buckets.as_ptr() as usize).hash(&mut h);
    dict.ht[0].size.hash(&mut h);
    dict.ht[0].used.hash(&mut h);
    (dict.ht[1].buckets.as_ptr() as usize).hash(&mut h);
    dict.ht[1].size.hash(&mut h);
    dict.ht[1].used.hash(&mut h);
    h.finish()
}

/// Marker so `iter.rs` can mutate `iterator_count` without a public
/// setter leaking into the rest of the crate's API.
pub(crate) fn bump_iterator_count<K, V, T: DictType<K, V>>(dict: &mut Dict<K, V, T>, delta: i32) {
    if delta >= 0 {
        dict.iterator_count += delta as u32;
    } else {
        dict.iterator_count = dict.iterator_count.saturating_sub((-delta) as u32);
    }
}

fn bucket_head_key<K: Clone, V>(t: &Table<K, V>, bucket: usize) -> Option<K> {
    t.buckets[bucket].as_deref().map(|e| e.key.clone())
}

/// Finds `key` in `bucket` (assumed still present there) and returns the
/// key of its chain successor, if any. Only ever called on a key this
/// module itself just handed to the caller as the current cursor position,
/// so the search cannot fail under the documented single-entry-deletion
/// contract (spec.md §4.2): the caller may unlink the entry it was just
/// given, never one the cursor hasn't reached yet.
fn successor_key<K: Clone, V>(t: &Table<K, V>, bucket: usize, key: &K, eq: &impl Fn(&K, &K) -> bool) -> Option<K> {
    let mut node = t.buckets[bucket].as_deref();
    while let Some(e) = node {
        if eq(&e.key, key) {
            return e.next.as_deref().map(|n| n.key.clone());
        }
        node = e.next.as_deref();
    }
    None
}

/// Advances `(table, bucket)` to the next non-empty bucket at or after the
/// given position (visiting `ht[1]` too while rehashing), returning its
/// head key. Leaves `(table, bucket)` pointing at that bucket.
fn find_next_bucket_head<K: Clone, V, T: DictType<K, V>>(
    dict: &Dict<K, V, T>,
    table: &mut usize,
    bucket: &mut usize,
) -> Option<K> {
    let mut t = *table;
    let mut b = *bucket;
    loop {
        let tbl = &dict.ht[t];
        while b < tbl.size {
            if let Some(k) = bucket_head_key(tbl, b) {
                *table = t;
                *bucket = b;
                return Some(k);
            }
            b += 1;
        }
        if t == 0 && dict.is_rehashing() {
            t = 1;
            b = 0;
        } else {
            return None;
        }
    }
}

/// Cursor step shared by `SafeIter` and `UnsafeIter`. `pending` holds the
/// key the *previous* call already determined comes next (captured by
/// peeking the yielded entry's chain successor at the time it was handed
/// back), so this call never has to re-locate a potentially-deleted
/// previous key to find its way forward — the defining property spec.md
/// §4.2 requires ("`nextEntry` caches the successor before yielding
/// `entry` so that the caller may unlink the yielded entry without losing
/// its neighbor").
pub(crate) fn seek<K: Clone, V, T: DictType<K, V>>(
    dict: &Dict<K, V, T>,
    table: &mut usize,
    bucket: &mut usize,
    pending: &mut Option<K>,
) -> Option<K> {
    let key = match pending.take() {
        Some(k) => k,
        None => find_next_bucket_head(dict, table, bucket)?,
    };

    let eq = |a: &K, b: &K| dict.vtable.key_eq(a, b);
    match successor_key(&dict.ht[*table], *bucket, &key, &eq) {
        Some(next) => *pending = Some(next),
        None => *bucket += 1,
    }
    Some(key)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::DictType;
    use std::hash::{Hash, Hasher};

    pub struct StringKeys;

    impl DictType<String, i64> for StringKeys {
        fn hash(&self, key: &String) -> u64 {
            let mut h = std::collections::hash_map::DefaultHasher::new();
            key.hash(&mut h);
            h.finish()
        }

        fn key_eq(&self, a: &String, b: &String) -> bool {
            a == b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StringKeys;
    use super::*;

    fn dict() -> Dict<String, i64, StringKeys> {
        Dict::new(StringKeys)
    }

    #[test]
    fn add_tracks_size_and_rejects_duplicates() {
        let mut d = dict();
        assert!(d.add("a".to_string(), 1).is_ok());
        assert_eq!(d.len(), 1);
        assert_eq!(d.add("a".to_string(), 2), Err(DictError::KeyExists));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn delete_removes_and_errors_on_missing() {
        let mut d = dict();
        d.add("a".to_string(), 1).unwrap();
        assert!(d.delete(&"a".to_string()).is_ok());
        assert_eq!(d.len(), 0);
        assert_eq!(d.delete(&"a".to_string()), Err(DictError::NotFound));
    }

    #[test]
    fn replace_updates_existing_value() {
        let mut d = dict();
        d.add("a".to_string(), 1).unwrap();
        d.replace("a".to_string(), 2);
        assert_eq!(*d.find(&"a".to_string()).unwrap(), 2);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn inserting_many_keys_keeps_power_of_two_tables() {
        let mut d = dict();
        for i in 0..1000 {
            d.add(format!("k{i}"), i).unwrap();
            if (i + 1) % 50 == 0 {
                assert_eq!(d.len(), (i + 1) as usize);
                assert!(d.ht[0].size == 0 || d.ht[0].size.is_power_of_two());
                if d.ht[1].size != 0 {
                    assert!(d.ht[1].size.is_power_of_two());
                }
            }
        }
        assert_eq!(d.len(), 1000);
    }

    #[test]
    fn find_succeeds_during_in_progress_rehash() {
        let mut d = dict();
        // Force a small starting table, then insert enough to trigger
        // rehashing and interleave lookups mid-migration.
        d.expand(4).unwrap();
        for i in 0..100 {
            d.add(format!("k{i}"), i).unwrap();
        }
        assert!(d.is_rehashing() || d.ht[1].size == 0);
        for i in 0..100 {
            assert_eq!(*d.find(&format!("k{i}")).unwrap(), i);
        }
    }

    #[test]
    fn full_rehash_empties_ht1_and_keeps_all_keys_reachable() {
        let mut d = dict();
        for i in 0..200 {
            d.add(format!("k{i}"), i).unwrap();
        }
        while d.rehash(1_000_000) {}
        assert_eq!(d.ht[1].size, 0);
        for i in 0..200 {
            assert_eq!(*d.find(&format!("k{i}")).unwrap(), i);
        }
    }

    #[test]
    fn scan_covers_every_key_at_least_once() {
        let mut d = dict();
        for i in 0..300 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let mut seen = std::collections::HashMap::new();
        let mut cursor = 0u64;
        loop {
            cursor = d.scan(
                cursor,
                |_b| {},
                |k, _v| {
                    *seen.entry(k.clone()).or_insert(0) += 1;
                },
            );
            if cursor == 0 {
                break;
            }
        }
        for i in 0..300 {
            let count = *seen.get(&format!("k{i}")).unwrap_or(&0);
            assert!(count >= 1 && count <= 2, "key k{i} seen {count} times");
        }
    }

    #[test]
    fn random_key_returns_a_live_entry() {
        let mut d = dict();
        for i in 0..10 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let (k, _v) = d.get_random_key().unwrap();
        assert!(k.starts_with('k'));
        let (k2, _v2) = d.get_fair_random_key().unwrap();
        assert!(k2.starts_with('k'));
    }

    #[test]
    fn empty_dict_yields_no_random_key() {
        let d = dict();
        assert!(d.get_random_key().is_none());
        assert!(d.get_fair_random_key().is_none());
    }

    #[test]
    fn get_some_keys_returns_only_live_distinct_keys() {
        let mut d = dict();
        for i in 0..200 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let sample = d.get_some_keys(20);
        assert!(!sample.is_empty());
        let mut seen = std::collections::HashSet::new();
        for (k, v) in &sample {
            assert!(seen.insert(k.clone()), "duplicate key {k} in sample");
            assert_eq!(*d.find(k).unwrap(), *v);
        }
    }

    #[test]
    fn rehash_for_ms_drains_an_in_progress_rehash() {
        let mut d = dict();
        d.expand(4).unwrap();
        for i in 0..500 {
            d.add(format!("k{i}"), i).unwrap();
        }
        d.rehash_for_ms(50);
        assert!(!d.is_rehashing());
        assert_eq!(d.ht[1].size, 0);
        for i in 0..500 {
            assert_eq!(*d.find(&format!("k{i}")).unwrap(), i);
        }
    }
}
