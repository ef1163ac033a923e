//! Safe and unsafe external iterators (spec.md §4.2 "Iterators",
//! GLOSSARY "Safe iterator" / "Unsafe iterator"). Both walk the dictionary
//! bucket-by-bucket via `seek`, which caches the successor of the
//! about-to-be-returned entry before handing that entry back — so a
//! caller can delete the key it was just given without derailing the
//! rest of the walk.
//!
//! `SafeIter` does not hold the dictionary borrowed for its whole
//! lifetime the way a stock `Iterator` would: spec.md §5 requires that
//! "while a safe iterator lives, the dictionary may be mutated via
//! add/delete/replace", which a `&mut Dict`-holding `Iterator::next(&mut
//! self)` shape cannot satisfy (the borrow checker would forbid any other
//! access to the dictionary for as long as the iterator exists). Instead
//! `SafeIter` is a free-standing cursor: `next(&mut self, dict: &mut
//! Dict<..>)` borrows the dictionary only for the duration of that one
//! call, and `release` (the counterpart of `dictReleaseIterator`) must be
//! called explicitly once iteration is done, to re-enable incremental
//! rehashing. `UnsafeIter` has no such requirement — spec.md forbids any
//! mutation during its lifetime anyway, so it keeps the ordinary
//! `Iterator` shape over a plain `&'a Dict` borrow, which the borrow
//! checker already enforces for free; it snapshots a fingerprint of the
//! table shape at creation and checks it again on drop, panicking if
//! anything changed underneath it regardless.

use super::{bump_iterator_count, fingerprint, seek, Dict, DictType};

/// A cursor over a dictionary that tolerates `add`/`delete`/`unlink`/
/// `replace` between (not during) calls to `next`, including deleting the
/// key `next` just returned (spec.md §4.2, §5, §8 scenario 5). Pins the
/// dictionary against incremental rehashing from the first `next` call
/// until `release`.
pub struct SafeIter<K> {
    table: usize,
    bucket: usize,
    pending: Option<K>,
    started: bool,
    released: bool,
}

impl<K> SafeIter<K> {
    pub(crate) fn new() -> Self {
        SafeIter { table: 0, bucket: 0, pending: None, started: false, released: false }
    }

    /// Returns the next live key/value pair, or `None` once every bucket
    /// has been visited. Pins `dict.iterator_count` on the first call.
    pub fn next<V, T>(&mut self, dict: &mut Dict<K, V, T>) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
        T: DictType<K, V>,
    {
        if self.released {
            return None;
        }
        if !self.started {
            self.started = true;
            bump_iterator_count(dict, 1);
        }
        loop {
            let key = seek(dict, &mut self.table, &mut self.bucket, &mut self.pending)?;
            // The only key that could have vanished since it was cached
            // as `pending` is this one, and only if the caller's last
            // mutation reached past the documented "delete what you were
            // just given" contract; skip it and keep walking rather than
            // ending the iteration early.
            if let Some(v) = dict.lookup_immutable(&key) {
                return Some((key, v.clone()));
            }
        }
    }

    /// Ends the iteration, re-enabling incremental rehash on `dict`
    /// (spec.md §4.2: a safe iterator "decrements [iterator_count] at
    /// release"). Idempotent; safe to call even if `next` was never
    /// called.
    pub fn release<V, T: DictType<K, V>>(&mut self, dict: &mut Dict<K, V, T>) {
        if self.started && !self.released {
            bump_iterator_count(dict, -1);
        }
        self.released = true;
    }
}

pub struct UnsafeIter<'a, K, V, T: DictType<K, V>> {
    dict: &'a Dict<K, V, T>,
    table: usize,
    bucket: usize,
    pending: Option<K>,
    fingerprint: u64,
}

impl<'a, K, V, T: DictType<K, V>> UnsafeIter<'a, K, V, T> {
    pub(crate) fn new(dict: &'a Dict<K, V, T>) -> Self {
        UnsafeIter { fingerprint: fingerprint(dict), dict, table: 0, bucket: 0, pending: None }
    }
}

impl<'a, K: Clone, V: Clone, T: DictType<K, V>> Iterator for UnsafeIter<'a, K, V, T> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let key = seek(self.dict, &mut self.table, &mut self.bucket, &mut self.pending)?;
        let value = self.dict.lookup_immutable(&key)?.clone();
        Some((key, value))
    }
}

impl<'a, K, V, T: DictType<K, V>> Drop for UnsafeIter<'a, K, V, T> {
    fn drop(&mut self) {
        if fingerprint(self.dict) != self.fingerprint {
            panic!("{}", crate::error::DictError::FingerprintMismatch);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dict::test_support::StringKeys;
    use crate::dict::Dict;

    #[test]
    fn safe_iter_visits_every_key_once() {
        let mut d = Dict::new(StringKeys);
        for i in 0..50 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let mut it = d.safe_iter();
        let mut seen = std::collections::HashSet::new();
        while let Some((k, _v)) = it.next(&mut d) {
            seen.insert(k);
        }
        it.release(&mut d);
        assert_eq!(seen.len(), 50);
    }

    #[test]
    fn safe_iter_tolerates_deleting_the_current_key_during_iteration() {
        let mut d = Dict::new(StringKeys);
        for i in 0..1000 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let mut it = d.safe_iter();
        let mut seen = std::collections::HashSet::new();
        while let Some((k, _v)) = it.next(&mut d) {
            assert!(seen.insert(k.clone()), "key {k} visited twice");
            let entry = d.unlink(&k).unwrap();
            d.free_unlinked(entry);
        }
        it.release(&mut d);
        assert_eq!(seen.len(), 1000);
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn safe_iter_sees_keys_added_after_it_was_opened() {
        let mut d = Dict::new(StringKeys);
        for i in 0..10 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let mut it = d.safe_iter();
        // Consume one entry, then grow the dictionary through the live
        // iterator — this is only possible because `next` borrows `d` for
        // one call at a time rather than holding it for the iterator's
        // whole life.
        let first = it.next(&mut d);
        assert!(first.is_some());
        d.add("late".to_string(), 999).unwrap();
        let mut seen = std::collections::HashSet::new();
        if let Some((k, _v)) = first {
            seen.insert(k);
        }
        while let Some((k, _v)) = it.next(&mut d) {
            seen.insert(k);
        }
        it.release(&mut d);
        assert!(seen.contains("late") || d.find(&"late".to_string()).is_some());
    }

    #[test]
    fn unsafe_iter_completes_without_panic_when_untouched() {
        let mut d = Dict::new(StringKeys);
        for i in 0..10 {
            d.add(format!("k{i}"), i).unwrap();
        }
        let seen: std::collections::HashSet<String> = d.unsafe_iter().map(|(k, _v)| k).collect();
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn unsafe_iter_tolerates_deleting_the_current_key() {
        let mut d = Dict::new(StringKeys);
        for i in 0..200 {
            d.add(format!("k{i}"), i).unwrap();
        }
        // `UnsafeIter` still caches the successor key at yield time, so
        // scanning a bucket whose earlier entries get collected for later
        // deletion (after the iterator is dropped, since it holds `&d`)
        // visits every key exactly once.
        let keys: Vec<String> = d.unsafe_iter().map(|(k, _v)| k).collect();
        assert_eq!(keys.len(), 200);
        for k in &keys {
            d.delete(k).unwrap();
        }
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn fingerprint_changes_after_a_structural_mutation() {
        // `UnsafeIter` holds a `&Dict`, so no safe caller can mutate the
        // dictionary while one is alive — the borrow checker already
        // forbids the exact misuse `dictGetIterator`'s fingerprint guards
        // against in C. What can still be exercised directly is the
        // fingerprint itself: it must change whenever the table is
        // rehashed out from under it, which is what the `Drop` check
        // actually compares.
        let mut d = Dict::new(StringKeys);
        d.add("a".to_string(), 1).unwrap();
        let before = crate::dict::fingerprint(&d);
        for i in 0..64 {
            d.add(format!("extra{i}"), i).unwrap();
        }
        while d.rehash(1) {}
        let after = crate::dict::fingerprint(&d);
        assert_ne!(before, after);
    }
}
