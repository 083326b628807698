//! Entry log: the ordered record store behind the slot index.
//!
//! Backed by a `SlotMap`, so every record is addressed by a generational
//! `EntryKey`. Records are only ever appended, except when a new entry takes
//! over a tombstoned record: the old record is removed and the new one
//! inserted straight away, and `SlotMap` hands the just-freed slot back on
//! that insert. Slot order therefore stays the log order, and the bumped
//! generation keeps keys to the old record from resolving.
//!
//! Deleted records stay in place, flagged, until the next resize rebuilds
//! the log from the live ones.

use core::borrow::Borrow;
use core::mem;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    /// Generational address of one record in the log.
    pub(crate) struct EntryKey;
}

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) deleted: bool,
}

impl<K, V> Entry<K, V> {
    fn new(hash: u64, key: K, value: V) -> Self {
        Self {
            hash,
            key,
            value,
            deleted: false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct EntryLog<K, V> {
    records: SlotMap<EntryKey, Entry<K, V>>,
}

impl<K, V> EntryLog<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            records: SlotMap::with_capacity_and_key(capacity),
        }
    }

    /// Physical record count, deleted records included.
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn append(&mut self, hash: u64, key: K, value: V) -> EntryKey {
        self.records.insert(Entry::new(hash, key, value))
    }

    /// Replaces the deleted record at `tomb` with a fresh one in the same
    /// log position. The returned key differs from `tomb` in generation.
    pub(crate) fn replace(&mut self, tomb: EntryKey, hash: u64, key: K, value: V) -> EntryKey {
        debug_assert!(self.records.get(tomb).is_some_and(|e| e.deleted));
        let _old = self.records.remove(tomb);
        self.records.insert(Entry::new(hash, key, value))
    }

    /// Live record at `at`, if any.
    pub(crate) fn live(&self, at: EntryKey) -> Option<&Entry<K, V>> {
        self.records.get(at).filter(|e| !e.deleted)
    }

    pub(crate) fn live_mut(&mut self, at: EntryKey) -> Option<&mut Entry<K, V>> {
        self.records.get_mut(at).filter(|e| !e.deleted)
    }

    /// True if `at` holds a live record for `q` with the given hash.
    #[inline]
    pub(crate) fn matches<Q>(&self, at: EntryKey, hash: u64, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.live(at)
            .is_some_and(|e| e.hash == hash && e.key.borrow() == q)
    }

    /// Overwrites the value of a live record, returning the previous one.
    pub(crate) fn set_value(&mut self, at: EntryKey, value: V) -> Option<V> {
        self.live_mut(at).map(|e| mem::replace(&mut e.value, value))
    }

    /// Flags the record deleted. Returns false if it was not live.
    pub(crate) fn mark_deleted(&mut self, at: EntryKey) -> bool {
        match self.live_mut(at) {
            Some(e) => {
                e.deleted = true;
                true
            }
            None => false,
        }
    }

    /// Every record in log order, deleted ones included.
    pub(crate) fn iter(&self) -> slotmap::basic::Iter<'_, EntryKey, Entry<K, V>> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> slotmap::basic::IterMut<'_, EntryKey, Entry<K, V>> {
        self.records.iter_mut()
    }

    /// Consumes the log into a fresh one holding only the live records, in
    /// log order. A record listed in `folds` is merged into the record it
    /// maps to (which sits earlier in the log): its value overwrites the
    /// survivor's and the record itself is dropped. Returns the new log and
    /// the old-to-new key mapping of every record that moved.
    pub(crate) fn compact(
        self,
        capacity: usize,
        folds: &SecondaryMap<EntryKey, EntryKey>,
    ) -> (Self, SecondaryMap<EntryKey, EntryKey>) {
        let mut next = Self::with_capacity(capacity);
        let mut moved = SecondaryMap::new();
        for (at, e) in self.records {
            if e.deleted {
                continue;
            }
            match folds.get(at).and_then(|&survivor| moved.get(survivor)) {
                Some(&dst) => {
                    next.set_value(dst, e.value);
                }
                None => {
                    let dst = next.append(e.hash, e.key, e.value);
                    moved.insert(at, dst);
                }
            }
        }
        (next, moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut log: EntryLog<&str, i32> = EntryLog::with_capacity(4);
        for (i, k) in ["a", "b", "c"].into_iter().enumerate() {
            log.append(i as u64, k, i as i32);
        }
        let keys: Vec<_> = log.iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_takes_over_the_tombstoned_position() {
        let mut log: EntryLog<&str, i32> = EntryLog::with_capacity(4);
        let a = log.append(1, "a", 1);
        let _b = log.append(2, "b", 2);
        let _c = log.append(3, "c", 3);
        assert!(log.mark_deleted(a));
        let d = log.replace(a, 4, "d", 4);

        assert_ne!(a, d, "generation must change on reuse");
        assert!(log.records.get(a).is_none());
        assert_eq!(log.len(), 3);
        let keys: Vec<_> = log.iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec!["d", "b", "c"]);
    }

    #[test]
    fn deleted_records_do_not_match() {
        let mut log: EntryLog<String, i32> = EntryLog::with_capacity(1);
        let k = log.append(9, "x".to_string(), 0);
        assert!(log.matches(k, 9, "x"));
        assert!(!log.matches(k, 8, "x"));
        assert!(log.mark_deleted(k));
        assert!(!log.matches(k, 9, "x"));
        assert!(!log.mark_deleted(k));
        assert_eq!(log.set_value(k, 5), None);
    }

    #[test]
    fn compact_drops_deleted_and_folds_duplicates() {
        let mut log: EntryLog<&str, i32> = EntryLog::with_capacity(4);
        let a = log.append(1, "a", 1);
        let b = log.append(2, "b", 2);
        let c = log.append(3, "c", 3);
        let a2 = log.append(1, "a", 10);
        let d = log.append(4, "d", 4);
        log.mark_deleted(c);

        let mut folds = SecondaryMap::new();
        folds.insert(a2, a);
        let (next, moved) = log.compact(8, &folds);

        assert_eq!(next.len(), 3);
        assert_eq!(moved.len(), 3);
        assert!(moved.get(c).is_none());
        assert!(moved.get(a2).is_none());
        let survivors: Vec<_> = next.iter().map(|(_, e)| (e.key, e.value)).collect();
        assert_eq!(survivors, vec![("a", 10), ("b", 2), ("d", 4)]);
        for old in [a, b, d] {
            assert!(next.live(moved[old]).is_some());
        }
    }
}
