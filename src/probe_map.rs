//! ProbeMap: the container facade over the slot index and entry log.

use crate::config::{InsertPolicy, MapConfig};
use crate::entry_log::{EntryKey, EntryLog};
use crate::error::{Error, Result};
use crate::guard::OpGuard;
use crate::iter::{Iter, IterMut, Keys, Values};
use crate::slot_index::{InsertSlot, SlotIndex};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use slotmap::SecondaryMap;
use tracing::{debug, trace};

/// Stable reference to one live entry.
///
/// Valid until the entry is deleted, the map resizes, or the map is
/// cleared. After that it resolves to `None`; it never aliases a newer
/// entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    epoch: u64,
    entry: EntryKey,
}

impl Handle {
    pub fn key<'a, K, V, S>(&self, map: &'a ProbeMap<K, V, S>) -> Option<&'a K> {
        map.resolve(*self).map(|(k, _)| k)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a ProbeMap<K, V, S>) -> Option<&'a V> {
        map.resolve(*self).map(|(_, v)| v)
    }

    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut ProbeMap<K, V, S>) -> Option<&'a mut V> {
        map.resolve_mut(*self)
    }
}

/// Occupancy snapshot. `tombstones` only drops at a resize or `clear`, so
/// heavy delete/insert churn between growth events shows up here.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TableStats {
    pub capacity: usize,
    pub live: usize,
    pub occupied_slots: usize,
    pub tombstones: usize,
    pub log_len: usize,
    pub epoch: u64,
}

/// Outcome of placing one key.
enum Placed<V> {
    Fresh,
    Updated(V),
}

/// Slot index, entry log and counters. Split from `ProbeMap` so the public
/// methods can hold the operation guard while mutating the table.
#[derive(Debug)]
struct Table<K, V> {
    index: SlotIndex,
    log: EntryLog<K, V>,
    size: usize,
    epoch: u64,
}

impl<K, V> Table<K, V> {
    fn new(capacity: usize, epoch: u64) -> Self {
        Self {
            index: SlotIndex::new(capacity),
            log: EntryLog::with_capacity(capacity),
            size: 0,
            epoch,
        }
    }

    fn capacity(&self) -> usize {
        self.index.capacity()
    }

    fn lookup<Q>(&self, hash: u64, q: &Q) -> Result<Option<(usize, EntryKey)>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.index
            .find_live(hash, |entry| self.log.matches(entry, hash, q))
    }

    fn get<Q>(&self, hash: u64, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let (_, entry) = self.lookup(hash, q)?.ok_or(Error::KeyNotFound)?;
        self.log
            .live(entry)
            .map(|e| &e.value)
            .ok_or(Error::KeyNotFound)
    }

    fn get_mut<Q>(&mut self, hash: u64, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let (_, entry) = self.lookup(hash, q)?.ok_or(Error::KeyNotFound)?;
        self.log
            .live_mut(entry)
            .map(|e| &mut e.value)
            .ok_or(Error::KeyNotFound)
    }

    fn remove<Q>(&mut self, hash: u64, q: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let (slot, entry) = self.lookup(hash, q)?.ok_or(Error::KeyNotFound)?;
        if !self.log.mark_deleted(entry) {
            return Err(Error::KeyNotFound);
        }
        self.index.bury(slot);
        self.size -= 1;
        Ok(())
    }

    /// Writes one key without evaluating the growth trigger.
    fn place(&mut self, policy: InsertPolicy, hash: u64, key: K, value: V) -> Result<Placed<V>>
    where
        K: Eq,
    {
        let target = self
            .index
            .find_insert_slot(hash, policy, |entry| self.log.matches(entry, hash, &key))?;
        match target {
            InsertSlot::Update { entry, .. } => match self.log.set_value(entry, value) {
                Some(old) => Ok(Placed::Updated(old)),
                None => Err(Error::KeyNotFound),
            },
            InsertSlot::Vacant { slot, reuse } => {
                let entry = match reuse {
                    Some(tomb) => {
                        trace!(slot, "reusing tombstone");
                        self.log.replace(tomb, hash, key, value)
                    }
                    None => self.log.append(hash, key, value),
                };
                self.index.occupy(slot, entry);
                self.size += 1;
                Ok(Placed::Fresh)
            }
        }
    }

    fn needs_growth(&self) -> bool {
        self.size >= self.capacity() * 2 / 3
    }

    /// Rebuilds at twice the capacity from the live entries, in log order.
    /// Stored hashes are reused, so `K: Hash` is not called here.
    ///
    /// Every live record gets its new slot while the old log is still in
    /// place; only then does anything move. An error leaves the table as it
    /// was.
    fn grow(&mut self, policy: InsertPolicy) -> Result<()>
    where
        K: Eq,
    {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity * 2;
        let (_, tombstones) = self.index.census();
        let live = self.size;

        let mut index = SlotIndex::new(new_capacity);
        // Later duplicates (FirstDecisionSlot only) fold into the first entry
        // for their key.
        let mut folds = SecondaryMap::new();
        let log = &self.log;
        for (at, e) in log.iter().filter(|(_, e)| !e.deleted) {
            match index.find_insert_slot(e.hash, policy, |c| log.matches(c, e.hash, &e.key))? {
                InsertSlot::Update { entry, .. } => {
                    folds.insert(at, entry);
                }
                InsertSlot::Vacant { slot, .. } => index.occupy(slot, at),
            }
        }

        let old_log = core::mem::replace(&mut self.log, EntryLog::with_capacity(0));
        let (log, moved) = old_log.compact(new_capacity, &folds);
        index.rekey(&moved);
        self.index = index;
        self.log = log;
        self.size = moved.len();
        self.epoch += 1;

        debug!(
            old_capacity,
            new_capacity,
            live,
            tombstones,
            epoch = self.epoch,
            "grew probe table"
        );
        Ok(())
    }
}

/// Open-addressing hash map with perturbed probing, tombstone deletion and
/// an insertion-ordered entry log.
pub struct ProbeMap<K, V, S = DefaultHashBuilder> {
    hasher: S,
    config: MapConfig,
    table: Table<K, V>,
    guard: OpGuard,
}

impl<K, V> ProbeMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config_and_hasher(MapConfig::default(), DefaultHashBuilder::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        Self::with_config_and_hasher(config, DefaultHashBuilder::default())
    }
}

impl<K, V> Default for ProbeMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ProbeMap<K, V, S> {
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.table.size
    }

    pub fn is_empty(&self) -> bool {
        self.table.size == 0
    }

    /// Slot index length. Always a power of two, never below 8, never
    /// shrinks.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn insert_policy(&self) -> InsertPolicy {
        self.config.insert_policy()
    }

    pub fn stats(&self) -> TableStats {
        let (occupied_slots, tombstones) = self.table.index.census();
        TableStats {
            capacity: self.capacity(),
            live: self.table.size,
            occupied_slots,
            tombstones,
            log_len: self.table.log.len(),
            epoch: self.table.epoch,
        }
    }

    /// Drops every entry. Capacity is kept; outstanding handles go stale.
    pub fn clear(&mut self) {
        let _g = self.guard.enter();
        let next = Table::new(self.table.capacity(), self.table.epoch + 1);
        self.table = next;
    }

    /// Live entries in log order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.table.log.iter(), self.table.size)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let len = self.table.size;
        IterMut::new(self.table.log.iter_mut(), len)
    }

    /// Live keys in log order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Live values in log order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Live `(key, value)` pairs in log order; same as [`iter`](Self::iter).
    pub fn items(&self) -> Iter<'_, K, V> {
        self.iter()
    }

    fn resolve(&self, h: Handle) -> Option<(&K, &V)> {
        if h.epoch != self.table.epoch {
            return None;
        }
        self.table.log.live(h.entry).map(|e| (&e.key, &e.value))
    }

    fn resolve_mut(&mut self, h: Handle) -> Option<&mut V> {
        if h.epoch != self.table.epoch {
            return None;
        }
        self.table.log.live_mut(h.entry).map(|e| &mut e.value)
    }
}

impl<K, V, S> ProbeMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_and_hasher(MapConfig::default(), hasher)
    }

    pub fn with_config_and_hasher(config: MapConfig, hasher: S) -> Self {
        Self {
            hasher,
            table: Table::new(config.initial_capacity(), 0),
            config,
            guard: OpGuard::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Inserts or updates. Returns the previous value on update.
    ///
    /// A fresh insert that brings the load to 2/3 doubles the capacity,
    /// which invalidates every outstanding [`Handle`].
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>> {
        let _g = self.guard.enter();
        let hash = self.make_hash(&key);
        let policy = self.config.insert_policy();
        match self.table.place(policy, hash, key, value)? {
            Placed::Updated(old) => Ok(Some(old)),
            Placed::Fresh => {
                if self.table.needs_growth() {
                    self.table.grow(policy)?;
                }
                Ok(None)
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let hash = self.make_hash(key);
        self.table.get(hash, key)
    }

    /// `get`, falling back to `default` instead of failing.
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).unwrap_or(default)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let hash = self.make_hash(key);
        self.table.get_mut(hash, key)
    }

    /// Removes a live key, leaving a tombstone in its slot.
    pub fn delete<Q>(&mut self, key: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let hash = self.make_hash(key);
        self.table.remove(hash, key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).is_ok()
    }

    /// Handle to the live entry for `key`, if any.
    pub fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let hash = self.make_hash(key);
        match self.table.lookup(hash, key) {
            Ok(Some((_, entry))) => Some(Handle {
                epoch: self.table.epoch,
                entry,
            }),
            _ => None,
        }
    }

    /// `set` for every pair, stopping at the first failure.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.set(k, v)?;
        }
        Ok(())
    }
}

impl<K, V> ProbeMap<K, V>
where
    K: Eq + Hash,
{
    pub fn try_from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        map.try_extend(iter)?;
        Ok(map)
    }
}

impl<'a, K, V, S> IntoIterator for &'a ProbeMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ProbeMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ProbeMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// One `key - value` line per live entry, in log order.
impl<K: fmt::Display, V: fmt::Display, S> fmt::Display for ProbeMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self {
            writeln!(f, "{k} - {v}")?;
        }
        Ok(())
    }
}
