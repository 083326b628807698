//! Construction-time knobs for `ProbeMap`.

/// Smallest slot-index length a map is ever built with.
pub const MIN_CAPACITY: usize = 8;

/// How `set` chooses the slot for a key that may already be present.
///
/// The two policies differ only after deletions: with no tombstones on a
/// key's probe path both pick the same slot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum InsertPolicy {
    /// Remember the first tombstone but keep probing until an empty slot or
    /// a live match. A match is updated in place; otherwise the remembered
    /// tombstone (or the empty slot) receives the new entry. A key never has
    /// more than one live entry.
    #[default]
    ScanForMatch,
    /// Stop at the first empty, tombstone, or matching slot.
    ///
    /// A tombstone in front of a live entry for the same key makes `set`
    /// create a second entry for it. The newer entry shadows the older one
    /// until it is deleted, after which lookups fall through to the stale
    /// value. Kept for compatibility with tables built that way; the next
    /// resize folds the duplicates back into one entry.
    FirstDecisionSlot,
}

/// Initial geometry and insert behavior.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MapConfig {
    initial_capacity: usize,
    insert_policy: InsertPolicy,
}

impl MapConfig {
    pub const fn new() -> Self {
        Self {
            initial_capacity: MIN_CAPACITY,
            insert_policy: InsertPolicy::ScanForMatch,
        }
    }

    /// Rounded up to a power of two, never below [`MIN_CAPACITY`].
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity.max(MIN_CAPACITY).next_power_of_two();
        self
    }

    pub fn with_insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.insert_policy = policy;
        self
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    pub fn insert_policy(&self) -> InsertPolicy {
        self.insert_policy
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}
