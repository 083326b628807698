//! Slot index: the fixed-size probe array and the two walks over it.
//!
//! Lookup and delete use [`SlotIndex::find_live`], which skips tombstones and
//! mismatches until it reaches a live match or an empty slot. Insertion uses
//! [`SlotIndex::find_insert_slot`], whose stopping rule depends on the
//! [`InsertPolicy`]. Both drive the same [`ProbeSeq`]; the index never looks
//! at keys itself and asks the caller through a match predicate.

use crate::config::InsertPolicy;
use crate::entry_log::EntryKey;
use crate::error::{Error, Result};
use crate::probe::ProbeSeq;
use slotmap::SecondaryMap;
use tracing::warn;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Slot {
    Empty,
    /// Deleted entry; carries the record it used to point at.
    Tombstone(EntryKey),
    Occupied(EntryKey),
}

/// Where `set` should put a key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum InsertSlot {
    /// A live entry for the key sits at `slot`.
    Update { slot: usize, entry: EntryKey },
    /// No live entry reachable; write a new one at `slot`. `reuse` is the
    /// tombstoned record to take over, if the slot was a tombstone.
    Vacant { slot: usize, reuse: Option<EntryKey> },
}

#[derive(Debug)]
pub(crate) struct SlotIndex {
    slots: Box<[Slot]>,
}

impl SlotIndex {
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: vec![Slot::Empty; capacity].into_boxed_slice(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn exhausted(&self) -> Error {
        let capacity = self.capacity();
        warn!(capacity, "probe sequence exhausted");
        Error::ProbeExhausted { capacity }
    }

    /// Walks past tombstones and mismatches. `Ok(None)` means the key is
    /// absent: an empty slot ended the chain, or the full budget ran out,
    /// which visits every slot.
    pub(crate) fn find_live<F>(&self, hash: u64, mut is_match: F) -> Result<Option<(usize, EntryKey)>>
    where
        F: FnMut(EntryKey) -> bool,
    {
        for slot in ProbeSeq::new(hash, self.capacity()) {
            match self.slots[slot] {
                Slot::Empty => return Ok(None),
                Slot::Tombstone(_) => {}
                Slot::Occupied(entry) if is_match(entry) => return Ok(Some((slot, entry))),
                Slot::Occupied(_) => {}
            }
        }
        Ok(None)
    }

    pub(crate) fn find_insert_slot<F>(
        &self,
        hash: u64,
        policy: InsertPolicy,
        mut is_match: F,
    ) -> Result<InsertSlot>
    where
        F: FnMut(EntryKey) -> bool,
    {
        let mut first_tombstone = None;
        for slot in ProbeSeq::new(hash, self.capacity()) {
            match self.slots[slot] {
                Slot::Empty => {
                    return Ok(first_tombstone.unwrap_or(InsertSlot::Vacant { slot, reuse: None }));
                }
                Slot::Tombstone(tomb) => {
                    let vacant = InsertSlot::Vacant {
                        slot,
                        reuse: Some(tomb),
                    };
                    match policy {
                        InsertPolicy::FirstDecisionSlot => return Ok(vacant),
                        InsertPolicy::ScanForMatch => {
                            first_tombstone.get_or_insert(vacant);
                        }
                    }
                }
                Slot::Occupied(entry) if is_match(entry) => {
                    return Ok(InsertSlot::Update { slot, entry });
                }
                Slot::Occupied(_) => {}
            }
        }
        // A full walk with no match: any tombstone seen is still usable.
        first_tombstone.ok_or_else(|| self.exhausted())
    }

    pub(crate) fn occupy(&mut self, slot: usize, entry: EntryKey) {
        debug_assert!(!matches!(self.slots[slot], Slot::Occupied(_)));
        self.slots[slot] = Slot::Occupied(entry);
    }

    pub(crate) fn bury(&mut self, slot: usize) {
        if let Slot::Occupied(entry) = self.slots[slot] {
            self.slots[slot] = Slot::Tombstone(entry);
        }
    }

    /// Points every occupied slot whose record moved at its new key.
    pub(crate) fn rekey(&mut self, moved: &SecondaryMap<EntryKey, EntryKey>) {
        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(at) = slot {
                if let Some(&dst) = moved.get(*at) {
                    *at = dst;
                }
            }
        }
    }

    /// `(occupied, tombstones)` slot counts.
    pub(crate) fn census(&self) -> (usize, usize) {
        self.slots
            .iter()
            .fold((0, 0), |(occupied, tombs), slot| match slot {
                Slot::Empty => (occupied, tombs),
                Slot::Tombstone(_) => (occupied, tombs + 1),
                Slot::Occupied(_) => (occupied + 1, tombs),
            })
    }
}
