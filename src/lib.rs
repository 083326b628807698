//! probe-map: an open-addressing hash map with perturbed probing,
//! tombstone deletion and an insertion-ordered entry log.
//!
//! ```
//! use probe_map::{Error, ProbeMap};
//!
//! let mut m = ProbeMap::new();
//! m.set("apple".to_string(), 1).unwrap();
//! m.set("pear".to_string(), 2).unwrap();
//! assert_eq!(m.get("apple"), Ok(&1));
//!
//! m.delete("apple").unwrap();
//! assert_eq!(m.get("apple"), Err(Error::KeyNotFound));
//! assert_eq!(m.keys().collect::<Vec<_>>(), vec!["pear"]);
//! ```
//!
//! Internal Design:
//!
//! Summary
//! - Layers, leaves first:
//!   - `probe::ProbeSeq`: pure candidate stream from `(hash, capacity)`.
//!     `seed = perturb = hash`; each step yields
//!     `(5 * seed + 1 + perturb) mod capacity`, feeds it back as the seed
//!     and shifts `perturb` right by 5.
//!   - `slot_index::SlotIndex`: power-of-two array of
//!     `Empty | Tombstone(entry) | Occupied(entry)` and the two walks over
//!     the sequencer: `find_live` for lookup/delete and `find_insert_slot`
//!     for `set`.
//!   - `entry_log::EntryLog`: `SlotMap` of `(hash, key, value, deleted)`
//!     records. Slot order is insertion order; a new entry that lands on a
//!     tombstone takes over the tombstoned record's position.
//!   - `ProbeMap<K, V, S>`: public facade. Counts live entries, evaluates the
//!     growth trigger and runs the resizer.
//!
//! Growth
//! - After a fresh insert, if `len >= floor(capacity * 2 / 3)` the table is
//!   rebuilt at twice the capacity from the live entries in log order. The
//!   rebuild drops every tombstone and deleted record. Capacity never
//!   shrinks; deletes never compact.
//! - Tombstones accumulate between growth events. Heavy delete/insert churn
//!   on a table that never grows can fill most slots with them, which
//!   lengthens probes for misses. `ProbeMap::stats` reports the count.
//!
//! Insert policy
//! - `InsertPolicy::ScanForMatch` (default) probes past tombstones for an
//!   existing live entry before reusing the first tombstone seen, so each key
//!   has at most one live entry.
//! - `InsertPolicy::FirstDecisionSlot` stops at the first tombstone. A key
//!   whose live entry sits behind that tombstone gets a second entry; when
//!   the newer one is deleted, lookups fall through to the older value.
//!
//! Handles
//! - `Handle` pairs the map's resize epoch with the record's generational
//!   key. A handle resolves only while both match, so resizes, `clear` and
//!   tombstone reuse all leave stale handles dangling safely.
//!
//! Hashing
//! - Each record stores its `u64` hash. Resizes reuse it, so `K: Hash` only
//!   runs on the public entry points.
//! - The default hasher is hashbrown's `DefaultHashBuilder`. Hash values
//!   are not meant to match any other map or runtime.
//!
//! Errors
//! - `Error::KeyNotFound` for `get`/`get_mut`/`delete` on absent keys.
//! - `Error::ProbeExhausted` when `set` consumes the whole probe budget
//!   (`capacity + 13` candidates, enough to visit every slot) without a free
//!   slot or a match. It cannot happen below the load threshold. A lookup
//!   that exhausts the budget has seen every slot and reports
//!   `KeyNotFound`.
//!
//! Constraints
//! - Single-threaded. `ProbeMap` is `Send` but not `Sync`; wrap it in a lock
//!   to share it.
//! - Reentrancy from `K: Hash`/`K: Eq` into the same map panics in debug
//!   builds and is unchecked in release builds.

mod config;
mod entry_log;
mod error;
mod guard;
mod iter;
mod probe;
mod probe_map;
mod probe_map_proptest;
mod slot_index;

pub use config::{InsertPolicy, MapConfig, MIN_CAPACITY};
pub use error::{Error, Result};
pub use iter::{Iter, IterMut, Keys, Values};
pub use probe_map::{Handle, ProbeMap, TableStats};

// Benchmark hook: exposes the raw sequencer.
#[cfg(feature = "bench_internal")]
pub use probe::{ProbeSeq, PERTURB_ROUNDS, PERTURB_SHIFT};
