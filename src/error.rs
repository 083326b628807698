//! Error type shared by every fallible `ProbeMap` operation.

use thiserror::Error;

/// Failures surfaced by [`ProbeMap`](crate::ProbeMap).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `get`, `get_mut` or `delete` was called with a key that is not live.
    #[error("key not found")]
    KeyNotFound,
    /// `set` walked the whole table without finding a free slot or a match.
    /// Lookups never report it. Not expected under the 2/3 load policy.
    #[error("probe sequence exhausted at capacity {capacity}")]
    ProbeExhausted { capacity: usize },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
