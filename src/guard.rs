//! Debug-only guard against re-entering a map mid-probe.
//!
//! `Hash` and `Eq` are user code and run while the slot index is being
//! walked. A call back into the same map from there would observe a table
//! between steps, so debug builds panic on it. Release builds keep no state.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Per-map busy flag. Public entry points hold `self.guard.enter()` while
/// they probe.
#[derive(Debug)]
pub(crate) struct OpGuard {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Keeps the owning map !Sync in release builds too.
    _not_sync: PhantomData<core::cell::Cell<()>>,
}

impl OpGuard {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _not_sync: PhantomData,
        }
    }

    /// Marks the map busy until the returned token drops.
    #[inline]
    pub(crate) fn enter(&self) -> Busy<'_> {
        #[cfg(debug_assertions)]
        {
            let was_busy = self.busy.replace(true);
            assert!(!was_busy, "re-entrant call into ProbeMap during a probe");
            Busy { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            Busy { _owner: PhantomData }
        }
    }
}

pub(crate) struct Busy<'a> {
    #[cfg(debug_assertions)]
    owner: &'a OpGuard,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a OpGuard>,
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}
