//! Probe sequencer: the deterministic candidate stream for a hash.
//!
//! Each step computes `candidate = (5 * seed + 1 + perturb) mod capacity`,
//! then feeds the candidate back in as the next seed and shifts `perturb`
//! right by [`PERTURB_SHIFT`]. All arithmetic wraps in `u64`; since the
//! capacity is a power of two this agrees with exact arithmetic modulo the
//! capacity.
//!
//! Budget: once the perturbation has drained to zero the recurrence is
//! `x -> 5x + 1 mod 2^k`, a full-period generator, so `capacity` further
//! steps touch every slot exactly once. The stream is therefore cut off after
//! `PERTURB_ROUNDS + capacity` candidates; a walk that ends without a decision
//! has seen the whole table.

/// Bits dropped from the perturbation per step.
pub const PERTURB_SHIFT: u32 = 5;

/// Steps needed for a 64-bit perturbation to reach zero.
pub const PERTURB_ROUNDS: usize = (u64::BITS as usize).div_ceil(PERTURB_SHIFT as usize);

/// Candidate slot stream for one hash at one capacity.
#[derive(Clone, Debug)]
pub struct ProbeSeq {
    seed: u64,
    perturb: u64,
    mask: u64,
    remaining: usize,
}

impl ProbeSeq {
    /// `capacity` must be a power of two.
    #[inline]
    pub fn new(hash: u64, capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            seed: hash,
            perturb: hash,
            mask: (capacity - 1) as u64,
            remaining: Self::budget(capacity),
        }
    }

    /// Number of candidates produced before the sequence is exhausted.
    #[inline]
    pub const fn budget(capacity: usize) -> usize {
        capacity.saturating_add(PERTURB_ROUNDS)
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let candidate = self
            .seed
            .wrapping_mul(5)
            .wrapping_add(1)
            .wrapping_add(self.perturb)
            & self.mask;
        self.seed = candidate;
        self.perturb >>= PERTURB_SHIFT;
        Some(candidate as usize)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ProbeSeq {}
