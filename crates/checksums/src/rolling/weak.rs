use super::{RabinKarp, Rollsum};

/// Which rolling checksum algorithm a signature uses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WeakKind {
    /// Fletcher-style rollsum, kept for older signature formats.
    Rollsum,
    /// Multiplicative RabinKarp hash, the default for new signatures.
    RabinKarp,
}

/// A rolling checksum of either kind.
///
/// The two variants present the same operations, so the delta scanner never
/// branches on the algorithm outside this type. Dispatch is a plain `match`
/// rather than a trait object to keep the inner rotate loop monomorphic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WeakSum {
    /// Rollsum state.
    Rollsum(Rollsum),
    /// RabinKarp state.
    RabinKarp(RabinKarp),
}

impl WeakSum {
    /// Creates an empty checksum of the given kind.
    #[must_use]
    pub const fn new(kind: WeakKind) -> Self {
        match kind {
            WeakKind::Rollsum => Self::Rollsum(Rollsum::new()),
            WeakKind::RabinKarp => Self::RabinKarp(RabinKarp::new()),
        }
    }

    /// Returns the algorithm of this checksum.
    #[must_use]
    pub const fn kind(&self) -> WeakKind {
        match self {
            Self::Rollsum(_) => WeakKind::Rollsum,
            Self::RabinKarp(_) => WeakKind::RabinKarp,
        }
    }

    /// Empties the window, keeping the algorithm.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind());
    }

    /// Returns the current window length in bytes.
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Rollsum(sum) => sum.count(),
            Self::RabinKarp(sum) => sum.count(),
        }
    }

    /// Folds `data` into the window.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Rollsum(sum) => sum.update(data),
            Self::RabinKarp(sum) => sum.update(data),
        }
    }

    /// Slides the window one byte forward without changing its length.
    #[inline]
    pub fn rotate(&mut self, outgoing: u8, incoming: u8) {
        match self {
            Self::Rollsum(sum) => sum.rotate(outgoing, incoming),
            Self::RabinKarp(sum) => sum.rotate(outgoing, incoming),
        }
    }

    /// Grows the window by one byte.
    #[inline]
    pub fn rollin(&mut self, incoming: u8) {
        match self {
            Self::Rollsum(sum) => sum.rollin(incoming),
            Self::RabinKarp(sum) => sum.rollin(incoming),
        }
    }

    /// Shrinks the window by one byte.
    #[inline]
    pub fn rollout(&mut self, outgoing: u8) {
        match self {
            Self::Rollsum(sum) => sum.rollout(outgoing),
            Self::RabinKarp(sum) => sum.rollout(outgoing),
        }
    }

    /// Returns the 32-bit value used for hash-table lookup.
    ///
    /// Rollsum digests are passed through [`mix32`] here; the raw digest has
    /// poor high-bit distribution and is only ever stored, never keyed on.
    #[must_use]
    #[inline]
    pub const fn digest(&self) -> u32 {
        match self {
            Self::Rollsum(sum) => mix32(sum.digest()),
            Self::RabinKarp(sum) => sum.digest(),
        }
    }
}

/// Computes the weak sum of `data` in its on-wire form.
///
/// Unlike [`WeakSum::digest`], no scrambling is applied: signature files
/// store raw rollsum digests for compatibility with older readers, and the
/// mix is re-applied when the sums are indexed.
#[must_use]
pub fn calc_weak_sum(kind: WeakKind, data: &[u8]) -> u32 {
    match kind {
        WeakKind::Rollsum => {
            let mut sum = Rollsum::new();
            sum.update(data);
            sum.digest()
        }
        WeakKind::RabinKarp => {
            let mut sum = RabinKarp::new();
            sum.update(data);
            sum.digest()
        }
    }
}

/// 32-bit avalanche mix (the murmur3 finalizer).
///
/// Repairs the poor distribution of rollsum digests before they are used as
/// hash-table keys.
#[must_use]
#[inline]
pub const fn mix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digest_mixes_rollsum_but_not_rabinkarp() {
        let data = b"mix check";

        let mut weak = WeakSum::new(WeakKind::Rollsum);
        weak.update(data);
        assert_eq!(weak.digest(), mix32(calc_weak_sum(WeakKind::Rollsum, data)));

        let mut weak = WeakSum::new(WeakKind::RabinKarp);
        weak.update(data);
        assert_eq!(weak.digest(), calc_weak_sum(WeakKind::RabinKarp, data));
    }

    #[test]
    fn reset_empties_the_window() {
        let mut weak = WeakSum::new(WeakKind::RabinKarp);
        weak.update(b"abc");
        weak.reset();
        assert_eq!(weak.count(), 0);
        assert_eq!(weak.kind(), WeakKind::RabinKarp);
    }

    proptest! {
        /// A digest after `rotate` equals a from-scratch digest of the
        /// shifted window, for both algorithms.
        #[test]
        fn rotate_equals_fresh_update(
            data in proptest::collection::vec(any::<u8>(), 2..200),
            window in 1usize..64,
        ) {
            let window = window.min(data.len() - 1);
            for kind in [WeakKind::Rollsum, WeakKind::RabinKarp] {
                let mut sum = WeakSum::new(kind);
                sum.update(&data[..window]);
                for i in 0..data.len() - window {
                    sum.rotate(data[i], data[i + window]);
                    let mut fresh = WeakSum::new(kind);
                    fresh.update(&data[i + 1..i + 1 + window]);
                    prop_assert_eq!(sum.digest(), fresh.digest());
                }
            }
        }

        /// Rolling bytes out of the front of the window matches a fresh
        /// digest of the remaining suffix.
        #[test]
        fn rollout_equals_fresh_update(data in proptest::collection::vec(any::<u8>(), 1..128)) {
            for kind in [WeakKind::Rollsum, WeakKind::RabinKarp] {
                let mut sum = WeakSum::new(kind);
                sum.update(&data);
                for i in 0..data.len() {
                    sum.rollout(data[i]);
                    let mut fresh = WeakSum::new(kind);
                    fresh.update(&data[i + 1..]);
                    prop_assert_eq!(sum.digest(), fresh.digest());
                }
                prop_assert_eq!(sum.count(), 0);
            }
        }
    }
}
