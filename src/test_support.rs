//! Shared test-only helpers: a seeded RNG, a stability-checking element
//! wrapper, and a comparator that panics on a schedule. Used by the
//! `#[cfg(test)]` modules throughout this crate.

use rand::{Rng as _, SeedableRng as _};

/// The seed shared by every test that needs determinism.
pub(crate) const TEST_SEED: u64 = 0xa8bf17eb656f828d;

/// The rng type used by tests.
pub(crate) type Rng = rand::rngs::SmallRng;

/// Build the shared test rng.
pub(crate) fn test_rng() -> Rng {
    Rng::seed_from_u64(TEST_SEED)
}

/// Wraps an element with its original position, so a sort result can be
/// checked for stability as well as order: compares only on the wrapped
/// value, but [`IndexedOrdered::is_stable_sorted`] additionally requires
/// equal-valued elements to keep their original relative order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedOrdered<T>(pub usize, pub T);

impl<T> IndexedOrdered<T> {
    pub fn map_iter(iter: impl Iterator<Item = T>) -> impl Iterator<Item = Self> {
        iter.enumerate().map(|(index, element)| Self(index, element))
    }
}

/// A strict-weak-order `lt` over `IndexedOrdered<T>` that compares only the
/// wrapped value, ignoring the index, for feeding to [`crate::sort_by`].
pub(crate) fn lt_by_value<T: PartialOrd>(a: &IndexedOrdered<T>, b: &IndexedOrdered<T>) -> bool {
    a.1 < b.1
}

impl<T: PartialOrd> IndexedOrdered<T> {
    /// `slice` is sorted by value, and equal-valued runs keep increasing
    /// original index.
    pub fn is_stable_sorted(slice: &[Self]) -> bool {
        slice.windows(2).all(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            if prev.1 < cur.1 {
                true
            } else if cur.1 < prev.1 {
                false
            } else {
                prev.0 < cur.0
            }
        })
    }
}

/// A comparator wrapper that panics with probability `1 / likelihood` each
/// time it's consulted, for exercising the unwind path of a merge.
pub(crate) struct MaybePanickingLt<'a, T> {
    rng: Rng,
    likelihood: usize,
    inner: &'a mut dyn FnMut(&T, &T) -> bool,
}

impl<'a, T> MaybePanickingLt<'a, T> {
    pub fn new(seed: u64, likelihood: usize, inner: &'a mut dyn FnMut(&T, &T) -> bool) -> Self {
        Self {
            rng: Rng::seed_from_u64(seed),
            likelihood,
            inner,
        }
    }

    pub fn call(&mut self, a: &T, b: &T) -> bool {
        if self.rng.random_range(0..self.likelihood) == 0 {
            panic!("MaybePanickingLt panicked during comparison");
        }
        (self.inner)(a, b)
    }
}
