//! Stable binary merge of two adjacent runs, with galloping.
//!
//! The auxiliary buffer always holds the smaller of the two runs: if the
//! left run is no larger than the right, it is copied into the buffer and
//! merged forward (`merge_low`); otherwise the right run is copied into the
//! buffer and merged backward (`merge_high`). A panicking comparator can
//! leave the merge incomplete, but a drop guard in `gallop` flushes
//! whatever is still buffered back into the slice during unwinding, so the
//! caller always gets back some permutation of the original elements,
//! see [`crate`] crate docs.

mod gallop;

use std::mem::MaybeUninit;

/// An auxiliary buffer used by [`merge`], reused across merge calls to
/// avoid repeated allocation.
///
/// Modeled directly on the teacher's `BufGuard`: a buffer that owns
/// potentially-uninitialized storage for `T` and exposes it as a
/// `MaybeUninit` slice, so the merge can write into it without requiring
/// `T: Default` or similar.
pub(crate) trait BufGuard<T> {
    /// Create a buffer with room for at least `capacity` elements.
    fn with_capacity(capacity: usize) -> Self;
    /// Borrow the buffer's storage, uninitialized.
    fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>];
}

impl<T> BufGuard<T> for Vec<T> {
    fn with_capacity(capacity: usize) -> Self {
        Vec::with_capacity(capacity)
    }

    fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        self.spare_capacity_mut()
    }
}

/// Merge the two sorted adjacent runs `slice[..mid]` and `slice[mid..]` in
/// place, using `buf` as scratch space (must have capacity for at least
/// `min(mid, slice.len() - mid)` elements).
pub(crate) fn merge<T>(
    slice: &mut [T],
    mid: usize,
    lt: &mut impl FnMut(&T, &T) -> bool,
    gallop_threshold: usize,
    buf: &mut impl BufGuard<T>,
) {
    if slice.len() < 2 || mid == 0 || mid == slice.len() {
        return;
    }

    let left_len = mid;
    let right_len = slice.len() - mid;

    if left_len <= right_len {
        gallop::merge_low(slice, mid, lt, gallop_threshold, buf);
    } else {
        gallop::merge_high(slice, mid, lt, gallop_threshold, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DefaultPolicy, Policy};

    fn lt(a: &i32, b: &i32) -> bool {
        a < b
    }

    fn do_merge(slice: &mut [i32], mid: usize) {
        let mut buf: Vec<i32> = Vec::with_capacity(slice.len());
        let mut lt_fn = lt;
        merge(slice, mid, &mut lt_fn, DefaultPolicy::gallop_threshold(), &mut buf);
    }

    #[test]
    fn merges_empty_sides() {
        let mut slice: [i32; 0] = [];
        do_merge(&mut slice, 0);
    }

    #[test]
    fn merges_left_smaller() {
        let mut slice = [1, 5, 2, 3, 4, 6, 7, 8, 9];
        do_merge(&mut slice, 2);
        assert_eq!(slice, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn merges_right_smaller() {
        let mut slice = [2, 3, 4, 6, 7, 8, 9, 1, 5];
        do_merge(&mut slice, 7);
        assert_eq!(slice, [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn merge_is_stable() {
        let mut slice = [(1, 'a'), (2, 'b'), (1, 'c'), (1, 'd')];
        let mut lt_first = |a: &(i32, char), b: &(i32, char)| a.0 < b.0;
        let mut buf: Vec<(i32, char)> = Vec::with_capacity(4);
        merge(&mut slice, 2, &mut lt_first, 7, &mut buf);
        assert_eq!(slice, [(1, 'a'), (1, 'c'), (1, 'd'), (2, 'b')]);
    }

    #[test]
    fn merge_triggers_gallop_when_one_side_dominates() {
        // Left run is 100 small values, right run is a single large value:
        // the right side should win once, left should gallop the rest in.
        let mut left: Vec<i32> = (0..100).collect();
        left.push(1000);
        let mid = left.len() - 1;
        do_merge(&mut left, mid);
        assert!(left.is_sorted());
    }

    /// A panicking `lt` must still leave `slice` holding every original
    /// element exactly once (some permutation, not necessarily sorted).
    /// Exercised on both `merge_low` (left run smaller) and `merge_high`
    /// (right run smaller) by choosing `mid` on either side of the
    /// midpoint.
    fn assert_panic_leaves_a_permutation(mut slice: Vec<i32>, mid: usize) {
        let original = slice.clone();
        let mut buf: Vec<i32> = Vec::with_capacity(slice.len());
        let mut calls = 0u32;
        let mut lt_fn = |a: &i32, b: &i32| {
            calls += 1;
            if calls == 3 {
                panic!("injected comparator panic");
            }
            a < b
        };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            merge(&mut slice, mid, &mut lt_fn, 7, &mut buf);
        }));
        assert!(result.is_err(), "expected the injected panic to propagate");

        let mut got = slice;
        got.sort();
        let mut expected = original;
        expected.sort();
        assert_eq!(got, expected, "slice must still be a permutation after a panic");
    }

    #[test]
    fn merge_low_panic_leaves_a_permutation() {
        assert_panic_leaves_a_permutation(vec![1, 3, 5, 7, 2, 4, 6, 8, 9, 10], 4);
    }

    #[test]
    fn merge_high_panic_leaves_a_permutation() {
        assert_panic_leaves_a_permutation(vec![1, 3, 5, 7, 9, 10, 2, 4, 6, 8], 6);
    }

    /// Fuzzes panic safety across many random runs and split points, using
    /// a comparator that panics unpredictably rather than on a fixed call
    /// count.
    #[test]
    fn merge_survives_an_unpredictably_panicking_comparator() {
        use crate::test_support::{test_rng, MaybePanickingLt};
        use rand::Rng;

        let mut rng = test_rng();
        for trial in 0..200u64 {
            let left_len = rng.random_range(1..50);
            let right_len = rng.random_range(1..50);
            let mut left: Vec<i32> = (0..left_len).map(|_| rng.random_range(-50..50)).collect();
            let mut right: Vec<i32> = (0..right_len).map(|_| rng.random_range(-50..50)).collect();
            left.sort();
            right.sort();
            let mid = left.len();
            let mut slice = left.clone();
            slice.extend(right.clone());
            let original = slice.clone();

            let mut buf: Vec<i32> = Vec::with_capacity(slice.len());
            let mut base_lt = |a: &i32, b: &i32| a < b;
            let mut panicking = MaybePanickingLt::new(trial, 10, &mut base_lt);

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                merge(&mut slice, mid, &mut |a, b| panicking.call(a, b), 7, &mut buf);
            }));

            let mut got = slice;
            got.sort();
            let mut expected = original;
            expected.sort();
            assert_eq!(
                got, expected,
                "trial {trial} (panicked: {}): slice must remain a permutation",
                result.is_err()
            );
        }
    }
}
