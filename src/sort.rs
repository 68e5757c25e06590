//! The driver: detect runs, push them onto the stack, consolidate after
//! each push, then drain the stack top-to-bottom.
//!
//! Two of the three error classes the algorithm's policy-dispatch and
//! range handling could otherwise raise don't exist here: `&mut [T]` is
//! always a valid range (no "invalid range" case to check), and
//! [`MergeAction`](crate::policy::MergeAction) is an exhaustive enum (no
//! "invalid policy action" case a `match` could miss). Only a failing
//! comparator remains as a possible failure mode, and it is handled by
//! unwinding, see [`crate::merge`].

use crate::detect::detect_run;
use crate::merge::BufGuard;
use crate::policy::{DefaultPolicy, MergeAction, Policy};
use crate::stack::{Run, RunStack};

/// Sort `slice` in place, using `T`'s natural order and the default merge
/// policy.
pub fn sort<T: Ord>(slice: &mut [T]) {
    sort_by(slice, |a, b| a < b);
}

/// Sort `slice` in place with a custom strict-weak-order comparator and the
/// default merge policy.
pub fn sort_by<T>(slice: &mut [T], mut lt: impl FnMut(&T, &T) -> bool) {
    sort_by_policy::<T, DefaultPolicy>(slice, &mut lt);
}

/// Sort `slice` in place with a custom comparator and an explicit
/// [`Policy`].
///
/// `P` is a type parameter, not a value, see [`Policy`]'s docs for why.
pub fn sort_by_policy<T, P: Policy>(slice: &mut [T], lt: &mut impl FnMut(&T, &T) -> bool) {
    let n = slice.len();
    if n < 2 {
        return;
    }

    let min_run = P::min_run(n);
    let gallop_threshold = P::gallop_threshold();
    // The smaller side of any merge never exceeds `ceil(n / 2)`, so one
    // buffer sized to that bound covers every merge in the sort.
    let mut buf: Vec<T> = Vec::with_capacity(n.div_ceil(2));
    let mut stack = RunStack::new();

    let mut cursor = 0;
    while cursor < n {
        let len = detect_run(&mut slice[cursor..], lt, min_run);
        stack.push(Run { start: cursor, len });
        cursor += len;
        consolidate::<T, P>(&mut stack, slice, lt, gallop_threshold, &mut buf);
    }

    drain(&mut stack, slice, lt, gallop_threshold, &mut buf);
}

/// Merge adjacent runs on the stack until the policy reports the
/// three-run invariant holds (or fewer than two runs remain).
fn consolidate<T, P: Policy>(
    stack: &mut RunStack,
    slice: &mut [T],
    lt: &mut impl FnMut(&T, &T) -> bool,
    gallop_threshold: usize,
    buf: &mut impl BufGuard<T>,
) {
    while stack.len() >= 2 {
        let x = stack
            .peek_len_from_top(0)
            .expect("loop guard ensures at least two runs");
        let y = stack
            .peek_len_from_top(1)
            .expect("loop guard ensures at least two runs");
        let z = stack.peek_len_from_top(2);

        match P::merge_action(x, y, z) {
            MergeAction::MergeYX => stack.merge_top_two(slice, lt, gallop_threshold, buf),
            MergeAction::MergeZY => {
                stack.merge_second_and_third(slice, lt, gallop_threshold, buf)
            }
            MergeAction::MergeNothing => break,
        }
    }
}

/// Merge whatever runs remain, top-down, until one run covers the whole
/// sequence.
fn drain<T>(
    stack: &mut RunStack,
    slice: &mut [T],
    lt: &mut impl FnMut(&T, &T) -> bool,
    gallop_threshold: usize,
    buf: &mut impl BufGuard<T>,
) {
    while stack.len() > 1 {
        stack.merge_top_two(slice, lt, gallop_threshold, buf);
    }
}
