//! `merge_low` and `merge_high`: the two directions of the adaptive binary
//! merge. `merge_low` copies the left (smaller-or-equal) run into the
//! auxiliary buffer and writes the result forward into `slice`;
//! `merge_high` copies the right (smaller) run into the buffer and writes
//! the result backward. Both gallop once one side wins `gallop_threshold`
//! comparisons in a row.
//!
//! Once the initial copy into the buffer is done, the loop below writes
//! directly into `slice` as it goes, not into a second scratch area, so
//! that the buffer never holds more than the smaller run. That means a
//! `lt` that panics partway through leaves some of the buffer's contents
//! not yet copied back into `slice`; [`FlushOnDrop`] is the guard that
//! makes sure they still land in the right place of `slice` during
//! unwinding, so `slice` is always left holding some permutation of its
//! original elements, merge outcome notwithstanding.

use super::BufGuard;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Smallest index `i` such that `!lt(sorted[i], needle)`, the first
/// element not less than `needle`.
fn lower_bound<T>(sorted: &[T], lt: &mut impl FnMut(&T, &T) -> bool, needle: &T) -> usize {
    let mut low = 0;
    let mut high = sorted.len();
    while low < high {
        let mid = low + (high - low) / 2;
        if lt(&sorted[mid], needle) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low
}

/// Smallest index `i` such that `lt(needle, sorted[i])`, the first
/// element strictly greater than `needle`.
fn upper_bound<T>(sorted: &[T], lt: &mut impl FnMut(&T, &T) -> bool, needle: &T) -> usize {
    let mut low = 0;
    let mut high = sorted.len();
    while low < high {
        let mid = low + (high - low) / 2;
        if lt(needle, &sorted[mid]) {
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    low
}

/// On drop, copies whatever is still sitting in the buffer back into
/// `slice` at `dst`. Advance `buf_ptr`/`remaining`/`dst` together as
/// elements are flushed normally during the merge; whatever is left when
/// this drops (be it the ordinary post-loop flush or an unwind out of a
/// panicking `lt`) gets copied in one shot.
struct FlushOnDrop<T> {
    buf_ptr: *const T,
    dst: *mut T,
    remaining: usize,
}

impl<T> Drop for FlushOnDrop<T> {
    fn drop(&mut self) {
        // SAFETY: the caller of `FlushOnDrop::new` guarantees `buf_ptr` has
        // `remaining` initialized elements available and `dst` has room for
        // `remaining` more; both are kept in sync on every advance.
        unsafe {
            std::ptr::copy_nonoverlapping(self.buf_ptr, self.dst, self.remaining);
        }
    }
}

impl<T> FlushOnDrop<T> {
    fn advance(&mut self, count: usize) {
        // SAFETY: staying within the bounds established at construction.
        unsafe {
            self.buf_ptr = self.buf_ptr.add(count);
            self.dst = self.dst.add(count);
        }
        self.remaining -= count;
    }
}

/// Merge `slice[..mid]` (the smaller-or-equal run) with `slice[mid..]`,
/// copying the left run into `buf` and writing the merged output forward
/// into `slice`.
pub(super) fn merge_low<T>(
    slice: &mut [T],
    mid: usize,
    lt: &mut impl FnMut(&T, &T) -> bool,
    gallop_threshold: usize,
    buf: &mut impl BufGuard<T>,
) {
    let total = slice.len();
    let buffer = buf.as_uninit_slice_mut();
    assert!(
        buffer.len() >= mid,
        "auxiliary buffer too small for the left run"
    );

    // SAFETY: `slice[..mid]` is live data; `buffer` has room for `mid`
    // elements. This leaves `slice` untouched (a read, not a write).
    unsafe {
        std::ptr::copy_nonoverlapping(slice.as_ptr(), buffer.as_mut_ptr() as *mut T, mid);
    }

    // Tracks the still-buffered left elements and where they'd land in
    // `slice` if flushed right now; see `FlushOnDrop`.
    let mut guard = FlushOnDrop {
        buf_ptr: buffer.as_ptr() as *const T,
        dst: slice.as_mut_ptr(),
        remaining: mid,
    };

    // Invariant for the remainder of this function: `b_idx - out_idx ==
    // guard.remaining` always. Every element written from the left buffer
    // advances `out_idx` alone and shrinks `guard.remaining` (via
    // `guard.advance`); every element written from the right run advances
    // both `out_idx` and `b_idx` together (gap unchanged). The gap starts
    // at `mid` and cannot go negative, so `out_idx < b_idx` holds strictly
    // whenever the left run still has elements left (`guard.remaining >
    // 0`), which is exactly the loop condition.
    let mut b_idx = mid; // cursor into `slice`, the right run
    let mut out_idx = 0; // next write position in `slice`

    let mut streak_len = 0usize;
    let mut streak_side = None;

    while guard.remaining > 0 && b_idx < total {
        // SAFETY: `guard.buf_ptr` has `guard.remaining > 0` initialized
        // elements starting here.
        let a_head: &T = unsafe { &*guard.buf_ptr };
        let b_head = &slice[b_idx];

        let right_wins = lt(b_head, a_head);
        let winner = if right_wins { Side::Right } else { Side::Left };

        if streak_side != Some(winner) {
            streak_len = 0;
        }
        streak_len += 1;
        streak_side = Some(winner);

        if streak_len < gallop_threshold {
            if right_wins {
                // SAFETY: `out_idx < b_idx` (see invariant above), so this
                // is a copy between non-overlapping positions in `slice`.
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        slice.as_ptr().add(b_idx),
                        slice.as_mut_ptr().add(out_idx),
                        1,
                    );
                }
                b_idx += 1;
                // SAFETY: staying within `slice`'s bounds.
                guard.dst = unsafe { guard.dst.add(1) };
            } else {
                // SAFETY: `guard.dst` points at `slice[out_idx]`, which the
                // invariant guarantees has not yet been written this call.
                unsafe {
                    std::ptr::copy_nonoverlapping(guard.buf_ptr, guard.dst, 1);
                }
                guard.advance(1);
            }
            out_idx += 1;
        } else {
            if right_wins {
                // Pivot is the losing (left) side's current head. Lower-bound
                // search in the winning (right) side so equal elements on
                // the right are *not* swept in, they must still lose to an
                // equal element already on the left, per stability.
                let pivot = a_head;
                let pos = b_idx + lower_bound(&slice[b_idx..total], lt, pivot);
                let count = pos - b_idx;

                // SAFETY: source and destination may overlap once `count`
                // exceeds the current gap, so this uses `copy` (memmove
                // semantics) rather than `copy_nonoverlapping`.
                unsafe {
                    std::ptr::copy(
                        slice.as_ptr().add(b_idx),
                        slice.as_mut_ptr().add(out_idx),
                        count,
                    );
                }
                out_idx += count;
                b_idx = pos;
                // SAFETY: staying within `slice`'s bounds.
                guard.dst = unsafe { guard.dst.add(count) };
            } else {
                // Pivot is the losing (right) side's current head.
                // Upper-bound search in the winning (left) side so equal
                // elements on the left *are* swept in ahead of the equal
                // right element, per stability.
                let pivot = b_head;
                // SAFETY: `guard.remaining` elements are initialized
                // starting at `guard.buf_ptr`.
                let a_live =
                    unsafe { std::slice::from_raw_parts(guard.buf_ptr, guard.remaining) };
                let count = upper_bound(a_live, lt, pivot);

                unsafe {
                    std::ptr::copy_nonoverlapping(guard.buf_ptr, guard.dst, count);
                }
                out_idx += count;
                guard.advance(count);
            }
            streak_len = 0;
            streak_side = None;
        }
    }

    // `guard`'s drop here performs the flush: if the left run still has
    // elements (the common case, since the right run's remainder is
    // already sitting in place), they get copied into `slice[out_idx..]`
    // now. If it's empty, the drop is a no-op.
}

/// Merge `slice[..mid]` with `slice[mid..]` (the smaller-or-equal run),
/// copying the right run into `buf` and writing the merged output backward
/// into `slice`.
pub(super) fn merge_high<T>(
    slice: &mut [T],
    mid: usize,
    lt: &mut impl FnMut(&T, &T) -> bool,
    gallop_threshold: usize,
    buf: &mut impl BufGuard<T>,
) {
    let total = slice.len();
    let right_len = total - mid;
    let buffer = buf.as_uninit_slice_mut();
    assert!(
        buffer.len() >= right_len,
        "auxiliary buffer too small for the right run"
    );

    // SAFETY: `slice[mid..]` is live data; `buffer` has room for
    // `right_len` elements. `slice` is left untouched here.
    unsafe {
        std::ptr::copy_nonoverlapping(
            slice.as_ptr().add(mid),
            buffer.as_mut_ptr() as *mut T,
            right_len,
        );
    }

    // Symmetric to `merge_low`'s guard, but flushes toward the front: the
    // buffer holds the right run, and its remainder (if any) belongs at
    // `slice[left_remaining..]` once the left run runs out. `dst` is kept
    // pointing at `slice[left_remaining]` throughout, see the updates
    // below every time `left_remaining` changes.
    let mut guard = FlushOnDrop {
        buf_ptr: buffer.as_ptr() as *const T,
        dst: unsafe { slice.as_mut_ptr().add(mid) },
        remaining: right_len,
    };

    // Invariant: `out_remaining == left_remaining + guard.remaining`
    // always (symmetric to the forward-gap invariant in `merge_low`), so
    // `out_remaining > left_remaining` strictly whenever `guard.remaining >
    // 0`, which is exactly the loop condition. `guard.dst` always points at
    // `slice[left_remaining]`, i.e. where the buffer's current remainder
    // would need to land if flushed right now.
    let mut left_remaining = mid;
    let mut out_remaining = total;

    let mut streak_len = 0usize;
    let mut streak_side = None;

    while left_remaining > 0 && guard.remaining > 0 {
        let left_tail = &slice[left_remaining - 1];
        // SAFETY: `guard.buf_ptr` has `guard.remaining > 0` initialized
        // elements, and the tail one is at offset `remaining - 1`.
        let buf_tail: &T = unsafe { &*guard.buf_ptr.add(guard.remaining - 1) };

        let left_wins = lt(buf_tail, left_tail);
        let winner = if left_wins { Side::Left } else { Side::Right };

        if streak_side != Some(winner) {
            streak_len = 0;
        }
        streak_len += 1;
        streak_side = Some(winner);

        if streak_len < gallop_threshold {
            if left_wins {
                // SAFETY: `out_remaining - 1 > left_remaining - 1` (see
                // invariant above), so source and destination do not
                // overlap.
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        slice.as_ptr().add(left_remaining - 1),
                        slice.as_mut_ptr().add(out_remaining - 1),
                        1,
                    );
                }
                left_remaining -= 1;
                out_remaining -= 1;
                guard.dst = unsafe { slice.as_mut_ptr().add(left_remaining) };
            } else {
                // SAFETY: the element at offset `remaining - 1` is the one
                // about to be flushed; write it directly to its final spot
                // and shrink the guard's tracked remainder by one from the
                // back. `advance` (which shifts from the front) doesn't fit
                // here, so this updates the fields directly.
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        guard.buf_ptr.add(guard.remaining - 1),
                        slice.as_mut_ptr().add(out_remaining - 1),
                        1,
                    );
                }
                guard.remaining -= 1;
                out_remaining -= 1;
            }
        } else {
            if left_wins {
                // Pivot is the losing (right/buffer) side's current tail.
                // Upper-bound search (strict) over the winning (left) side
                // so an equal left element is *not* swept in here, it must
                // still be placed after (i.e. at a smaller index than) the
                // pivot, per stability. The qualifying elements are the
                // suffix of the live left range strictly greater than
                // pivot.
                let pivot = buf_tail;
                let pos = upper_bound(&slice[..left_remaining], lt, pivot);
                let count = left_remaining - pos;

                // SAFETY: source and destination may overlap once `count`
                // exceeds the current gap, so this uses `copy` (memmove
                // semantics).
                unsafe {
                    std::ptr::copy(
                        slice.as_ptr().add(pos),
                        slice.as_mut_ptr().add(out_remaining - count),
                        count,
                    );
                }
                out_remaining -= count;
                left_remaining = pos;
                guard.dst = unsafe { slice.as_mut_ptr().add(left_remaining) };
            } else {
                // Pivot is the losing (left) side's current tail.
                // Lower-bound search (non-strict) over the winning
                // (right/buffer) side, so an equal buffered element *is*
                // swept in here, it is free to be placed after the pivot.
                let pivot = left_tail;
                // SAFETY: `guard.remaining` elements are initialized
                // starting at `guard.buf_ptr`.
                let buf_live =
                    unsafe { std::slice::from_raw_parts(guard.buf_ptr, guard.remaining) };
                let pos = lower_bound(buf_live, lt, pivot);
                let count = guard.remaining - pos;

                // SAFETY: `buffer` and `slice` never alias.
                unsafe {
                    std::ptr::copy_nonoverlapping(
                        guard.buf_ptr.add(pos),
                        slice.as_mut_ptr().add(out_remaining - count),
                        count,
                    );
                }
                out_remaining -= count;
                guard.remaining = pos;
            }
            streak_len = 0;
            streak_side = None;
        }
    }

    // `guard`'s drop here performs the flush: if the buffered right run
    // still has elements (the common case, since the left run's remainder
    // is already sitting in place), they get copied into
    // `slice[left_remaining..]` now. If it's empty, the drop is a no-op.
}
