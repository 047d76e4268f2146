// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Incremental range tagging.
//!
//! A `RangeTracker` maintains a set of disjoint "checked" ranges over one
//! buffer, stored as a dedicated view of strictly alternating start/end
//! marks. Because the view is offset-sorted and alternation is strict, a
//! mark's role is its index parity and every operation reduces to binary
//! search plus a bounded splice: O(log n + k) where k is the number of
//! boundary marks touched.
//!
//! Adjacent or overlapping ranges always merge, so `add` is idempotent and
//! coverage has one canonical representation. Edits move the boundary marks
//! through the ordinary mark adjustment; a lazy normalize pass (keyed off
//! the buffer's edit counter) then drops ranges an edit collapsed to zero
//! width and re-merges ranges an edit pushed into contact. A checked range
//! wholly inside a replaced span therefore vanishes, leaving the
//! replacement text uncovered.
//!
//! `add` and `clear` are total over well-formed input: empty or inverted
//! ranges are no-ops (logged as caller bugs), never errors.

use crate::buffer::TextBuffer;
use crate::marks::Gravity;
use crate::{MarkId, ViewId};

/// Tracks which sub-ranges of a buffer have been checked, incrementally.
#[derive(Debug)]
pub struct RangeTracker {
    view: ViewId,
    tag: String,
    /// Buffer edit counter at last normalize; stale means an edit may have
    /// collapsed or joined ranges.
    synced_at: u64,
}

fn off(buf: &TextBuffer, id: MarkId) -> usize {
    buf.mark_offset(id).expect("tracker boundary mark is live")
}

impl RangeTracker {
    /// Create a tracker with its own mark view on `buf`, named after `tag`.
    pub fn new(buf: &mut TextBuffer, tag: &str) -> Self {
        let view = buf.add_view(&format!("range:{tag}"));
        Self {
            view,
            tag: tag.to_string(),
            synced_at: buf.edit_seq(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Release the tracker's view and every boundary mark in it.
    pub fn close(self, buf: &mut TextBuffer) {
        buf.remove_view(self.view);
    }

    /// Mark `[lo, hi)` as checked, merging with any range it overlaps or
    /// touches. Clamped to the buffer; `lo >= hi` is a no-op.
    pub fn add(&mut self, buf: &mut TextBuffer, lo: usize, hi: usize) {
        self.sync(buf);
        let len = buf.len_chars();
        let (lo, hi) = (lo.min(len), hi.min(len));
        if lo >= hi {
            if lo > hi {
                tracing::debug!(tag = %self.tag, lo, hi, "inverted add ignored");
            }
            return;
        }
        // Boundary marks with offsets in [lo, hi] belong to ranges the new
        // range swallows or touches; they all go. The window's index parity
        // says whether an existing range already runs through lo (resp. hi),
        // in which case its outer mark is reused instead of inserting one.
        let (i, j, doomed) = {
            let ids = buf.view_marks(self.view);
            let i = ids.partition_point(|&m| off(buf, m) < lo);
            let j = ids.partition_point(|&m| off(buf, m) <= hi);
            (i, j, ids[i..j].to_vec())
        };
        for id in doomed {
            buf.release_mark(id);
        }
        let store = buf.store_mut();
        if i % 2 == 0 {
            store.create(self.view, lo, Gravity::Left);
        }
        if j % 2 == 0 {
            store.create(self.view, hi, Gravity::Left);
        }
    }

    /// Remove checked status from `[lo, hi)`, splitting ranges that straddle
    /// a boundary. Clamped to the buffer; `lo >= hi` is a no-op.
    pub fn clear(&mut self, buf: &mut TextBuffer, lo: usize, hi: usize) {
        self.sync(buf);
        let len = buf.len_chars();
        let (lo, hi) = (lo.min(len), hi.min(len));
        if lo >= hi {
            if lo > hi {
                tracing::debug!(tag = %self.tag, lo, hi, "inverted clear ignored");
            }
            return;
        }
        let (split_left, split_right, doomed) = {
            let ids = buf.view_marks(self.view);
            let n = ids.len();
            let i = ids.partition_point(|&m| off(buf, m) < lo);
            let j = ids.partition_point(|&m| off(buf, m) <= hi);
            // A range running through lo keeps its start and gets a new end
            // at lo; symmetrically for hi.
            let split_left = i % 2 == 1 && off(buf, ids[i]) > lo;
            let split_right = j % 2 == 1 && off(buf, ids[j - 1]) < hi;
            // Starts in [lo, hi) and ends in (lo, hi] are deleted; an end
            // sitting exactly at lo (range ends there) and a start exactly
            // at hi (range begins there) belong to untouched ranges.
            let mut a = i;
            if a < n && a % 2 == 1 && off(buf, ids[a]) == lo {
                a += 1;
            }
            let mut b = j;
            if b > 0 && (b - 1) % 2 == 0 && off(buf, ids[b - 1]) == hi {
                b -= 1;
            }
            let b = b.max(a);
            (split_left, split_right, ids[a..b].to_vec())
        };
        for id in doomed {
            buf.release_mark(id);
        }
        let store = buf.store_mut();
        if split_left {
            store.create(self.view, lo, Gravity::Left);
        }
        if split_right {
            store.create(self.view, hi, Gravity::Left);
        }
    }

    /// Remove checked status from `lo` to the end of the buffer. The
    /// fallback consumers use when no precise dirty range is known.
    pub fn clear_from(&mut self, buf: &mut TextBuffer, lo: usize) {
        let len = buf.len_chars();
        self.clear(buf, lo, len);
    }

    /// First maximal unchecked sub-range of `[lo, hi)`, or `None` when the
    /// whole window is covered. Drives incremental background work.
    pub fn choose_uncovered(
        &mut self,
        buf: &mut TextBuffer,
        lo: usize,
        hi: usize,
    ) -> Option<(usize, usize)> {
        self.sync(buf);
        let len = buf.len_chars();
        let (lo, hi) = (lo.min(len), hi.min(len));
        if lo >= hi {
            return None;
        }
        let ids = buf.view_marks(self.view);
        let i = ids.partition_point(|&m| off(buf, m) <= lo);
        // Odd parity: lo sits inside a range; the gap begins at its end.
        let start = if i % 2 == 1 { off(buf, ids[i]) } else { lo };
        if start >= hi {
            return None;
        }
        let next_start = if i % 2 == 1 { i + 1 } else { i };
        let end = ids.get(next_start).map_or(hi, |&m| off(buf, m).min(hi));
        Some((start, end))
    }

    /// True when every char of `[lo, hi)` is checked.
    pub fn is_covered(&mut self, buf: &mut TextBuffer, lo: usize, hi: usize) -> bool {
        self.choose_uncovered(buf, lo, hi).is_none()
    }

    /// All checked ranges in buffer order.
    pub fn ranges(&mut self, buf: &mut TextBuffer) -> Vec<(usize, usize)> {
        self.sync(buf);
        let ids = buf.view_marks(self.view);
        ids.chunks_exact(2)
            .map(|pair| (off(buf, pair[0]), off(buf, pair[1])))
            .collect()
    }

    fn sync(&mut self, buf: &mut TextBuffer) {
        if buf.edit_seq() != self.synced_at {
            self.normalize(buf);
            self.synced_at = buf.edit_seq();
        }
    }

    /// Repair the alternation invariant after edits moved boundary marks:
    /// drop ranges collapsed to zero width, merge ranges pushed into
    /// contact. Offsets are strictly increasing again afterwards.
    fn normalize(&mut self, buf: &mut TextBuffer) {
        let ids: Vec<MarkId> = buf.view_marks(self.view).to_vec();
        debug_assert!(ids.len() % 2 == 0, "boundary marks must come in pairs");
        let mut doomed = Vec::new();
        let mut prev_end: Option<(MarkId, usize)> = None;
        for pair in ids.chunks_exact(2) {
            let (start, end) = (pair[0], pair[1]);
            let (start_off, end_off) = (off(buf, start), off(buf, end));
            if start_off >= end_off {
                doomed.push(start);
                doomed.push(end);
                continue;
            }
            if let Some((prev_id, prev_off)) = prev_end {
                if prev_off == start_off {
                    doomed.push(prev_id);
                    doomed.push(start);
                }
            }
            prev_end = Some((end, end_off));
        }
        if !doomed.is_empty() {
            tracing::debug!(tag = %self.tag, marks = doomed.len(), "normalizing after edit");
        }
        for id in doomed {
            buf.release_mark(id);
        }
    }
}
