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

//! Visible-window tracking.
//!
//! A `ViewPort` is a pair of marks bracketing the region a consumer
//! currently cares about. Incremental work (spell scans, pagers) bounds
//! its queries to this window so off-screen text is never eagerly
//! processed. Text inserted at the end edge lands inside the window;
//! text inserted at the start edge shifts the whole window right, so the
//! window's content is preserved either way. The start mark carries left
//! gravity and the end mark right gravity: a replacement straddling an
//! edge keeps the replacement text inside the window.

use crate::buffer::TextBuffer;
use crate::marks::Gravity;
use crate::{MarkId, ViewId};

/// A pair of marks denoting the visible region of a buffer.
#[derive(Debug)]
pub struct ViewPort {
    view: ViewId,
    start: MarkId,
    end: MarkId,
}

impl ViewPort {
    /// Create a viewport spanning `[lo, hi)`, clamped to the buffer.
    pub fn new(buf: &mut TextBuffer, name: &str, lo: usize, hi: usize) -> Self {
        let len = buf.len_chars();
        let lo = lo.min(len);
        let hi = hi.min(len).max(lo);
        let view = buf.add_view(&format!("viewport:{name}"));
        let store = buf.store_mut();
        let start = store.create(view, lo, Gravity::Left);
        let end = store.create(view, hi, Gravity::Right);
        Self { view, start, end }
    }

    /// The window as `(lo, hi)` in current buffer offsets.
    pub fn range(&self, buf: &TextBuffer) -> (usize, usize) {
        let lo = buf.mark_offset(self.start).expect("viewport start mark is live");
        let hi = buf.mark_offset(self.end).expect("viewport end mark is live");
        // An edit swallowing the whole window can leave end left of start
        // (end collapses right, start stays put only on pure inserts).
        (lo, hi.max(lo))
    }

    pub fn contains(&self, buf: &TextBuffer, pos: usize) -> bool {
        let (lo, hi) = self.range(buf);
        lo <= pos && pos < hi
    }

    pub fn is_empty(&self, buf: &TextBuffer) -> bool {
        let (lo, hi) = self.range(buf);
        lo >= hi
    }

    /// Re-anchor both marks, e.g. after a scroll. Clamped to the buffer;
    /// an inverted request collapses to an empty window at `lo`.
    pub fn resize(&mut self, buf: &mut TextBuffer, lo: usize, hi: usize) {
        let len = buf.len_chars();
        let lo = lo.min(len);
        let hi = hi.min(len).max(lo);
        let store = buf.store_mut();
        store.move_to(self.start, lo);
        store.move_to(self.end, hi);
    }

    /// Release both marks and the viewport's view.
    pub fn close(self, buf: &mut TextBuffer) {
        buf.remove_view(self.view);
    }
}
