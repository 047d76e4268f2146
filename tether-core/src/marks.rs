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

//! Mark storage and edit adjustment.
//!
//! Marks are positions that survive edits. The buffer owns a slab of marks;
//! `MarkId` is a handle into it, so nothing in the engine holds a pointer
//! back to the buffer. Marks are grouped into views: each view keeps its
//! marks in a `Vec` ordered by offset, and that vec order is the
//! authoritative total order (marks sharing an offset keep their insertion
//! history order). All position queries are binary searches over the vec.
//!
//! The adjustment rule applied on every edit `(lo, hi, new_len)`:
//! - offsets below `lo` are untouched,
//! - offsets strictly inside the replaced span collapse to `lo` (left
//!   gravity, the default) or to `lo + new_len` (right gravity),
//! - offsets at or past `hi` shift by the length delta. A mark sitting
//!   exactly at a pure insertion point therefore advances past the
//!   inserted text.

use crate::buffer::EditEvent;
use crate::{MarkId, ViewId};
use slotmap::SlotMap;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Where a mark moves when the text it sits in is replaced or deleted.
///
/// Gravity only matters for marks strictly inside a replaced span: left
/// gravity collapses to the start of the edit, right gravity to the end of
/// the replacement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    Left,
    Right,
}

#[derive(Debug)]
struct MarkData {
    view: ViewId,
    offset: usize,
    /// Creation/move order stamp within the view; tie-break bookkeeping only,
    /// the view's vec order is authoritative.
    seq: u64,
    gravity: Gravity,
    /// Sparse consumer-facing attributes; the engine stores nothing here.
    attrs: Option<HashMap<String, String>>,
}

#[derive(Debug)]
struct ViewState {
    name: String,
    /// Mark ids ordered by offset (insertion-history order within ties)
    order: Vec<MarkId>,
    next_seq: u64,
}

/// Slab of marks plus the per-view orderings. Owned by a `TextBuffer`,
/// which re-exposes the operations with bounds checking.
#[derive(Debug, Default)]
pub(crate) struct MarkStore {
    marks: SlotMap<MarkId, MarkData>,
    views: SlotMap<ViewId, ViewState>,
}

impl MarkStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_view(&mut self, name: &str) -> ViewId {
        self.views.insert(ViewState {
            name: name.to_string(),
            order: Vec::new(),
            next_seq: 0,
        })
    }

    /// Remove a view and release every mark in it. Idempotent.
    pub(crate) fn remove_view(&mut self, view: ViewId) {
        if let Some(state) = self.views.remove(view) {
            tracing::debug!(view = ?view, marks = state.order.len(), "removing view");
            for id in state.order {
                self.marks.remove(id);
            }
        }
    }

    pub(crate) fn view_name(&self, view: ViewId) -> Option<&str> {
        self.views.get(view).map(|v| v.name.as_str())
    }

    pub(crate) fn view_marks(&self, view: ViewId) -> &[MarkId] {
        self.views.get(view).map_or(&[], |v| v.order.as_slice())
    }

    /// Create a mark. The new mark sorts after every existing mark at the
    /// same offset. Panics if the view does not exist.
    pub(crate) fn create(&mut self, view: ViewId, offset: usize, gravity: Gravity) -> MarkId {
        let seq = {
            let state = &mut self.views[view];
            let seq = state.next_seq;
            state.next_seq += 1;
            seq
        };
        let id = self.marks.insert(MarkData {
            view,
            offset,
            seq,
            gravity,
            attrs: None,
        });
        let marks = &self.marks;
        let state = &mut self.views[view];
        let idx = state.order.partition_point(|&m| marks[m].offset <= offset);
        state.order.insert(idx, id);
        id
    }

    /// Release a mark. Releasing an already-released mark is a no-op.
    pub(crate) fn release(&mut self, id: MarkId) {
        let Some(data) = self.marks.get(id) else {
            tracing::trace!(mark = ?id, "release of dead mark ignored");
            return;
        };
        let view = data.view;
        let offset = data.offset;
        let marks = &self.marks;
        if let Some(state) = self.views.get_mut(view) {
            let start = state.order.partition_point(|&m| marks[m].offset < offset);
            if let Some(pos) = state.order[start..].iter().position(|&m| m == id) {
                state.order.remove(start + pos);
            }
        }
        self.marks.remove(id);
    }

    /// Duplicate a mark: same view, offset, and gravity, ordered immediately
    /// after the original. Returns `None` for a released mark.
    pub(crate) fn duplicate(&mut self, id: MarkId) -> Option<MarkId> {
        let (view, offset, gravity) = {
            let data = self.marks.get(id)?;
            (data.view, data.offset, data.gravity)
        };
        let seq = {
            let state = &mut self.views[view];
            let seq = state.next_seq;
            state.next_seq += 1;
            seq
        };
        let new_id = self.marks.insert(MarkData {
            view,
            offset,
            seq,
            gravity,
            attrs: None,
        });
        let marks = &self.marks;
        let state = &mut self.views[view];
        let start = state.order.partition_point(|&m| marks[m].offset < offset);
        let pos = state.order[start..]
            .iter()
            .position(|&m| m == id)
            .map(|p| start + p + 1)
            .unwrap_or(state.order.len());
        state.order.insert(pos, new_id);
        Some(new_id)
    }

    /// Re-anchor a mark at a new offset with a fresh sequence stamp, so it
    /// sorts after existing marks at the destination. No-op for dead marks.
    pub(crate) fn move_to(&mut self, id: MarkId, new_offset: usize) {
        let Some(data) = self.marks.get(id) else {
            tracing::trace!(mark = ?id, "move of dead mark ignored");
            return;
        };
        let view = data.view;
        let old_offset = data.offset;
        {
            let marks = &self.marks;
            let state = &mut self.views[view];
            let start = state
                .order
                .partition_point(|&m| marks[m].offset < old_offset);
            if let Some(pos) = state.order[start..].iter().position(|&m| m == id) {
                state.order.remove(start + pos);
            }
        }
        let seq = {
            let state = &mut self.views[view];
            let seq = state.next_seq;
            state.next_seq += 1;
            seq
        };
        {
            let data = &mut self.marks[id];
            data.offset = new_offset;
            data.seq = seq;
        }
        let marks = &self.marks;
        let state = &mut self.views[view];
        let idx = state
            .order
            .partition_point(|&m| marks[m].offset <= new_offset);
        state.order.insert(idx, id);
    }

    pub(crate) fn offset(&self, id: MarkId) -> Option<usize> {
        self.marks.get(id).map(|d| d.offset)
    }

    pub(crate) fn view_of(&self, id: MarkId) -> Option<ViewId> {
        self.marks.get(id).map(|d| d.view)
    }

    pub(crate) fn seq(&self, id: MarkId) -> Option<u64> {
        self.marks.get(id).map(|d| d.seq)
    }

    pub(crate) fn gravity(&self, id: MarkId) -> Option<Gravity> {
        self.marks.get(id).map(|d| d.gravity)
    }

    /// Order two marks. Offsets compare first; ties within one view resolve
    /// to the view's list order. Marks in different views at the same offset
    /// compare equal. `None` if either mark is released.
    pub(crate) fn compare(&self, a: MarkId, b: MarkId) -> Option<Ordering> {
        let da = self.marks.get(a)?;
        let db = self.marks.get(b)?;
        if a == b {
            return Some(Ordering::Equal);
        }
        match da.offset.cmp(&db.offset) {
            Ordering::Equal => {}
            other => return Some(other),
        }
        if da.view != db.view {
            return Some(Ordering::Equal);
        }
        let marks = &self.marks;
        let state = &self.views[da.view];
        let start = state.order.partition_point(|&m| marks[m].offset < da.offset);
        for &m in &state.order[start..] {
            if m == a {
                return Some(Ordering::Less);
            }
            if m == b {
                return Some(Ordering::Greater);
            }
        }
        Some(Ordering::Equal)
    }

    /// Last mark in the view at or before `pos`. O(log n).
    pub(crate) fn nearest_at_or_before(&self, view: ViewId, pos: usize) -> Option<MarkId> {
        let state = self.views.get(view)?;
        let marks = &self.marks;
        let i = state.order.partition_point(|&m| marks[m].offset <= pos);
        if i == 0 {
            None
        } else {
            Some(state.order[i - 1])
        }
    }

    /// First mark in the view at or after `pos`. O(log n).
    pub(crate) fn nearest_at_or_after(&self, view: ViewId, pos: usize) -> Option<MarkId> {
        let state = self.views.get(view)?;
        let marks = &self.marks;
        let i = state.order.partition_point(|&m| marks[m].offset < pos);
        state.order.get(i).copied()
    }

    pub(crate) fn set_attr(&mut self, id: MarkId, key: &str, value: &str) -> bool {
        match self.marks.get_mut(id) {
            Some(data) => {
                data.attrs
                    .get_or_insert_with(HashMap::new)
                    .insert(key.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    pub(crate) fn attr(&self, id: MarkId, key: &str) -> Option<&str> {
        self.marks
            .get(id)?
            .attrs
            .as_ref()?
            .get(key)
            .map(|s| s.as_str())
    }

    pub(crate) fn clear_attr(&mut self, id: MarkId, key: &str) -> Option<String> {
        self.marks.get_mut(id)?.attrs.as_mut()?.remove(key)
    }

    pub(crate) fn mark_count(&self) -> usize {
        self.marks.len()
    }

    /// Apply the edit adjustment rule to every view. Marks before the edit
    /// are never visited; the first affected mark is found by binary search.
    pub(crate) fn on_edit(&mut self, ev: &EditEvent) {
        let EditEvent {
            lo, hi, new_len, ..
        } = *ev;
        let removed = hi - lo;
        let marks = &mut self.marks;
        for (_view, state) in self.views.iter_mut() {
            let first = state.order.partition_point(|&m| marks[m].offset < lo);
            if first == state.order.len() {
                continue;
            }
            let mid = state.order.partition_point(|&m| marks[m].offset < hi);

            // Marks at or past the old end of the edit shift by the delta.
            for &m in &state.order[mid..] {
                let data = &mut marks[m];
                data.offset = data.offset - removed + new_len;
            }

            // Marks inside the replaced span collapse by gravity. A stable
            // partition (lefts then rights) keeps the view offset-sorted.
            if first < mid {
                let mut lefts = Vec::with_capacity(mid - first);
                let mut rights = Vec::new();
                for &m in &state.order[first..mid] {
                    let data = &mut marks[m];
                    match data.gravity {
                        Gravity::Left => {
                            data.offset = lo;
                            lefts.push(m);
                        }
                        Gravity::Right => {
                            data.offset = lo + new_len;
                            rights.push(m);
                        }
                    }
                }
                if !rights.is_empty() {
                    lefts.extend_from_slice(&rights);
                    state.order[first..mid].copy_from_slice(&lefts);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(lo: usize, hi: usize, new_len: usize) -> EditEvent {
        EditEvent {
            lo,
            hi,
            new_len,
            seq: 0,
        }
    }

    #[test]
    fn test_create_keeps_offset_order() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let m10 = store.create(view, 10, Gravity::Left);
        let m5 = store.create(view, 5, Gravity::Left);
        let m20 = store.create(view, 20, Gravity::Left);
        assert_eq!(store.view_marks(view), &[m5, m10, m20]);
    }

    #[test]
    fn test_same_offset_orders_by_creation() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 7, Gravity::Left);
        let b = store.create(view, 7, Gravity::Left);
        let c = store.create(view, 7, Gravity::Left);
        assert_eq!(store.view_marks(view), &[a, b, c]);
        assert_eq!(store.compare(a, b), Some(Ordering::Less));
        assert_eq!(store.compare(c, a), Some(Ordering::Greater));
    }

    #[test]
    fn test_duplicate_sorts_immediately_after_original() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 7, Gravity::Left);
        let b = store.create(view, 7, Gravity::Left);
        let dup = store.duplicate(a).unwrap();
        // dup has the highest seq but must sit right after a, before b
        assert_eq!(store.view_marks(view), &[a, dup, b]);
        assert_eq!(store.compare(a, dup), Some(Ordering::Less));
        assert_eq!(store.compare(dup, b), Some(Ordering::Less));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 3, Gravity::Left);
        store.release(a);
        assert_eq!(store.offset(a), None);
        store.release(a); // must not panic or disturb anything
        assert_eq!(store.mark_count(), 0);
        assert!(store.view_marks(view).is_empty());
    }

    #[test]
    fn test_remove_view_releases_marks() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 1, Gravity::Left);
        let b = store.create(view, 2, Gravity::Left);
        store.remove_view(view);
        assert_eq!(store.offset(a), None);
        assert_eq!(store.offset(b), None);
        assert_eq!(store.mark_count(), 0);
    }

    #[test]
    fn test_nearest_queries() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let m5 = store.create(view, 5, Gravity::Left);
        let m10 = store.create(view, 10, Gravity::Left);

        assert_eq!(store.nearest_at_or_before(view, 4), None);
        assert_eq!(store.nearest_at_or_before(view, 5), Some(m5));
        assert_eq!(store.nearest_at_or_before(view, 9), Some(m5));
        assert_eq!(store.nearest_at_or_before(view, 100), Some(m10));

        assert_eq!(store.nearest_at_or_after(view, 0), Some(m5));
        assert_eq!(store.nearest_at_or_after(view, 6), Some(m10));
        assert_eq!(store.nearest_at_or_after(view, 10), Some(m10));
        assert_eq!(store.nearest_at_or_after(view, 11), None);
    }

    #[test]
    fn test_views_are_independent() {
        let mut store = MarkStore::new();
        let v1 = store.add_view("one");
        let v2 = store.add_view("two");
        let a = store.create(v1, 5, Gravity::Left);
        let b = store.create(v2, 3, Gravity::Left);
        assert_eq!(store.view_marks(v1), &[a]);
        assert_eq!(store.view_marks(v2), &[b]);
        assert_eq!(store.nearest_at_or_before(v1, 4), None);
        assert_eq!(store.nearest_at_or_before(v2, 4), Some(b));
    }

    #[test]
    fn test_edit_shifts_marks_after() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 10, Gravity::Left);
        // insert 5 chars at 3
        store.on_edit(&edit(3, 3, 5));
        assert_eq!(store.offset(a), Some(15));
        // delete 4 chars at 0
        store.on_edit(&edit(0, 4, 0));
        assert_eq!(store.offset(a), Some(11));
    }

    #[test]
    fn test_edit_leaves_marks_before() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 2, Gravity::Left);
        store.on_edit(&edit(5, 9, 1));
        assert_eq!(store.offset(a), Some(2));
    }

    #[test]
    fn test_mark_inside_replacement_collapses_left() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 6, Gravity::Left);
        store.on_edit(&edit(4, 9, 2));
        assert_eq!(store.offset(a), Some(4));
    }

    #[test]
    fn test_mark_inside_replacement_collapses_right() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 6, Gravity::Right);
        store.on_edit(&edit(4, 9, 2));
        assert_eq!(store.offset(a), Some(6)); // lo + new_len
    }

    #[test]
    fn test_insertion_at_mark_advances_it() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 5, Gravity::Left);
        store.on_edit(&edit(5, 5, 3));
        assert_eq!(store.offset(a), Some(8));
    }

    #[test]
    fn test_view_stays_sorted_through_mixed_gravity_collapse() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let r = store.create(view, 4, Gravity::Right);
        let l = store.create(view, 6, Gravity::Left);
        // both inside the replaced span; left-collapsing mark must sort first
        store.on_edit(&edit(2, 8, 3));
        assert_eq!(store.offset(l), Some(2));
        assert_eq!(store.offset(r), Some(5));
        assert_eq!(store.view_marks(view), &[l, r]);
        assert_eq!(store.compare(l, r), Some(Ordering::Less));
    }

    #[test]
    fn test_move_reanchors_after_destination_ties() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 3, Gravity::Left);
        let b = store.create(view, 9, Gravity::Left);
        store.move_to(b, 3);
        assert_eq!(store.view_marks(view), &[a, b]);
        assert_eq!(store.compare(a, b), Some(Ordering::Less));
        assert!(store.seq(b) > store.seq(a));
    }

    #[test]
    fn test_attrs_are_sparse_and_per_mark() {
        let mut store = MarkStore::new();
        let view = store.add_view("test");
        let a = store.create(view, 0, Gravity::Left);
        let b = store.create(view, 1, Gravity::Left);
        assert_eq!(store.attr(a, "lang"), None);
        assert!(store.set_attr(a, "lang", "en"));
        assert_eq!(store.attr(a, "lang"), Some("en"));
        assert_eq!(store.attr(b, "lang"), None);
        assert_eq!(store.clear_attr(a, "lang"), Some("en".to_string()));
        assert_eq!(store.attr(a, "lang"), None);
        store.release(a);
        assert!(!store.set_attr(a, "lang", "en"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// The adjustment law from the design: o < lo unchanged, inside
        /// collapses to lo (left gravity), o >= hi shifts by the delta.
        fn expected(o: usize, lo: usize, hi: usize, new_len: usize) -> usize {
            if o < lo {
                o
            } else if o < hi {
                lo
            } else {
                o - (hi - lo) + new_len
            }
        }

        proptest! {
            #[test]
            fn prop_edit_adjustment_law(
                offsets in prop::collection::vec(0..500usize, 1..40),
                lo in 0..500usize,
                span in 0..100usize,
                new_len in 0..100usize,
            ) {
                let hi = (lo + span).min(500);
                let mut store = MarkStore::new();
                let view = store.add_view("prop");
                let marks: Vec<_> = offsets
                    .iter()
                    .map(|&o| store.create(view, o, Gravity::Left))
                    .collect();

                store.on_edit(&edit(lo, hi, new_len));

                for (mark, &o) in marks.iter().zip(offsets.iter()) {
                    prop_assert_eq!(store.offset(*mark), Some(expected(o, lo, hi, new_len)));
                }
            }

            #[test]
            fn prop_view_order_is_offset_sorted_after_edits(
                offsets in prop::collection::vec(0..300usize, 1..30),
                edits in prop::collection::vec((0..300usize, 0..60usize, 0..60usize), 1..12),
            ) {
                let mut store = MarkStore::new();
                let view = store.add_view("prop");
                for &o in &offsets {
                    store.create(view, o, Gravity::Left);
                }
                for &(lo, span, new_len) in &edits {
                    store.on_edit(&edit(lo, lo + span, new_len));
                }
                let positions: Vec<_> = store
                    .view_marks(view)
                    .iter()
                    .map(|&m| store.offset(m).unwrap())
                    .collect();
                for pair in positions.windows(2) {
                    prop_assert!(pair[0] <= pair[1], "view order violated: {:?}", positions);
                }
            }

            #[test]
            fn prop_same_offset_ties_stay_stable(
                edits in prop::collection::vec((0..100usize, 0..20usize, 0..20usize), 1..10),
            ) {
                let mut store = MarkStore::new();
                let view = store.add_view("prop");
                let first = store.create(view, 50, Gravity::Left);
                let second = store.create(view, 50, Gravity::Left);
                for &(lo, span, new_len) in &edits {
                    store.on_edit(&edit(lo, lo + span, new_len));
                }
                // both marks share gravity, so no edit can reorder them
                prop_assert_eq!(store.compare(first, second), Some(Ordering::Less));
            }
        }
    }
}
