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

//! The text buffer and its edit event stream.
//!
//! Every mutation goes through `replace`, which describes itself as a single
//! `EditEvent` (replace `[lo, hi)` with `new_len` chars). The buffer owns the
//! mark store and adjusts all marks inside `replace`, before any external
//! observer runs and before the call returns: by the time a subscriber sees
//! the event, every mark already has its post-edit offset.
//!
//! Observers receive `&EditEvent` only, so they cannot re-enter the buffer
//! from inside a notification. Edits are never merged or batched; one call
//! is one event.

use crate::error::RangeError;
use crate::marks::{Gravity, MarkStore};
use crate::{MarkId, ViewId};
use ropey::Rope;
use std::cmp::Ordering;

///// One atomic edit: the chars in `[lo, hi)` were replaced by `new_len` chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    pub lo: usize,
    pub hi: usize,
    pub new_len: usize,
    /// Value of the buffer's edit counter after this edit
    pub seq: u64,
}

impl EditEvent {
    /// Net change in buffer length
    pub fn delta(&self) -> isize {
        self.new_len as isize - (self.hi - self.lo) as isize
    }
}

/// Handle for unsubscribing an edit observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&EditEvent)>;

/// Mutable character buffer with position-tracking marks.
pub struct TextBuffer {
    text: Rope,
    edit_seq: u64,
    marks: MarkStore,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer")
            .field("len_chars", &self.text.len_chars())
            .field("edit_seq", &self.edit_seq)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            text: Rope::new(),
            edit_seq: 0,
            marks: MarkStore::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Create a buffer from existing content
    pub fn from_str(text: &str) -> Self {
        Self {
            text: Rope::from_str(text),
            ..Self::new()
        }
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len_chars() == 0
    }

    /// Monotonic edit counter, bumped once per successful `replace`
    pub fn edit_seq(&self) -> u64 {
        self.edit_seq
    }

    pub fn content(&self) -> String {
        self.text.to_string()
    }

    pub fn char_at(&self, pos: usize) -> Result<char, RangeError> {
        if pos >= self.text.len_chars() {
            return Err(RangeError::OutOfBounds {
                pos,
                len: self.text.len_chars(),
            });
        }
        Ok(self.text.char(pos))
    }

    pub fn slice(&self, lo: usize, hi: usize) -> Result<String, RangeError> {
        self.check_range(lo, hi)?;
        Ok(self.text.slice(lo..hi).to_string())
    }

    /// Bidirectional char iterator positioned at `pos` (clamped to length).
    /// `next` walks forward, `prev` walks backward.
    pub fn chars_at(&self, pos: usize) -> ropey::iter::Chars<'_> {
        self.text.chars_at(pos.min(self.text.len_chars()))
    }

    /// Replace the chars in `[lo, hi)` with `text`. Adjusts every mark and
    /// notifies observers in registration order before returning.
    pub fn replace(&mut self, lo: usize, hi: usize, text: &str) -> Result<EditEvent, RangeError> {
        self.check_range(lo, hi)?;
        let new_len = text.chars().count();
        if hi > lo {
            self.text.remove(lo..hi);
        }
        if new_len > 0 {
            self.text.insert(lo, text);
        }
        self.edit_seq += 1;
        let ev = EditEvent {
            lo,
            hi,
            new_len,
            seq: self.edit_seq,
        };
        self.marks.on_edit(&ev);
        for (_, observer) in self.observers.iter_mut() {
            observer(&ev);
        }
        Ok(ev)
    }

    /// Insert `text` at `pos`
    pub fn insert(&mut self, pos: usize, text: &str) -> Result<EditEvent, RangeError> {
        self.replace(pos, pos, text)
    }

    /// Delete the chars in `[lo, hi)`
    pub fn delete(&mut self, lo: usize, hi: usize) -> Result<EditEvent, RangeError> {
        self.replace(lo, hi, "")
    }

    /// Register an edit observer, called synchronously after each edit (and
    /// after mark adjustment) in registration order.
    pub fn subscribe(&mut self, observer: impl FnMut(&EditEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Drop an observer. Returns false if it was already removed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    // === MARKS AND VIEWS ===

    /// Create a named view: an independently ordered group of marks
    pub fn add_view(&mut self, name: &str) -> ViewId {
        self.marks.add_view(name)
    }

    /// Remove a view, releasing every mark in it
    pub fn remove_view(&mut self, view: ViewId) {
        self.marks.remove_view(view)
    }

    pub fn view_name(&self, view: ViewId) -> Option<&str> {
        self.marks.view_name(view)
    }

    /// The view's marks in buffer order
    pub fn view_marks(&self, view: ViewId) -> &[MarkId] {
        self.marks.view_marks(view)
    }

    /// Create a left-gravity mark at `offset` in `view`
    pub fn create_mark(&mut self, view: ViewId, offset: usize) -> Result<MarkId, RangeError> {
        self.create_mark_with_gravity(view, offset, Gravity::Left)
    }

    pub fn create_mark_with_gravity(
        &mut self,
        view: ViewId,
        offset: usize,
        gravity: Gravity,
    ) -> Result<MarkId, RangeError> {
        self.check_pos(offset)?;
        Ok(self.marks.create(view, offset, gravity))
    }

    /// Release a mark. Releasing twice is a no-op.
    pub fn release_mark(&mut self, id: MarkId) {
        self.marks.release(id)
    }

    /// New mark at the same offset and view, ordered immediately after the
    /// original. `None` for a released mark.
    pub fn duplicate_mark(&mut self, id: MarkId) -> Option<MarkId> {
        self.marks.duplicate(id)
    }

    /// Re-anchor a mark. The mark sorts after existing marks at the
    /// destination offset. No-op for released marks.
    pub fn move_mark(&mut self, id: MarkId, offset: usize) -> Result<(), RangeError> {
        self.check_pos(offset)?;
        self.marks.move_to(id, offset);
        Ok(())
    }

    pub fn mark_offset(&self, id: MarkId) -> Option<usize> {
        self.marks.offset(id)
    }

    pub fn mark_view(&self, id: MarkId) -> Option<ViewId> {
        self.marks.view_of(id)
    }

    pub fn mark_seq(&self, id: MarkId) -> Option<u64> {
        self.marks.seq(id)
    }

    pub fn mark_gravity(&self, id: MarkId) -> Option<Gravity> {
        self.marks.gravity(id)
    }

    /// Buffer order of two marks; `None` if either is released
    pub fn compare_marks(&self, a: MarkId, b: MarkId) -> Option<Ordering> {
        self.marks.compare(a, b)
    }

    pub fn nearest_at_or_before(&self, view: ViewId, pos: usize) -> Option<MarkId> {
        self.marks.nearest_at_or_before(view, pos)
    }

    pub fn nearest_at_or_after(&self, view: ViewId, pos: usize) -> Option<MarkId> {
        self.marks.nearest_at_or_after(view, pos)
    }

    pub fn set_mark_attr(&mut self, id: MarkId, key: &str, value: &str) -> bool {
        self.marks.set_attr(id, key, value)
    }

    pub fn mark_attr(&self, id: MarkId, key: &str) -> Option<&str> {
        self.marks.attr(id, key)
    }

    pub fn clear_mark_attr(&mut self, id: MarkId, key: &str) -> Option<String> {
        self.marks.clear_attr(id, key)
    }

    /// Total live marks across all views
    pub fn mark_count(&self) -> usize {
        self.marks.mark_count()
    }

    pub(crate) fn store_mut(&mut self) -> &mut MarkStore {
        &mut self.marks
    }

    fn check_pos(&self, pos: usize) -> Result<(), RangeError> {
        let len = self.text.len_chars();
        if pos > len {
            return Err(RangeError::OutOfBounds { pos, len });
        }
        Ok(())
    }

    fn check_range(&self, lo: usize, hi: usize) -> Result<(), RangeError> {
        if lo > hi {
            return Err(RangeError::Inverted { lo, hi });
        }
        self.check_pos(hi)
    }
}
