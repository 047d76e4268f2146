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

//! Budgeted word-by-word scanning, the reference consumer of the mark and
//! range machinery.
//!
//! An `IncrementalScanner` walks the unchecked parts of a viewport one word
//! per budget step, hands each word to a visitor (a spell checker, an
//! abbreviation indexer), and records coverage in a [`RangeTracker`] so the
//! same text is never visited twice. Edits dirty the smallest word-aligned
//! span around the change, so fixing one word re-scans one word.

use crate::buffer::{EditEvent, TextBuffer};
use crate::tracker::RangeTracker;
use crate::viewport::ViewPort;
use crate::work::{Progress, StepBudget};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

/// Offset of the start of the word containing (or ending at) `pos`.
fn word_start(buf: &TextBuffer, pos: usize) -> usize {
    let mut pos = pos.min(buf.len_chars());
    let mut it = buf.chars_at(pos);
    while let Some(c) = it.prev() {
        if !is_word_char(c) {
            break;
        }
        pos -= 1;
    }
    pos
}

/// Offset just past the end of the word containing (or starting at) `pos`.
fn word_end(buf: &TextBuffer, pos: usize) -> usize {
    let mut pos = pos.min(buf.len_chars());
    for c in buf.chars_at(pos) {
        if !is_word_char(c) {
            break;
        }
        pos += 1;
    }
    pos
}

/// First offset in `[lo, hi)` holding a word char, if any.
fn next_word_start(buf: &TextBuffer, lo: usize, hi: usize) -> Option<usize> {
    buf.chars_at(lo)
        .take(hi - lo)
        .position(is_word_char)
        .map(|i| lo + i)
}

/// Incremental word scanner over one buffer.
///
/// The visitor is called as `visit(lo, hi, word)` for each word exactly
/// once until an edit dirties it.
pub struct IncrementalScanner<F> {
    tracker: RangeTracker,
    viewport: ViewPort,
    visit: F,
}

impl<F> std::fmt::Debug for IncrementalScanner<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalScanner")
            .field("tracker", &self.tracker)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl<F: FnMut(usize, usize, &str)> IncrementalScanner<F> {
    /// Scanner covering the whole buffer initially; narrow with [`focus`].
    ///
    /// [`focus`]: IncrementalScanner::focus
    pub fn new(buf: &mut TextBuffer, tag: &str, visit: F) -> Self {
        let len = buf.len_chars();
        Self {
            tracker: RangeTracker::new(buf, tag),
            viewport: ViewPort::new(buf, tag, 0, len),
            visit,
        }
    }

    /// Restrict scanning to `[lo, hi)`; already-checked text stays checked.
    pub fn focus(&mut self, buf: &mut TextBuffer, lo: usize, hi: usize) {
        self.viewport.resize(buf, lo, hi);
    }

    /// Dirty the word-aligned span around an edit so the next `step`
    /// revisits it. The span extends outward to the nearest word
    /// boundaries, catching words the edit joined or split.
    pub fn invalidate_edit(&mut self, buf: &mut TextBuffer, ev: &EditEvent) {
        let lo = word_start(buf, ev.lo);
        let hi = word_end(buf, ev.lo + ev.new_len);
        tracing::debug!(lo, hi, edit = ev.seq, "invalidating span");
        self.tracker.clear(buf, lo, hi);
    }

    /// Dirty everything from `pos` onward. The blunt fallback when no
    /// precise edit span is known.
    pub fn invalidate_from(&mut self, buf: &mut TextBuffer, pos: usize) {
        self.tracker.clear_from(buf, pos);
    }

    /// Visit unchecked words in the viewport, one per budget step. Returns
    /// `Done` when the viewport is fully checked, `Yield` when the budget
    /// ran out first.
    pub fn step(&mut self, buf: &mut TextBuffer, budget: &mut StepBudget) -> Progress {
        loop {
            if budget.is_exhausted() {
                return Progress::Yield;
            }
            let (lo, hi) = self.viewport.range(buf);
            let Some((gap_lo, gap_hi)) = self.tracker.choose_uncovered(buf, lo, hi) else {
                return Progress::Done;
            };
            budget.consume(1);
            match next_word_start(buf, gap_lo, gap_hi) {
                None => {
                    // separators only; cover the gap and move on
                    self.tracker.add(buf, gap_lo, gap_hi);
                }
                Some(word_lo) => {
                    // the word may run past the gap or viewport edge;
                    // check it whole so it is never split across steps
                    let word_hi = word_end(buf, word_lo);
                    let word: String = buf.chars_at(word_lo).take(word_hi - word_lo).collect();
                    (self.visit)(word_lo, word_hi, &word);
                    self.tracker.add(buf, gap_lo, word_hi);
                }
            }
        }
    }

    /// Fraction of the viewport already checked, for tests and progress UI.
    pub fn is_idle(&mut self, buf: &mut TextBuffer) -> bool {
        let (lo, hi) = self.viewport.range(buf);
        self.tracker.is_covered(buf, lo, hi)
    }

    /// Release the scanner's tracker and viewport marks.
    pub fn close(self, buf: &mut TextBuffer) {
        self.tracker.close(buf);
        self.viewport.close(buf);
    }
}
