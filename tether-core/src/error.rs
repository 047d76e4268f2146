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

use std::fmt;

/// Error for buffer and mark operations handed an invalid range.
///
/// Absence of a result (e.g. no mark at or before a position) is expressed
/// as `None` by the query APIs, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// A position exceeded the buffer length
    OutOfBounds { pos: usize, len: usize },
    /// A range with lo > hi
    Inverted { lo: usize, hi: usize },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::OutOfBounds { pos, len } => {
                write!(f, "position {pos} out of bounds (buffer length {len})")
            }
            RangeError::Inverted { lo, hi } => {
                write!(f, "inverted range: lo {lo} > hi {hi}")
            }
        }
    }
}

impl std::error::Error for RangeError {}
