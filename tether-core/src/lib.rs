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

use slotmap::new_key_type;

pub mod buffer;
pub mod error;
pub mod marks;
pub mod scan;
pub mod tracker;
pub mod viewport;
pub mod work;

new_key_type! {
    /// Handle to a mark owned by a buffer's mark store
    pub struct MarkId;
}

new_key_type! {
    /// Handle to a view (an independently ordered group of marks)
    pub struct ViewId;
}

new_key_type! {
    /// Handle to a task scheduled on a WorkQueue
    pub struct TaskId;
}

pub use buffer::{EditEvent, ObserverId, TextBuffer};
pub use error::RangeError;
pub use marks::Gravity;
pub use scan::IncrementalScanner;
pub use tracker::RangeTracker;
pub use viewport::ViewPort;
pub use work::{IdleTask, Progress, StepBudget, WorkQueue};
