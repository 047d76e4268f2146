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

//! Cooperative background work.
//!
//! The engine never owns a scheduler. Incremental jobs (spell scans,
//! re-validation sweeps) are `IdleTask`s parked on a `WorkQueue`; the host
//! calls [`WorkQueue::run`] whenever it is idle, handing over a
//! [`StepBudget`] that caps how much gets done before control returns.
//! Tasks honor the contract "do at most this much work, say whether you
//! are done" and are re-queued round-robin until they report
//! [`Progress::Done`].

use crate::TaskId;
use slotmap::SlotMap;
use std::collections::VecDeque;
use std::time::Instant;

/// How much work one scheduler slice may perform.
///
/// Steps are task-defined units (a word spell-checked, a line parsed). An
/// optional wall-clock deadline bounds slices whose steps have uneven cost.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
    remaining: usize,
    deadline: Option<Instant>,
}

impl StepBudget {
    pub fn steps(steps: usize) -> Self {
        Self {
            remaining: steps,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Spend up to `n` steps; returns how many were actually available.
    pub fn consume(&mut self, n: usize) -> usize {
        let spent = n.min(self.remaining);
        self.remaining -= spent;
        spent
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Outcome of one slice of an idle task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Finished; the task is dropped from the queue.
    Done,
    /// More work remains; the task is re-queued.
    Yield,
}

/// A resumable unit of background work, driven by a host scheduler.
///
/// `C` is the host's context (typically the buffer plus whatever the task
/// consults); the queue threads it through so tasks hold no references of
/// their own between slices.
pub trait IdleTask<C> {
    fn step(&mut self, ctx: &mut C, budget: &mut StepBudget) -> Progress;
}

impl<C, F> IdleTask<C> for F
where
    F: FnMut(&mut C, &mut StepBudget) -> Progress,
{
    fn step(&mut self, ctx: &mut C, budget: &mut StepBudget) -> Progress {
        self(ctx, budget)
    }
}

/// Round-robin queue of idle tasks, drained in budgeted slices.
pub struct WorkQueue<C> {
    tasks: SlotMap<TaskId, Box<dyn IdleTask<C>>>,
    order: VecDeque<TaskId>,
}

impl<C> std::fmt::Debug for WorkQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl<C> Default for WorkQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> WorkQueue<C> {
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn schedule(&mut self, task: impl IdleTask<C> + 'static) -> TaskId {
        let id = self.tasks.insert(Box::new(task));
        self.order.push_back(id);
        tracing::debug!(task = ?id, pending = self.tasks.len(), "task scheduled");
        id
    }

    /// Drop a task before it completes. Returns false if it already
    /// finished or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let found = self.tasks.remove(id).is_some();
        if found {
            self.order.retain(|&t| t != id);
            tracing::debug!(task = ?id, "task cancelled");
        }
        found
    }

    /// Run queued tasks round-robin until the budget is exhausted, the
    /// queue drains, or a full pass makes no progress (every remaining task
    /// yielded without spending a step). Returns `Progress::Done` when no
    /// tasks remain.
    pub fn run(&mut self, ctx: &mut C, budget: &mut StepBudget) -> Progress {
        loop {
            if self.order.is_empty() || budget.is_exhausted() {
                break;
            }
            let mut progressed = false;
            for _ in 0..self.order.len() {
                if budget.is_exhausted() {
                    break;
                }
                let id = match self.order.pop_front() {
                    Some(id) => id,
                    None => break,
                };
                let task = match self.tasks.get_mut(id) {
                    Some(task) => task,
                    None => continue, // cancelled while queued
                };
                let before = budget.remaining();
                match task.step(ctx, budget) {
                    Progress::Done => {
                        self.tasks.remove(id);
                        progressed = true;
                        tracing::debug!(task = ?id, pending = self.tasks.len(), "task finished");
                    }
                    Progress::Yield => self.order.push_back(id),
                }
                if budget.remaining() < before {
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        if self.tasks.is_empty() {
            Progress::Done
        } else {
            Progress::Yield
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_consume_caps_at_remaining() {
        let mut budget = StepBudget::steps(5);
        assert_eq!(budget.consume(3), 3);
        assert_eq!(budget.consume(10), 2);
        assert!(budget.is_exhausted());
        assert_eq!(budget.consume(1), 0);
    }

    #[test]
    fn test_past_deadline_exhausts_budget() {
        let budget = StepBudget::steps(100).with_deadline(Instant::now());
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), 100);
    }

    #[test]
    fn test_task_runs_to_completion_across_slices() {
        let mut queue: WorkQueue<Vec<u32>> = WorkQueue::new();
        queue.schedule(|log: &mut Vec<u32>, budget: &mut StepBudget| {
            while budget.consume(1) == 1 {
                log.push(log.len() as u32);
                if log.len() == 7 {
                    return Progress::Done;
                }
            }
            Progress::Yield
        });

        let mut log = Vec::new();
        assert_eq!(queue.run(&mut log, &mut StepBudget::steps(3)), Progress::Yield);
        assert_eq!(log.len(), 3);
        assert_eq!(queue.run(&mut log, &mut StepBudget::steps(3)), Progress::Yield);
        assert_eq!(log.len(), 6);
        assert_eq!(queue.run(&mut log, &mut StepBudget::steps(3)), Progress::Done);
        assert_eq!(log, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tasks_share_one_slice_round_robin() {
        let mut queue: WorkQueue<Vec<char>> = WorkQueue::new();
        for tag in ['a', 'b'] {
            let mut left = 2;
            queue.schedule(move |log: &mut Vec<char>, budget: &mut StepBudget| {
                if budget.consume(1) == 0 {
                    return Progress::Yield;
                }
                log.push(tag);
                left -= 1;
                if left == 0 {
                    Progress::Done
                } else {
                    Progress::Yield
                }
            });
        }

        let mut log = Vec::new();
        assert_eq!(queue.run(&mut log, &mut StepBudget::steps(10)), Progress::Done);
        assert_eq!(log, vec!['a', 'b', 'a', 'b']);
    }

    #[test]
    fn test_cancel_removes_pending_task() {
        let mut queue: WorkQueue<u32> = WorkQueue::new();
        let keep = queue.schedule(|n: &mut u32, _: &mut StepBudget| {
            *n += 1;
            Progress::Done
        });
        let drop = queue.schedule(|n: &mut u32, _: &mut StepBudget| {
            *n += 100;
            Progress::Done
        });
        assert!(queue.cancel(drop));
        assert!(!queue.cancel(drop));

        let mut n = 0;
        queue.run(&mut n, &mut StepBudget::steps(10));
        assert_eq!(n, 1);
        assert!(!queue.cancel(keep));
    }

    #[test]
    fn test_exhausted_budget_runs_nothing() {
        let mut queue: WorkQueue<u32> = WorkQueue::new();
        queue.schedule(|n: &mut u32, _: &mut StepBudget| {
            *n += 1;
            Progress::Done
        });
        let mut n = 0;
        assert_eq!(queue.run(&mut n, &mut StepBudget::steps(0)), Progress::Yield);
        assert_eq!(n, 0);
        assert_eq!(queue.len(), 1);
    }
}
