//! Decomposition context: the current search record and its history.

use std::sync::Arc;

use crate::domain::TaskCall;
use crate::env::{Environment, Frame};
use crate::planner::PlanStep;

/// Position of a committed choice inside a method: the branch taken and
/// how many earlier precondition solutions of that branch were skipped.
///
/// Only the count is kept, not the solver's position, so a restore solves
/// the branch precondition again from the start and discards `solution`
/// answers. Resuming a choice point with `n` solutions therefore costs
/// O(n^2) precondition work in total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Choice {
    pub branch: usize,
    pub solution: usize,
}

/// A task waiting on the pending stack.
#[derive(Debug, Clone)]
pub struct TaskInstance<'d> {
    pub call: &'d TaskCall,
    /// Root segment of every path opened for this instance.
    pub scope: u32,
    /// Bindings of the branch that pushed the task.
    pub bindings: Arc<Frame>,
    /// Where to resume when this instance is re-expanded after a restore.
    pub choice: Choice,
}

impl<'d> TaskInstance<'d> {
    pub fn root(call: &'d TaskCall, scope: u32) -> Self {
        Self {
            call,
            scope,
            bindings: Arc::new(Frame::default()),
            choice: Choice::default(),
        }
    }
}

/// One point in the search.
#[derive(Debug, Clone, Default)]
pub struct Record<'d> {
    pending: Vec<TaskInstance<'d>>,
    plan: Vec<PlanStep>,
}

/// Owns the current record, the history stack and the environment for a
/// single planning call.
///
/// Snapshots happen only at task boundaries, when no scope is open, so the
/// environment is empty whenever a record is copied and needs no copy of
/// its own.
#[derive(Debug, Default)]
pub struct DecompositionContext<'d> {
    current: Record<'d>,
    history: Vec<Record<'d>>,
    environment: Environment,
    next_scope: u32,
}

impl<'d> DecompositionContext<'d> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_task(&mut self, task: TaskInstance<'d>) {
        self.current.pending.push(task);
    }

    /// Pop the next pending task. `None` means the decomposition is done.
    pub fn pop_task(&mut self) -> Option<TaskInstance<'d>> {
        self.current.pending.pop()
    }

    /// Copy the current record onto the history stack with `resume` pushed
    /// back on its pending stack. Returns the new history depth.
    pub fn snapshot_history(&mut self, resume: TaskInstance<'d>) -> usize {
        let mut record = self.current.clone();
        record.pending.push(resume);
        self.history.push(record);
        self.history.len()
    }

    /// Make the most recent snapshot current. False when history is empty.
    pub fn restore(&mut self) -> bool {
        match self.history.pop() {
            Some(record) => {
                self.current = record;
                true
            }
            None => false,
        }
    }

    /// Mark the choice of the task on top of the pending stack as tried.
    pub fn advance_choice(&mut self) {
        if let Some(top) = self.current.pending.last_mut() {
            top.choice.solution += 1;
        }
    }

    pub fn emit(&mut self, step: PlanStep) {
        self.current.plan.push(step);
    }

    pub fn plan(&self) -> &[PlanStep] {
        &self.current.plan
    }

    pub fn take_plan(&mut self) -> Vec<PlanStep> {
        std::mem::take(&mut self.current.plan)
    }

    /// Fresh root segment id, unique within this call.
    pub fn next_scope_id(&mut self) -> u32 {
        let id = self.next_scope;
        self.next_scope += 1;
        id
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn pending_depth(&self) -> usize {
        self.current.pending.len()
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }
}
