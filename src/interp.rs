//! The decomposition search.
//!
//! A small state machine drives the loop: `Expanding` pops and processes
//! one pending task, `Backtracking` restores the latest history snapshot,
//! and the loop ends in `Succeeded` (pending stack empty) or `Failed`
//! (history exhausted).
//!
//! Expanding a compound task opens the method's scope, walks its branches
//! in source order from the instance's `Choice`, and commits to the first
//! precondition solution not yet tried. When anything remains untried (a
//! later solution of that branch, or a later branch) the record is
//! snapshotted with the task pushed back, so a restore re-expands it one
//! solution further along.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::context::{Choice, DecompositionContext, TaskInstance};
use crate::domain::{Branch, Domain, Method, TaskCall};
use crate::env::{Environment, Frame, NodePath, Segment};
use crate::metrics::PlanMetrics;
use crate::planner::{PlanError, PlanStep};
use crate::scope::NodeScope;
use crate::solver::{bind_params, read_term, Solver};
use crate::trace::{debug, trace};
use crate::value::Value;
use crate::world::WorldState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Expanding,
    Backtracking,
    Succeeded,
    Failed,
}

/// Outcome of trying one branch: the committed bindings and whether the
/// branch has further solutions.
struct Commit {
    frame: Frame,
    open: bool,
}

pub struct Interpreter<'d> {
    solver: Solver<'d>,
    context: DecompositionContext<'d>,
}

impl<'d> Interpreter<'d> {
    pub fn new(domain: &'d Domain, world: &'d WorldState) -> Self {
        Self {
            solver: Solver::new(domain, world),
            context: DecompositionContext::new(),
        }
    }

    /// Decompose `root` until the pending stack empties or the search is
    /// exhausted.
    pub fn run(&mut self, root: &'d TaskCall, goal: &str) -> Result<Vec<PlanStep>, PlanError> {
        let scope = self.context.next_scope_id();
        self.context.push_task(TaskInstance::root(root, scope));

        let mut state = SearchState::Expanding;
        loop {
            state = match state {
                SearchState::Expanding => self.step()?,
                SearchState::Backtracking => {
                    if self.context.restore() {
                        self.context.advance_choice();
                        self.solver.metrics.record_restore();
                        debug!(depth = self.context.history_depth(), "restore");
                        SearchState::Expanding
                    } else {
                        SearchState::Failed
                    }
                }
                SearchState::Succeeded => {
                    let plan = self.context.take_plan();
                    debug!(steps = plan.len(), "plan found");
                    return Ok(plan);
                }
                SearchState::Failed => {
                    debug!(goal, "search exhausted");
                    return Err(PlanError::Exhausted {
                        goal: goal.to_string(),
                    });
                }
            };
        }
    }

    pub fn metrics(&self) -> &PlanMetrics {
        &self.solver.metrics
    }

    pub fn environment(&self) -> &Environment {
        self.context.environment()
    }

    fn step(&mut self) -> Result<SearchState, PlanError> {
        self.solver.metrics.record_step();
        let Some(task) = self.context.pop_task() else {
            return Ok(SearchState::Succeeded);
        };
        let domain = self.solver.domain();
        match domain.method(task.call.name, task.call.arity()) {
            Some(method) => self.expand(task, method),
            None => Ok(self.emit_primitive(&task)),
        }
    }

    fn emit_primitive(&mut self, task: &TaskInstance<'d>) -> SearchState {
        let domain = self.solver.domain();
        let mut args = SmallVec::new();
        for term in &task.call.args {
            match read_term(domain, term, |name| task.bindings.get(name)) {
                Some(value) if value.is_ground() => args.push(value),
                _ => {
                    self.solver.metrics.record_unresolved_primitive();
                    debug!(task = domain.name(task.call.name), "unbound primitive argument");
                    return SearchState::Backtracking;
                }
            }
        }
        trace!(task = domain.name(task.call.name), "primitive");
        self.context.emit(PlanStep {
            task: task.call.name,
            args,
        });
        self.solver.metrics.record_primitive();
        SearchState::Expanding
    }

    fn expand(
        &mut self,
        task: TaskInstance<'d>,
        method: &'d Method,
    ) -> Result<SearchState, PlanError> {
        let domain = self.solver.domain();
        let actuals: Option<SmallVec<[Value; 4]>> = task
            .call
            .args
            .iter()
            .map(|term| read_term(domain, term, |name| task.bindings.get(name)))
            .collect();
        let Some(actuals) = actuals else {
            return Ok(SearchState::Backtracking);
        };
        self.solver.metrics.record_expansion();
        debug!(
            method = domain.name(method.name),
            branch = task.choice.branch,
            solution = task.choice.solution,
            "expand"
        );

        let root = NodePath::task(task.scope);
        let Some(mut method_scope) = NodeScope::enter(
            self.context.environment_mut(),
            &root,
            Segment::Node(method.id),
        ) else {
            self.solver.metrics.record_cycle_blocked();
            return Ok(SearchState::Backtracking);
        };
        let method_path = method_scope.path().clone();

        method_scope.set_index(task.choice.branch);
        let mut committed = None;
        while method_scope.index() < method.branches.len() {
            let index = method_scope.index();
            let skip = if index == task.choice.branch {
                task.choice.solution
            } else {
                0
            };
            let outcome = try_branch(
                &mut self.solver,
                &mut method_scope,
                &method_path,
                method,
                &method.branches[index],
                &actuals,
                skip,
            )?;
            self.solver.metrics.record_branch(outcome.is_some());
            if let Some(commit) = outcome {
                committed = Some((index, skip, commit));
                break;
            }
            method_scope.advance();
        }
        drop(method_scope);

        let Some((index, skip, commit)) = committed else {
            debug!(method = domain.name(method.name), "no branch applies");
            return Ok(SearchState::Backtracking);
        };

        if commit.open || index + 1 < method.branches.len() {
            let resume = TaskInstance {
                choice: Choice {
                    branch: index,
                    solution: skip,
                },
                ..task
            };
            let depth = self.context.snapshot_history(resume);
            self.solver.metrics.record_snapshot(depth);
            debug!(depth, "snapshot");
        }

        let bindings = Arc::new(commit.frame);
        for call in method.branches[index].tasks.iter().rev() {
            let scope = self.context.next_scope_id();
            self.context.push_task(TaskInstance {
                call,
                scope,
                bindings: Arc::clone(&bindings),
                choice: Choice::default(),
            });
        }
        self.solver
            .metrics
            .update_max_pending(self.context.pending_depth());
        Ok(SearchState::Expanding)
    }
}

/// Bind the method parameters in a fresh branch scope and look for the
/// `skip`-th solution of the branch precondition.
fn try_branch<'d>(
    solver: &mut Solver<'d>,
    env: &mut Environment,
    method_path: &NodePath,
    method: &'d Method,
    branch: &'d Branch,
    actuals: &[Value],
    skip: usize,
) -> Result<Option<Commit>, PlanError> {
    let Some(mut scope) = NodeScope::enter(env, method_path, Segment::Node(branch.id)) else {
        return Ok(None);
    };
    let frame = scope.path().clone();
    if !bind_params(solver.domain(), &method.params, actuals, &mut scope, &frame) {
        return Ok(None);
    }

    let mut seen = 0;
    let mut chosen = None;
    let mut open = false;
    solver.solve_branch(
        branch.condition.as_ref(),
        &mut scope,
        &frame,
        &frame,
        &mut |_: &mut Solver<'d>, env: &mut Environment| -> Result<bool, PlanError> {
            if seen < skip {
                seen += 1;
                return Ok(false);
            }
            if chosen.is_none() {
                chosen = Some(env.capture(&frame));
                return Ok(false);
            }
            open = true;
            Ok(true)
        },
    )?;
    Ok(chosen.map(|frame| Commit { frame, open }))
}

#[cfg(test)]
#[path = "tests/interp.rs"]
mod tests;
