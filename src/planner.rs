//! Planner driver: one `make_plan` call per goal.
//!
//! Every call builds its own interpreter, decomposition context and
//! environment, so calls are independent and may run concurrently on
//! separate threads against the same `Domain` and `WorldState`.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use thiserror::Error;

use crate::domain::{Domain, Method, TaskCall};
use crate::interp::Interpreter;
use crate::metrics::MetricsReport;
use crate::symbol::{Sym, SymbolStore};
use crate::trace::{debug_span, info};
use crate::value::{format_value, value_to_json, Value};
use crate::world::{WorldState, MAX_ARITY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no parameterless method `{0}` to plan from")]
    UnknownEntryPoint(String),
    #[error("no plan found for `{goal}`")]
    Exhausted { goal: String },
    #[error("fact query `{fact}` has arity {arity}, outside 0..={max}", max = MAX_ARITY)]
    ArityOutOfRange { fact: String, arity: usize },
}

/// One primitive task of a plan with its resolved arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub task: Sym,
    pub args: SmallVec<[Value; 4]>,
}

impl PlanStep {
    pub fn new(task: Sym, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            task,
            args: args.into_iter().collect(),
        }
    }
}

/// Render a step as `task(arg, ...)`.
pub fn format_step(step: &PlanStep, symbols: &SymbolStore) -> String {
    let args: Vec<String> = step
        .args
        .iter()
        .map(|arg| format_value(arg, symbols))
        .collect();
    format!("{}({})", symbols.name(step.task), args.join(", "))
}

/// An ordered sequence of primitive tasks.
#[derive(Debug, Clone)]
pub struct Plan {
    steps: Vec<PlanStep>,
    symbols: Arc<SymbolStore>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>, symbols: Arc<SymbolStore>) -> Self {
        Self { steps, symbols }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanStep> {
        self.steps.iter()
    }

    pub fn task_name(&self, index: usize) -> Option<&str> {
        self.steps
            .get(index)
            .map(|step| self.symbols.name(step.task))
    }

    /// Each step rendered as `task(arg, ...)`.
    pub fn lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|step| format_step(step, &self.symbols))
            .collect()
    }

    /// `[{"task": ..., "args": [...]}, ...]`
    pub fn to_json(&self) -> serde_json::Value {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                serde_json::json!({
                    "task": self.symbols.name(step.task),
                    "args": step
                        .args
                        .iter()
                        .map(|arg| value_to_json(arg, &self.symbols))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        serde_json::Value::Array(steps)
    }
}

impl std::ops::Index<usize> for Plan {
    type Output = PlanStep;

    fn index(&self, index: usize) -> &PlanStep {
        &self.steps[index]
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanStep;
    type IntoIter = std::slice::Iter<'a, PlanStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            writeln!(f, "{}", format_step(step, &self.symbols))?;
        }
        Ok(())
    }
}

/// Outcome of a planning call together with its search counters.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub outcome: Result<Plan, PlanError>,
    pub metrics: MetricsReport,
}

/// Plans goals of one domain against one world state.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'d> {
    domain: &'d Domain,
    world: &'d WorldState,
}

impl<'d> Planner<'d> {
    pub fn new(domain: &'d Domain, world: &'d WorldState) -> Self {
        Self { domain, world }
    }

    /// Decompose the parameterless method `entry` into a plan.
    pub fn make_plan(&self, entry: &str) -> Result<Plan, PlanError> {
        self.make_plan_with_report(entry).outcome
    }

    /// Plan the method marked top-level in the domain.
    pub fn make_top_level_plan(&self) -> Result<Plan, PlanError> {
        match self.domain.top_level() {
            Some(method) => self.plan_method(method, self.domain.name(method.name)).outcome,
            None => Err(PlanError::UnknownEntryPoint("<top-level>".to_string())),
        }
    }

    pub fn make_plan_with_report(&self, entry: &str) -> PlanReport {
        let method = self
            .domain
            .symbols()
            .get(entry)
            .and_then(|name| self.domain.method(name, 0));
        match method {
            Some(method) => self.plan_method(method, entry),
            None => PlanReport {
                outcome: Err(PlanError::UnknownEntryPoint(entry.to_string())),
                metrics: MetricsReport::default(),
            },
        }
    }

    fn plan_method(&self, method: &Method, goal: &str) -> PlanReport {
        let _span = debug_span!("make_plan", goal).entered();
        let root = TaskCall::new(method.name, Vec::new());
        let mut interp = Interpreter::new(self.domain, self.world);
        let outcome = interp
            .run(&root, goal)
            .map(|steps| Plan::new(steps, Arc::clone(self.domain.symbols())));
        let mut metrics = interp.metrics().report();
        metrics.residual_entries = interp.environment().len() as u64;
        if outcome.is_ok() {
            info!(goal, steps = outcome.as_ref().map_or(0, Plan::len), "plan found");
        }
        PlanReport { outcome, metrics }
    }
}

/// Plan `entry` with a fresh `Planner`.
pub fn make_plan(domain: &Domain, world: &WorldState, entry: &str) -> Result<Plan, PlanError> {
    Planner::new(domain, world).make_plan(entry)
}

#[cfg(test)]
#[path = "tests/planner.rs"]
mod tests;
