//! Precondition search.
//!
//! Conditions are solved in continuation-passing style: every solution of a
//! condition calls the continuation `k` with the environment holding that
//! solution's bindings. The continuation returns `Ok(true)` to stop the
//! enumeration or `Ok(false)` to ask for the next solution, which makes
//! conjunctions backtrack into earlier conjuncts and lets a caller count
//! solutions to resume after a restore. Bindings made for one solution are
//! undone through the environment's trail before the next is tried.
//!
//! Each condition node opens a `NodeScope` whose index is the node's
//! iteration cursor: the fact row, the axiom clause or the disjunct being
//! tried.

use smallvec::SmallVec;

use crate::domain::{Condition, ConditionKind, Domain, Term, VarRole};
use crate::env::{Environment, NodePath, Segment};
use crate::metrics::PlanMetrics;
use crate::planner::PlanError;
use crate::scope::NodeScope;
use crate::symbol::Sym;
use crate::trace::trace;
use crate::value::Value;
use crate::world::{WorldState, MAX_ARITY};

/// Continuation invoked once per solution.
pub type Cont<'a, 'd> =
    dyn FnMut(&mut Solver<'d>, &mut Environment) -> Result<bool, PlanError> + 'a;

type Args = SmallVec<[Value; 4]>;

pub struct Solver<'d> {
    domain: &'d Domain,
    world: &'d WorldState,
    pub(crate) metrics: PlanMetrics,
}

impl<'d> Solver<'d> {
    pub fn new(domain: &'d Domain, world: &'d WorldState) -> Self {
        Self {
            domain,
            world,
            metrics: PlanMetrics::new(),
        }
    }

    pub fn domain(&self) -> &'d Domain {
        self.domain
    }

    /// Enumerate solutions of an optional branch precondition. A missing
    /// precondition has exactly one solution.
    pub fn solve_branch(
        &mut self,
        condition: Option<&'d Condition>,
        env: &mut Environment,
        parent: &NodePath,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        match condition {
            Some(cond) => self.solve(cond, env, parent, frame, k),
            None => k(self, env),
        }
    }

    /// Enumerate solutions of `cond`, entered below `parent`, reading and
    /// binding variables in `frame`.
    pub fn solve(
        &mut self,
        cond: &'d Condition,
        env: &mut Environment,
        parent: &NodePath,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        let Some(mut scope) = NodeScope::enter(env, parent, Segment::Node(cond.id)) else {
            self.metrics.record_cycle_blocked();
            return Ok(false);
        };
        match &cond.kind {
            ConditionKind::Fact { name, args } => {
                self.solve_fact(*name, args, &mut scope, frame, k)
            }
            ConditionKind::Axiom { name, args } => {
                self.solve_axiom(*name, args, &mut scope, frame, k)
            }
            ConditionKind::And(children) => {
                let path = scope.path().clone();
                self.solve_all(children, &mut scope, &path, frame, k)
            }
            ConditionKind::Or(children) => self.solve_any(children, &mut scope, frame, k),
            ConditionKind::Not(child) => {
                let path = scope.path().clone();
                self.solve_not(child, &mut scope, &path, frame, k)
            }
        }
    }

    fn solve_fact(
        &mut self,
        name: Sym,
        args: &'d [Term],
        scope: &mut NodeScope<'_>,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        let arity = args.len();
        if arity > MAX_ARITY {
            return Err(PlanError::ArityOutOfRange {
                fact: self.domain.name(name).to_string(),
                arity,
            });
        }
        let Some(query) = self.read_args(args, scope, frame) else {
            return Ok(false);
        };

        let rows = self.world.num_rows(name, arity);
        while scope.index() < rows {
            let row = scope.index();
            let mut candidate = query.clone();
            let matched = self.world.match_row(name, arity, row, &mut candidate);
            self.metrics.record_fact_probe(matched);
            trace!(fact = self.domain.name(name), row, matched, "fact probe");
            if matched {
                let mark = scope.mark();
                let stop = if bind_terms(args, &candidate, scope, frame) {
                    k(self, &mut **scope)?
                } else {
                    false
                };
                scope.rollback(mark);
                if stop {
                    return Ok(true);
                }
            }
            scope.advance();
        }
        Ok(false)
    }

    fn solve_axiom(
        &mut self,
        name: Sym,
        args: &'d [Term],
        scope: &mut NodeScope<'_>,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        let Some(actuals) = self.read_args(args, scope, frame) else {
            return Ok(false);
        };
        let clauses = self.domain.axiom_clauses(name, args.len());
        let call_path = scope.path().clone();
        self.metrics.record_axiom_call();
        trace!(axiom = self.domain.name(name), clauses = clauses.len(), "axiom call");

        while scope.index() < clauses.len() {
            let axiom = &self.domain.axioms()[clauses[scope.index()]];
            let Some(mut callee) = NodeScope::enter(scope, &call_path, Segment::Node(axiom.id))
            else {
                self.metrics.record_cycle_blocked();
                scope.advance();
                continue;
            };
            let callee_frame = callee.path().clone();
            let params = &axiom.params;
            let stop = if bind_params(self.domain, params, &actuals, &mut callee, &callee_frame) {
                self.solve(
                    &axiom.condition,
                    &mut callee,
                    &callee_frame,
                    &callee_frame,
                    &mut |solver: &mut Solver<'d>,
                          env: &mut Environment|
                          -> Result<bool, PlanError> {
                        let mark = env.mark();
                        let stop = if pass_out(solver.domain, params, args, env, &callee_frame, frame) {
                            k(solver, env)?
                        } else {
                            false
                        };
                        env.rollback(mark);
                        Ok(stop)
                    },
                )?
            } else {
                false
            };
            drop(callee);
            if stop {
                return Ok(true);
            }
            scope.advance();
        }
        Ok(false)
    }

    fn solve_all(
        &mut self,
        children: &'d [Condition],
        env: &mut Environment,
        parent: &NodePath,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        match children.split_first() {
            None => k(self, env),
            Some((first, rest)) => self.solve(
                first,
                env,
                parent,
                frame,
                &mut |solver: &mut Solver<'d>, env: &mut Environment| -> Result<bool, PlanError> {
                    solver.solve_all(rest, env, parent, frame, k)
                },
            ),
        }
    }

    fn solve_any(
        &mut self,
        children: &'d [Condition],
        scope: &mut NodeScope<'_>,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        let path = scope.path().clone();
        while scope.index() < children.len() {
            let child = &children[scope.index()];
            if self.solve(child, scope, &path, frame, k)? {
                return Ok(true);
            }
            scope.advance();
        }
        Ok(false)
    }

    fn solve_not(
        &mut self,
        child: &'d Condition,
        env: &mut Environment,
        parent: &NodePath,
        frame: &NodePath,
        k: &mut Cont<'_, 'd>,
    ) -> Result<bool, PlanError> {
        let mark = env.mark();
        let held = self.solve(
            child,
            env,
            parent,
            frame,
            &mut |_: &mut Solver<'d>, _: &mut Environment| -> Result<bool, PlanError> {
                Ok(true)
            },
        )?;
        env.rollback(mark);
        if held {
            Ok(false)
        } else {
            k(self, env)
        }
    }

    fn read_args(&self, args: &[Term], env: &Environment, frame: &NodePath) -> Option<Args> {
        args.iter()
            .map(|term| read_term(self.domain, term, |name| env.get_variable(frame, name)))
            .collect()
    }
}

/// Evaluate `term` for reading. `None` when an input variable is unbound
/// or a constant reference does not exist; other unbound variables read
/// as `Unbound`.
pub fn read_term(domain: &Domain, term: &Term, lookup: impl FnOnce(Sym) -> Value) -> Option<Value> {
    match term {
        Term::Literal(value) => Some(value.clone()),
        Term::Const { group, name } => domain.constant(*group, *name).cloned(),
        Term::Var(var) => match var.role {
            VarRole::Wildcard => Some(Value::Unbound),
            VarRole::Input => Some(lookup(var.name)).filter(Value::is_bound),
            VarRole::InOut | VarRole::Output => Some(lookup(var.name)),
        },
    }
}

/// Bind `name` to `value` in `frame`, or check agreement when it is bound.
fn unify_var(env: &mut Environment, frame: &NodePath, name: Sym, value: &Value) -> bool {
    let current = env.get_variable(frame, name);
    if current.is_bound() {
        current == *value
    } else {
        env.set_variable(frame, name, value.clone());
        true
    }
}

/// Bind the variables of a matched query to the row values.
fn bind_terms(terms: &[Term], values: &[Value], env: &mut Environment, frame: &NodePath) -> bool {
    terms.iter().zip(values).all(|(term, value)| match term {
        Term::Var(var) if var.role != VarRole::Wildcard => unify_var(env, frame, var.name, value),
        _ => true,
    })
}

/// Bind a method's or axiom's parameters from the caller's argument
/// values into `frame`.
pub fn bind_params(
    domain: &Domain,
    params: &[Term],
    actuals: &[Value],
    env: &mut Environment,
    frame: &NodePath,
) -> bool {
    params.iter().zip(actuals).all(|(param, actual)| match param {
        Term::Literal(_) | Term::Const { .. } => {
            match read_term(domain, param, |_| Value::Unbound) {
                Some(expected) => !actual.is_bound() || expected == *actual,
                None => false,
            }
        }
        Term::Var(var) => match var.role {
            VarRole::Wildcard | VarRole::Output => true,
            VarRole::Input => actual.is_bound() && unify_var(env, frame, var.name, actual),
            VarRole::InOut => !actual.is_bound() || unify_var(env, frame, var.name, actual),
        },
    })
}

/// Copy an axiom's parameter values back into the caller's argument
/// variables after its body succeeded.
fn pass_out(
    domain: &Domain,
    params: &[Term],
    args: &[Term],
    env: &mut Environment,
    callee: &NodePath,
    caller: &NodePath,
) -> bool {
    params.iter().zip(args).all(|(param, arg)| {
        let Term::Var(target) = arg else {
            return true;
        };
        if target.role == VarRole::Wildcard {
            return true;
        }
        let value = match param {
            Term::Var(var) => match var.role {
                VarRole::InOut | VarRole::Output => env.get_variable(callee, var.name),
                VarRole::Input | VarRole::Wildcard => return true,
            },
            _ => match read_term(domain, param, |_| Value::Unbound) {
                Some(value) => value,
                None => return false,
            },
        };
        !value.is_bound() || unify_var(env, caller, target.name, &value)
    })
}

#[cfg(test)]
#[path = "tests/solver.rs"]
mod tests;
