use std::sync::Arc;

use super::*;
use crate::domain::DomainBuilder;
use crate::symbol::SymbolStore;

fn domain_with(build: impl FnOnce(&mut DomainBuilder) -> Condition) -> Domain {
    let mut b = DomainBuilder::new(Arc::new(SymbolStore::new()));
    let cond = build(&mut b);
    let task = b.task("done", vec![]);
    let branch = b.branch("only", Some(cond), vec![task]);
    b.add_method("m", vec![], vec![branch]);
    b.build().unwrap()
}

fn sym(domain: &Domain, name: &str) -> Value {
    Value::Symbol(domain.symbols().intern(name))
}

fn fact(world: &mut WorldState, domain: &Domain, name: &str, args: &[&str]) {
    let row: Vec<Value> = args.iter().map(|a| sym(domain, a)).collect();
    world.insert(domain.symbols().intern(name), row).unwrap();
}

/// Every solution of the single branch condition, projected onto `vars`.
fn solutions<'d>(
    domain: &'d Domain,
    world: &'d WorldState,
    vars: &[&str],
) -> (Vec<Vec<Value>>, PlanMetrics) {
    let cond = domain.methods()[0].branches[0].condition.as_ref();
    let names: Vec<Sym> = vars.iter().map(|n| domain.symbols().intern(n)).collect();
    let frame = NodePath::task(0);
    let mut solver = Solver::new(domain, world);
    let mut env = Environment::new();
    let mut out = Vec::new();
    solver
        .solve_branch(
            cond,
            &mut env,
            &frame,
            &frame,
            &mut |_: &mut Solver<'d>, env: &mut Environment| -> Result<bool, PlanError> {
                out.push(names.iter().map(|n| env.get_variable(&frame, *n)).collect());
                Ok(false)
            },
        )
        .unwrap();
    assert!(env.is_empty(), "solver leaked environment entries");
    (out, solver.metrics)
}

fn edges(domain: &Domain, pairs: &[(&str, &str)]) -> WorldState {
    let mut world = WorldState::new();
    for (a, b) in pairs {
        fact(&mut world, domain, "edge", &[a, b]);
    }
    world
}

// ========== FACT QUERIES ==========

#[test]
fn rows_are_enumerated_in_insertion_order() {
    let domain = domain_with(|b| b.fact("day", vec![b.var("?d")]));
    let mut world = WorldState::new();
    fact(&mut world, &domain, "day", &["Monday"]);
    fact(&mut world, &domain, "day", &["Tuesday"]);

    let (found, metrics) = solutions(&domain, &world, &["d"]);
    assert_eq!(
        found,
        vec![vec![sym(&domain, "Monday")], vec![sym(&domain, "Tuesday")]]
    );
    assert_eq!(metrics.report().fact_probes, 2);
}

#[test]
fn repeated_variable_must_agree() {
    let domain = domain_with(|b| b.fact("edge", vec![b.var("?x"), b.var("?x")]));
    let world = edges(&domain, &[("a", "b"), ("a", "a")]);
    let (found, _) = solutions(&domain, &world, &["x"]);
    assert_eq!(found, vec![vec![sym(&domain, "a")]]);
}

#[test]
fn unbound_input_variable_fails() {
    let domain = domain_with(|b| b.fact("day", vec![b.var("+d")]));
    let mut world = WorldState::new();
    fact(&mut world, &domain, "day", &["Monday"]);
    let (found, _) = solutions(&domain, &world, &["d"]);
    assert!(found.is_empty());
}

#[test]
fn wildcard_matches_without_binding() {
    let domain = domain_with(|b| b.fact("edge", vec![b.var("_"), b.var("?y")]));
    let world = edges(&domain, &[("a", "b"), ("c", "d")]);
    let (found, _) = solutions(&domain, &world, &["_", "y"]);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|row| !row[0].is_bound()));
    assert_eq!(found[1][1], sym(&domain, "d"));
}

#[test]
fn constant_reference_is_resolved() {
    let domain = domain_with(|b| {
        b.add_constant("Days", "first", Value::string("Monday"));
        b.fact("day", vec![b.constant_ref("Days", "first")])
    });
    let mut world = WorldState::new();
    world
        .insert(domain.symbols().intern("day"), [Value::string("Monday")])
        .unwrap();
    let (found, _) = solutions(&domain, &world, &[]);
    assert_eq!(found.len(), 1);

    let missing = domain_with(|b| b.fact("day", vec![b.constant_ref("Days", "nope")]));
    let (found, _) = solutions(&missing, &world, &[]);
    assert!(found.is_empty());
}

// ========== CONNECTIVES ==========

#[test]
fn conjunction_joins_left_to_right() {
    let domain = domain_with(|b| {
        let first = b.fact("edge", vec![b.var("?x"), b.var("?y")]);
        let second = b.fact("edge", vec![b.var("?y"), b.var("?z")]);
        b.and(vec![first, second])
    });
    let world = edges(&domain, &[("a", "b"), ("a", "c"), ("b", "c")]);
    let (found, _) = solutions(&domain, &world, &["x", "y", "z"]);
    assert_eq!(
        found,
        vec![vec![sym(&domain, "a"), sym(&domain, "b"), sym(&domain, "c")]]
    );
}

#[test]
fn negation_keeps_no_bindings() {
    let domain = domain_with(|b| {
        let day = b.fact("day", vec![b.var("?d")]);
        let holiday = b.fact("holiday", vec![b.var("?d")]);
        let not_holiday = b.not(holiday);
        let other = b.fact("day", vec![b.var("?e")]);
        let negated_other = b.not(other);
        let unbound_not = b.not(negated_other);
        b.and(vec![day, not_holiday, unbound_not])
    });
    let mut world = WorldState::new();
    fact(&mut world, &domain, "day", &["Monday"]);
    fact(&mut world, &domain, "day", &["Tuesday"]);
    fact(&mut world, &domain, "holiday", &["Monday"]);

    let (found, _) = solutions(&domain, &world, &["d", "e"]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0][0], sym(&domain, "Tuesday"));
    assert!(!found[0][1].is_bound(), "negation must not leak bindings");
}

#[test]
fn disjunction_yields_every_alternative_in_order() {
    let domain = domain_with(|b| {
        let day = b.fact("day", vec![b.var("?t")]);
        let night = b.fact("night", vec![b.var("?t")]);
        b.or(vec![day, night])
    });
    let mut world = WorldState::new();
    fact(&mut world, &domain, "night", &["late"]);
    fact(&mut world, &domain, "day", &["noon"]);

    let (found, _) = solutions(&domain, &world, &["t"]);
    assert_eq!(
        found,
        vec![vec![sym(&domain, "noon")], vec![sym(&domain, "late")]]
    );
}

// ========== AXIOMS ==========

#[test]
fn axiom_binds_output_parameters() {
    let domain = domain_with(|b| {
        let body = b.fact("edge", vec![b.var("+a"), b.var("?b")]);
        b.add_axiom("linked", vec![b.var("+a"), b.var("?b")], body);
        b.fact("linked", vec![b.symbol("a"), b.var("?y")])
    });
    let world = edges(&domain, &[("a", "b"), ("x", "y"), ("a", "c")]);
    let (found, metrics) = solutions(&domain, &world, &["y"]);
    assert_eq!(
        found,
        vec![vec![sym(&domain, "b")], vec![sym(&domain, "c")]]
    );
    assert_eq!(metrics.report().axiom_calls, 1);
}

#[test]
fn output_parameter_ignores_caller_value() {
    let domain = domain_with(|b| {
        let body = b.fact("edge", vec![b.var("?a"), b.var("!b")]);
        b.add_axiom("target", vec![b.var("?a"), b.var("!b")], body);
        let pick = b.fact("edge", vec![b.symbol("a"), b.var("?y")]);
        let call = b.fact("target", vec![b.var("?x"), b.var("?y")]);
        b.and(vec![pick, call])
    });
    let world = edges(&domain, &[("a", "b"), ("c", "d")]);
    // ?y is bound to b by the first conjunct; the axiom solves its `!b`
    // freely and only solutions agreeing with b flow back.
    let (found, _) = solutions(&domain, &world, &["x", "y"]);
    assert_eq!(found, vec![vec![sym(&domain, "a"), sym(&domain, "b")]]);
}

#[test]
fn multi_clause_axiom_tries_clauses_in_order() {
    let domain = domain_with(|b| {
        let direct = b.fact("edge", vec![b.var("+a"), b.var("?b")]);
        b.add_axiom("reach", vec![b.var("+a"), b.var("?b")], direct);
        let step = b.fact("edge", vec![b.var("+a"), b.var("?m")]);
        let rest = b.fact("reach", vec![b.var("+m"), b.var("?b")]);
        let body = b.and(vec![step, rest]);
        b.add_axiom("reach", vec![b.var("+a"), b.var("?b")], body);
        b.fact("reach", vec![b.symbol("a"), b.var("?y")])
    });
    let world = edges(&domain, &[("a", "b"), ("b", "c")]);
    let (found, metrics) = solutions(&domain, &world, &["y"]);
    assert_eq!(
        found,
        vec![vec![sym(&domain, "b")], vec![sym(&domain, "c")]]
    );
    assert!(metrics.report().cycles_blocked > 0);
}

#[test]
fn self_recursive_axiom_fails_instead_of_looping() {
    let domain = domain_with(|b| {
        let body = b.fact("forever", vec![b.var("?x")]);
        b.add_axiom("forever", vec![b.var("?x")], body);
        b.fact("forever", vec![b.var("?y")])
    });
    let world = WorldState::new();
    let (found, metrics) = solutions(&domain, &world, &["y"]);
    assert!(found.is_empty());
    assert_eq!(metrics.report().cycles_blocked, 1);
}

#[test]
fn mutually_recursive_axioms_fail_instead_of_looping() {
    let domain = domain_with(|b| {
        let to_bb = b.fact("bb", vec![b.var("?x")]);
        b.add_axiom("aa", vec![b.var("?x")], to_bb);
        let to_aa = b.fact("aa", vec![b.var("?x")]);
        b.add_axiom("bb", vec![b.var("?x")], to_aa);
        b.fact("aa", vec![b.var("?y")])
    });
    let world = WorldState::new();
    let (found, metrics) = solutions(&domain, &world, &["y"]);
    assert!(found.is_empty());
    assert_eq!(metrics.report().cycles_blocked, 1);
}

#[test]
fn literal_parameter_must_match_argument() {
    let domain = domain_with(|b| {
        let body = b.fact("day", vec![b.var("?d")]);
        b.add_axiom("weekday", vec![b.symbol("yes"), b.var("?d")], body);
        b.fact("weekday", vec![b.var("?flag"), b.var("?d")])
    });
    let mut world = WorldState::new();
    fact(&mut world, &domain, "day", &["Monday"]);
    let (found, _) = solutions(&domain, &world, &["flag", "d"]);
    assert_eq!(
        found,
        vec![vec![sym(&domain, "yes"), sym(&domain, "Monday")]]
    );
}

// ========== ENUMERATION CONTROL ==========

#[test]
fn continuation_can_stop_early() {
    let domain = domain_with(|b| b.fact("day", vec![b.var("?d")]));
    let mut world = WorldState::new();
    for d in ["a", "b", "c"] {
        fact(&mut world, &domain, "day", &[d]);
    }
    let cond = domain.methods()[0].branches[0].condition.as_ref();
    let frame = NodePath::task(0);
    let mut solver = Solver::new(&domain, &world);
    let mut env = Environment::new();
    let mut calls = 0;
    let stopped = solver
        .solve_branch(
            cond,
            &mut env,
            &frame,
            &frame,
            &mut |_: &mut Solver<'_>, _: &mut Environment| -> Result<bool, PlanError> {
                calls += 1;
                Ok(calls == 2)
            },
        )
        .unwrap();
    assert!(stopped);
    assert_eq!(calls, 2);
    assert!(env.is_empty());
}

#[test]
fn missing_precondition_has_one_solution() {
    let mut b = DomainBuilder::new(Arc::new(SymbolStore::new()));
    let task = b.task("t", vec![]);
    let branch = b.branch("b", None, vec![task]);
    b.add_method("m", vec![], vec![branch]);
    let domain = b.build().unwrap();
    let world = WorldState::new();
    let (found, _) = solutions(&domain, &world, &[]);
    assert_eq!(found.len(), 1);
}
