use super::*;
use crate::domain::ConditionKind;
use crate::test_utils::{load_domain as load, load_world, plan_lines};
use crate::value::format_value;

fn load_err(text: &str) -> LoadError {
    parse_domain(text, Arc::new(SymbolStore::new())).unwrap_err()
}

fn parse_err(text: &str) -> ParseError {
    match load_err(text) {
        LoadError::Parse(err) => err,
        other => panic!("expected a parse error, got {:?}", other),
    }
}

const TRAVEL: &str = r#"
# Walk when close, otherwise take a taxi.
constants Limits {
    walkable = 3;
}

axiom near(+from, +to) { distance(+from, +to, ?d), below(?d, Limits.walkable) }

top method travel() {
    walk: at(?here), near(?here, park) => walkTo(?here, park);
    taxi: => callTaxi(), pay("cash", 12.5);
}
"#;

// ========================================================================
// DOMAIN PARSING TESTS
// ========================================================================

#[test]
fn parses_methods_branches_and_tasks() {
    let domain = load(TRAVEL);
    assert_eq!(domain.methods().len(), 1);
    let travel = &domain.methods()[0];
    assert_eq!(domain.name(travel.name), "travel");
    assert_eq!(travel.branches.len(), 2);
    assert_eq!(domain.name(travel.branches[0].name), "walk");
    assert!(travel.branches[1].condition.is_none());
    assert_eq!(travel.branches[1].tasks.len(), 2);
    assert_eq!(
        domain.top_level().map(|m| m.name),
        Some(travel.name),
        "`top method` marks the entry point"
    );
}

#[test]
fn comma_separated_conditions_form_a_conjunction() {
    let domain = load(TRAVEL);
    let walk = &domain.methods()[0].branches[0];
    match walk.condition.as_ref().map(|c| &c.kind) {
        Some(ConditionKind::And(items)) => {
            assert_eq!(items.len(), 2);
            assert!(matches!(items[0].kind, ConditionKind::Fact { .. }));
            assert!(
                matches!(items[1].kind, ConditionKind::Axiom { .. }),
                "`near/2` names an axiom"
            );
        }
        other => panic!("expected a conjunction, got {:?}", other),
    }
}

#[test]
fn parses_connectives() {
    let domain = load(
        "method m() { b: or(p, and(q, r)), not(s(1)) => t(); }",
    );
    let branch = &domain.methods()[0].branches[0];
    let Some(ConditionKind::And(items)) = branch.condition.as_ref().map(|c| &c.kind) else {
        panic!("expected a conjunction");
    };
    match &items[0].kind {
        ConditionKind::Or(alts) => {
            assert_eq!(alts.len(), 2);
            assert!(matches!(&alts[1].kind, ConditionKind::And(inner) if inner.len() == 2));
        }
        other => panic!("expected a disjunction, got {:?}", other),
    }
    assert!(matches!(items[1].kind, ConditionKind::Not(_)));
}

#[test]
fn empty_connectives_are_allowed() {
    let domain = load("method m() { b: and() => t(); c: or() => u(); }");
    let branches = &domain.methods()[0].branches;
    assert!(
        matches!(branches[0].condition.as_ref().map(|c| &c.kind), Some(ConditionKind::And(v)) if v.is_empty())
    );
    assert!(
        matches!(branches[1].condition.as_ref().map(|c| &c.kind), Some(ConditionKind::Or(v)) if v.is_empty())
    );
}

#[test]
fn parses_variable_roles() {
    let domain = load("method m(+a, !b, ?c, _, _skip) { x: => t(); }");
    let roles: Vec<_> = domain.methods()[0]
        .params
        .iter()
        .map(|p| p.as_var().map(|v| v.role))
        .collect();
    assert_eq!(
        roles,
        vec![
            Some(VarRole::Input),
            Some(VarRole::Output),
            Some(VarRole::InOut),
            Some(VarRole::Wildcard),
            Some(VarRole::Wildcard),
        ]
    );
}

#[test]
fn parses_literals() {
    let domain = load(r#"method m() { x: => t(3, -2.5, "a\"b\n", true, false, home, [1, [two], "3"]); }"#);
    let symbols = domain.symbols();
    let task = &domain.methods()[0].branches[0].tasks[0];
    let literals: Vec<String> = task
        .args
        .iter()
        .map(|term| match term {
            Term::Literal(v) => format_value(v, symbols),
            other => panic!("expected a literal, got {:?}", other),
        })
        .collect();
    assert_eq!(
        literals,
        vec!["3", "-2.5", "\"a\\\"b\\n\"", "true", "false", "home", "[1, [two], \"3\"]"]
    );
}

#[test]
fn parses_constant_references() {
    let domain = load(TRAVEL);
    let limits = domain.symbols().intern("Limits");
    let walkable = domain.symbols().intern("walkable");
    assert_eq!(domain.constant(limits, walkable), Some(&Value::Number(3.0)));
}

#[test]
fn bare_fact_names_are_zero_arity() {
    let domain = load("method m() { x: raining, not(sunny()) => t(); }");
    let Some(ConditionKind::And(items)) = domain.methods()[0].branches[0]
        .condition
        .as_ref()
        .map(|c| &c.kind)
    else {
        panic!("expected a conjunction");
    };
    assert!(matches!(&items[0].kind, ConditionKind::Fact { args, .. } if args.is_empty()));
}

#[test]
fn axioms_accumulate_clauses_in_order() {
    let domain = load(
        "axiom link(?a, ?b) { edge(?a, ?b) }\naxiom link(?a, ?b) { edge(?b, ?a) }\nmethod m() { x: => t(); }",
    );
    let link = domain.symbols().intern("link");
    assert_eq!(domain.axiom_clauses(link, 2).len(), 2);
}

#[test]
fn comments_and_semicolons_are_optional() {
    let domain = load(
        "# leading\nmethod m() { # after brace\n  a: p => t() # no semicolon\n  b: => u();\n}\n",
    );
    assert_eq!(domain.methods()[0].branches.len(), 2);
}

#[test]
fn parsed_domain_plans() {
    let domain = load(TRAVEL);
    let near = load_world(&domain, "at(home)\ndistance(home, park, 2)\nbelow(2, 3)\n");
    assert_eq!(
        plan_lines(&domain, &near, "travel").unwrap(),
        vec!["walkTo(home, park)"]
    );

    let far = load_world(&domain, "at(home)\ndistance(home, park, 9)\n");
    assert_eq!(
        plan_lines(&domain, &far, "travel").unwrap(),
        vec!["callTaxi()", "pay(\"cash\", 12.5)"]
    );
}

// ========================================================================
// DOMAIN ERROR TESTS
// ========================================================================

#[test]
fn unterminated_string_is_lexical() {
    let err = parse_err("method m() {\n  x: => say(\"hi);\n}");
    assert_eq!(err.kind, ParseErrorKind::Lexical);
    assert_eq!((err.line, err.column), (2, 13));
    assert_eq!(err.to_string(), "2:13: lexical error: unterminated string literal");
}

#[test]
fn stray_characters_are_lexical() {
    let err = parse_err("method m() { x: => t(@); }");
    assert_eq!(err.kind, ParseErrorKind::Lexical);
    assert_eq!(err.message, "unexpected character `@`");

    let err = parse_err("method m(+) { x: => t(); }");
    assert_eq!(err.kind, ParseErrorKind::Lexical);
    assert_eq!((err.line, err.column), (1, 10));

    let err = parse_err("method m() { x: => t(\"\\q\"); }");
    assert_eq!(err.kind, ParseErrorKind::Lexical);
}

#[test]
fn missing_paren_is_syntax() {
    let err = parse_err("method m() {\n  x: p(?a => t();\n}");
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.line, 2);
    assert_eq!(err.message, "expected `)`, found `=>`");
}

#[test]
fn unknown_declaration_is_syntax() {
    let err = parse_err("procedure m() {}");
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!((err.line, err.column), (1, 1));
}

#[test]
fn truncated_input_reports_end() {
    let err = parse_err("method m() { x: => t()");
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert!(err.message.ends_with("found end of input"), "{}", err.message);
}

#[test]
fn wildcard_is_not_a_constant_value() {
    let err = parse_err("constants C { a = _; }");
    assert_eq!(err.message, "wildcard `_` is not a literal");
}

#[test]
fn domain_validation_errors_pass_through() {
    let err = load_err("method m() { x: => t(); }\nmethod m() { y: => u(); }");
    assert_eq!(
        err,
        LoadError::Domain(DomainError::DuplicateMethod {
            name: "m".into(),
            arity: 0
        })
    );
    assert!(matches!(load_err("method m() { }"), LoadError::Domain(DomainError::EmptyMethod(_))));
}

// ========================================================================
// WORLD STATE TESTS
// ========================================================================

#[test]
fn parses_world_rows_in_order() {
    let symbols = SymbolStore::new();
    let world = parse_world_state(
        "# days\nday(Monday);\nday(Tuesday)\nraining\nsunny();\nprice(\"tea\", 2.5, [a, 1])\n",
        &symbols,
    )
    .unwrap();
    let day = symbols.intern("day");
    let rows: Vec<String> = world
        .rows(day, 1)
        .iter()
        .map(|row| format_value(&row[0], &symbols))
        .collect();
    assert_eq!(rows, vec!["Monday", "Tuesday"]);
    assert_eq!(world.rows(symbols.intern("raining"), 0).len(), 1);
    assert_eq!(world.rows(symbols.intern("sunny"), 0).len(), 1);
    assert_eq!(world.len(), 5);
}

#[test]
fn world_rejects_variables() {
    let err = parse_world_state("at(?x)", &SymbolStore::new()).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!((err.line, err.column), (1, 4));
    assert_eq!(err.message, "expected a literal, found `?x`");
}

#[test]
fn world_rejects_wide_facts_with_position() {
    let err = parse_world_state("ok(1)\nwide(1,2,3,4,5,6,7,8,9,10,11)", &SymbolStore::new())
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!((err.line, err.column), (2, 1));
    assert!(err.message.starts_with("fact `wide`"), "{}", err.message);
}

#[test]
fn empty_world_text_is_empty_world() {
    let world = parse_world_state("  # nothing here\n", &SymbolStore::new()).unwrap();
    assert!(world.is_empty());
}
