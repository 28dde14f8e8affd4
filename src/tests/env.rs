use super::*;
use crate::symbol::SymbolStore;

fn node(raw: u32) -> Segment {
    Segment::Node(NodeId::new(raw))
}

// ========== PATHS ==========

#[test]
fn child_extends_and_prefixes() {
    let root = NodePath::task(0);
    let method = root.child(node(1));
    let branch = method.child(node(2));

    assert_eq!(branch.len(), 3);
    assert!(branch.starts_with(&method));
    assert!(branch.starts_with(&root));
    assert!(!method.starts_with(&branch));
    assert!(branch.contains(node(1)));
    assert!(!branch.contains(node(3)));
    assert!(!NodePath::task(1).starts_with(&root));
}

// ========== VARIABLES ==========

#[test]
fn unset_variable_is_unbound() {
    let symbols = SymbolStore::new();
    let env = Environment::new();
    let v = env.get_variable(&NodePath::task(0), symbols.intern("x"));
    assert!(!v.is_bound());
}

#[test]
fn frames_are_separate_namespaces() {
    let symbols = SymbolStore::new();
    let x = symbols.intern("x");
    let a = NodePath::task(0).child(node(1));
    let b = NodePath::task(1).child(node(1));

    let mut env = Environment::new();
    env.set_variable(&a, x, Value::from(1));
    assert_eq!(env.get_variable(&a, x), Value::from(1));
    assert!(!env.get_variable(&b, x).is_bound());
}

#[test]
fn rollback_restores_previous_bindings() {
    let symbols = SymbolStore::new();
    let x = symbols.intern("x");
    let y = symbols.intern("y");
    let frame = NodePath::task(0);

    let mut env = Environment::new();
    env.set_variable(&frame, x, Value::from(1));
    let mark = env.mark();
    env.set_variable(&frame, x, Value::from(2));
    env.set_variable(&frame, y, Value::from(3));
    assert_eq!(env.get_variable(&frame, x), Value::from(2));

    env.rollback(mark);
    assert_eq!(env.get_variable(&frame, x), Value::from(1));
    assert!(!env.get_variable(&frame, y).is_bound());

    env.rollback(Mark(0));
    assert!(env.is_empty());
}

#[test]
fn remove_variables_drops_nested_frames() {
    let symbols = SymbolStore::new();
    let x = symbols.intern("x");
    let outer = NodePath::task(0).child(node(1));
    let inner = outer.child(node(2));
    let sibling = NodePath::task(0).child(node(3));

    let mut env = Environment::new();
    env.set_variable(&outer, x, Value::from(1));
    env.set_variable(&inner, x, Value::from(2));
    env.set_variable(&sibling, x, Value::from(3));

    env.remove_variables(&outer);
    assert!(!env.get_variable(&outer, x).is_bound());
    assert!(!env.get_variable(&inner, x).is_bound());
    assert_eq!(env.get_variable(&sibling, x), Value::from(3));
    assert_eq!(env.num_frames(), 1);
}

#[test]
fn capture_copies_a_frame() {
    let symbols = SymbolStore::new();
    let x = symbols.intern("x");
    let y = symbols.intern("y");
    let frame = NodePath::task(4);

    let mut env = Environment::new();
    env.set_variable(&frame, x, Value::from("here"));
    let captured = env.capture(&frame);
    env.rollback(Mark(0));

    assert_eq!(captured.get(x), Value::from("here"));
    assert!(!captured.get(y).is_bound());
    assert_eq!(captured.len(), 1);
}

// ========== INDICES ==========

#[test]
fn index_defaults_to_zero_and_is_removable() {
    let path = NodePath::task(0).child(node(7));
    let mut env = Environment::new();
    assert_eq!(env.get_index(&path), 0);
    env.set_index(&path, 3);
    assert_eq!(env.get_index(&path), 3);
    env.remove_index(&path);
    assert_eq!(env.get_index(&path), 0);
    assert!(env.is_empty());
}

#[test]
fn advance_index_starts_from_zero() {
    let path = NodePath::task(0).child(node(7));
    let other = NodePath::task(1).child(node(7));
    let mut env = Environment::new();
    env.advance_index(&path);
    env.advance_index(&path);
    assert_eq!(env.get_index(&path), 2);
    assert_eq!(env.get_index(&other), 0, "cursors are per path");
}
