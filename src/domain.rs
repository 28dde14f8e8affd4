//! Domain AST: constants, axioms and methods.
//!
//! The tree is strictly owned top-down. Nodes that open a scope during
//! planning (methods, branches, axioms, conditions) carry a `NodeId`, which
//! the interpreter appends to the active path instead of holding references
//! back into the tree. A `Domain` is immutable once built and can be shared
//! between threads.

use std::sync::Arc;

use smallvec::SmallVec;
use thiserror::Error;

use crate::symbol::{Sym, SymbolStore};
use crate::value::Value;
use crate::world::MAX_ARITY;
use crate::FxHashMap;

/// Identity of a scope-opening AST node, unique within one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(raw: u32) -> Self {
        NodeId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Binding role of a variable, selected by its prefix in domain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarRole {
    /// `+x`: must already be bound when read.
    Input,
    /// `!x`: as a parameter, starts unbound and only flows out.
    Output,
    /// `?x`: binds when unbound, constrains when bound.
    InOut,
    /// `_`: matches anything, never binds.
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var {
    pub name: Sym,
    pub role: VarRole,
}

/// A parameter or argument expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Literal(Value),
    Var(Var),
    /// Reference to `group.name` in a `constants` block.
    Const { group: Sym, name: Sym },
}

impl Term {
    pub fn as_var(&self) -> Option<Var> {
        match self {
            Term::Var(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Value> for Term {
    fn from(v: Value) -> Self {
        Term::Literal(v)
    }
}

/// A task invocation inside a branch. Compound when a method with the same
/// id and arity exists, primitive otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCall {
    pub name: Sym,
    pub args: Vec<Term>,
}

impl TaskCall {
    pub fn new(name: Sym, args: Vec<Term>) -> Self {
        Self { name, args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    /// Direct world-state query.
    Fact { name: Sym, args: Vec<Term> },
    /// Call to an axiom with matching id and arity.
    Axiom { name: Sym, args: Vec<Term> },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub id: NodeId,
    pub kind: ConditionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: NodeId,
    pub name: Sym,
    pub condition: Option<Condition>,
    pub tasks: Vec<TaskCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub id: NodeId,
    pub name: Sym,
    pub params: Vec<Term>,
    pub branches: Vec<Branch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axiom {
    pub id: NodeId,
    pub name: Sym,
    pub params: Vec<Term>,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("method `{name}/{arity}` is defined more than once")]
    DuplicateMethod { name: String, arity: usize },
    #[error("method `{0}` has no branches")]
    EmptyMethod(String),
    #[error("branch `{branch}` of method `{method}` has no tasks")]
    EmptyBranch { method: String, branch: String },
    #[error("fact query `{name}` has arity {arity}, at most {max} is supported")]
    FactArity {
        name: String,
        arity: usize,
        max: usize,
    },
    #[error("constant `{group}.{name}` is defined more than once")]
    DuplicateConstant { group: String, name: String },
    #[error("top-level method `{0}` with no parameters is not defined")]
    UnknownTopLevel(String),
    #[error("more than one method is marked top-level")]
    MultipleTopLevel,
}

/// A validated, immutable planning domain.
#[derive(Debug)]
pub struct Domain {
    symbols: Arc<SymbolStore>,
    constants: FxHashMap<(Sym, Sym), Value>,
    axioms: Vec<Axiom>,
    methods: Vec<Method>,
    method_index: FxHashMap<(Sym, usize), usize>,
    axiom_index: FxHashMap<(Sym, usize), SmallVec<[usize; 2]>>,
    top_level: Option<usize>,
}

impl Domain {
    pub fn symbols(&self) -> &Arc<SymbolStore> {
        &self.symbols
    }

    /// Display name of an interned id.
    pub fn name(&self, id: Sym) -> &str {
        self.symbols.name(id)
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    /// The method decomposing `name` with `arity` parameters, if any.
    pub fn method(&self, name: Sym, arity: usize) -> Option<&Method> {
        self.method_index
            .get(&(name, arity))
            .map(|&idx| &self.methods[idx])
    }

    /// Indices into `axioms()` of every clause for `name/arity`, in
    /// declaration order.
    pub fn axiom_clauses(&self, name: Sym, arity: usize) -> &[usize] {
        self.axiom_index
            .get(&(name, arity))
            .map_or(&[][..], |clauses| clauses.as_slice())
    }

    pub fn constant(&self, group: Sym, name: Sym) -> Option<&Value> {
        self.constants.get(&(group, name))
    }

    /// The method marked as the domain's top-level entry point.
    pub fn top_level(&self) -> Option<&Method> {
        self.top_level.map(|idx| &self.methods[idx])
    }
}

/// Incremental construction of a `Domain`.
///
/// Node ids are assigned as nodes are created. `build` resolves condition
/// calls to axiom calls where an axiom of the same id and arity exists and
/// validates the structural rules of the domain grammar.
pub struct DomainBuilder {
    symbols: Arc<SymbolStore>,
    next_node: u32,
    constants: Vec<(Sym, Sym, Value)>,
    axioms: Vec<Axiom>,
    methods: Vec<Method>,
    top_level: Vec<Sym>,
}

impl DomainBuilder {
    pub fn new(symbols: Arc<SymbolStore>) -> Self {
        Self {
            symbols,
            next_node: 0,
            constants: Vec::new(),
            axioms: Vec::new(),
            methods: Vec::new(),
            top_level: Vec::new(),
        }
    }

    pub fn symbols(&self) -> &Arc<SymbolStore> {
        &self.symbols
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    /// A variable term from its prefixed spelling: `?x`, `+x`, `!x`, `_`.
    /// An unprefixed name is an input-output variable.
    pub fn var(&self, text: &str) -> Term {
        let (role, name) = match text.chars().next() {
            Some('?') => (VarRole::InOut, &text[1..]),
            Some('+') => (VarRole::Input, &text[1..]),
            Some('!') => (VarRole::Output, &text[1..]),
            Some('_') => (VarRole::Wildcard, text),
            _ => (VarRole::InOut, text),
        };
        Term::Var(Var {
            name: self.symbols.intern(name),
            role,
        })
    }

    /// A symbol literal term.
    pub fn symbol(&self, name: &str) -> Term {
        Term::Literal(Value::Symbol(self.symbols.intern(name)))
    }

    pub fn constant_ref(&self, group: &str, name: &str) -> Term {
        Term::Const {
            group: self.symbols.intern(group),
            name: self.symbols.intern(name),
        }
    }

    /// A condition call. It becomes an axiom call at `build` time when an
    /// axiom with this id and arity exists.
    pub fn fact(&mut self, name: &str, args: Vec<Term>) -> Condition {
        let name = self.symbols.intern(name);
        Condition {
            id: self.next_id(),
            kind: ConditionKind::Fact { name, args },
        }
    }

    pub fn and(&mut self, conditions: Vec<Condition>) -> Condition {
        Condition {
            id: self.next_id(),
            kind: ConditionKind::And(conditions),
        }
    }

    pub fn or(&mut self, conditions: Vec<Condition>) -> Condition {
        Condition {
            id: self.next_id(),
            kind: ConditionKind::Or(conditions),
        }
    }

    pub fn not(&mut self, condition: Condition) -> Condition {
        Condition {
            id: self.next_id(),
            kind: ConditionKind::Not(Box::new(condition)),
        }
    }

    pub fn task(&self, name: &str, args: Vec<Term>) -> TaskCall {
        TaskCall::new(self.symbols.intern(name), args)
    }

    pub fn branch(
        &mut self,
        name: &str,
        condition: Option<Condition>,
        tasks: Vec<TaskCall>,
    ) -> Branch {
        Branch {
            id: self.next_id(),
            name: self.symbols.intern(name),
            condition,
            tasks,
        }
    }

    pub fn add_method(&mut self, name: &str, params: Vec<Term>, branches: Vec<Branch>) -> &mut Self {
        let method = Method {
            id: self.next_id(),
            name: self.symbols.intern(name),
            params,
            branches,
        };
        self.methods.push(method);
        self
    }

    /// Add a method and mark it as the top-level entry point.
    pub fn add_top_level_method(
        &mut self,
        name: &str,
        params: Vec<Term>,
        branches: Vec<Branch>,
    ) -> &mut Self {
        self.top_level.push(self.symbols.intern(name));
        self.add_method(name, params, branches)
    }

    pub fn add_axiom(&mut self, name: &str, params: Vec<Term>, condition: Condition) -> &mut Self {
        let axiom = Axiom {
            id: self.next_id(),
            name: self.symbols.intern(name),
            params,
            condition,
        };
        self.axioms.push(axiom);
        self
    }

    pub fn add_constant(&mut self, group: &str, name: &str, value: Value) -> &mut Self {
        let group = self.symbols.intern(group);
        let name = self.symbols.intern(name);
        self.constants.push((group, name, value));
        self
    }

    pub fn build(self) -> Result<Domain, DomainError> {
        let DomainBuilder {
            symbols,
            constants: constant_list,
            mut axioms,
            mut methods,
            top_level: top_marks,
            ..
        } = self;
        let name = |id: Sym| symbols.name(id).to_string();

        let mut constants = FxHashMap::default();
        for (group, cname, value) in constant_list {
            if constants.insert((group, cname), value).is_some() {
                return Err(DomainError::DuplicateConstant {
                    group: name(group),
                    name: name(cname),
                });
            }
        }

        let mut axiom_index: FxHashMap<(Sym, usize), SmallVec<[usize; 2]>> =
            FxHashMap::default();
        for (idx, axiom) in axioms.iter().enumerate() {
            axiom_index
                .entry((axiom.name, axiom.params.len()))
                .or_default()
                .push(idx);
        }

        for axiom in &mut axioms {
            resolve_calls(&mut axiom.condition, &axiom_index, &symbols)?;
        }

        let mut method_index = FxHashMap::default();
        for (idx, method) in methods.iter_mut().enumerate() {
            let key = (method.name, method.params.len());
            if method_index.insert(key, idx).is_some() {
                return Err(DomainError::DuplicateMethod {
                    name: name(method.name),
                    arity: method.params.len(),
                });
            }
            if method.branches.is_empty() {
                return Err(DomainError::EmptyMethod(name(method.name)));
            }
            for branch in &mut method.branches {
                if branch.tasks.is_empty() {
                    return Err(DomainError::EmptyBranch {
                        method: name(method.name),
                        branch: name(branch.name),
                    });
                }
                if let Some(condition) = &mut branch.condition {
                    resolve_calls(condition, &axiom_index, &symbols)?;
                }
            }
        }

        let top_level = match top_marks.as_slice() {
            [] => None,
            [mark] => match method_index.get(&(*mark, 0)) {
                Some(&idx) => Some(idx),
                None => return Err(DomainError::UnknownTopLevel(name(*mark))),
            },
            _ => return Err(DomainError::MultipleTopLevel),
        };

        Ok(Domain {
            symbols,
            constants,
            axioms,
            methods,
            method_index,
            axiom_index,
            top_level,
        })
    }
}

/// Turn fact queries that name an axiom into axiom calls and check the
/// arity of the remaining fact queries.
fn resolve_calls(
    condition: &mut Condition,
    axioms: &FxHashMap<(Sym, usize), SmallVec<[usize; 2]>>,
    symbols: &SymbolStore,
) -> Result<(), DomainError> {
    match &mut condition.kind {
        ConditionKind::Fact { name, args } => {
            if axioms.contains_key(&(*name, args.len())) {
                let name = *name;
                let args = std::mem::take(args);
                condition.kind = ConditionKind::Axiom { name, args };
            } else if args.len() > MAX_ARITY {
                return Err(DomainError::FactArity {
                    name: symbols.name(*name).to_string(),
                    arity: args.len(),
                    max: MAX_ARITY,
                });
            }
        }
        ConditionKind::Axiom { .. } => {}
        ConditionKind::And(children) | ConditionKind::Or(children) => {
            for child in children {
                resolve_calls(child, axioms, symbols)?;
            }
        }
        ConditionKind::Not(child) => resolve_calls(child, axioms, symbols)?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/domain.rs"]
mod tests;
