//! Hierarchical task network planning.
//!
//! A [`Domain`] holds methods (alternative decompositions of compound tasks)
//! and axioms (derived predicates). A [`WorldState`] holds ground facts.
//! [`Planner::make_plan`] decomposes a parameterless method into an ordered
//! list of primitive tasks with chronological backtracking.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use htn_plan::{parse_domain, parse_world_state, Planner, SymbolStore};
//!
//! let domain = parse_domain(DOMAIN_TEXT, Arc::new(SymbolStore::new()))?;
//! let world = parse_world_state(FACTS_TEXT, domain.symbols())?;
//! let plan = Planner::new(&domain, &world).make_top_level_plan()?;
//! print!("{}", plan);
//! ```

pub mod context;
pub mod domain;
pub mod env;
pub mod interp;
pub mod metrics;
pub mod parser;
pub mod planner;
pub mod scope;
pub mod solver;
pub mod symbol;
pub mod trace;
pub mod value;
pub mod world;

pub use domain::{Domain, DomainBuilder, DomainError};
pub use metrics::MetricsReport;
pub use parser::{parse_domain, parse_world_state, LoadError, ParseError, ParseErrorKind};
pub use planner::{make_plan, Plan, PlanError, PlanReport, PlanStep, Planner};
pub use symbol::{Sym, SymbolStore};
pub use value::Value;
pub use world::{WorldError, WorldState};

pub(crate) type FxHashMap<K, V> =
    hashbrown::HashMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

#[cfg(test)]
pub(crate) mod test_utils;
