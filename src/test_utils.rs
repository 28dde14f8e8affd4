use std::sync::Arc;

use crate::domain::Domain;
use crate::parser::{parse_domain, parse_world_state};
use crate::planner::{make_plan, PlanError};
use crate::symbol::SymbolStore;
use crate::world::WorldState;

/// Parse a domain into a fresh symbol store.
pub(crate) fn load_domain(text: &str) -> Domain {
    parse_domain(text, Arc::new(SymbolStore::new())).unwrap()
}

/// Parse facts against the domain's symbol store.
pub(crate) fn load_world(domain: &Domain, text: &str) -> WorldState {
    parse_world_state(text, domain.symbols()).unwrap()
}

/// Plan `entry` and render each step as `task(arg, ...)`.
pub(crate) fn plan_lines(
    domain: &Domain,
    world: &WorldState,
    entry: &str,
) -> Result<Vec<String>, PlanError> {
    make_plan(domain, world, entry).map(|plan| plan.lines())
}
