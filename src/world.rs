//! World state: an append-only, multi-valued fact store.
//!
//! Each fact id owns one table per arity (0..=MAX_ARITY). A table is an
//! ordered sequence of argument rows; repeated inserts produce repeated
//! rows, so `day(Monday)` and `day(Tuesday)` coexist as two rows of the
//! arity-1 table for `day`. Rows are matched in insertion order.

use smallvec::SmallVec;
use thiserror::Error;

use crate::symbol::Sym;
use crate::value::Value;
use crate::FxHashMap;

/// Largest arity a fact may have.
pub const MAX_ARITY: usize = 10;

/// One stored argument row.
pub type Row = SmallVec<[Value; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("fact arity {arity} is outside 0..={max}")]
    ArityOutOfRange { arity: usize, max: usize },
    #[error("fact argument {position} is not a ground value")]
    UnboundArgument { position: usize },
}

/// Per-arity row tables for a single fact id.
#[derive(Debug, Clone, Default)]
struct FactTables {
    tables: [Vec<Row>; MAX_ARITY + 1],
}

/// The world state store.
///
/// Read-only from the planner's point of view: `match_row` never mutates
/// the store, only the caller's argument buffer.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    facts: FxHashMap<Sym, FactTables>,
    rows: usize,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `args` as a new row in the table of `fact` at arity
    /// `args.len()`. No uniqueness check is made.
    pub fn insert(
        &mut self,
        fact: Sym,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<(), WorldError> {
        let row: Row = args.into_iter().collect();
        if row.len() > MAX_ARITY {
            return Err(WorldError::ArityOutOfRange {
                arity: row.len(),
                max: MAX_ARITY,
            });
        }
        if let Some(position) = row.iter().position(|v| !v.is_ground()) {
            return Err(WorldError::UnboundArgument { position });
        }
        let arity = row.len();
        self.facts.entry(fact).or_default().tables[arity].push(row);
        self.rows += 1;
        Ok(())
    }

    /// Match row `row` of the `arity` table for `fact` against `args`.
    ///
    /// Every bound position of `args` must equal the stored value; every
    /// unbound position receives the stored value. Returns false, leaving
    /// `args` untouched, when the table or row does not exist, when
    /// `args.len() != arity`, or when any bound position differs.
    pub fn match_row(&self, fact: Sym, arity: usize, row: usize, args: &mut [Value]) -> bool {
        if arity > MAX_ARITY || args.len() != arity {
            return false;
        }
        let Some(stored) = self
            .facts
            .get(&fact)
            .and_then(|tables| tables.tables[arity].get(row))
        else {
            return false;
        };

        let consistent = args
            .iter()
            .zip(stored.iter())
            .all(|(query, value)| !query.is_bound() || query == value);
        if !consistent {
            return false;
        }

        for (query, value) in args.iter_mut().zip(stored.iter()) {
            if !query.is_bound() {
                *query = value.clone();
            }
        }
        true
    }

    /// Number of arity tables of `fact` holding at least one row.
    ///
    /// Arity-0 facts are presence-only and deliberately not counted here:
    /// a fact asserted only as `threat` reports zero tables.
    pub fn num_fact_tables(&self, fact: Sym) -> usize {
        self.facts.get(&fact).map_or(0, |tables| {
            tables.tables[1..].iter().filter(|t| !t.is_empty()).count()
        })
    }

    /// Number of rows stored for `fact` at `arity`.
    pub fn num_rows(&self, fact: Sym, arity: usize) -> usize {
        if arity > MAX_ARITY {
            return 0;
        }
        self.facts
            .get(&fact)
            .map_or(0, |tables| tables.tables[arity].len())
    }

    /// The rows stored for `fact` at `arity`, in insertion order.
    pub fn rows(&self, fact: Sym, arity: usize) -> &[Row] {
        if arity > MAX_ARITY {
            return &[];
        }
        match self.facts.get(&fact) {
            Some(tables) => &tables.tables[arity],
            None => &[],
        }
    }

    /// Total number of rows across all facts and arities.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Fact ids that have at least one row at any arity.
    pub fn fact_ids(&self) -> impl Iterator<Item = Sym> + '_ {
        self.facts.keys().copied()
    }
}

#[cfg(test)]
#[path = "tests/world.rs"]
mod tests;
