//! Search counters for profiling a planning call.
//!
//! A `PlanMetrics` is owned by one planning call and updated from a single
//! thread, so the counters are plain integers. Call `report()` for a
//! snapshot.
//!
//! ```rust,ignore
//! let report = planner.make_plan_with_report("travel");
//! println!("{}", report.metrics);
//! ```

use serde::Serialize;

/// Counters collected while decomposing one goal.
#[derive(Debug, Clone, Default)]
pub struct PlanMetrics {
    steps: u64,
    expansions: u64,
    primitives: u64,
    unresolved_primitives: u64,
    branches_tried: u64,
    branches_failed: u64,
    snapshots: u64,
    restores: u64,
    fact_probes: u64,
    fact_matches: u64,
    axiom_calls: u64,
    cycles_blocked: u64,
    max_pending: u64,
    max_history: u64,
}

impl PlanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One iteration of the decomposition loop.
    #[inline]
    pub fn record_step(&mut self) {
        self.steps += 1;
    }

    /// A compound task was replaced by its method's chosen branch.
    #[inline]
    pub fn record_expansion(&mut self) {
        self.expansions += 1;
    }

    #[inline]
    pub fn record_primitive(&mut self) {
        self.primitives += 1;
    }

    /// A primitive task failed because an argument had no value.
    #[inline]
    pub fn record_unresolved_primitive(&mut self) {
        self.unresolved_primitives += 1;
    }

    #[inline]
    pub fn record_branch(&mut self, succeeded: bool) {
        self.branches_tried += 1;
        if !succeeded {
            self.branches_failed += 1;
        }
    }

    #[inline]
    pub fn record_snapshot(&mut self, depth: usize) {
        self.snapshots += 1;
        self.max_history = self.max_history.max(depth as u64);
    }

    #[inline]
    pub fn record_restore(&mut self) {
        self.restores += 1;
    }

    #[inline]
    pub fn record_fact_probe(&mut self, matched: bool) {
        self.fact_probes += 1;
        if matched {
            self.fact_matches += 1;
        }
    }

    #[inline]
    pub fn record_axiom_call(&mut self) {
        self.axiom_calls += 1;
    }

    #[inline]
    pub fn record_cycle_blocked(&mut self) {
        self.cycles_blocked += 1;
    }

    #[inline]
    pub fn update_max_pending(&mut self, depth: usize) {
        self.max_pending = self.max_pending.max(depth as u64);
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            steps: self.steps,
            expansions: self.expansions,
            primitives: self.primitives,
            unresolved_primitives: self.unresolved_primitives,
            branches_tried: self.branches_tried,
            branches_failed: self.branches_failed,
            snapshots: self.snapshots,
            restores: self.restores,
            fact_probes: self.fact_probes,
            fact_matches: self.fact_matches,
            axiom_calls: self.axiom_calls,
            cycles_blocked: self.cycles_blocked,
            max_pending: self.max_pending,
            max_history: self.max_history,
            residual_entries: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of the counters after a planning call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub steps: u64,
    pub expansions: u64,
    pub primitives: u64,
    pub unresolved_primitives: u64,
    pub branches_tried: u64,
    pub branches_failed: u64,
    pub snapshots: u64,
    pub restores: u64,
    pub fact_probes: u64,
    pub fact_matches: u64,
    pub axiom_calls: u64,
    pub cycles_blocked: u64,
    pub max_pending: u64,
    pub max_history: u64,
    /// Environment entries still alive when the call returned.
    pub residual_entries: u64,
}

impl MetricsReport {
    /// Fraction of fact probes that matched a row.
    pub fn fact_hit_rate(&self) -> f64 {
        if self.fact_probes == 0 {
            1.0
        } else {
            self.fact_matches as f64 / self.fact_probes as f64
        }
    }

    /// Fraction of tried branches whose condition held.
    pub fn branch_success_rate(&self) -> f64 {
        if self.branches_tried == 0 {
            1.0
        } else {
            (self.branches_tried - self.branches_failed) as f64 / self.branches_tried as f64
        }
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Planning Metrics ===")?;
        writeln!(f, "Steps:              {}", self.steps)?;
        writeln!(
            f,
            "Tasks:              {} expanded, {} primitive ({} unresolved)",
            self.expansions, self.primitives, self.unresolved_primitives
        )?;
        writeln!(
            f,
            "Branches:           {} tried, {} failed, {:.1}% success",
            self.branches_tried,
            self.branches_failed,
            self.branch_success_rate() * 100.0
        )?;
        writeln!(
            f,
            "History:            {} snapshots, {} restores, max depth {}",
            self.snapshots, self.restores, self.max_history
        )?;
        writeln!(
            f,
            "Fact probes:        {} ({} matched, {:.1}% hit)",
            self.fact_probes,
            self.fact_matches,
            self.fact_hit_rate() * 100.0
        )?;
        writeln!(
            f,
            "Axiom calls:        {} ({} cycles blocked)",
            self.axiom_calls, self.cycles_blocked
        )?;
        writeln!(f, "Max pending tasks:  {}", self.max_pending)?;
        writeln!(f, "Residual entries:   {}", self.residual_entries)?;
        Ok(())
    }
}
