//! The observable outcome of build-time verification.
//!
//! A report is produced on every finalize, pass or fail, so callers can
//! always render diagnostics. Phases that never ran (because an earlier
//! phase failed) are `None` rather than defaulted booleans; a size-policy
//! failure is distinguishable from a WFC failure without parsing strings.

use std::fmt;

use crate::state::State;

/// Outcome of the Well-Founded Compensation check.
#[derive(Debug, Clone)]
pub enum WfcOutcome {
    /// Every in-domain state reaches a normal form; `max_depth` is the
    /// longest compensation chain observed.
    Pass { max_depth: usize },
    /// Compensation cycles or overruns the depth bound starting from
    /// `state`.
    Fail { state: State },
}

impl WfcOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, WfcOutcome::Pass { .. })
    }
}

/// Pair counts from the Compensation Commutativity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CcSummary {
    /// Pairs selected for checking.
    pub pairs_total: usize,
    /// Pairs discharged by influence-set disjointness, no states visited.
    pub pairs_disjoint: usize,
    /// Pairs verified by exhaustive enumeration.
    pub pairs_brute: usize,
}

/// A specific commutativity violation.
#[derive(Debug, Clone)]
pub struct CcCounterexample {
    pub event1: String,
    pub event2: String,
    /// The valid starting state the orderings diverge from.
    pub state: State,
    /// Result of applying `event1` then `event2`.
    pub result12: State,
    /// Result of applying `event2` then `event1`.
    pub result21: State,
}

/// Outcome of the Compensation Commutativity check.
#[derive(Debug, Clone)]
pub enum CcOutcome {
    Pass(CcSummary),
    Fail {
        /// Counts at the moment the counterexample surfaced.
        summary: CcSummary,
        counterexample: CcCounterexample,
    },
}

impl CcOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CcOutcome::Pass(_))
    }

    pub fn summary(&self) -> CcSummary {
        match self {
            CcOutcome::Pass(s) => *s,
            CcOutcome::Fail { summary, .. } => *summary,
        }
    }
}

/// Results of build-time verification.
#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    pub var_count: usize,
    /// In-domain states (the padded address space may be larger).
    pub state_count: u64,
    pub event_count: usize,
    /// `None` if verification failed before the WFC phase.
    pub wfc: Option<WfcOutcome>,
    /// `None` if verification failed before the CC phase.
    pub cc: Option<CcOutcome>,
}

impl Report {
    /// Did both checks run and pass?
    pub fn converged(&self) -> bool {
        self.wfc.as_ref().is_some_and(|w| w.passed())
            && self.cc.as_ref().is_some_and(|c| c.passed())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Machine: {}", self.name)?;
        writeln!(f, "  Variables: {}", self.var_count)?;
        writeln!(f, "  States: {}", self.state_count)?;
        writeln!(f, "  Events: {}", self.event_count)?;
        writeln!(f)?;

        match &self.wfc {
            Some(WfcOutcome::Pass { max_depth }) => {
                writeln!(f, "  WFC: PASS (max repair depth: {})", max_depth)?;
            }
            Some(WfcOutcome::Fail { state }) => {
                writeln!(f, "  WFC: FAIL (compensation does not terminate from {})", state)?;
            }
            None => writeln!(f, "  WFC: not run")?,
        }

        match &self.cc {
            Some(CcOutcome::Pass(s)) => {
                writeln!(
                    f,
                    "  CC (Compensation Commutativity): PASS ({} pairs: {} disjoint, {} brute-force)",
                    s.pairs_total, s.pairs_disjoint, s.pairs_brute
                )?;
            }
            Some(CcOutcome::Fail { counterexample: cx, .. }) => {
                writeln!(f, "  CC (Compensation Commutativity): FAIL")?;
                writeln!(f, "    Events: ({}, {})", cx.event1, cx.event2)?;
                writeln!(f, "    State:  {}", cx.state)?;
                writeln!(f, "    {}->{}: {}", cx.event1, cx.event2, cx.result12)?;
                writeln!(f, "    {}->{}: {}", cx.event2, cx.event1, cx.result21)?;
            }
            None => writeln!(f, "  CC (Compensation Commutativity): not run")?,
        }

        if self.converged() {
            writeln!(f)?;
            writeln!(f, "  Convergence: GUARANTEED")?;
        }
        Ok(())
    }
}
