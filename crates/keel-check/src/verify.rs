//! The verification pipeline: from declarations to a proven artifact.
//!
//! Phases run in dependency order, each reading only tables the previous
//! phase finished writing:
//!
//! 1. Declaration validation (lazily recorded errors, pair resolution)
//! 2. Size policy (packed width and in-domain state count ceilings)
//! 3. Validity mask over the padded address space
//! 4. Normal-form fixpoint (Well-Founded Compensation)
//! 5. Step tables (effect fused with normalization)
//! 6. Compensation Commutativity (disjointness discharge, then brute force)
//!
//! Any failure aborts the pipeline; there is no partial artifact. The
//! report is produced on both paths, reflecting exactly the phases that
//! ran.

use std::sync::Arc;

use tracing::{debug, info};

use keel_core::rules::PairPolicy;
use keel_core::{BuildError, CcOutcome, Report, WfcOutcome, MAX_STATE_BITS, MAX_STATE_SPACE};

use crate::artifact::{Machine, VerificationStamp};
use crate::builder::MachineBuilder;
use crate::{commutativity, footprint, normal_form, step};

/// Outcome of [`MachineBuilder::build`]: the artifact plus its report, or
/// the failure plus the report of the phases that ran.
#[derive(Debug)]
pub enum BuildResult {
    Verified { machine: Machine, report: Report },
    Failed { error: BuildError, report: Report },
}

impl BuildResult {
    /// The verification report, available on both paths.
    pub fn report(&self) -> &Report {
        match self {
            BuildResult::Verified { report, .. } => report,
            BuildResult::Failed { report, .. } => report,
        }
    }

    /// The artifact, if verification succeeded.
    pub fn machine(&self) -> Option<&Machine> {
        match self {
            BuildResult::Verified { machine, .. } => Some(machine),
            BuildResult::Failed { .. } => None,
        }
    }

    /// The failure, if verification did not succeed.
    pub fn error(&self) -> Option<&BuildError> {
        match self {
            BuildResult::Verified { .. } => None,
            BuildResult::Failed { error, .. } => Some(error),
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, BuildResult::Verified { .. })
    }

    /// Discard the report and keep the artifact or the error.
    pub fn into_machine(self) -> Result<Machine, BuildError> {
        match self {
            BuildResult::Verified { machine, .. } => Ok(machine),
            BuildResult::Failed { error, .. } => Err(error),
        }
    }

    pub fn into_report(self) -> Report {
        match self {
            BuildResult::Verified { report, .. } => report,
            BuildResult::Failed { report, .. } => report,
        }
    }
}

pub(crate) fn run(builder: MachineBuilder) -> BuildResult {
    let MachineBuilder {
        name,
        layout,
        invariants,
        events,
        declared_pairs,
        all_pairs,
        mut decl_errors,
    } = builder;

    let mut report = Report {
        name: name.clone(),
        var_count: layout.var_count(),
        state_count: layout.domain_len(),
        event_count: events.len(),
        wfc: None,
        cc: None,
    };

    // Phase 1: declarations. Layout-level errors come first, then the
    // builder's own, then independence pairs resolved against event names.
    let mut all_decl_errors: Vec<String> = layout.declaration_errors().to_vec();
    all_decl_errors.append(&mut decl_errors);

    let event_index = |event_name: &str| {
        events
            .iter()
            .position(|ev| ev.name.as_ref() == event_name)
            .map(|i| i as u16)
    };
    let mut resolved_pairs = Vec::with_capacity(declared_pairs.len());
    for (a, b) in &declared_pairs {
        match (event_index(a), event_index(b)) {
            (Some(i), Some(j)) => resolved_pairs.push((i, j)),
            (None, _) => {
                all_decl_errors.push(format!("unknown event {:?} in independence declaration", a))
            }
            (_, None) => {
                all_decl_errors.push(format!("unknown event {:?} in independence declaration", b))
            }
        }
    }
    if !all_decl_errors.is_empty() {
        return BuildResult::Failed {
            error: BuildError::BadDeclaration {
                detail: all_decl_errors.join("; "),
            },
            report,
        };
    }
    let policy = if all_pairs {
        PairPolicy::AllPairs
    } else {
        PairPolicy::Declared(resolved_pairs)
    };

    // Phase 2: size policy, before any table is allocated.
    if layout.total_bits() > MAX_STATE_BITS {
        return BuildResult::Failed {
            error: BuildError::StateSpaceTooLarge {
                bits: layout.total_bits(),
                limit: MAX_STATE_BITS,
            },
            report,
        };
    }
    if layout.domain_len() > MAX_STATE_SPACE {
        return BuildResult::Failed {
            error: BuildError::StateCountExceeded {
                count: layout.domain_len(),
                limit: MAX_STATE_SPACE,
            },
            report,
        };
    }

    let layout = Arc::new(layout);

    // Phase 3: validity mask.
    let valid: Vec<bool> = (0..layout.padded_len())
        .map(|id| layout.is_in_domain(id as u32))
        .collect();
    debug!(
        "{}: validity mask built, {} in-domain of {} padded ids",
        name,
        report.state_count,
        layout.padded_len()
    );

    // Phase 4: normal forms (WFC).
    let forms = match normal_form::compute(&layout, &invariants, &valid) {
        Ok(forms) => forms,
        Err(error) => {
            if let BuildError::WfcViolation { state } = &error {
                report.wfc = Some(WfcOutcome::Fail {
                    state: state.clone(),
                });
            }
            return BuildResult::Failed { error, report };
        }
    };
    report.wfc = Some(WfcOutcome::Pass {
        max_depth: forms.max_depth,
    });
    info!(
        "{}: WFC verified, max repair depth {}",
        name, forms.max_depth
    );

    // Phase 5: step tables.
    let steps = step::build(&layout, &events, &valid, &forms.nf);

    // Phase 6: commutativity.
    let pairs = commutativity::select_pairs(&policy, events.len());
    let influence = footprint::influence_masks(&invariants, &events);
    let cc = commutativity::check(
        &layout, &events, &pairs, &influence, &valid, &forms.nf, &steps,
    );
    match cc.counterexample {
        Some(cx) => {
            report.cc = Some(CcOutcome::Fail {
                summary: cc.summary,
                counterexample: cx.clone(),
            });
            return BuildResult::Failed {
                error: BuildError::CcCounterexample {
                    event1: cx.event1,
                    event2: cx.event2,
                    state: cx.state,
                    left: cx.result12,
                    right: cx.result21,
                },
                report,
            };
        }
        None => {
            report.cc = Some(CcOutcome::Pass(cc.summary));
            info!(
                "{}: CC verified, {} pairs ({} disjoint, {} brute-force)",
                name, cc.summary.pairs_total, cc.summary.pairs_disjoint, cc.summary.pairs_brute
            );
        }
    }

    // The declarations' closures are dropped here; the artifact carries
    // only the tables and the layout.
    let stamp = VerificationStamp {
        wfc: true,
        cc: true,
        max_repair_depth: forms.max_depth,
        state_count: report.state_count,
        event_count: events.len(),
        verified_at: chrono::Utc::now().to_rfc3339(),
    };
    let event_names = events.iter().map(|ev| ev.name.clone()).collect();
    let machine = Machine::assemble(name, layout, event_names, forms.nf, steps, stamp);

    BuildResult::Verified { machine, report }
}
