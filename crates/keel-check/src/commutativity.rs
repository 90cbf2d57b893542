//! The Compensation Commutativity check.
//!
//! For every selected unordered event pair, either discharge it because
//! the influence sets are disjoint, or compare the two step-orderings
//! across every valid state. The step tables make each probe two array
//! lookups, so brute force over the whole valid space stays cheap.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use keel_core::rules::{EventDef, PairPolicy};
use keel_core::{CcCounterexample, CcSummary, Layout, State};

pub(crate) struct CcCheck {
    pub summary: CcSummary,
    pub counterexample: Option<CcCounterexample>,
}

/// Unordered pairs to check, normalized so `i < j` and deduplicated.
/// Self-pairs commute trivially and are dropped.
pub(crate) fn select_pairs(policy: &PairPolicy, event_count: usize) -> Vec<(u16, u16)> {
    match policy {
        PairPolicy::AllPairs => {
            let mut pairs = Vec::new();
            for i in 0..event_count as u16 {
                for j in i + 1..event_count as u16 {
                    pairs.push((i, j));
                }
            }
            pairs
        }
        PairPolicy::Declared(declared) => {
            let mut seen = FxHashSet::default();
            let mut pairs = Vec::new();
            for &(a, b) in declared {
                let (i, j) = if a <= b { (a, b) } else { (b, a) };
                if i != j && seen.insert((i, j)) {
                    pairs.push((i, j));
                }
            }
            pairs
        }
    }
}

/// Verify every selected pair, early-exiting on the first divergence.
///
/// Invalid in-domain states are skipped: commutativity is required on
/// valid starting points only, and follows for invalid ones from
/// normalization idempotence.
pub(crate) fn check(
    layout: &Arc<Layout>,
    events: &[EventDef],
    pairs: &[(u16, u16)],
    influence: &[u32],
    valid: &[bool],
    nf: &[u32],
    step: &[Vec<u32>],
) -> CcCheck {
    let mut summary = CcSummary {
        pairs_total: pairs.len(),
        pairs_disjoint: 0,
        pairs_brute: 0,
    };

    for &(i, j) in pairs {
        let (i, j) = (i as usize, j as usize);
        if influence[i] & influence[j] == 0 {
            summary.pairs_disjoint += 1;
            tracing::debug!(
                "pair ({}, {}) discharged by disjoint influence sets",
                events[i].name,
                events[j].name
            );
            continue;
        }

        summary.pairs_brute += 1;
        for id in 0..valid.len() {
            if !valid[id] || nf[id] != id as u32 {
                continue;
            }
            let after_ij = step[j][step[i][id] as usize];
            let after_ji = step[i][step[j][id] as usize];
            if after_ij != after_ji {
                let mk = |id: u32| State::from_id(id, layout.clone());
                return CcCheck {
                    summary,
                    counterexample: Some(CcCounterexample {
                        event1: events[i].name.to_string(),
                        event2: events[j].name.to_string(),
                        state: mk(id as u32),
                        result12: mk(after_ij),
                        result21: mk(after_ji),
                    }),
                };
            }
        }
    }

    CcCheck {
        summary,
        counterexample: None,
    }
}
