//! The normal-form fixpoint: Well-Founded Compensation.
//!
//! For each in-domain state, iterate the first-violated-invariant repair
//! until every check holds or a cycle is detected. Priority ordering makes
//! the scheduler deterministic; cycle detection by visited set is
//! necessary because repairs may individually reduce violations yet
//! globally oscillate (invariant 1 forces x even, invariant 2 forces x
//! odd). The depth bound of one step per in-domain state is a pigeonhole
//! backstop for the visited set.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use keel_core::rules::InvariantDef;
use keel_core::{BuildError, Layout, State};

pub(crate) struct NormalForms {
    /// `nf[id]` over the padded address space; identity outside the
    /// domain.
    pub nf: Vec<u32>,
    /// Longest compensation chain observed.
    pub max_depth: usize,
}

/// Compute the normal form of every in-domain state, or report why one
/// does not exist.
pub(crate) fn compute(
    layout: &Arc<Layout>,
    invariants: &[InvariantDef],
    valid: &[bool],
) -> Result<NormalForms, BuildError> {
    let in_domain_count = valid.iter().filter(|&&v| v).count();
    let fp_masks: Vec<u32> = invariants
        .iter()
        .map(|inv| field_mask(layout, &inv.footprint))
        .collect();

    let mut nf = vec![0u32; valid.len()];
    let mut max_depth = 0usize;

    for id in 0..valid.len() {
        if !valid[id] {
            nf[id] = id as u32;
            continue;
        }

        let start = State::from_id(id as u32, layout.clone());
        let mut current = start.clone();
        let mut seen = FxHashSet::default();
        seen.insert(current.id());
        let mut depth = 0usize;

        while let Some(pos) = first_violated(invariants, &current) {
            let inv = &invariants[pos];
            let repaired = (inv.repair)(&current);

            // Repairs may only modify variables inside their declared
            // footprint; the disjointness discharge depends on it.
            let moved = current.id() ^ repaired.id();
            if moved & !fp_masks[pos] != 0 {
                let culprit = offending_var(layout, moved & !fp_masks[pos]);
                return Err(BuildError::BadDeclaration {
                    detail: format!(
                        "repair of invariant {:?} writes variable {:?} outside its footprint \
                         (from {} to {})",
                        inv.name,
                        culprit,
                        current,
                        repaired
                    ),
                });
            }

            depth += 1;
            if depth > in_domain_count || !seen.insert(repaired.id()) {
                return Err(BuildError::WfcViolation { state: start });
            }
            current = repaired;
        }

        nf[id] = current.id();
        max_depth = max_depth.max(depth);
    }

    // Valid entry states must already be fixpoints. Unreachable while the
    // scheduler only fires violated invariants; guards against scheduler
    // changes.
    for id in 0..valid.len() {
        if valid[id] && nf[id] != id as u32 {
            let s = State::from_id(id as u32, layout.clone());
            if first_violated(invariants, &s).is_none() {
                return Err(BuildError::RepairMovesValidState { state: s });
            }
        }
    }

    Ok(NormalForms { nf, max_depth })
}

/// Index of the lowest-priority-number violated invariant, if any.
pub(crate) fn first_violated(invariants: &[InvariantDef], s: &State) -> Option<usize> {
    invariants.iter().position(|inv| !(inv.check)(s))
}

/// Packed-bit mask covering the fields of the given variable indices.
fn field_mask(layout: &Layout, indices: &[u16]) -> u32 {
    indices
        .iter()
        .map(|&i| layout.info(i as usize).var().mask())
        .fold(0, |acc, m| acc | m)
}

/// Name of some variable whose field intersects `bits`.
fn offending_var(layout: &Layout, bits: u32) -> String {
    layout
        .vars()
        .iter()
        .find(|vi| vi.var().mask() & bits != 0)
        .map(|vi| vi.name().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}
