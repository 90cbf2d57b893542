//! Influence sets and the disjointness discharge.
//!
//! For an event e, the influence set F(e) contains every variable whose
//! value can differ between "apply e alone" and "apply e then normalize":
//! the variables e writes, plus the footprint of any invariant a write can
//! trigger, closed transitively because a repair's own writes can trigger
//! further invariants. If F(e1) and F(e2) are disjoint, the pair commutes
//! modulo normalization and needs no state enumeration.
//!
//! The closure is iterated to a fixpoint rather than stopping after one
//! hop: an under-approximated influence set could wrongly discharge a
//! pair, while the larger set only sends more pairs to the brute-force
//! path. Variable sets are bitmasks; the 20-bit width ceiling caps the
//! machine at 20 variables, so a `u32` always suffices.

use keel_core::rules::{EventDef, InvariantDef};

/// Bitmask over variable indices (not packed-field bits).
fn index_mask(indices: &[u16]) -> u32 {
    indices.iter().fold(0u32, |acc, &i| {
        debug_assert!(i < 32);
        acc | (1 << i)
    })
}

/// Influence mask for every event, in event order.
pub(crate) fn influence_masks(invariants: &[InvariantDef], events: &[EventDef]) -> Vec<u32> {
    let inv_masks: Vec<u32> = invariants
        .iter()
        .map(|inv| index_mask(&inv.footprint))
        .collect();

    events
        .iter()
        .map(|ev| {
            let mut influence = index_mask(&ev.writes);
            loop {
                let mut grew = false;
                for &fp in &inv_masks {
                    if fp & influence != 0 && fp | influence != influence {
                        influence |= fp;
                        grew = true;
                    }
                }
                if !grew {
                    break;
                }
            }
            influence
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::rules::VarIndexList;
    use keel_core::State;
    use std::sync::Arc;

    fn inv(footprint: &[u16]) -> InvariantDef {
        InvariantDef {
            name: Arc::from("inv"),
            footprint: VarIndexList::from_slice(footprint),
            check: Box::new(|_| true),
            repair: Box::new(|s: &State| s.clone()),
        }
    }

    fn ev(writes: &[u16]) -> EventDef {
        EventDef {
            name: Arc::from("ev"),
            writes: VarIndexList::from_slice(writes),
            guard: None,
            effect: Box::new(|s: &State| s.clone()),
        }
    }

    #[test]
    fn writes_alone_when_no_invariant_overlaps() {
        let invariants = vec![inv(&[2, 3])];
        let events = vec![ev(&[0])];
        assert_eq!(influence_masks(&invariants, &events), vec![0b0001]);
    }

    #[test]
    fn one_hop_pulls_in_overlapping_footprints() {
        let invariants = vec![inv(&[0, 1])];
        let events = vec![ev(&[0]), ev(&[2])];
        let masks = influence_masks(&invariants, &events);
        assert_eq!(masks[0], 0b011);
        assert_eq!(masks[1], 0b100);
    }

    #[test]
    fn closure_iterates_across_chained_footprints() {
        // Writing a can trigger the {a,b} invariant, whose repair can
        // touch b and so trigger the {b,c} invariant: c is influenced
        // even though no single hop names it.
        let invariants = vec![inv(&[0, 1]), inv(&[1, 2])];
        let events = vec![ev(&[0])];
        assert_eq!(influence_masks(&invariants, &events), vec![0b111]);
    }

    #[test]
    fn disjoint_events_stay_disjoint() {
        let invariants = vec![inv(&[0, 1]), inv(&[2])];
        let events = vec![ev(&[0]), ev(&[2])];
        let masks = influence_masks(&invariants, &events);
        assert_eq!(masks[0] & masks[1], 0);
    }
}
