//! Step-table construction: event effect fused with normalization.
//!
//! `STEP[e][id] = NF[clamp(effect(id))]` for in-domain ids, with a false
//! guard short-circuiting to the state's own normal form. At runtime the
//! artifact answers apply() with one lookup into these arrays; every
//! closure is evaluated here, once per (event, state), and never again.

use std::sync::Arc;

use keel_core::rules::EventDef;
use keel_core::{Layout, State};

/// Build one table per event over the padded address space.
///
/// Out-of-domain ids map to themselves; they are never read by the
/// commutativity check or through the public runtime surface.
pub(crate) fn build(
    layout: &Arc<Layout>,
    events: &[EventDef],
    valid: &[bool],
    nf: &[u32],
) -> Vec<Vec<u32>> {
    events
        .iter()
        .map(|ev| {
            (0..valid.len())
                .map(|id| {
                    if !valid[id] {
                        return id as u32;
                    }
                    let s = State::from_id(id as u32, layout.clone());
                    let skipped = ev.guard.as_ref().is_some_and(|g| !g(&s));
                    let post = if skipped { s } else { (ev.effect)(&s) };
                    // Arithmetic effects may overrun the declared range;
                    // saturate rather than letting the field bits wrap.
                    let clamped = layout.clamp(post.id());
                    nf[clamped as usize]
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal_form;
    use keel_core::rules::{InvariantDef, VarIndexList};
    use keel_core::Var;

    fn counter() -> (Arc<Layout>, Var, Vec<bool>) {
        let mut layout = Layout::new();
        let x = layout.add_int("x", 0, 5);
        let layout = Arc::new(layout);
        let valid: Vec<bool> = (0..layout.padded_len())
            .map(|id| layout.is_in_domain(id as u32))
            .collect();
        (layout, x, valid)
    }

    fn increment(x: Var) -> EventDef {
        EventDef {
            name: Arc::from("increment"),
            writes: VarIndexList::from_slice(&[0]),
            guard: None,
            effect: Box::new(move |s| s.set_int(x, s.get_int(x) + 1)),
        }
    }

    #[test]
    fn effect_overrun_saturates_at_domain_top() {
        let (layout, x, valid) = counter();
        // No invariants: NF is the identity.
        let nf = normal_form::compute(&layout, &[], &valid).unwrap();
        let step = build(&layout, &[increment(x)], &valid, &nf.nf);
        assert_eq!(step[0][4], 5);
        // set_int clamps 6 back into [0, 5]; the table clamp is the
        // backstop for effects that write raw fields directly.
        assert_eq!(step[0][5], 5);
    }

    #[test]
    fn false_guard_is_a_no_op() {
        let (layout, x, valid) = counter();
        let nf = normal_form::compute(&layout, &[], &valid).unwrap();
        let gated = EventDef {
            name: Arc::from("gated"),
            writes: VarIndexList::from_slice(&[0]),
            guard: Some(Box::new(move |s| s.get_int(x) < 2)),
            effect: Box::new(move |s| s.set_int(x, 5)),
        };
        let step = build(&layout, &[gated], &valid, &nf.nf);
        assert_eq!(step[0][1], 5);
        assert_eq!(step[0][3], 3);
    }

    #[test]
    fn step_composes_effect_with_normalization() {
        let (layout, x, valid) = counter();
        let invs = vec![InvariantDef {
            name: Arc::from("cap_at_3"),
            footprint: VarIndexList::from_slice(&[0]),
            check: Box::new(move |s| s.get_int(x) <= 3),
            repair: Box::new(move |s| s.set_int(x, 0)),
        }];
        let nf = normal_form::compute(&layout, &invs, &valid).unwrap();
        let step = build(&layout, &[increment(x)], &valid, &nf.nf);
        // 3 -> 4, which the invariant repairs to 0.
        assert_eq!(step[0][3], 0);
        assert_eq!(step[0][2], 3);
    }

    #[test]
    fn out_of_domain_ids_map_to_themselves() {
        let (layout, x, valid) = counter();
        let nf = normal_form::compute(&layout, &[], &valid).unwrap();
        let step = build(&layout, &[increment(x)], &valid, &nf.nf);
        assert!(!valid[7]);
        assert_eq!(step[0][7], 7);
    }
}
