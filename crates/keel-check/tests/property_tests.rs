//! Property-based tests for the verified runtime.
//!
//! These check the quantified guarantees over randomized inputs: states
//! drawn from the whole padded address space, event sequences drawn from
//! the declared vocabulary, and random interleavings of the same multiset
//! of events.

use std::sync::OnceLock;

use proptest::prelude::*;

use keel_check::{Machine, MachineBuilder, State};

/// The order fulfillment machine from the end-to-end scenarios, built
/// once and shared across cases.
fn order_machine() -> &'static Machine {
    static MACHINE: OnceLock<Machine> = OnceLock::new();
    MACHINE.get_or_init(|| {
        let mut b = MachineBuilder::new("order_fulfillment");

        let status = b.enum_var("status", &["pending", "paid", "shipped", "cancelled"]);
        let paid = b.bool_var("paid");
        let inventory = b.int_var("inventory", 0, 5);

        b.invariant("no_ship_unpaid")
            .over(&[status, paid])
            .check(move |s| s.get(status) != "shipped" || s.get_bool(paid))
            .repair(move |s| s.set(status, "pending"))
            .add();

        b.invariant("stock_non_negative")
            .over(&[inventory])
            .check(move |s| s.get_int(inventory) >= 0)
            .repair(move |s| s.set_int(inventory, 0))
            .add();

        b.event("place_order")
            .writes(&[status, paid])
            .effect(move |s| s.set(status, "pending").set_bool(paid, false))
            .add();

        b.event("process_payment")
            .writes(&[status, paid])
            .guard(move |s| s.get(status) == "pending")
            .effect(move |s| s.set(status, "paid").set_bool(paid, true))
            .add();

        b.event("ship_item")
            .writes(&[status, inventory])
            .guard(move |s| s.get(status) == "paid" && s.get_int(inventory) > 0)
            .effect(move |s| {
                let left = s.get_int(inventory) - 1;
                s.set(status, "shipped").set_int(inventory, left)
            })
            .add();

        b.event("cancel_order")
            .writes(&[status])
            .guard(move |s| s.get(status) != "shipped")
            .effect(move |s| s.set(status, "cancelled"))
            .add();

        b.event("restock")
            .writes(&[inventory])
            .effect(move |s| s.set_int(inventory, s.get_int(inventory) + 1))
            .add();

        b.independent("place_order", "restock");
        b.independent("process_payment", "restock");
        b.independent("cancel_order", "restock");

        b.build().into_machine().expect("order machine verifies")
    })
}

/// Two saturating counters plus a double-step increment; every pair
/// commutes, so the full upper triangle is checked.
fn counters_machine() -> &'static Machine {
    static MACHINE: OnceLock<Machine> = OnceLock::new();
    MACHINE.get_or_init(|| {
        let mut b = MachineBuilder::new("counters");

        let a = b.int_var("a", 0, 7);
        let bvar = b.int_var("b", 0, 7);

        b.invariant("cap_a")
            .over(&[a])
            .check(move |s| s.get_int(a) <= 6)
            .repair(move |s| s.set_int(a, 6))
            .add();

        b.invariant("cap_b")
            .over(&[bvar])
            .check(move |s| s.get_int(bvar) <= 6)
            .repair(move |s| s.set_int(bvar, 6))
            .add();

        b.event("inc_a")
            .writes(&[a])
            .effect(move |s| s.set_int(a, s.get_int(a) + 1))
            .add();

        b.event("inc_a_twice")
            .writes(&[a])
            .effect(move |s| s.set_int(a, s.get_int(a) + 2))
            .add();

        b.event("inc_b")
            .writes(&[bvar])
            .effect(move |s| s.set_int(bvar, s.get_int(bvar) + 1))
            .add();

        b.build().into_machine().expect("counters machine verifies")
    })
}

/// Pairs declared independent on the order machine.
const DECLARED_PAIRS: [(&str, &str); 3] = [
    ("place_order", "restock"),
    ("process_payment", "restock"),
    ("cancel_order", "restock"),
];

/// Any state in the order machine's padded address space.
fn any_padded_id() -> impl Strategy<Value = u32> {
    0u32..64
}

/// An in-domain order-machine state, by construction.
fn any_in_domain_state() -> impl Strategy<Value = u32> {
    (0u32..4, 0u32..2, 0u32..6).prop_map(|(status, paid, inventory)| {
        let m = order_machine();
        let layout = m.layout();
        layout.pack(&[status, paid, inventory])
    })
}

fn counters_event() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("inc_a"), Just("inc_a_twice"), Just("inc_b")]
}

/// A random event multiset together with a random permutation of it.
fn sequence_and_permutation() -> impl Strategy<Value = (Vec<&'static str>, Vec<&'static str>)> {
    proptest::collection::vec(counters_event(), 0..12)
        .prop_flat_map(|seq| (Just(seq.clone()), Just(seq).prop_shuffle()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // --- Normalization laws ---

    #[test]
    fn prop_normalization_is_idempotent(id in any_padded_id()) {
        // State::from_id so padding ids are exercised too; Machine::state
        // would clamp them into the domain first.
        let m = order_machine();
        let once = m.normalize(&State::from_id(id, m.layout().clone()));
        let twice = m.normalize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_normal_forms_are_valid(id in any_in_domain_state()) {
        let m = order_machine();
        let nf = m.normalize(&m.state(id));
        prop_assert!(m.is_valid(&nf));
    }

    // --- Step laws ---

    #[test]
    fn prop_steps_land_valid(id in any_in_domain_state(), event in 0usize..5) {
        let m = order_machine();
        let s = m.state(id);
        prop_assume!(m.is_valid(&s));
        let name = m.events().nth(event).unwrap().to_string();
        let next = m.apply(&s, &name).unwrap();
        prop_assert!(m.is_valid(&next));
    }

    #[test]
    fn prop_declared_pairs_commute(id in any_in_domain_state(), pair in 0usize..3) {
        let m = order_machine();
        let s = m.state(id);
        prop_assume!(m.is_valid(&s));
        let (e1, e2) = DECLARED_PAIRS[pair];

        let one_two = m.apply(&m.apply(&s, e1).unwrap(), e2).unwrap();
        let two_one = m.apply(&m.apply(&s, e2).unwrap(), e1).unwrap();
        prop_assert_eq!(one_two, two_one);
    }

    // --- Permutation closure ---

    // On a machine where every pair is checked, any two interleavings of
    // the same multiset of events reach the same final state.
    #[test]
    fn prop_permutations_reach_the_same_state(
        (sequence, permuted) in sequence_and_permutation(),
    ) {
        let m = counters_machine();

        let mut s1 = m.initial_state();
        for event in &sequence {
            s1 = m.apply(&s1, event).unwrap();
        }
        let mut s2 = m.initial_state();
        for event in &permuted {
            s2 = m.apply(&s2, event).unwrap();
        }
        prop_assert_eq!(s1, s2);
    }
}
