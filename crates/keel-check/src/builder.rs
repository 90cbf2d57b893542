//! Fluent declaration of governed state machines.
//!
//! The builder is a mutable aggregator: declare variables, invariants,
//! and events, then call [`MachineBuilder::build`] to verify convergence
//! and produce an immutable [`Machine`](crate::Machine). The handoff is a
//! consuming finalize; the builder's closures are evaluated during
//! verification and dropped afterwards.
//!
//! Declaration mistakes (a missing check or effect, an empty enum, an
//! unknown event name in an independence declaration) never panic; they
//! are recorded and surfaced as a `BadDeclaration` error when `build()`
//! runs.

use std::sync::Arc;

use keel_core::rules::{CheckFn, EffectFn, EventDef, InvariantDef, VarIndexList};
use keel_core::{Layout, State, Var};

use crate::verify::{self, BuildResult};

/// Declares a governed state machine and finalizes it into a verified
/// [`Machine`](crate::Machine).
///
/// By default every unordered event pair is checked for commutativity.
/// Declaring any pair with [`independent`](MachineBuilder::independent)
/// switches to declared-only mode, which avoids checking all O(n²) pairs
/// when most events are causally ordered.
pub struct MachineBuilder {
    pub(crate) name: String,
    pub(crate) layout: Layout,
    pub(crate) invariants: Vec<InvariantDef>,
    pub(crate) events: Vec<EventDef>,
    pub(crate) declared_pairs: Vec<(String, String)>,
    pub(crate) all_pairs: bool,
    pub(crate) decl_errors: Vec<String>,
}

impl MachineBuilder {
    /// Start declaring a machine with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        MachineBuilder {
            name: name.into(),
            layout: Layout::new(),
            invariants: Vec::new(),
            events: Vec::new(),
            declared_pairs: Vec::new(),
            all_pairs: true,
            decl_errors: Vec::new(),
        }
    }

    /// Declare a boolean state variable.
    pub fn bool_var(&mut self, name: &str) -> Var {
        self.layout.add_bool(name)
    }

    /// Declare an enumerated state variable over ordered labels.
    pub fn enum_var(&mut self, name: &str, labels: &[&str]) -> Var {
        self.layout.add_enum(name, labels)
    }

    /// Declare a bounded integer state variable over `[min, max]`.
    pub fn int_var(&mut self, name: &str, min: i64, max: i64) -> Var {
        self.layout.add_int(name, min, max)
    }

    /// Begin declaring a named invariant.
    pub fn invariant(&mut self, name: &str) -> InvariantBuilder<'_> {
        InvariantBuilder {
            owner: self,
            name: Arc::from(name),
            footprint: VarIndexList::new(),
            check: None,
            repair: None,
        }
    }

    /// Begin declaring a named event.
    pub fn event(&mut self, name: &str) -> EventBuilder<'_> {
        EventBuilder {
            owner: self,
            name: Arc::from(name),
            writes: VarIndexList::new(),
            guard: None,
            effect: None,
        }
    }

    /// Declare that two events may arrive in either order (they are not
    /// causally related); commutativity will be verified for the pair.
    ///
    /// Declaring a pair switches checking to declared-only mode.
    pub fn independent(&mut self, event1: &str, event2: &str) -> &mut Self {
        self.all_pairs = false;
        self.declared_pairs
            .push((event1.to_string(), event2.to_string()));
        self
    }

    /// Explicitly restrict commutativity checking to declared pairs.
    ///
    /// This happens automatically on the first
    /// [`independent`](MachineBuilder::independent) call; the method
    /// remains for machines with causally ordered events only, where no
    /// pair should be checked at all.
    pub fn only_declared_pairs(&mut self) -> &mut Self {
        self.all_pairs = false;
        self
    }

    /// Verify the declarations and produce the immutable artifact.
    ///
    /// Runs the full pipeline: validity mask, normal-form fixpoint
    /// (Well-Founded Compensation), step tables, and the commutativity
    /// check. A report is produced whether or not verification succeeds.
    pub fn build(self) -> BuildResult {
        verify::run(self)
    }

    pub(crate) fn record_decl_error(&mut self, detail: String) {
        self.decl_errors.push(detail);
    }
}

/// Fluent declaration of one invariant; see
/// [`MachineBuilder::invariant`].
pub struct InvariantBuilder<'a> {
    owner: &'a mut MachineBuilder,
    name: Arc<str>,
    footprint: VarIndexList,
    check: Option<CheckFn>,
    repair: Option<EffectFn>,
}

impl<'a> InvariantBuilder<'a> {
    /// Declare the invariant's footprint: the variables it constrains and
    /// the only variables its repair may modify.
    pub fn over(mut self, vars: &[Var]) -> Self {
        self.footprint.extend(vars.iter().map(|v| v.index() as u16));
        self
    }

    /// Set the invariant predicate; `true` means the invariant holds.
    pub fn check(mut self, f: impl Fn(&State) -> bool + Send + Sync + 'static) -> Self {
        self.check = Some(Box::new(f));
        self
    }

    /// Set the compensation function, called on states where the check
    /// fails. It must modify only variables in the footprint.
    pub fn repair(mut self, f: impl Fn(&State) -> State + Send + Sync + 'static) -> Self {
        self.repair = Some(Box::new(f));
        self
    }

    /// Register the invariant. Priority follows registration order.
    pub fn add(self) {
        match (self.check, self.repair) {
            (Some(check), Some(repair)) => self.owner.invariants.push(InvariantDef {
                name: self.name,
                footprint: self.footprint,
                check,
                repair,
            }),
            (None, _) => self.owner.record_decl_error(format!(
                "invariant {:?} is missing a check function",
                self.name
            )),
            (_, None) => self.owner.record_decl_error(format!(
                "invariant {:?} is missing a repair function",
                self.name
            )),
        }
    }
}

/// Fluent declaration of one event; see [`MachineBuilder::event`].
pub struct EventBuilder<'a> {
    owner: &'a mut MachineBuilder,
    name: Arc<str>,
    writes: VarIndexList,
    guard: Option<CheckFn>,
    effect: Option<EffectFn>,
}

impl<'a> EventBuilder<'a> {
    /// Declare which variables this event may modify.
    pub fn writes(mut self, vars: &[Var]) -> Self {
        self.writes.extend(vars.iter().map(|v| v.index() as u16));
        self
    }

    /// Set an optional precondition. When the guard returns false the
    /// event is a no-op in that state.
    pub fn guard(mut self, f: impl Fn(&State) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Box::new(f));
        self
    }

    /// Set the event's effect function.
    pub fn effect(mut self, f: impl Fn(&State) -> State + Send + Sync + 'static) -> Self {
        self.effect = Some(Box::new(f));
        self
    }

    /// Register the event.
    pub fn add(self) {
        match self.effect {
            Some(effect) => self.owner.events.push(EventDef {
                name: self.name,
                writes: self.writes,
                guard: self.guard,
                effect,
            }),
            None => self.owner.record_decl_error(format!(
                "event {:?} is missing an effect function",
                self.name
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::BuildError;

    #[test]
    fn missing_check_is_a_lazy_declaration_error() {
        let mut b = MachineBuilder::new("m");
        let x = b.int_var("x", 0, 3);
        b.invariant("cap").over(&[x]).repair(move |s| s.set_int(x, 3)).add();
        match b.build().into_machine() {
            Err(BuildError::BadDeclaration { detail }) => {
                assert!(detail.contains("missing a check function"), "{detail}");
            }
            other => panic!("expected BadDeclaration, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_effect_is_a_lazy_declaration_error() {
        let mut b = MachineBuilder::new("m");
        let x = b.bool_var("x");
        b.event("toggle").writes(&[x]).add();
        match b.build().into_machine() {
            Err(BuildError::BadDeclaration { detail }) => {
                assert!(detail.contains("missing an effect function"), "{detail}");
            }
            other => panic!("expected BadDeclaration, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_event_in_independence_declaration() {
        let mut b = MachineBuilder::new("m");
        let x = b.bool_var("x");
        b.event("toggle").writes(&[x]).effect(move |s| {
            let v = s.get_bool(x);
            s.set_bool(x, !v)
        }).add();
        b.independent("toggle", "missing");
        match b.build().into_machine() {
            Err(BuildError::BadDeclaration { detail }) => {
                assert!(detail.contains("unknown event"), "{detail}");
            }
            other => panic!("expected BadDeclaration, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_enum_is_reported_at_build_time() {
        let mut b = MachineBuilder::new("m");
        b.enum_var("status", &[]);
        match b.build().into_machine() {
            Err(BuildError::BadDeclaration { detail }) => {
                assert!(detail.contains("at least 2 labels"), "{detail}");
            }
            other => panic!("expected BadDeclaration, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn independent_switches_to_declared_only_mode() {
        let mut b = MachineBuilder::new("m");
        assert!(b.all_pairs);
        let x = b.int_var("x", 0, 3);
        b.event("a").writes(&[x]).effect(move |s| s.clone()).add();
        b.event("b").writes(&[x]).effect(move |s| s.clone()).add();
        b.independent("a", "b");
        assert!(!b.all_pairs);
        assert_eq!(b.declared_pairs.len(), 1);
    }
}
