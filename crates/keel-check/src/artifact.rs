//! The immutable artifact: apply any event to any state in O(1).
//!
//! A [`Machine`] carries only the variable layout, the event dictionary,
//! the normal-form array, and the step arrays. Applying an event is a name
//! lookup plus one array index; there is no closure invocation, no
//! branching on variable values, no invariant evaluation. Machines are
//! immutable and freely shared across threads by reference.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use keel_core::{ApplyError, Layout, State, Var};

/// What the verifier proved about this machine, carried for provenance
/// and persisted with the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationStamp {
    pub wfc: bool,
    pub cc: bool,
    pub max_repair_depth: usize,
    pub state_count: u64,
    pub event_count: usize,
    /// RFC 3339 timestamp of the successful verification.
    pub verified_at: String,
}

/// An immutable, verified governed state machine.
///
/// Produced by [`MachineBuilder::build`](crate::MachineBuilder::build)
/// after Well-Founded Compensation and Compensation Commutativity have
/// been proven, or reconstituted from an exported artifact by
/// [`Machine::import_json`](crate::Machine::import_json).
#[derive(Debug, Clone)]
pub struct Machine {
    pub(crate) name: String,
    pub(crate) layout: Arc<Layout>,
    pub(crate) event_names: Vec<Arc<str>>,
    pub(crate) event_index: FxHashMap<Arc<str>, u16>,
    pub(crate) nf: Vec<u32>,
    pub(crate) step: Vec<Vec<u32>>,
    pub(crate) stamp: VerificationStamp,
}

impl Machine {
    pub(crate) fn assemble(
        name: String,
        layout: Arc<Layout>,
        event_names: Vec<Arc<str>>,
        nf: Vec<u32>,
        step: Vec<Vec<u32>>,
        stamp: VerificationStamp,
    ) -> Machine {
        let event_index = event_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u16))
            .collect();
        Machine {
            name,
            layout,
            event_names,
            event_index,
            nf,
            step,
            stamp,
        }
    }

    /// The machine's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable layout states are encoded against.
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Handle for a declared variable, by name.
    pub fn var(&self, name: &str) -> Option<Var> {
        self.layout.var_by_name(name)
    }

    /// What verification proved, and when.
    pub fn stamp(&self) -> &VerificationStamp {
        &self.stamp
    }

    /// The all-zeros state: every variable at its minimum or first label.
    ///
    /// In-domain by construction; whether it is *valid* depends on the
    /// declared invariants.
    pub fn initial_state(&self) -> State {
        State::from_id(0, self.layout.clone())
    }

    /// Wrap a packed id as a state of this machine.
    ///
    /// The id is masked into the padded address space and any
    /// out-of-domain field is saturated at its domain top (the same
    /// policy [`Layout::clamp`] applies to effect overruns), so the
    /// result is always an in-domain state. Padded ids can still be
    /// inspected through [`State::from_id`] when the raw encoding
    /// matters.
    pub fn state(&self, id: u32) -> State {
        let mask = (self.nf.len() - 1) as u32;
        State::from_id(self.layout.clamp(id & mask), self.layout.clone())
    }

    /// Apply a named event: one dictionary lookup and one table index.
    pub fn apply(&self, s: &State, event: &str) -> Result<State, ApplyError> {
        let ei = self
            .event_index
            .get(event)
            .ok_or_else(|| ApplyError::UnknownEvent {
                name: event.to_string(),
            })?;
        let next = self.step[*ei as usize][s.id() as usize];
        Ok(State::from_id(next, self.layout.clone()))
    }

    /// The normal form of a state. Identity on valid states.
    pub fn normalize(&self, s: &State) -> State {
        State::from_id(self.nf[s.id() as usize], self.layout.clone())
    }

    /// Does every invariant hold for this state?
    pub fn is_valid(&self, s: &State) -> bool {
        self.nf[s.id() as usize] == s.id()
    }

    /// Declared event names, in index order.
    pub fn events(&self) -> impl ExactSizeIterator<Item = &str> {
        self.event_names.iter().map(|n| n.as_ref())
    }
}
