//! keel-core - Domain model for governed state machines
//!
//! A governed state machine is a finite-domain state machine whose
//! transitions may transiently violate business invariants; declared
//! compensation functions repair the violations automatically. This crate
//! provides the data the verifier consumes and the values it hands back:
//!
//! - **Variables**: boolean, enumerated, and bounded-integer slots with
//!   fixed finite domains ([`Var`], [`VarKind`])
//! - **Layout**: bit-field assignment and the packed-state codec ([`Layout`])
//! - **States**: immutable packed-integer values with typed accessors
//!   ([`State`])
//! - **Rules**: invariants with priority-ordered repair, events with
//!   guards and effects ([`InvariantDef`], [`EventDef`])
//! - **Errors**: the build-time and runtime error taxonomy ([`BuildError`],
//!   [`ApplyError`])
//! - **Reports**: the observable verification outcome ([`Report`])
//!
//! The verification engine itself lives in `keel-check`; this crate has no
//! opinion on how the tables are computed, only on what they are computed
//! from.

pub mod error;
pub mod layout;
pub mod report;
pub mod rules;
pub mod state;
pub mod var;

pub use error::{ApplyError, BuildError};
pub use layout::{Layout, VarInfo, MAX_STATE_BITS, MAX_STATE_SPACE};
pub use report::{CcCounterexample, CcOutcome, CcSummary, Report, WfcOutcome};
pub use rules::{CheckFn, EffectFn, EventDef, InvariantDef, PairPolicy};
pub use state::State;
pub use var::{Var, VarKind};
