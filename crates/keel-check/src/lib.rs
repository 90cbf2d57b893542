//! keel-check - Build-time verifier and O(1) runtime for governed state
//! machines
//!
//! This crate provides:
//! - **Fluent declaration**: variables, invariants with repair, events with
//!   guards ([`MachineBuilder`])
//! - **Exhaustive verification**: Well-Founded Compensation (every state
//!   reaches a normal form) and Compensation Commutativity (checked event
//!   pairs agree in either order)
//! - **An immutable artifact**: apply any event to any state with one
//!   table lookup ([`Machine`])
//! - **Persistence**: JSON export for portable runtimes in any language
//!
//! # Quick Start
//!
//! ```rust
//! use keel_check::MachineBuilder;
//!
//! let mut b = MachineBuilder::new("counter");
//! let count = b.int_var("count", 0, 10);
//!
//! b.invariant("cap_at_10")
//!     .over(&[count])
//!     .check(move |s| s.get_int(count) <= 10)
//!     .repair(move |s| s.set_int(count, 10))
//!     .add();
//!
//! b.event("increment")
//!     .writes(&[count])
//!     .effect(move |s| s.set_int(count, s.get_int(count) + 1))
//!     .add();
//!
//! let machine = b.build().into_machine().expect("convergence");
//!
//! let mut s = machine.initial_state();
//! for _ in 0..15 {
//!     s = machine.apply(&s, "increment").expect("declared event");
//! }
//! assert_eq!(s.get_int(count), 10);
//! ```
//!
//! # Verification
//!
//! `build()` enumerates the full packed address space: it computes the
//! normal form of every in-domain state under priority-ordered repair,
//! precomputes a step table fusing each event's effect with normalization,
//! and proves commutativity for every checked pair, either by influence-set
//! disjointness or by brute force over all valid states. When both proofs
//! hold, any permutation of the same multiset of events reaches the same
//! final state.

pub mod artifact;
pub mod builder;
mod commutativity;
pub mod export;
mod footprint;
mod normal_form;
mod step;
pub mod verify;

pub use artifact::{Machine, VerificationStamp};
pub use builder::{EventBuilder, InvariantBuilder, MachineBuilder};
pub use export::{ExportError, ImportError, ARTIFACT_VERSION};
pub use verify::BuildResult;

// The data model is part of this crate's public surface.
pub use keel_core::{
    ApplyError, BuildError, CcCounterexample, CcOutcome, CcSummary, Layout, Report, State, Var,
    VarKind, WfcOutcome, MAX_STATE_BITS, MAX_STATE_SPACE,
};
