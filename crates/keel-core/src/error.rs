//! Error taxonomy for build-time verification and runtime apply.
//!
//! Every failure the verifier can report is a distinct kind; nothing
//! propagates beyond the finalize call. On failure the verification report
//! is still produced alongside the error so callers can render
//! diagnostics.

use thiserror::Error;

use crate::state::State;

/// A failure detected while verifying a declared machine.
///
/// All variants are fatal: no artifact is produced.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The packed width exceeds the policy ceiling; tables would be too
    /// large to enumerate.
    #[error("state space too large: {bits} packed bits exceeds the {limit}-bit ceiling")]
    StateSpaceTooLarge { bits: u32, limit: u32 },

    /// The in-domain state count exceeds the configured ceiling.
    #[error("state space too large: {count} in-domain states exceeds the {limit} ceiling")]
    StateCountExceeded { count: u64, limit: u64 },

    /// Some in-domain state has no terminating repair sequence: iterated
    /// compensation revisited a state or overran the pigeonhole depth
    /// bound. Carries the first offending start state.
    #[error("compensation does not terminate from {state}")]
    WfcViolation { state: State },

    /// Normalization moved a state every invariant already accepted.
    /// Unreachable for the deterministic first-violated scheduler; kept as
    /// insurance against scheduler changes.
    #[error("compensation moves valid state {state}; repair must be identity on valid states")]
    RepairMovesValidState { state: State },

    /// A checked event pair reaches different states depending on order.
    #[error(
        "events {event1:?} and {event2:?} do not commute from {state}: \
         {left} vs {right}"
    )]
    CcCounterexample {
        event1: String,
        event2: String,
        state: State,
        /// Result of applying `event1` then `event2`.
        left: State,
        /// Result of applying `event2` then `event1`.
        right: State,
    },

    /// The declarations themselves are ill-formed: an empty enum, an
    /// inverted int range, a missing check/repair/effect, an unknown event
    /// name in an independence declaration, or a repair that writes
    /// outside its footprint.
    #[error("bad declaration: {detail}")]
    BadDeclaration { detail: String },
}

/// A failure applying an event at runtime. Fatal to the call, not to the
/// artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The event name is absent from the artifact's event dictionary.
    #[error("unknown event {name:?}")]
    UnknownEvent { name: String },
}
