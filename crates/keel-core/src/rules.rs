//! The rule data model: invariants, events, and the pair policy.
//!
//! Invariants and events are held as ordered lists. Ordering is
//! semantically significant for invariants: the list order is the priority
//! the repair scheduler uses, so earlier invariants win when several are
//! violated at once.
//!
//! The closures declared here live only for the duration of verification.
//! The artifact produced by a successful build carries tables, never
//! closures.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::state::State;

/// A pure predicate over states (invariant checks and event guards).
pub type CheckFn = Box<dyn Fn(&State) -> bool + Send + Sync>;

/// A pure state transformer (repairs and event effects).
pub type EffectFn = Box<dyn Fn(&State) -> State + Send + Sync>;

/// Variable index lists are tiny in practice; keep them inline.
pub type VarIndexList = SmallVec<[u16; 4]>;

/// An invariant: a predicate over states plus the compensation that
/// restores it.
///
/// The footprint names the variables the invariant constrains; its repair
/// may modify only those. Violating that contract is a declaration error,
/// detected while the normal-form fixpoint runs.
pub struct InvariantDef {
    pub name: Arc<str>,
    pub footprint: VarIndexList,
    pub check: CheckFn,
    pub repair: EffectFn,
}

/// An event: an optional guard plus an effect over a declared write set.
///
/// When the guard is present and false, the event is a no-op in that
/// state.
pub struct EventDef {
    pub name: Arc<str>,
    pub writes: VarIndexList,
    pub guard: Option<CheckFn>,
    pub effect: EffectFn,
}

/// Which unordered event pairs commutativity is verified for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairPolicy {
    /// Check the full upper triangle of the event-index matrix.
    AllPairs,
    /// Check only explicitly declared pairs, normalized so `i < j` and
    /// deduplicated.
    Declared(Vec<(u16, u16)>),
}

impl fmt::Debug for InvariantDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvariantDef")
            .field("name", &self.name)
            .field("footprint", &self.footprint)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for EventDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDef")
            .field("name", &self.name)
            .field("writes", &self.writes)
            .field("guarded", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}
