//! Packed-state values and typed accessors.
//!
//! A [`State`] is a packed unsigned integer plus a shared reference to the
//! layout that gives its bit fields meaning. States are pure values:
//! equality, ordering, and hashing all reduce to integer comparison on the
//! packed id, which is what lets the verifier use ids directly as table
//! indices.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::layout::Layout;
use crate::var::{Var, VarKind};

/// A compact, immutable snapshot of all variable values.
///
/// Accessors take the [`Var`] handle by value and return a new `State`;
/// nothing is mutated in place. Cloning is cheap (an integer and an `Arc`
/// bump).
#[derive(Clone)]
pub struct State {
    id: u32,
    layout: Arc<Layout>,
}

impl State {
    /// Wrap a packed id. The id should lie inside the layout's padded
    /// address space.
    pub fn from_id(id: u32, layout: Arc<Layout>) -> Self {
        State { id, layout }
    }

    /// The packed integer, usable as a table index.
    #[inline(always)]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The layout this state is encoded against.
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Raw field value of a variable.
    #[inline(always)]
    pub fn raw(&self, v: Var) -> u32 {
        v.raw(self.id)
    }

    /// New state with a variable's raw field replaced.
    #[inline]
    pub fn with_raw(&self, v: Var, raw: u32) -> State {
        State {
            id: v.write(self.id, raw),
            layout: self.layout.clone(),
        }
    }

    /// Value of a bool variable.
    pub fn get_bool(&self, v: Var) -> bool {
        self.raw(v) != 0
    }

    /// Label of an enum variable.
    ///
    /// Every in-domain state has a label for each enum field. A state
    /// fabricated from an out-of-domain id renders its dead code as
    /// `?<raw>` instead, the same fallback `Display` uses.
    pub fn get(&self, v: Var) -> Cow<'_, str> {
        let info = self.layout.info(v.index());
        let raw = self.raw(v) as usize;
        match info.labels().get(raw) {
            Some(label) => Cow::Borrowed(label.as_ref()),
            None => Cow::Owned(format!("?{}", raw)),
        }
    }

    /// Value of an int variable, adjusted for its minimum.
    pub fn get_int(&self, v: Var) -> i64 {
        self.raw(v) as i64 + v.min()
    }

    /// New state with a bool variable set.
    pub fn set_bool(&self, v: Var, value: bool) -> State {
        self.with_raw(v, value as u32)
    }

    /// New state with an enum variable set to the named label.
    ///
    /// # Panics
    ///
    /// Panics if the label is not one of the variable's declared labels.
    pub fn set(&self, v: Var, label: &str) -> State {
        let info = self.layout.info(v.index());
        match info.label_index(label) {
            Some(raw) => self.with_raw(v, raw),
            None => panic!("keel: enum {:?} has no label {:?}", info.name(), label),
        }
    }

    /// New state with an int variable set, clamped to the declared range.
    pub fn set_int(&self, v: Var, value: i64) -> State {
        let clamped = value.clamp(v.min(), v.max());
        self.with_raw(v, (clamped - v.min()) as u32)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, vi) in self.layout.vars().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let v = vi.var();
            write!(f, "{}=", vi.name())?;
            match v.kind() {
                VarKind::Bool => write!(f, "{}", self.get_bool(v))?,
                VarKind::Enum => write!(f, "{}", self.get(v))?,
                VarKind::Int => write!(f, "{}", self.get_int(v))?,
            }
        }
        write!(f, "}}")
    }
}

// Debug shows both the packed id and the decoded fields; assertion
// failures read much better with the decoding inline.
impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State({} = {})", self.id, self)
    }
}
