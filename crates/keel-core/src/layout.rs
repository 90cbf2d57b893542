//! Bit-field layout and the packed-state codec.
//!
//! The verifier sweeps the full padded address space `2^B`, so field access
//! is the hot path: every operation here reduces to shift/mask arithmetic
//! on a `u32`. Because domains need not be powers of two, the padded space
//! is larger than the in-domain state count; [`Layout::is_in_domain`] is
//! the validity test that rejects padding codes (an enum of 3 labels has a
//! dead code `0b11`).
//!
//! Declaration mistakes (empty enums, inverted int ranges, duplicate
//! names) are recorded rather than reported eagerly; the builder surfaces
//! them as a `BadDeclaration` error at finalize time.

use std::sync::Arc;

use crate::var::{bits_needed, Var, VarKind};

/// Ceiling on the packed state width, in bits. Tables scale as
/// `(events + 1) * 2^B * 4` bytes, so this is a policy floor rather than an
/// algorithmic limit.
pub const MAX_STATE_BITS: u32 = 20;

/// Ceiling on the number of in-domain states.
pub const MAX_STATE_SPACE: u64 = 1 << 20;

/// Per-variable metadata owned by the layout.
///
/// The [`Var`] handle mirrors the field geometry; the name and enum labels
/// live only here and are reached by index.
#[derive(Debug, Clone)]
pub struct VarInfo {
    pub(crate) var: Var,
    pub(crate) name: Arc<str>,
    pub(crate) labels: Vec<Arc<str>>,
}

impl VarInfo {
    /// The variable's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handle for this variable.
    pub fn var(&self) -> Var {
        self.var
    }

    /// Enum labels in declaration order; empty for bools and ints.
    pub fn labels(&self) -> &[Arc<str>] {
        &self.labels
    }

    /// Index of a named enum label.
    pub(crate) fn label_index(&self, label: &str) -> Option<u32> {
        self.labels
            .iter()
            .position(|l| l.as_ref() == label)
            .map(|i| i as u32)
    }
}

/// Ordered variable metadata plus the total packed width.
///
/// A layout is built once during declaration and never mutated afterwards;
/// states share it behind an `Arc`. Field offsets follow declaration order,
/// so the same declarations always produce the same packed encoding (the
/// exported artifact relies on this to rebuild the layout from variable
/// specs alone).
#[derive(Debug, Clone, Default)]
pub struct Layout {
    vars: Vec<VarInfo>,
    total_bits: u32,
    decl_errors: Vec<String>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Layout::default()
    }

    /// Declare a boolean variable: one bit, domain 2.
    pub fn add_bool(&mut self, name: &str) -> Var {
        self.add(name, VarKind::Bool, 2, 0, Vec::new())
    }

    /// Declare an enumerated variable over the given labels.
    ///
    /// Fewer than two labels is recorded as a declaration error and
    /// reported at finalize time.
    pub fn add_enum(&mut self, name: &str, labels: &[&str]) -> Var {
        if labels.len() < 2 {
            self.decl_errors.push(format!(
                "enum {:?} needs at least 2 labels, got {}",
                name,
                labels.len()
            ));
        }
        let owned: Vec<Arc<str>> = labels.iter().map(|l| Arc::from(*l)).collect();
        self.add(name, VarKind::Enum, labels.len() as i128, 0, owned)
    }

    /// Declare a bounded integer variable over `[min, max]`.
    ///
    /// `max < min` is recorded as a declaration error and reported at
    /// finalize time.
    pub fn add_int(&mut self, name: &str, min: i64, max: i64) -> Var {
        if max < min {
            self.decl_errors
                .push(format!("int {:?} has max {} < min {}", name, max, min));
            return self.add(name, VarKind::Int, 0, min, Vec::new());
        }
        let domain = max as i128 - min as i128 + 1;
        self.add(name, VarKind::Int, domain, min, Vec::new())
    }

    fn add(
        &mut self,
        name: &str,
        kind: VarKind,
        domain: i128,
        min: i64,
        labels: Vec<Arc<str>>,
    ) -> Var {
        if self.vars.iter().any(|vi| vi.name.as_ref() == name) {
            self.decl_errors
                .push(format!("duplicate variable name {:?}", name));
        }
        // Saturate oversized domains; the width check at finalize rejects
        // them long before any table is sized from the stored value.
        let domain = domain.clamp(0, u32::MAX as i128) as u32;
        let bits = bits_needed(domain as u64);
        let var = Var {
            index: self.vars.len() as u16,
            kind,
            offset: self.total_bits,
            bits,
            domain,
            min,
        };
        self.total_bits += bits;
        self.vars.push(VarInfo {
            var,
            name: Arc::from(name),
            labels,
        });
        var
    }

    /// Declaration errors recorded so far, in declaration order.
    pub fn declaration_errors(&self) -> &[String] {
        &self.decl_errors
    }

    /// All variables in declaration order.
    pub fn vars(&self) -> &[VarInfo] {
        &self.vars
    }

    /// Metadata for the variable at `index`.
    pub fn info(&self, index: usize) -> &VarInfo {
        &self.vars[index]
    }

    /// Look up a variable handle by name.
    pub fn var_by_name(&self, name: &str) -> Option<Var> {
        self.vars
            .iter()
            .find(|vi| vi.name.as_ref() == name)
            .map(|vi| vi.var)
    }

    /// Number of declared variables.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Total packed width in bits.
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Size of the padded address space, `2^B`.
    ///
    /// Callers must have checked `total_bits() <= MAX_STATE_BITS` first.
    pub fn padded_len(&self) -> usize {
        debug_assert!(self.total_bits <= MAX_STATE_BITS);
        1usize << self.total_bits
    }

    /// Number of in-domain states, the product of all domain sizes.
    pub fn domain_len(&self) -> u64 {
        self.vars
            .iter()
            .fold(1u64, |acc, vi| acc.saturating_mul(vi.var.domain as u64))
    }

    /// Pack one raw field value per variable into an id.
    ///
    /// Each field must satisfy `raw < domain`; values are masked to their
    /// field width.
    pub fn pack(&self, fields: &[u32]) -> u32 {
        debug_assert_eq!(fields.len(), self.vars.len());
        self.vars
            .iter()
            .zip(fields)
            .fold(0, |id, (vi, &raw)| vi.var.write(id, raw))
    }

    /// Does every field of `id` decode to an in-domain raw value?
    #[inline]
    pub fn is_in_domain(&self, id: u32) -> bool {
        self.vars.iter().all(|vi| vi.var.raw(id) < vi.var.domain)
    }

    /// Saturate every out-of-range field of `id` at `domain - 1`.
    ///
    /// Arithmetic effects may overrun a declared range; without this the
    /// field bits would wrap modulo `2^w` and silently produce a wrong
    /// value. Saturating preserves the intent of the write and leaves any
    /// real invariant free to fire a repair afterwards.
    pub fn clamp(&self, id: u32) -> u32 {
        let mut id = id;
        for vi in &self.vars {
            let v = vi.var;
            if v.raw(id) >= v.domain {
                id = v.write(id, v.domain - 1);
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_layout() -> (Layout, Var, Var, Var) {
        let mut layout = Layout::new();
        let status = layout.add_enum("status", &["pending", "paid", "shipped", "cancelled"]);
        let paid = layout.add_bool("paid");
        let inventory = layout.add_int("inventory", 0, 5);
        (layout, status, paid, inventory)
    }

    #[test]
    fn offsets_follow_declaration_order() {
        let (layout, status, paid, inventory) = mixed_layout();
        assert_eq!(status.offset(), 0);
        assert_eq!(status.bits(), 2);
        assert_eq!(paid.offset(), 2);
        assert_eq!(paid.bits(), 1);
        assert_eq!(inventory.offset(), 3);
        assert_eq!(inventory.bits(), 3);
        assert_eq!(layout.total_bits(), 6);
        assert_eq!(layout.padded_len(), 64);
        assert_eq!(layout.domain_len(), 4 * 2 * 6);
    }

    #[test]
    fn padding_codes_are_out_of_domain() {
        let mut layout = Layout::new();
        let tri = layout.add_enum("tri", &["a", "b", "c"]);
        assert_eq!(tri.bits(), 2);
        assert!(layout.is_in_domain(tri.write(0, 2)));
        // The unused code 0b11 must be rejected.
        assert!(!layout.is_in_domain(tri.write(0, 3)));
    }

    #[test]
    fn clamp_saturates_at_domain_top() {
        let (layout, _, _, inventory) = mixed_layout();
        // inventory has domain 6 in a 3-bit field; raw 7 is representable
        // but out of domain.
        let id = inventory.write(0, 7);
        assert!(!layout.is_in_domain(id));
        let clamped = layout.clamp(id);
        assert_eq!(inventory.raw(clamped), 5);
        assert!(layout.is_in_domain(clamped));
    }

    #[test]
    fn pack_combines_fields() {
        let (layout, status, paid, inventory) = mixed_layout();
        let id = layout.pack(&[1, 1, 4]);
        assert_eq!(status.raw(id), 1);
        assert_eq!(paid.raw(id), 1);
        assert_eq!(inventory.raw(id), 4);
    }

    #[test]
    fn declaration_errors_are_recorded_lazily() {
        let mut layout = Layout::new();
        layout.add_enum("empty", &[]);
        layout.add_int("backwards", 5, 2);
        layout.add_bool("flag");
        layout.add_bool("flag");
        let errors = layout.declaration_errors();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("at least 2 labels"));
        assert!(errors[1].contains("max 2 < min 5"));
        assert!(errors[2].contains("duplicate variable name"));
    }

    #[test]
    fn var_by_name_finds_handles() {
        let (layout, _, paid, _) = mixed_layout();
        assert_eq!(layout.var_by_name("paid").unwrap().index(), paid.index());
        assert!(layout.var_by_name("missing").is_none());
    }
}
