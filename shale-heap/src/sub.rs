//! Substitutions
//!
//! A [`Sub`] is a finite map from identifiers to expressions. The matcher
//! grows one binding at a time while unifying a pattern against a heap;
//! domains are expected to contain only primed (existential) identifiers.
//!
//! Application is one-pass: a bound identifier is replaced by its image and
//! the image is not rewritten again. Substitutions produced by the matcher
//! never map an identifier to an expression containing another domain
//! identifier, which makes application idempotent.

use crate::expr::{ExprId, ExprKind, ExprManager};
use crate::ident::Ident;
use rustc_hash::FxHashMap;

/// A finite map from identifiers to expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sub {
    bindings: FxHashMap<Ident, ExprId>,
}

impl Sub {
    /// The empty substitution.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a substitution from binding pairs.
    ///
    /// Panics if the same identifier is bound to two different expressions.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Ident, ExprId)>) -> Self {
        let mut bindings = FxHashMap::default();
        for (id, e) in pairs {
            if let Some(prev) = bindings.insert(id, e)
                && prev != e
            {
                panic!("substitution binds {id} twice with different images");
            }
        }
        Self { bindings }
    }

    /// The image of `id`, if bound.
    pub fn lookup(&self, id: Ident) -> Option<ExprId> {
        self.bindings.get(&id).copied()
    }

    /// Whether `id` is in the domain.
    pub fn contains(&self, id: Ident) -> bool {
        self.bindings.contains_key(&id)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Extend with `id ↦ e`.
    ///
    /// Returns `None` when `id` is already bound to a different expression;
    /// rebinding to the same expression is a no-op.
    pub fn extend(&self, id: Ident, e: ExprId) -> Option<Sub> {
        match self.bindings.get(&id) {
            Some(&prev) if prev != e => None,
            _ => {
                let mut out = self.clone();
                out.bindings.insert(id, e);
                Some(out)
            }
        }
    }

    /// Union of two substitutions.
    ///
    /// The domains are expected to agree wherever they overlap; a
    /// conflicting binding is a caller bug and aborts.
    pub fn join(&self, other: &Sub) -> Sub {
        let mut out = self.clone();
        for (&id, &e) in &other.bindings {
            if let Some(&prev) = out.bindings.get(&id)
                && prev != e
            {
                panic!("substitution join conflicts on {id}");
            }
            out.bindings.insert(id, e);
        }
        out
    }

    /// Keep only the bindings whose identifier satisfies `keep`.
    pub fn filter(&self, keep: impl Fn(Ident) -> bool) -> Sub {
        Sub {
            bindings: self
                .bindings
                .iter()
                .filter(|(id, _)| keep(**id))
                .map(|(&id, &e)| (id, e))
                .collect(),
        }
    }

    /// The domain, sorted for deterministic iteration.
    pub fn domain_sorted(&self) -> Vec<Ident> {
        let mut ids: Vec<Ident> = self.bindings.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All bindings, sorted by identifier.
    pub fn bindings_sorted(&self) -> Vec<(Ident, ExprId)> {
        let mut out: Vec<(Ident, ExprId)> = self.bindings.iter().map(|(&i, &e)| (i, e)).collect();
        out.sort_unstable_by_key(|&(id, _)| id);
        out
    }

    /// Apply the substitution to `e`, sharing unchanged subterms.
    pub fn apply(&self, tm: &mut ExprManager, e: ExprId) -> ExprId {
        if self.is_empty() {
            return e;
        }
        match *tm.kind(e) {
            ExprKind::Var(id) => self.lookup(id).unwrap_or(e),
            ExprKind::Const(_) | ExprKind::Sizeof(_) | ExprKind::Lvar(_) => e,
            ExprKind::Cast(ty, e1) => {
                let e1n = self.apply(tm, e1);
                if e1n == e1 { e } else { tm.mk_cast(ty, e1n) }
            }
            ExprKind::UnOp(op, e1, ty) => {
                let e1n = self.apply(tm, e1);
                if e1n == e1 { e } else { tm.mk_unop(op, e1n, ty) }
            }
            ExprKind::BinOp(op, e1, e2) => {
                let e1n = self.apply(tm, e1);
                let e2n = self.apply(tm, e2);
                if e1n == e1 && e2n == e2 {
                    e
                } else {
                    tm.mk_binop(op, e1n, e2n)
                }
            }
            ExprKind::Lfield(e1, fld, ty) => {
                let e1n = self.apply(tm, e1);
                if e1n == e1 { e } else { tm.mk_lfield(e1n, fld, ty) }
            }
            ExprKind::Lindex(e1, e2) => {
                let e1n = self.apply(tm, e1);
                let e2n = self.apply(tm, e2);
                if e1n == e1 && e2n == e2 {
                    e
                } else {
                    tm.mk_lindex(e1n, e2n)
                }
            }
        }
    }
}
