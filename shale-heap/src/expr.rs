//! Hash-consed expression arena
//!
//! Expressions are stored once in an [`ExprManager`] and referred to by
//! [`ExprId`] handles. Building the same expression twice yields the same
//! handle, so syntactic equality of expressions is equality of ids. The
//! manager also owns the name interner and the monotonic stamp counter that
//! fresh identifiers are drawn from.
//!
//! All constructors perform structural sharing: substituting into an
//! expression whose subterms are unchanged returns the original handle.

use crate::ident::{FieldName, Ident, IdentKind, Pvar, TypeName};
use lasso::{Rodeo, Spur};
use num_bigint::BigInt;
use rustc_hash::FxHashMap;
use std::fmt;

/// Handle to an expression stored in an [`ExprManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(u32);

impl ExprId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    BNot,
    /// Logical negation.
    LNot,
}

/// Binary operators.
///
/// Matching over binary expressions is syntactic: no commutativity or other
/// algebraic normalisation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BinOp {
    PlusA,
    MinusA,
    Mult,
    Div,
    Mod,
    Shiftlt,
    Shiftrt,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BAnd,
    BXor,
    BOr,
    LAnd,
    LOr,
}

/// Constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Const {
    /// Integer literal.
    Int(BigInt),
    /// Interned string literal.
    Str(Spur),
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(n) => write!(f, "{n}"),
            Const::Str(_) => write!(f, "\"<str>\""),
        }
    }
}

/// The shape of one expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// A logical identifier.
    Var(Ident),
    /// A constant.
    Const(Const),
    /// The size of a named type.
    Sizeof(TypeName),
    /// A cast. The target type is ignored by matching.
    Cast(TypeName, ExprId),
    /// A unary operation, with an optional result type annotation.
    UnOp(UnOp, ExprId, Option<TypeName>),
    /// A binary operation.
    BinOp(BinOp, ExprId, ExprId),
    /// A program variable.
    Lvar(Pvar),
    /// A field offset from a base expression.
    Lfield(ExprId, FieldName, TypeName),
    /// An array index off a base expression.
    Lindex(ExprId, ExprId),
}

/// Arena, interner and fresh-identifier source for the term algebra.
#[derive(Debug)]
pub struct ExprManager {
    kinds: Vec<ExprKind>,
    dedup: FxHashMap<ExprKind, ExprId>,
    names: Rodeo,
    next_stamp: u32,
}

impl Default for ExprManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            dedup: FxHashMap::default(),
            names: Rodeo::default(),
            next_stamp: 0,
        }
    }

    fn intern(&mut self, kind: ExprKind) -> ExprId {
        if let Some(&id) = self.dedup.get(&kind) {
            return id;
        }
        let id = ExprId(u32::try_from(self.kinds.len()).unwrap_or_else(|_| {
            panic!("expression arena overflow");
        }));
        self.kinds.push(kind.clone());
        self.dedup.insert(kind, id);
        id
    }

    /// The node stored under `e`.
    pub fn kind(&self, e: ExprId) -> &ExprKind {
        &self.kinds[e.index()]
    }

    /// Number of distinct expressions stored so far.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    // ---- fresh identifiers ------------------------------------------------

    /// Create a fresh identifier of the given kind.
    pub fn fresh_ident(&mut self, kind: IdentKind) -> Ident {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        Ident::new(kind, stamp)
    }

    /// Create a fresh primed (existential) identifier.
    pub fn fresh_primed(&mut self) -> Ident {
        self.fresh_ident(IdentKind::Primed)
    }

    // ---- names ------------------------------------------------------------

    /// Intern a field name.
    pub fn field(&mut self, name: &str) -> FieldName {
        FieldName(self.names.get_or_intern(name))
    }

    /// Intern a type name.
    pub fn type_name(&mut self, name: &str) -> TypeName {
        TypeName(self.names.get_or_intern(name))
    }

    /// Resolve a field name back to its string.
    pub fn field_str(&self, f: FieldName) -> &str {
        self.names.resolve(&f.0)
    }

    /// Resolve a type name back to its string.
    pub fn type_str(&self, t: TypeName) -> &str {
        self.names.resolve(&t.0)
    }

    /// Resolve a program-variable name back to its string.
    pub fn pvar_str(&self, p: Pvar) -> &str {
        self.names.resolve(&p.0)
    }

    // ---- constructors -----------------------------------------------------

    /// An identifier expression.
    pub fn mk_var(&mut self, id: Ident) -> ExprId {
        self.intern(ExprKind::Var(id))
    }

    /// An integer constant.
    pub fn mk_int(&mut self, n: impl Into<BigInt>) -> ExprId {
        self.intern(ExprKind::Const(Const::Int(n.into())))
    }

    /// A string constant.
    pub fn mk_str(&mut self, s: &str) -> ExprId {
        let spur = self.names.get_or_intern(s);
        self.intern(ExprKind::Const(Const::Str(spur)))
    }

    /// The size of a named type.
    pub fn mk_sizeof(&mut self, ty: &str) -> ExprId {
        let ty = self.type_name(ty);
        self.intern(ExprKind::Sizeof(ty))
    }

    /// A cast of `e` to a named type.
    pub fn mk_cast(&mut self, ty: TypeName, e: ExprId) -> ExprId {
        self.intern(ExprKind::Cast(ty, e))
    }

    /// A unary operation.
    pub fn mk_unop(&mut self, op: UnOp, e: ExprId, ty: Option<TypeName>) -> ExprId {
        self.intern(ExprKind::UnOp(op, e, ty))
    }

    /// A binary operation.
    pub fn mk_binop(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.intern(ExprKind::BinOp(op, lhs, rhs))
    }

    /// A program variable.
    pub fn mk_lvar(&mut self, name: &str) -> ExprId {
        let pv = Pvar(self.names.get_or_intern(name));
        self.intern(ExprKind::Lvar(pv))
    }

    /// A field offset `base.fld` with its struct type.
    pub fn mk_lfield(&mut self, base: ExprId, fld: FieldName, ty: TypeName) -> ExprId {
        self.intern(ExprKind::Lfield(base, fld, ty))
    }

    /// An array index `base[idx]`.
    pub fn mk_lindex(&mut self, base: ExprId, idx: ExprId) -> ExprId {
        self.intern(ExprKind::Lindex(base, idx))
    }

    // ---- traversals -------------------------------------------------------

    /// Whether identifier `id` occurs anywhere in `e`.
    pub fn ident_in_expr(&self, id: Ident, e: ExprId) -> bool {
        match *self.kind(e) {
            ExprKind::Var(id1) => id1 == id,
            ExprKind::Const(_) | ExprKind::Sizeof(_) | ExprKind::Lvar(_) => false,
            ExprKind::Cast(_, e1) | ExprKind::UnOp(_, e1, _) => self.ident_in_expr(id, e1),
            ExprKind::BinOp(_, e1, e2) | ExprKind::Lindex(e1, e2) => {
                self.ident_in_expr(id, e1) || self.ident_in_expr(id, e2)
            }
            ExprKind::Lfield(e1, _, _) => self.ident_in_expr(id, e1),
        }
    }

    /// Add every identifier occurring in `e` to `acc`, in occurrence order.
    pub fn fav_add(&self, e: ExprId, acc: &mut Vec<Ident>) {
        match *self.kind(e) {
            ExprKind::Var(id) => {
                if !acc.contains(&id) {
                    acc.push(id);
                }
            }
            ExprKind::Const(_) | ExprKind::Sizeof(_) | ExprKind::Lvar(_) => {}
            ExprKind::Cast(_, e1) | ExprKind::UnOp(_, e1, _) | ExprKind::Lfield(e1, _, _) => {
                self.fav_add(e1, acc);
            }
            ExprKind::BinOp(_, e1, e2) | ExprKind::Lindex(e1, e2) => {
                self.fav_add(e1, acc);
                self.fav_add(e2, acc);
            }
        }
    }

    /// Replace whole sub-expressions according to an association list.
    ///
    /// The outermost match wins: when `e` itself is the left side of a pair
    /// the right side is returned without descending further.
    pub fn replace(&mut self, pairs: &[(ExprId, ExprId)], e: ExprId) -> ExprId {
        if let Some(&(_, to)) = pairs.iter().find(|&&(from, _)| from == e) {
            return to;
        }
        match *self.kind(e) {
            ExprKind::Var(_) | ExprKind::Const(_) | ExprKind::Sizeof(_) | ExprKind::Lvar(_) => e,
            ExprKind::Cast(ty, e1) => {
                let e1n = self.replace(pairs, e1);
                if e1n == e1 { e } else { self.mk_cast(ty, e1n) }
            }
            ExprKind::UnOp(op, e1, ty) => {
                let e1n = self.replace(pairs, e1);
                if e1n == e1 { e } else { self.mk_unop(op, e1n, ty) }
            }
            ExprKind::BinOp(op, e1, e2) => {
                let e1n = self.replace(pairs, e1);
                let e2n = self.replace(pairs, e2);
                if e1n == e1 && e2n == e2 {
                    e
                } else {
                    self.mk_binop(op, e1n, e2n)
                }
            }
            ExprKind::Lfield(e1, fld, ty) => {
                let e1n = self.replace(pairs, e1);
                if e1n == e1 { e } else { self.mk_lfield(e1n, fld, ty) }
            }
            ExprKind::Lindex(e1, e2) => {
                let e1n = self.replace(pairs, e1);
                let e2n = self.replace(pairs, e2);
                if e1n == e1 && e2n == e2 {
                    e
                } else {
                    self.mk_lindex(e1n, e2n)
                }
            }
        }
    }

    /// Render `e` for diagnostics.
    pub fn expr_to_string(&self, e: ExprId) -> String {
        match self.kind(e) {
            ExprKind::Var(id) => id.to_string(),
            ExprKind::Const(Const::Str(s)) => format!("{:?}", self.names.resolve(s)),
            ExprKind::Const(c) => c.to_string(),
            ExprKind::Sizeof(ty) => format!("sizeof({})", self.type_str(*ty)),
            ExprKind::Cast(ty, e1) => {
                format!("({}){}", self.type_str(*ty), self.expr_to_string(*e1))
            }
            ExprKind::UnOp(op, e1, _) => format!("{:?}({})", op, self.expr_to_string(*e1)),
            ExprKind::BinOp(op, e1, e2) => format!(
                "({} {:?} {})",
                self.expr_to_string(*e1),
                op,
                self.expr_to_string(*e2)
            ),
            ExprKind::Lvar(pv) => format!("&{}", self.pvar_str(*pv)),
            ExprKind::Lfield(e1, fld, _) => {
                format!("{}.{}", self.expr_to_string(*e1), self.field_str(*fld))
            }
            ExprKind::Lindex(e1, e2) => {
                format!("{}[{}]", self.expr_to_string(*e1), self.expr_to_string(*e2))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_dedups_constants() {
        let mut tm = ExprManager::new();
        let a = tm.mk_int(7);
        let b = tm.mk_int(7);
        assert_eq!(a, b);
        assert_ne!(a, tm.mk_int(8));
    }

    #[test]
    fn hash_consing_dedups_compound_expressions() {
        let mut tm = ExprManager::new();
        let x = tm.fresh_primed();
        let vx = tm.mk_var(x);
        let one = tm.mk_int(1);
        let s1 = tm.mk_binop(BinOp::PlusA, vx, one);
        let s2 = tm.mk_binop(BinOp::PlusA, vx, one);
        assert_eq!(s1, s2);
    }

    #[test]
    fn fresh_idents_are_distinct_and_monotonic() {
        let mut tm = ExprManager::new();
        let a = tm.fresh_primed();
        let b = tm.fresh_ident(IdentKind::Normal);
        let c = tm.fresh_primed();
        assert_ne!(a, c);
        assert!(a.stamp() < b.stamp() && b.stamp() < c.stamp());
    }

    #[test]
    fn occurs_check_descends_into_subterms() {
        let mut tm = ExprManager::new();
        let x = tm.fresh_primed();
        let y = tm.fresh_primed();
        let vx = tm.mk_var(x);
        let two = tm.mk_int(2);
        let e = tm.mk_binop(BinOp::Mult, two, vx);
        let fld = tm.field("next");
        let node = tm.type_name("node");
        let deep = tm.mk_lfield(e, fld, node);
        assert!(tm.ident_in_expr(x, deep));
        assert!(!tm.ident_in_expr(y, deep));
    }

    #[test]
    fn replace_prefers_outermost_match() {
        let mut tm = ExprManager::new();
        let x = tm.fresh_primed();
        let vx = tm.mk_var(x);
        let one = tm.mk_int(1);
        let sum = tm.mk_binop(BinOp::PlusA, vx, one);
        let zero = tm.mk_int(0);
        let ten = tm.mk_int(10);
        // Both the whole sum and its variable are mapped; the sum wins.
        let out = tm.replace(&[(sum, zero), (vx, ten)], sum);
        assert_eq!(out, zero);
        // Below the root, the variable mapping applies.
        let neg = tm.mk_unop(UnOp::Neg, sum, None);
        let out = tm.replace(&[(vx, ten)], neg);
        let expected_sum = tm.mk_binop(BinOp::PlusA, ten, one);
        let expected = tm.mk_unop(UnOp::Neg, expected_sum, None);
        assert_eq!(out, expected);
    }

    #[test]
    fn replace_shares_unchanged_subtrees() {
        let mut tm = ExprManager::new();
        let x = tm.fresh_primed();
        let vx = tm.mk_var(x);
        let one = tm.mk_int(1);
        let sum = tm.mk_binop(BinOp::PlusA, one, one);
        let out = tm.replace(&[(vx, one)], sum);
        assert_eq!(out, sum);
    }

    #[test]
    fn fav_add_collects_each_ident_once() {
        let mut tm = ExprManager::new();
        let x = tm.fresh_primed();
        let vx = tm.mk_var(x);
        let e = tm.mk_binop(BinOp::PlusA, vx, vx);
        let mut acc = Vec::new();
        tm.fav_add(e, &mut acc);
        assert_eq!(acc, vec![x]);
    }

    #[test]
    fn expr_to_string_renders_structure() {
        let mut tm = ExprManager::new();
        let base = tm.mk_lvar("p");
        let fld = tm.field("next");
        let node = tm.type_name("node");
        let e = tm.mk_lfield(base, fld, node);
        assert_eq!(tm.expr_to_string(e), "&p.next");
    }
}
