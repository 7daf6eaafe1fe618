//! Structured expression values
//!
//! A points-to predicate stores a [`Strexp`]: an atomic expression, a record
//! of named fields, or an array of indexed cells. Record fields are kept
//! sorted by the field-name total order and array cells by the stored index
//! handle; the matcher's merge walks assume both invariants.

use crate::expr::{ExprId, ExprManager};
use crate::ident::{FieldName, Ident};
use crate::sub::Sub;

/// Opaque provenance metadata attached to structured values.
///
/// Matching ignores it entirely; it is carried through so analysis results
/// can report where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inst {
    /// No recorded provenance.
    #[default]
    None,
    /// The value came from an allocation.
    Alloc,
    /// The value was produced by a heap update.
    Update,
}

/// A structured value stored by a points-to predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strexp {
    /// A single expression.
    Atom(ExprId, Inst),
    /// A record, fields sorted by name.
    Record(Vec<(FieldName, Strexp)>, Inst),
    /// An array with a symbolic size, cells sorted by index handle.
    Array {
        /// Number of cells the array holds.
        size: ExprId,
        /// The populated cells.
        cells: Vec<(ExprId, Strexp)>,
        /// Provenance.
        inst: Inst,
    },
}

impl Strexp {
    /// An atomic value with no provenance.
    pub fn atom(e: ExprId) -> Self {
        Strexp::Atom(e, Inst::None)
    }

    /// Build a record, sorting the fields by name.
    pub fn record(mut fields: Vec<(FieldName, Strexp)>, inst: Inst) -> Self {
        fields.sort_by_key(|&(f, _)| f);
        Strexp::Record(fields, inst)
    }

    /// Build an array, sorting the cells by index handle.
    pub fn array(size: ExprId, mut cells: Vec<(ExprId, Strexp)>, inst: Inst) -> Self {
        cells.sort_by_key(|&(i, _)| i);
        Strexp::Array { size, cells, inst }
    }

    /// Apply a substitution to every expression in the value.
    pub fn apply_sub(&self, tm: &mut ExprManager, sub: &Sub) -> Strexp {
        match self {
            Strexp::Atom(e, inst) => Strexp::Atom(sub.apply(tm, *e), *inst),
            Strexp::Record(fields, inst) => Strexp::Record(
                fields
                    .iter()
                    .map(|(f, se)| (*f, se.apply_sub(tm, sub)))
                    .collect(),
                *inst,
            ),
            Strexp::Array { size, cells, inst } => Strexp::Array {
                size: sub.apply(tm, *size),
                cells: cells
                    .iter()
                    .map(|(i, se)| (sub.apply(tm, *i), se.apply_sub(tm, sub)))
                    .collect(),
                inst: *inst,
            },
        }
    }

    /// Replace whole sub-expressions in the value (see [`ExprManager::replace`]).
    pub fn replace(&self, tm: &mut ExprManager, pairs: &[(ExprId, ExprId)]) -> Strexp {
        match self {
            Strexp::Atom(e, inst) => Strexp::Atom(tm.replace(pairs, *e), *inst),
            Strexp::Record(fields, inst) => Strexp::Record(
                fields
                    .iter()
                    .map(|(f, se)| (*f, se.replace(tm, pairs)))
                    .collect(),
                *inst,
            ),
            Strexp::Array { size, cells, inst } => Strexp::Array {
                size: tm.replace(pairs, *size),
                cells: cells
                    .iter()
                    .map(|(i, se)| (tm.replace(pairs, *i), se.replace(tm, pairs)))
                    .collect(),
                inst: *inst,
            },
        }
    }

    /// Add every identifier occurring in the value to `acc`.
    pub fn fav_add(&self, tm: &ExprManager, acc: &mut Vec<Ident>) {
        match self {
            Strexp::Atom(e, _) => tm.fav_add(*e, acc),
            Strexp::Record(fields, _) => {
                for (_, se) in fields {
                    se.fav_add(tm, acc);
                }
            }
            Strexp::Array { size, cells, .. } => {
                tm.fav_add(*size, acc);
                for (i, se) in cells {
                    tm.fav_add(*i, acc);
                    se.fav_add(tm, acc);
                }
            }
        }
    }
}
