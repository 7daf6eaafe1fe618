//! Identifiers and interned names
//!
//! Identifiers are the logical variables of a symbolic heap. Each one is a
//! kind paired with a stamp drawn from the [`ExprManager`]'s monotonic
//! counter; only the `Primed` kind is eligible for unification.
//!
//! Program variables, record fields and type names are interned strings.
//! Their handles compare by intern key, which gives record fields the total
//! order used to keep field lists sorted.
//!
//! [`ExprManager`]: crate::expr::ExprManager

use lasso::Spur;
use std::fmt;

/// Kind of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentKind {
    /// Ordinary program-level identifier.
    Normal,
    /// Logical (existential) variable. The only kind the matcher may bind.
    Primed,
    /// Identifier belonging to the footprint part of a symbolic state.
    Footprint,
}

impl IdentKind {
    fn tag(self) -> char {
        match self {
            IdentKind::Normal => 'n',
            IdentKind::Primed => 'p',
            IdentKind::Footprint => 'f',
        }
    }
}

/// An identifier: a kind together with a stamp.
///
/// Stamps are expected to be unique per manager; fresh identifiers come from
/// [`ExprManager::fresh_ident`](crate::expr::ExprManager::fresh_ident).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident {
    kind: IdentKind,
    stamp: u32,
}

impl Ident {
    /// Create an identifier with an explicit stamp.
    ///
    /// Callers that mix explicitly stamped identifiers with manager-created
    /// ones must keep the stamp spaces disjoint.
    pub const fn new(kind: IdentKind, stamp: u32) -> Self {
        Self { kind, stamp }
    }

    /// The identifier's kind.
    pub const fn kind(self) -> IdentKind {
        self.kind
    }

    /// The identifier's stamp.
    pub const fn stamp(self) -> u32 {
        self.stamp
    }

    /// Whether this is a logical (existential) variable.
    pub const fn is_primed(self) -> bool {
        matches!(self.kind, IdentKind::Primed)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}", self.kind.tag(), self.stamp)
    }
}

/// An interned program-variable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pvar(pub(crate) Spur);

/// An interned record field name.
///
/// Field lists in structured values are kept sorted by this handle's `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldName(pub(crate) Spur);

/// An interned type name, used by sizeof, casts and points-to types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeName(pub(crate) Spur);
