//! Heap predicates
//!
//! The spatial part of a symbolic heap is a conjunction of [`HeapPred`]s:
//! points-to facts, singly-linked list segments and doubly-linked list
//! segments. Segments carry a parameter ([`LsegPara`] / [`DllPara`])
//! describing the shape of one cell; parameter bodies are closed under
//! their own formals and existential locals, so substitution into a
//! predicate never descends into a nested body.

use crate::error::{HeapError, Result};
use crate::expr::{ExprId, ExprManager};
use crate::ident::Ident;
use crate::strexp::Strexp;
use crate::sub::Sub;
use std::fmt;

/// Kind of a list segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegKind {
    /// The segment holds at least one cell.
    Ne,
    /// The segment may be empty.
    Pe,
}

impl fmt::Display for SegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegKind::Ne => write!(f, "ne"),
            SegKind::Pe => write!(f, "pe"),
        }
    }
}

/// Parameter of a singly-linked list segment: the shape of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsegPara {
    /// Formal root of the cell.
    pub root: Ident,
    /// Formal next pointer of the cell.
    pub next: Ident,
    /// Shared formals, bound at each use site by the segment's `shared` list.
    pub svars: Vec<Ident>,
    /// Existential locals of the body.
    pub evars: Vec<Ident>,
    /// The cell's spatial footprint. Never empty.
    pub body: Vec<HeapPred>,
}

/// Parameter of a doubly-linked list segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DllPara {
    /// Formal address of the cell.
    pub cell: Ident,
    /// Formal back pointer.
    pub blink: Ident,
    /// Formal forward pointer.
    pub flink: Ident,
    /// Shared formals.
    pub svars: Vec<Ident>,
    /// Existential locals of the body.
    pub evars: Vec<Ident>,
    /// The cell's spatial footprint. Never empty.
    pub body: Vec<HeapPred>,
}

fn check_formals(formals: &[Ident], body: &[HeapPred]) -> Result<()> {
    if body.is_empty() {
        return Err(HeapError::EmptyParaBody);
    }
    for (i, id) in formals.iter().enumerate() {
        if formals[..i].contains(id) {
            return Err(HeapError::DuplicateFormal(*id));
        }
    }
    Ok(())
}

impl LsegPara {
    /// Build a parameter, rejecting empty bodies and duplicate formals.
    pub fn new(
        root: Ident,
        next: Ident,
        svars: Vec<Ident>,
        evars: Vec<Ident>,
        body: Vec<HeapPred>,
    ) -> Result<Self> {
        let mut formals = vec![root, next];
        formals.extend_from_slice(&svars);
        formals.extend_from_slice(&evars);
        check_formals(&formals, &body)?;
        Ok(Self {
            root,
            next,
            svars,
            evars,
            body,
        })
    }

    /// Instantiate the one-cell body at `root`/`next` with the given shared
    /// actuals, replacing each existential local by a fresh primed
    /// identifier. Returns the fresh identifiers and the instantiated body.
    ///
    /// Panics when the shared actuals do not match the shared formals in
    /// number; that is a malformed segment, not a match failure.
    pub fn instantiate(
        &self,
        tm: &mut ExprManager,
        root: ExprId,
        next: ExprId,
        shared: &[ExprId],
    ) -> (Vec<Ident>, Vec<HeapPred>) {
        if shared.len() != self.svars.len() {
            panic!(
                "list-segment instantiation: {} shared actuals for {} formals",
                shared.len(),
                self.svars.len()
            );
        }
        let mut pairs = vec![(self.root, root), (self.next, next)];
        pairs.extend(self.svars.iter().copied().zip(shared.iter().copied()));
        let mut fresh = Vec::with_capacity(self.evars.len());
        for &ev in &self.evars {
            let id = tm.fresh_primed();
            fresh.push(id);
            let v = tm.mk_var(id);
            pairs.push((ev, v));
        }
        let sub = Sub::from_pairs(pairs);
        let body = self.body.iter().map(|p| p.apply_sub(tm, &sub)).collect();
        (fresh, body)
    }
}

impl DllPara {
    /// Build a parameter, rejecting empty bodies and duplicate formals.
    pub fn new(
        cell: Ident,
        blink: Ident,
        flink: Ident,
        svars: Vec<Ident>,
        evars: Vec<Ident>,
        body: Vec<HeapPred>,
    ) -> Result<Self> {
        let mut formals = vec![cell, blink, flink];
        formals.extend_from_slice(&svars);
        formals.extend_from_slice(&evars);
        check_formals(&formals, &body)?;
        Ok(Self {
            cell,
            blink,
            flink,
            svars,
            evars,
            body,
        })
    }

    /// Instantiate the one-cell body, as [`LsegPara::instantiate`].
    pub fn instantiate(
        &self,
        tm: &mut ExprManager,
        cell: ExprId,
        blink: ExprId,
        flink: ExprId,
        shared: &[ExprId],
    ) -> (Vec<Ident>, Vec<HeapPred>) {
        if shared.len() != self.svars.len() {
            panic!(
                "dll-segment instantiation: {} shared actuals for {} formals",
                shared.len(),
                self.svars.len()
            );
        }
        let mut pairs = vec![(self.cell, cell), (self.blink, blink), (self.flink, flink)];
        pairs.extend(self.svars.iter().copied().zip(shared.iter().copied()));
        let mut fresh = Vec::with_capacity(self.evars.len());
        for &ev in &self.evars {
            let id = tm.fresh_primed();
            fresh.push(id);
            let v = tm.mk_var(id);
            pairs.push((ev, v));
        }
        let sub = Sub::from_pairs(pairs);
        let body = self.body.iter().map(|p| p.apply_sub(tm, &sub)).collect();
        (fresh, body)
    }
}

/// One spatial conjunct of a symbolic heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapPred {
    /// `root ↦ value : ty`.
    PointsTo {
        /// Location being described.
        root: ExprId,
        /// Stored structured value.
        value: Strexp,
        /// Type expression of the stored value.
        ty: ExprId,
    },
    /// A singly-linked list segment from `from` to `to`.
    Lseg {
        /// Whether the segment may be empty.
        kind: SegKind,
        /// Shape of one cell.
        para: LsegPara,
        /// Entry pointer.
        from: ExprId,
        /// Exit pointer.
        to: ExprId,
        /// Actuals for the parameter's shared formals.
        shared: Vec<ExprId>,
    },
    /// A doubly-linked list segment.
    Dllseg {
        /// Whether the segment may be empty.
        kind: SegKind,
        /// Shape of one cell.
        para: DllPara,
        /// Entry pointer walking forward.
        in_fwd: ExprId,
        /// Exit pointer walking backward.
        out_back: ExprId,
        /// Exit pointer walking forward.
        out_fwd: ExprId,
        /// Entry pointer walking backward.
        in_back: ExprId,
        /// Actuals for the parameter's shared formals.
        shared: Vec<ExprId>,
    },
}

impl HeapPred {
    /// The root expression the predicate is anchored at.
    ///
    /// Roots are unique within a well-formed heap.
    pub fn root(&self) -> ExprId {
        match self {
            HeapPred::PointsTo { root, .. } => *root,
            HeapPred::Lseg { from, .. } => *from,
            HeapPred::Dllseg { in_fwd, .. } => *in_fwd,
        }
    }

    /// Apply a substitution to the predicate's expressions.
    ///
    /// Nested parameter bodies are closed and are left untouched.
    pub fn apply_sub(&self, tm: &mut ExprManager, sub: &Sub) -> HeapPred {
        match self {
            HeapPred::PointsTo { root, value, ty } => HeapPred::PointsTo {
                root: sub.apply(tm, *root),
                value: value.apply_sub(tm, sub),
                ty: sub.apply(tm, *ty),
            },
            HeapPred::Lseg {
                kind,
                para,
                from,
                to,
                shared,
            } => HeapPred::Lseg {
                kind: *kind,
                para: para.clone(),
                from: sub.apply(tm, *from),
                to: sub.apply(tm, *to),
                shared: shared.iter().map(|&e| sub.apply(tm, e)).collect(),
            },
            HeapPred::Dllseg {
                kind,
                para,
                in_fwd,
                out_back,
                out_fwd,
                in_back,
                shared,
            } => HeapPred::Dllseg {
                kind: *kind,
                para: para.clone(),
                in_fwd: sub.apply(tm, *in_fwd),
                out_back: sub.apply(tm, *out_back),
                out_fwd: sub.apply(tm, *out_fwd),
                in_back: sub.apply(tm, *in_back),
                shared: shared.iter().map(|&e| sub.apply(tm, e)).collect(),
            },
        }
    }

    /// Replace whole sub-expressions in the predicate (outermost match wins).
    ///
    /// Nested parameter bodies are closed and are left untouched.
    pub fn replace(&self, tm: &mut ExprManager, pairs: &[(ExprId, ExprId)]) -> HeapPred {
        match self {
            HeapPred::PointsTo { root, value, ty } => HeapPred::PointsTo {
                root: tm.replace(pairs, *root),
                value: value.replace(tm, pairs),
                ty: tm.replace(pairs, *ty),
            },
            HeapPred::Lseg {
                kind,
                para,
                from,
                to,
                shared,
            } => HeapPred::Lseg {
                kind: *kind,
                para: para.clone(),
                from: tm.replace(pairs, *from),
                to: tm.replace(pairs, *to),
                shared: shared.iter().map(|&e| tm.replace(pairs, e)).collect(),
            },
            HeapPred::Dllseg {
                kind,
                para,
                in_fwd,
                out_back,
                out_fwd,
                in_back,
                shared,
            } => HeapPred::Dllseg {
                kind: *kind,
                para: para.clone(),
                in_fwd: tm.replace(pairs, *in_fwd),
                out_back: tm.replace(pairs, *out_back),
                out_fwd: tm.replace(pairs, *out_fwd),
                in_back: tm.replace(pairs, *in_back),
                shared: shared.iter().map(|&e| tm.replace(pairs, e)).collect(),
            },
        }
    }

    /// Add every identifier occurring in the predicate's outer expressions.
    pub fn fav_add(&self, tm: &ExprManager, acc: &mut Vec<Ident>) {
        match self {
            HeapPred::PointsTo { root, value, ty } => {
                tm.fav_add(*root, acc);
                value.fav_add(tm, acc);
                tm.fav_add(*ty, acc);
            }
            HeapPred::Lseg {
                from, to, shared, ..
            } => {
                tm.fav_add(*from, acc);
                tm.fav_add(*to, acc);
                for &e in shared {
                    tm.fav_add(e, acc);
                }
            }
            HeapPred::Dllseg {
                in_fwd,
                out_back,
                out_fwd,
                in_back,
                shared,
                ..
            } => {
                tm.fav_add(*in_fwd, acc);
                tm.fav_add(*out_back, acc);
                tm.fav_add(*out_fwd, acc);
                tm.fav_add(*in_back, acc);
                for &e in shared {
                    tm.fav_add(e, acc);
                }
            }
        }
    }
}
