//! Partial isomorphism between sub-heaps
//!
//! [`find_partial_iso`] locates two disjoint sub-heaps related by a
//! bijection on rooted predicates, starting from a worklist of required
//! expression correspondences. The correspondence is a function on left
//! expressions and injective on right expressions; a pair whose left side
//! is already mapped elsewhere (or right side already used) kills the
//! candidate.
//!
//! The same generic walk serves the one-heap case (abstraction of two
//! adjacent list-shaped regions) and the two-heap case; callers supply the
//! `update` extractor that removes rooted predicates from the remaining
//! heap(s).

use crate::config::MatchConfig;
use crate::hpara::{hpara_dll_iso, hpara_iso};
use shale_heap::{ExprId, ExprManager, HeapPred, SegKind, Strexp};
use std::collections::VecDeque;
use tracing::trace;

/// Tolerance of the record walk while generating correspondence
/// obligations from two structured values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoMode {
    /// Field sets must coincide.
    Exact,
    /// The left record may carry extra fields.
    LFieldForget,
    /// The right record may carry extra fields.
    RFieldForget,
}

/// A list of agreed expression correspondences.
pub type Corres = Vec<(ExprId, ExprId)>;

/// Rewrite a list segment to possibly-empty kind; points-to facts pass
/// through.
pub fn hpred_lift_to_pe(hpred: HeapPred) -> HeapPred {
    match hpred {
        HeapPred::Lseg {
            para,
            from,
            to,
            shared,
            ..
        } => HeapPred::Lseg {
            kind: SegKind::Pe,
            para,
            from,
            to,
            shared,
        },
        HeapPred::Dllseg {
            para,
            in_fwd,
            out_back,
            out_fwd,
            in_back,
            shared,
            ..
        } => HeapPred::Dllseg {
            kind: SegKind::Pe,
            para,
            in_fwd,
            out_back,
            out_fwd,
            in_back,
            shared,
        },
        pred @ HeapPred::PointsTo { .. } => pred,
    }
}

/// Lift every segment of a spatial conjunction to possibly-empty kind.
pub fn sigma_lift_to_pe(sigma: Vec<HeapPred>) -> Vec<HeapPred> {
    sigma.into_iter().map(hpred_lift_to_pe).collect()
}

/// Remove the rooted predicate whose root is `eq`-equal to `e`.
///
/// Two predicates sharing a root violate the heap's well-formedness
/// contract and abort.
pub fn sigma_remove_hpred(
    eq: &dyn Fn(ExprId, ExprId) -> bool,
    sigma: Vec<HeapPred>,
    e: ExprId,
) -> (Option<HeapPred>, Vec<HeapPred>) {
    let (mut hits, rest): (Vec<_>, Vec<_>) = sigma.into_iter().partition(|p| eq(p.root(), e));
    match hits.len() {
        0 => (None, rest),
        1 => (hits.pop(), rest),
        n => panic!("{n} spatial predicates share one root"),
    }
}

/// Whether the pair is already accounted for: its left side maps to exactly
/// this right side, or neither side is used and the expressions coincide.
fn corres_related(corres: &Corres, e1: ExprId, e2: ExprId) -> bool {
    for &(a, b) in corres {
        if a == e1 {
            return b == e2;
        }
        if b == e2 {
            return a == e1;
        }
    }
    e1 == e2
}

/// Whether the pair can be added: left side unmapped, right side unused,
/// and the two expressions differ.
fn corres_extensible(corres: &Corres, e1: ExprId, e2: ExprId) -> bool {
    e1 != e2 && !corres.iter().any(|&(a, b)| a == e1 || b == e2)
}

fn corres_push(corres: &mut Corres, e1: ExprId, e2: ExprId) {
    if !corres.contains(&(e1, e2)) {
        corres.push((e1, e2));
    }
}

/// Emit correspondence obligations from matching atom positions of two
/// structured values. Records honour `mode`; arrays must agree on size and
/// cardinality, and each cell contributes its index pair as well as its
/// value obligations.
pub(crate) fn generate_todos_from_strexp(
    mode: IsoMode,
    acc: &mut Vec<(ExprId, ExprId)>,
    se1: &Strexp,
    se2: &Strexp,
) -> bool {
    match (se1, se2) {
        (Strexp::Atom(e1, _), Strexp::Atom(e2, _)) => {
            acc.push((*e1, *e2));
            true
        }
        (Strexp::Record(fel1, _), Strexp::Record(fel2, _)) => {
            generate_todos_from_fel(mode, acc, fel1, fel2)
        }
        (
            Strexp::Array {
                size: size1,
                cells: iel1,
                ..
            },
            Strexp::Array {
                size: size2,
                cells: iel2,
                ..
            },
        ) => size1 == size2 && generate_todos_from_iel(mode, acc, iel1, iel2),
        _ => false,
    }
}

fn generate_todos_from_fel(
    mode: IsoMode,
    acc: &mut Vec<(ExprId, ExprId)>,
    fel1: &[(shale_heap::FieldName, Strexp)],
    fel2: &[(shale_heap::FieldName, Strexp)],
) -> bool {
    match (fel1, fel2) {
        ([], []) => true,
        ([], [_, ..]) => mode == IsoMode::RFieldForget,
        ([_, ..], []) => mode == IsoMode::LFieldForget,
        ([(f1, se1), rest1 @ ..], [(f2, se2), rest2 @ ..]) => {
            if f1 == f2 {
                generate_todos_from_strexp(mode, acc, se1, se2)
                    && generate_todos_from_fel(mode, acc, rest1, rest2)
            } else if f1 < f2 && mode == IsoMode::LFieldForget {
                generate_todos_from_fel(mode, acc, rest1, fel2)
            } else if f1 > f2 && mode == IsoMode::RFieldForget {
                generate_todos_from_fel(mode, acc, fel1, rest2)
            } else {
                false
            }
        }
    }
}

fn generate_todos_from_iel(
    mode: IsoMode,
    acc: &mut Vec<(ExprId, ExprId)>,
    iel1: &[(ExprId, Strexp)],
    iel2: &[(ExprId, Strexp)],
) -> bool {
    match (iel1, iel2) {
        ([], []) => true,
        ([], [_, ..]) | ([_, ..], []) => false,
        ([(i1, se1), rest1 @ ..], [(i2, se2), rest2 @ ..]) => {
            acc.push((*i1, *i2));
            generate_todos_from_strexp(mode, acc, se1, se2)
                && generate_todos_from_iel(mode, acc, rest1, rest2)
        }
    }
}

/// Grow a correspondence until the worklist is empty, extracting rooted
/// predicates through `update` and pairing them structurally.
///
/// Returns the closed correspondence, the two collected sub-heaps (in
/// discovery order) and whatever remains of the searchable heap state.
pub(crate) fn generic_find_partial_iso<S, F>(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    mode: IsoMode,
    mut update: F,
    mut corres: Corres,
    todos: Vec<(ExprId, ExprId)>,
    sigma_todo: S,
) -> Option<(Corres, Vec<HeapPred>, Vec<HeapPred>, S)>
where
    F: FnMut(ExprId, ExprId, S) -> (Option<HeapPred>, Option<HeapPred>, S),
{
    let mut sigma1: Vec<HeapPred> = Vec::new();
    let mut sigma2: Vec<HeapPred> = Vec::new();
    let mut todos: VecDeque<(ExprId, ExprId)> = todos.into();
    let mut sigma_todo = sigma_todo;
    while let Some((e1, e2)) = todos.pop_front() {
        if corres_related(&corres, e1, e2) {
            corres_push(&mut corres, e1, e2);
            continue;
        }
        if !corres_extensible(&corres, e1, e2) {
            return None;
        }
        let (hpredo1, hpredo2, rest) = update(e1, e2, sigma_todo);
        sigma_todo = rest;
        match (hpredo1, hpredo2) {
            (None, None) => corres_push(&mut corres, e1, e2),
            (None, Some(_)) | (Some(_), None) => return None,
            (Some(hpred1), Some(hpred2)) => {
                match (&hpred1, &hpred2) {
                    (
                        HeapPred::PointsTo {
                            value: se1, ty: ty1, ..
                        },
                        HeapPred::PointsTo {
                            value: se2, ty: ty2, ..
                        },
                    ) => {
                        if ty1 != ty2 {
                            return None;
                        }
                        let mut fresh = Vec::new();
                        if !generate_todos_from_strexp(mode, &mut fresh, se1, se2) {
                            return None;
                        }
                        corres_push(&mut corres, e1, e2);
                        for pair in fresh.into_iter().rev() {
                            todos.push_front(pair);
                        }
                    }
                    (
                        HeapPred::Lseg {
                            kind: k1,
                            para: para1,
                            from: from1,
                            to: to1,
                            shared: shared1,
                        },
                        HeapPred::Lseg {
                            kind: k2,
                            para: para2,
                            from: from2,
                            to: to2,
                            shared: shared2,
                        },
                    ) => {
                        if k1 != k2
                            || shared1.len() != shared2.len()
                            || !hpara_iso(tm, cfg, para1, para2)
                        {
                            return None;
                        }
                        corres_push(&mut corres, e1, e2);
                        let mut fresh = vec![(*from1, *from2), (*to1, *to2)];
                        fresh.extend(shared1.iter().copied().zip(shared2.iter().copied()));
                        for pair in fresh.into_iter().rev() {
                            todos.push_front(pair);
                        }
                    }
                    (
                        HeapPred::Dllseg {
                            kind: k1,
                            para: para1,
                            in_fwd: if1,
                            out_back: ob1,
                            out_fwd: of1,
                            in_back: ib1,
                            shared: shared1,
                        },
                        HeapPred::Dllseg {
                            kind: k2,
                            para: para2,
                            in_fwd: if2,
                            out_back: ob2,
                            out_fwd: of2,
                            in_back: ib2,
                            shared: shared2,
                        },
                    ) => {
                        if k1 != k2
                            || shared1.len() != shared2.len()
                            || !hpara_dll_iso(tm, cfg, para1, para2)
                        {
                            return None;
                        }
                        corres_push(&mut corres, e1, e2);
                        let mut fresh =
                            vec![(*if1, *if2), (*ob1, *ob2), (*of1, *of2), (*ib1, *ib2)];
                        fresh.extend(shared1.iter().copied().zip(shared2.iter().copied()));
                        for pair in fresh.into_iter().rev() {
                            todos.push_front(pair);
                        }
                    }
                    _ => return None,
                }
                sigma1.push(hpred1);
                sigma2.push(hpred2);
            }
        }
    }
    trace!(
        pairs = corres.len(),
        preds = sigma1.len(),
        "correspondence closed"
    );
    Some((corres, sigma1, sigma2, sigma_todo))
}

/// Find two disjoint isomorphic sub-heaps of one spatial conjunction.
///
/// Runs in [`IsoMode::Exact`]. On success the two sub-heaps and the
/// leftover partition the input.
pub fn find_partial_iso(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    eq: &dyn Fn(ExprId, ExprId) -> bool,
    corres: Corres,
    todos: Vec<(ExprId, ExprId)>,
    sigma: Vec<HeapPred>,
) -> Option<(Corres, Vec<HeapPred>, Vec<HeapPred>, Vec<HeapPred>)> {
    let update = |e1: ExprId, e2: ExprId, sigma0: Vec<HeapPred>| {
        let (hpredo1, sigma_no1) = sigma_remove_hpred(eq, sigma0, e1);
        let (hpredo2, sigma_no12) = sigma_remove_hpred(eq, sigma_no1, e2);
        (hpredo1, hpredo2, sigma_no12)
    };
    generic_find_partial_iso(tm, cfg, IsoMode::Exact, update, corres, todos, sigma)
}

/// Find isomorphic sub-heaps across two spatial conjunctions, under the
/// given record tolerance.
#[allow(clippy::type_complexity)]
pub fn find_partial_iso_from_two_sigmas(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    mode: IsoMode,
    eq: &dyn Fn(ExprId, ExprId) -> bool,
    corres: Corres,
    todos: Vec<(ExprId, ExprId)>,
    sigma1: Vec<HeapPred>,
    sigma2: Vec<HeapPred>,
) -> Option<(
    Corres,
    Vec<HeapPred>,
    Vec<HeapPred>,
    (Vec<HeapPred>, Vec<HeapPred>),
)> {
    let update = |e1: ExprId, e2: ExprId, (s1, s2): (Vec<HeapPred>, Vec<HeapPred>)| {
        let (hpredo1, s1_rest) = sigma_remove_hpred(eq, s1, e1);
        let (hpredo2, s2_rest) = sigma_remove_hpred(eq, s2, e2);
        (hpredo1, hpredo2, (s1_rest, s2_rest))
    };
    generic_find_partial_iso(tm, cfg, mode, update, corres, todos, (sigma1, sigma2))
}
