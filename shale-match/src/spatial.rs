//! Spatial matching
//!
//! [`prop_match_with_impl`] drives a backtracking search that aligns a
//! pattern (a list of [`HPat`]s) with the spatial conjunction of a heap.
//! For each pattern head the search focuses candidate predicates through
//! the heap's iterator; on a hit it either commits (no pattern tail) or
//! tries "consume the focus and continue" before falling back to "advance
//! to the next candidate".
//!
//! List-segment pattern heads have two extra moves when no focus matches:
//! a possibly-empty segment may collapse against the unchanged heap, and
//! any segment may unfold into its one-cell parameter body. Unfolded body
//! predicates always carry `impl_flag = true`, whatever the head carried.

use crate::config::MatchConfig;
use crate::hpara::{hpara_dll_match, hpara_match};
use crate::unify::{exp_list_match, exp_match, strexp_match};
use shale_heap::{
    DllPara, ExprId, ExprManager, HeapPred, Ident, LsegPara, Prop, PropIter, SegKind, Sub,
};
use smallvec::SmallVec;
use tracing::trace;

/// A pattern entry: a heap predicate plus its implication flag.
///
/// With `impl_flag` unset the predicate must be matched by an equal focused
/// predicate. Setting it additionally lets a list-segment pattern collapse
/// against the empty heap (when possibly-empty) or unfold into its
/// parameter body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HPat {
    /// The pattern predicate.
    pub pred: HeapPred,
    /// Whether implicational discharge of the predicate is allowed.
    pub impl_flag: bool,
}

/// Side condition over a candidate leftover heap and substitution.
pub type SideCondition<'a> = &'a dyn Fn(&Prop, &Sub) -> bool;

/// Kind subsumption for a focused segment against a pattern segment: a
/// non-empty focus discharges either kind, a possibly-empty focus only a
/// possibly-empty pattern.
fn kinds_compatible(focus: SegKind, pattern: SegKind) -> bool {
    !(focus == SegKind::Pe && pattern == SegKind::Ne)
}

/// Extend `sub` with a fresh-primed renaming of `vars`, so leftover
/// existentials cannot escape into the result.
fn sub_extend_with_ren(tm: &mut ExprManager, sub: &Sub, vars: &[Ident]) -> Sub {
    let mut pairs = Vec::with_capacity(vars.len());
    for &id in vars {
        let fresh = tm.fresh_primed();
        let image = tm.mk_var(fresh);
        pairs.push((id, image));
    }
    sub.join(&Sub::from_pairs(pairs))
}

fn fully_instantiated(tm: &ExprManager, vars: &[Ident], e: ExprId) -> bool {
    !vars.iter().any(|&id| tm.ident_in_expr(id, e))
}

/// Decide `P ⊢ (head :: tail)[σ] * P'` for some σ over `vars`, returning
/// the witnessing substitution (closed over `vars`) and the leftover heap.
///
/// `condition` prunes candidate results; it must be a total predicate.
pub fn prop_match_with_impl(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    prop: Prop,
    condition: SideCondition<'_>,
    vars: Vec<Ident>,
    hpat: &HPat,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    prop_match_with_impl_sub(tm, cfg, prop, condition, Sub::empty(), vars, hpat, hpats)
}

/// As [`prop_match_with_impl`], threading a starting substitution.
#[allow(clippy::too_many_arguments)]
pub(crate) fn prop_match_with_impl_sub(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    prop: Prop,
    condition: SideCondition<'_>,
    sub: Sub,
    vars: Vec<Ident>,
    hpat: &HPat,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    match PropIter::create(prop) {
        Err(empty) => {
            let mut pats = Vec::with_capacity(1 + hpats.len());
            pats.push(hpat.clone());
            pats.extend_from_slice(hpats);
            instantiate_to_emp(tm, empty, condition, sub, vars, &pats)
        }
        Ok(iter) => iter_match_with_impl(tm, cfg, iter, condition, &sub, &vars, hpat, hpats),
    }
}

/// Discharge every remaining pattern entry against the empty heap: only
/// implicational possibly-empty segments whose start side is fully
/// instantiated can collapse.
fn instantiate_to_emp(
    tm: &mut ExprManager,
    prop: Prop,
    condition: SideCondition<'_>,
    mut sub: Sub,
    mut vars: Vec<Ident>,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    for hpat in hpats {
        if !hpat.impl_flag {
            return None;
        }
        match &hpat.pred {
            HeapPred::PointsTo { .. }
            | HeapPred::Lseg {
                kind: SegKind::Ne, ..
            }
            | HeapPred::Dllseg {
                kind: SegKind::Ne, ..
            } => return None,
            HeapPred::Lseg { from, to, .. } => {
                if !fully_instantiated(tm, &vars, *from) {
                    return None;
                }
                let from_inst = sub.apply(tm, *from);
                let (sub_new, vars_leftover) = exp_match(tm, from_inst, &sub, &vars, *to)?;
                sub = sub_new;
                vars = vars_leftover;
            }
            HeapPred::Dllseg {
                in_fwd,
                out_back,
                out_fwd,
                in_back,
                ..
            } => {
                if !fully_instantiated(tm, &vars, *in_fwd)
                    || !fully_instantiated(tm, &vars, *out_back)
                {
                    return None;
                }
                let if_inst = sub.apply(tm, *in_fwd);
                let ob_inst = sub.apply(tm, *out_back);
                let (sub_new, vars_leftover) =
                    exp_list_match(tm, &[if_inst, ob_inst], &sub, &vars, &[*out_fwd, *in_back])?;
                sub = sub_new;
                vars = vars_leftover;
            }
        }
        trace!("pattern segment collapsed against the empty heap");
    }
    if condition(&prop, &sub) {
        Some((sub, prop))
    } else {
        None
    }
}

/// Commit the focused predicate as the match of the last pattern entry.
fn commit_focus(
    tm: &mut ExprManager,
    iter_cur: PropIter,
    condition: SideCondition<'_>,
) -> Option<(Sub, Prop)> {
    let (sub_new, vars_leftover) = iter_cur.state().clone();
    let sub_res = sub_extend_with_ren(tm, &sub_new, &vars_leftover);
    let p_leftover = iter_cur.remove_curr_then_to_prop();
    if condition(&p_leftover, &sub_res) {
        Some((sub_res, p_leftover))
    } else {
        None
    }
}

/// Consume the focused predicate and match the pattern tail against the
/// residual heap.
fn consume_and_continue(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter_cur: PropIter,
    condition: SideCondition<'_>,
    hpat_next: &HPat,
    hpats_rest: &[HPat],
) -> Option<(Sub, Prop)> {
    let (sub_new, vars_leftover) = iter_cur.state().clone();
    let p_rest = iter_cur.remove_curr_then_to_prop();
    prop_match_with_impl_sub(
        tm,
        cfg,
        p_rest,
        condition,
        sub_new,
        vars_leftover,
        hpat_next,
        hpats_rest,
    )
}

/// The two-branch backtracking step on a found focus: commit when the
/// pattern tail is empty, otherwise try consuming the focus and fall back
/// to advancing the iterator past it.
#[allow(clippy::too_many_arguments)]
fn dispatch_on_focus(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter_cur: PropIter,
    condition: SideCondition<'_>,
    sub: &Sub,
    vars: &[Ident],
    hpat: &HPat,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    match hpats.split_first() {
        None => commit_focus(tm, iter_cur, condition),
        Some((hpat_next, hpats_rest)) => {
            match consume_and_continue(
                tm,
                cfg,
                iter_cur.clone(),
                condition,
                hpat_next,
                hpats_rest,
            ) {
                Some(res) => Some(res),
                None => match iter_cur.next() {
                    None => None,
                    Some(iter_next) => {
                        iter_match_with_impl(tm, cfg, iter_next, condition, sub, vars, hpat, hpats)
                    }
                },
            }
        }
    }
}

/// Collapse a possibly-empty list-segment pattern against the unchanged
/// heap by equating its two ends.
#[allow(clippy::too_many_arguments)]
fn collapse_pe_lseg(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter: &PropIter,
    condition: SideCondition<'_>,
    sub: &Sub,
    vars: &[Ident],
    from2: ExprId,
    to2: ExprId,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    if !fully_instantiated(tm, vars, from2) {
        return None;
    }
    let from2_inst = sub.apply(tm, from2);
    let (sub_new, vars_leftover) = exp_match(tm, from2_inst, sub, vars, to2)?;
    trace!("list-segment pattern collapsed to the empty segment");
    match hpats.split_first() {
        None => {
            let sub_res = sub_extend_with_ren(tm, &sub_new, &vars_leftover);
            let p_leftover = iter.clone().to_prop();
            if condition(&p_leftover, &sub_res) {
                Some((sub_res, p_leftover))
            } else {
                None
            }
        }
        Some((hpat_next, hpats_rest)) => iter_match_with_impl(
            tm,
            cfg,
            iter.clone(),
            condition,
            &sub_new,
            &vars_leftover,
            hpat_next,
            hpats_rest,
        ),
    }
}

/// Unfold a list-segment pattern into its one-cell parameter body and match
/// the body (flagged implicational) in front of the remaining pattern.
#[allow(clippy::too_many_arguments)]
fn unfold_lseg(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter: &PropIter,
    condition: SideCondition<'_>,
    sub: &Sub,
    vars: &[Ident],
    para2: &LsegPara,
    from2: ExprId,
    to2: ExprId,
    shared2: &[ExprId],
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    trace!("unfolding list-segment pattern into its parameter body");
    let (evars_fresh, body) = para2.instantiate(tm, from2, to2, shared2);
    let mut hpats_new: Vec<HPat> = body
        .into_iter()
        .map(|pred| HPat {
            pred,
            impl_flag: true,
        })
        .collect();
    hpats_new.extend_from_slice(hpats);
    let (hpat_next, hpats_rest) = match hpats_new.split_first() {
        Some(parts) => parts,
        None => panic!("list-segment parameter has an empty body"),
    };
    let mut vars_new = evars_fresh.clone();
    vars_new.extend_from_slice(vars);
    let (sub_res, p_leftover) = iter_match_with_impl(
        tm,
        cfg,
        iter.clone(),
        condition,
        sub,
        &vars_new,
        hpat_next,
        hpats_rest,
    )?;
    let sub_res = sub_res.filter(|id| !evars_fresh.contains(&id));
    Some((sub_res, p_leftover))
}

/// Collapse a possibly-empty dll-segment pattern by equating its forward
/// and backward entry/exit pairs.
#[allow(clippy::too_many_arguments)]
fn collapse_pe_dllseg(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter: &PropIter,
    condition: SideCondition<'_>,
    sub: &Sub,
    vars: &[Ident],
    in_fwd2: ExprId,
    out_back2: ExprId,
    out_fwd2: ExprId,
    in_back2: ExprId,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    if !fully_instantiated(tm, vars, in_fwd2) || !fully_instantiated(tm, vars, out_back2) {
        return None;
    }
    let if_inst = sub.apply(tm, in_fwd2);
    let ob_inst = sub.apply(tm, out_back2);
    let (sub_new, vars_leftover) =
        exp_list_match(tm, &[if_inst, ob_inst], sub, vars, &[out_fwd2, in_back2])?;
    trace!("dll-segment pattern collapsed to the empty segment");
    match hpats.split_first() {
        None => {
            let sub_res = sub_extend_with_ren(tm, &sub_new, &vars_leftover);
            let p_leftover = iter.clone().to_prop();
            if condition(&p_leftover, &sub_res) {
                Some((sub_res, p_leftover))
            } else {
                None
            }
        }
        Some((hpat_next, hpats_rest)) => iter_match_with_impl(
            tm,
            cfg,
            iter.clone(),
            condition,
            &sub_new,
            &vars_leftover,
            hpat_next,
            hpats_rest,
        ),
    }
}

/// Unfold a dll-segment pattern into its one-cell parameter body. The
/// one-cell reading additionally forces the forward entry to coincide with
/// the backward entry.
#[allow(clippy::too_many_arguments)]
fn unfold_dllseg(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter: &PropIter,
    condition: SideCondition<'_>,
    sub: &Sub,
    vars: &[Ident],
    para2: &DllPara,
    in_fwd2: ExprId,
    out_back2: ExprId,
    out_fwd2: ExprId,
    in_back2: ExprId,
    shared2: &[ExprId],
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    if !fully_instantiated(tm, vars, in_fwd2) {
        return None;
    }
    let if_inst = sub.apply(tm, in_fwd2);
    let (sub_new, vars_leftover) = exp_match(tm, if_inst, sub, vars, in_back2)?;
    trace!("unfolding dll-segment pattern into its parameter body");
    let (evars_fresh, body) = para2.instantiate(tm, in_fwd2, out_back2, out_fwd2, shared2);
    let mut hpats_new: Vec<HPat> = body
        .into_iter()
        .map(|pred| HPat {
            pred,
            impl_flag: true,
        })
        .collect();
    hpats_new.extend_from_slice(hpats);
    let (hpat_next, hpats_rest) = match hpats_new.split_first() {
        Some(parts) => parts,
        None => panic!("dll-segment parameter has an empty body"),
    };
    let mut vars_new = evars_fresh.clone();
    vars_new.extend_from_slice(&vars_leftover);
    let (sub_res, p_leftover) = iter_match_with_impl(
        tm,
        cfg,
        iter.clone(),
        condition,
        &sub_new,
        &vars_new,
        hpat_next,
        hpats_rest,
    )?;
    let sub_res = sub_res.filter(|id| !evars_fresh.contains(&id));
    Some((sub_res, p_leftover))
}

/// Match the pattern head against successive foci of the iterator,
/// dispatching on the head's predicate kind.
#[allow(clippy::too_many_arguments)]
fn iter_match_with_impl(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    iter: PropIter,
    condition: SideCondition<'_>,
    sub: &Sub,
    vars: &[Ident],
    hpat: &HPat,
    hpats: &[HPat],
) -> Option<(Sub, Prop)> {
    match &hpat.pred {
        HeapPred::PointsTo {
            root: root2,
            value: value2,
            ty: ty2,
        } => {
            let (root2, value2, ty2) = (*root2, value2.clone(), *ty2);
            let found = iter.find(tm, |tm, focus| {
                let HeapPred::PointsTo {
                    root: root1,
                    value: value1,
                    ty: ty1,
                } = focus
                else {
                    return None;
                };
                if *ty1 != ty2 {
                    return None;
                }
                let (sub_new, vars_new) = exp_match(tm, *root1, sub, vars, root2)?;
                strexp_match(tm, cfg, value1, &sub_new, &vars_new, &value2)
            });
            match found {
                None => None,
                Some(iter_cur) => {
                    dispatch_on_focus(tm, cfg, iter_cur, condition, sub, vars, hpat, hpats)
                }
            }
        }
        HeapPred::Lseg {
            kind: k2,
            para: para2,
            from: from2,
            to: to2,
            shared: shared2,
        } => {
            let k2 = *k2;
            let para2 = para2.clone();
            let (from2, to2) = (*from2, *to2);
            let shared2 = shared2.clone();
            let found = iter.clone().find(tm, |tm, focus| {
                let HeapPred::Lseg {
                    kind: k1,
                    para: para1,
                    from: from1,
                    to: to1,
                    shared: shared1,
                } = focus
                else {
                    return None;
                };
                if !kinds_compatible(*k1, k2) {
                    return None;
                }
                if !hpara_match(tm, cfg, true, para1, &para2) {
                    return None;
                }
                let mut es1: SmallVec<[ExprId; 6]> = SmallVec::new();
                es1.push(*from1);
                es1.push(*to1);
                es1.extend(shared1.iter().copied());
                let mut es2: SmallVec<[ExprId; 6]> = SmallVec::new();
                es2.push(from2);
                es2.push(to2);
                es2.extend(shared2.iter().copied());
                exp_list_match(tm, &es1, sub, vars, &es2)
            });
            match found {
                None if !hpat.impl_flag => None,
                None if k2 == SegKind::Ne => unfold_lseg(
                    tm, cfg, &iter, condition, sub, vars, &para2, from2, to2, &shared2, hpats,
                ),
                None => {
                    match collapse_pe_lseg(tm, cfg, &iter, condition, sub, vars, from2, to2, hpats)
                    {
                        Some(res) => Some(res),
                        None => unfold_lseg(
                            tm, cfg, &iter, condition, sub, vars, &para2, from2, to2, &shared2,
                            hpats,
                        ),
                    }
                }
                Some(iter_cur) => {
                    dispatch_on_focus(tm, cfg, iter_cur, condition, sub, vars, hpat, hpats)
                }
            }
        }
        HeapPred::Dllseg {
            kind: k2,
            para: para2,
            in_fwd: in_fwd2,
            out_back: out_back2,
            out_fwd: out_fwd2,
            in_back: in_back2,
            shared: shared2,
        } => {
            let k2 = *k2;
            let para2 = para2.clone();
            let (in_fwd2, out_back2, out_fwd2, in_back2) =
                (*in_fwd2, *out_back2, *out_fwd2, *in_back2);
            let shared2 = shared2.clone();
            let found = iter.clone().find(tm, |tm, focus| {
                let HeapPred::Dllseg {
                    kind: k1,
                    para: para1,
                    in_fwd: in_fwd1,
                    out_back: out_back1,
                    out_fwd: out_fwd1,
                    in_back: in_back1,
                    shared: shared1,
                } = focus
                else {
                    return None;
                };
                if !kinds_compatible(*k1, k2) {
                    return None;
                }
                if !hpara_dll_match(tm, cfg, true, para1, &para2) {
                    return None;
                }
                let mut es1: SmallVec<[ExprId; 8]> = SmallVec::new();
                es1.extend([*in_fwd1, *out_back1, *out_fwd1, *in_back1]);
                es1.extend(shared1.iter().copied());
                let mut es2: SmallVec<[ExprId; 8]> = SmallVec::new();
                es2.extend([in_fwd2, out_back2, out_fwd2, in_back2]);
                es2.extend(shared2.iter().copied());
                exp_list_match(tm, &es1, sub, vars, &es2)
            });
            match found {
                None if !hpat.impl_flag => None,
                None if k2 == SegKind::Ne => unfold_dllseg(
                    tm, cfg, &iter, condition, sub, vars, &para2, in_fwd2, out_back2, out_fwd2,
                    in_back2, &shared2, hpats,
                ),
                None => {
                    match collapse_pe_dllseg(
                        tm, cfg, &iter, condition, sub, vars, in_fwd2, out_back2, out_fwd2,
                        in_back2, hpats,
                    ) {
                        Some(res) => Some(res),
                        None => unfold_dllseg(
                            tm, cfg, &iter, condition, sub, vars, &para2, in_fwd2, out_back2,
                            out_fwd2, in_back2, &shared2, hpats,
                        ),
                    }
                }
                Some(iter_cur) => {
                    dispatch_on_focus(tm, cfg, iter_cur, condition, sub, vars, hpat, hpats)
                }
            }
        }
    }
}
