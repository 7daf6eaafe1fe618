//! Parameter-body matching
//!
//! Two list-segment parameters describe the same cell shape when their
//! bodies are α-equivalent: renaming one body's formals to the other's (and
//! its existential locals to fresh variables) must make the spatial matcher
//! consume the whole of one body against the other with nothing left over.

use crate::config::MatchConfig;
use crate::spatial::{HPat, prop_match_with_impl_sub};
use shale_heap::{DllPara, ExprId, ExprManager, HeapPred, Ident, LsegPara, Prop, Sub};

/// α-equivalence of inductive bodies modulo renaming of formals and
/// existentials. `impl_ok` is the implication flag put on every pattern
/// entry built from `body2`.
fn hpara_common_match(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    impl_ok: bool,
    ids1: &[Ident],
    body1: &[HeapPred],
    evars2: &[Ident],
    ids2: &[Ident],
    body2: &[HeapPred],
) -> bool {
    if ids1.len() != ids2.len() {
        return false;
    }
    if body1.is_empty() || body2.is_empty() {
        panic!("list-segment parameter has an empty body");
    }
    let mut pairs: Vec<(Ident, ExprId)> = Vec::with_capacity(ids2.len() + evars2.len());
    for (&id2, &id1) in ids2.iter().zip(ids1) {
        let image = tm.mk_var(id1);
        pairs.push((id2, image));
    }
    let mut evars_fresh = Vec::with_capacity(evars2.len());
    for &ev2 in evars2 {
        let fresh = tm.fresh_primed();
        evars_fresh.push(fresh);
        let image = tm.mk_var(fresh);
        pairs.push((ev2, image));
    }
    let ren = Sub::from_pairs(pairs);
    let body2_ren: Vec<HeapPred> = body2.iter().map(|p| p.apply_sub(tm, &ren)).collect();
    let (first, rest) = match body2_ren.split_first() {
        Some(parts) => parts,
        None => unreachable!(),
    };
    let hpat = HPat {
        pred: first.clone(),
        impl_flag: impl_ok,
    };
    let hpats: Vec<HPat> = rest
        .iter()
        .map(|p| HPat {
            pred: p.clone(),
            impl_flag: impl_ok,
        })
        .collect();
    let p1 = Prop::from_sigma(body1.to_vec());
    let trivial = |_: &Prop, _: &Sub| true;
    match prop_match_with_impl_sub(
        tm,
        cfg,
        p1,
        &trivial,
        Sub::empty(),
        evars_fresh,
        &hpat,
        &hpats,
    ) {
        Some((_, leftover)) => leftover.is_emp(),
        None => false,
    }
}

/// Whether `para1`'s body covers `para2`'s under formal renaming.
pub fn hpara_match(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    impl_ok: bool,
    para1: &LsegPara,
    para2: &LsegPara,
) -> bool {
    let mut ids1 = vec![para1.root, para1.next];
    ids1.extend_from_slice(&para1.svars);
    let mut ids2 = vec![para2.root, para2.next];
    ids2.extend_from_slice(&para2.svars);
    hpara_common_match(
        tm,
        cfg,
        impl_ok,
        &ids1,
        &para1.body,
        &para2.evars,
        &ids2,
        &para2.body,
    )
}

/// Whether `para1`'s body covers `para2`'s, doubly-linked variant.
pub fn hpara_dll_match(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    impl_ok: bool,
    para1: &DllPara,
    para2: &DllPara,
) -> bool {
    let mut ids1 = vec![para1.cell, para1.blink, para1.flink];
    ids1.extend_from_slice(&para1.svars);
    let mut ids2 = vec![para2.cell, para2.blink, para2.flink];
    ids2.extend_from_slice(&para2.svars);
    hpara_common_match(
        tm,
        cfg,
        impl_ok,
        &ids1,
        &para1.body,
        &para2.evars,
        &ids2,
        &para2.body,
    )
}

/// Strict α-equivalence of two parameters: each body covers the other with
/// no implicational discharge allowed.
pub fn hpara_iso(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    para1: &LsegPara,
    para2: &LsegPara,
) -> bool {
    hpara_match(tm, cfg, false, para1, para2) && hpara_match(tm, cfg, false, para2, para1)
}

/// As [`hpara_iso`], doubly-linked variant.
pub fn hpara_dll_iso(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    para1: &DllPara,
    para2: &DllPara,
) -> bool {
    hpara_dll_match(tm, cfg, false, para1, para2) && hpara_dll_match(tm, cfg, false, para2, para1)
}
