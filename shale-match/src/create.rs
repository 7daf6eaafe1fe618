//! Parameter synthesis
//!
//! After [`find_partial_iso`](crate::iso::find_partial_iso) has related two
//! sub-heaps, [`hpara_create`] fabricates the canonical list-segment
//! parameter both regions instantiate: every corresponding expression pair
//! is replaced by a fresh primed identifier, pairs whose two sides coincide
//! become shared formals (their common expression is the actual to supply
//! at each use site), and the rest become existential locals.

use crate::iso::sigma_lift_to_pe;
use shale_heap::{DllPara, ExprId, ExprKind, ExprManager, HeapPred, Ident, LsegPara};

/// Outcome of [`generic_para_create`]: the expression-to-identifier
/// renaming, the renamed PE-lifted body, the existential and shared formal
/// identifiers, and the shared actual expressions.
type ParaParts = (
    Vec<(ExprId, Ident)>,
    Vec<HeapPred>,
    Vec<Ident>,
    Vec<Ident>,
    Vec<ExprId>,
);

fn generic_para_create(
    tm: &mut ExprManager,
    corres: &[(ExprId, ExprId)],
    sigma1: &[HeapPred],
    elist1: &[ExprId],
) -> ParaParts {
    let mut corres_ids: Vec<((ExprId, ExprId), Ident)> = Vec::with_capacity(corres.len());
    for &(e1, e2) in corres {
        // A pair of one and the same constant stays itself in the body.
        let same_const = e1 == e2 && matches!(tm.kind(e1), ExprKind::Const(_));
        if same_const {
            continue;
        }
        corres_ids.push(((e1, e2), tm.fresh_primed()));
    }
    let mut es_shared = Vec::new();
    let mut svars = Vec::new();
    let mut evars = Vec::new();
    for &((e1, e2), id) in &corres_ids {
        if elist1.contains(&e1) {
            continue;
        }
        if e1 == e2 {
            es_shared.push(e1);
            svars.push(id);
        } else {
            evars.push(id);
        }
    }
    let renaming: Vec<(ExprId, Ident)> = corres_ids
        .iter()
        .map(|&((e1, _), id)| (e1, id))
        .collect();
    let mut pairs = Vec::with_capacity(renaming.len());
    for &(e1, id) in &renaming {
        let image = tm.mk_var(id);
        pairs.push((e1, image));
    }
    let lifted = sigma_lift_to_pe(sigma1.to_vec());
    let body: Vec<HeapPred> = lifted.iter().map(|p| p.replace(tm, &pairs)).collect();
    (renaming, body, evars, svars, es_shared)
}

fn renamed_id(
    tm: &ExprManager,
    renaming: &[(ExprId, Ident)],
    e: ExprId,
) -> Ident {
    match renaming.iter().find(|&&(e1, _)| e1 == e) {
        Some(&(_, id)) => id,
        None => panic!(
            "no fresh identifier assigned to {}",
            tm.expr_to_string(e)
        ),
    }
}

/// Synthesise a list-segment parameter from a correspondence and the left
/// sub-heap, rooted at `root1` with next pointer `next1`.
///
/// Returns the parameter and the shared actual expressions to supply at
/// each use site.
pub fn hpara_create(
    tm: &mut ExprManager,
    corres: &[(ExprId, ExprId)],
    sigma1: &[HeapPred],
    root1: ExprId,
    next1: ExprId,
) -> (LsegPara, Vec<ExprId>) {
    let (renaming, body, evars, svars, es_shared) =
        generic_para_create(tm, corres, sigma1, &[root1, next1]);
    let root = renamed_id(tm, &renaming, root1);
    let next = renamed_id(tm, &renaming, next1);
    let para = match LsegPara::new(root, next, svars, evars, body) {
        Ok(para) => para,
        Err(err) => panic!("synthesised an invalid list-segment parameter: {err}"),
    };
    (para, es_shared)
}

/// Synthesise a dll-segment parameter, rooted at `cell1` with back pointer
/// `blink1` and forward pointer `flink1`.
pub fn hpara_dll_create(
    tm: &mut ExprManager,
    corres: &[(ExprId, ExprId)],
    sigma1: &[HeapPred],
    cell1: ExprId,
    blink1: ExprId,
    flink1: ExprId,
) -> (DllPara, Vec<ExprId>) {
    let (renaming, body, evars, svars, es_shared) =
        generic_para_create(tm, corres, sigma1, &[cell1, blink1, flink1]);
    let cell = renamed_id(tm, &renaming, cell1);
    let blink = renamed_id(tm, &renaming, blink1);
    let flink = renamed_id(tm, &renaming, flink1);
    let para = match DllPara::new(cell, blink, flink, svars, evars, body) {
        Ok(para) => para,
        Err(err) => panic!("synthesised an invalid dll-segment parameter: {err}"),
    };
    (para, es_shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::hpara::hpara_iso;
    use crate::iso::find_partial_iso;
    use shale_heap::{Inst, Strexp};

    fn cell(tm: &mut ExprManager, root: ExprId, next: ExprId) -> HeapPred {
        let ty = tm.mk_sizeof("node");
        let fld = tm.field("next");
        HeapPred::PointsTo {
            root,
            value: Strexp::record(vec![(fld, Strexp::atom(next))], Inst::None),
            ty,
        }
    }

    #[test]
    fn creates_a_parameter_from_a_two_cell_chain() {
        let mut tm = ExprManager::new();
        let x = tm.mk_lvar("x");
        let y = tm.mk_lvar("y");
        let nil = tm.mk_int(0);
        let sigma = vec![cell(&mut tm, x, y), cell(&mut tm, y, nil)];
        let (corres, sigma1, _sigma2, _) = find_partial_iso(
            &mut tm,
            &MatchConfig::default(),
            &|a, b| a == b,
            vec![],
            vec![(x, y)],
            sigma,
        )
        .unwrap();
        let (para, es_shared) = hpara_create(&mut tm, &corres, &sigma1, x, y);
        // The chain shares nothing: both x and y got fresh formals and no
        // shared actuals remain.
        assert!(es_shared.is_empty());
        assert!(para.svars.is_empty());
        assert!(para.evars.is_empty());
        assert_eq!(para.body.len(), 1);
        // The synthesised cell reads root |-> { next: next }.
        let root_e = tm.mk_var(para.root);
        let next_e = tm.mk_var(para.next);
        let expected = cell(&mut tm, root_e, next_e);
        assert_eq!(para.body[0], expected);
    }

    #[test]
    fn shared_expressions_become_shared_formals() {
        let mut tm = ExprManager::new();
        let x = tm.mk_lvar("x");
        let y = tm.mk_lvar("y");
        let s = tm.mk_lvar("s");
        let ty = tm.mk_sizeof("node");
        let f_next = tm.field("next");
        let f_owner = tm.field("owner");
        let mk = |tm: &mut ExprManager, root: ExprId, next: ExprId| HeapPred::PointsTo {
            root,
            value: Strexp::record(
                vec![(f_next, Strexp::atom(next)), (f_owner, Strexp::atom(s))],
                Inst::None,
            ),
            ty,
        };
        let nil = tm.mk_int(0);
        let sigma1 = vec![mk(&mut tm, x, y)];
        // Correspondence relating the two cells: roots differ, next
        // pointers differ, the owner field is shared.
        let corres = vec![(x, y), (y, nil), (s, s)];
        let (para, es_shared) = hpara_create(&mut tm, &corres, &sigma1, x, y);
        assert_eq!(es_shared, vec![s]);
        assert_eq!(para.svars.len(), 1);
        assert!(para.evars.is_empty());
        // The body's owner field now reads the shared formal.
        let owner_formal = tm.mk_var(para.svars[0]);
        match &para.body[0] {
            HeapPred::PointsTo { value, .. } => match value {
                Strexp::Record(fields, _) => {
                    let owner = fields
                        .iter()
                        .find(|(f, _)| *f == f_owner)
                        .map(|(_, se)| se.clone())
                        .unwrap();
                    assert_eq!(owner, Strexp::atom(owner_formal));
                }
                _ => panic!("expected a record"),
            },
            _ => panic!("expected a points-to"),
        }
    }

    #[test]
    fn same_constant_pairs_survive_in_the_body() {
        let mut tm = ExprManager::new();
        let x = tm.mk_lvar("x");
        let y = tm.mk_lvar("y");
        let z = tm.mk_lvar("z");
        let nil = tm.mk_int(0);
        let ty = tm.mk_sizeof("node");
        let f_next = tm.field("next");
        let f_mark = tm.field("mark");
        let value = Strexp::record(
            vec![(f_next, Strexp::atom(y)), (f_mark, Strexp::atom(nil))],
            Inst::None,
        );
        let sigma1 = vec![HeapPred::PointsTo { root: x, value, ty }];
        let corres = vec![(x, y), (y, z), (nil, nil)];
        let (para, es_shared) = hpara_create(&mut tm, &corres, &sigma1, x, y);
        assert!(es_shared.is_empty());
        assert!(para.svars.is_empty() && para.evars.is_empty());
        // The mark field still stores the literal nil rather than a formal.
        match &para.body[0] {
            HeapPred::PointsTo {
                value: Strexp::Record(fields, _),
                ..
            } => {
                let mark = fields
                    .iter()
                    .find(|(f, _)| *f == f_mark)
                    .map(|(_, se)| se.clone())
                    .unwrap();
                assert_eq!(mark, Strexp::atom(nil));
            }
            _ => panic!("expected a record cell"),
        }
    }

    #[test]
    #[should_panic(expected = "no fresh identifier")]
    fn missing_root_in_the_correspondence_aborts() {
        let mut tm = ExprManager::new();
        let x = tm.mk_lvar("x");
        let y = tm.mk_lvar("y");
        let nil = tm.mk_int(0);
        let sigma1 = vec![cell(&mut tm, x, nil)];
        // The correspondence never mentions x, so no formal stands for the
        // requested root.
        let corres = vec![(y, nil)];
        let _ = hpara_create(&mut tm, &corres, &sigma1, x, nil);
    }

    #[test]
    fn round_trip_with_hpara_iso() {
        let mut tm = ExprManager::new();
        let x = tm.mk_lvar("x");
        let y = tm.mk_lvar("y");
        let nil = tm.mk_int(0);
        let sigma = vec![cell(&mut tm, x, y), cell(&mut tm, y, nil)];
        let (corres, sigma1, _sigma2, _) = find_partial_iso(
            &mut tm,
            &MatchConfig::default(),
            &|a, b| a == b,
            vec![],
            vec![(x, y)],
            sigma,
        )
        .unwrap();
        let (para, _) = hpara_create(&mut tm, &corres, &sigma1, x, y);
        // The synthesised parameter is α-equivalent to itself and to a
        // hand-built node parameter of the same shape.
        assert!(hpara_iso(&mut tm, &MatchConfig::default(), &para, &para));
        let root = tm.fresh_primed();
        let next = tm.fresh_primed();
        let root_e = tm.mk_var(root);
        let next_e = tm.mk_var(next);
        let body = vec![cell(&mut tm, root_e, next_e)];
        let hand = LsegPara::new(root, next, vec![], vec![], body).unwrap();
        assert!(hpara_iso(&mut tm, &MatchConfig::default(), &para, &hand));
    }
}
