//! One-sided expression unification
//!
//! [`exp_match`] decides whether a heap-side expression is an instance of a
//! pattern-side expression: it looks for bindings of the pattern's free
//! primed variables that make the two sides syntactically equal. The heap
//! side is never abstracted over: a bare variable on the left only matches
//! when the pattern maps to it exactly.
//!
//! Structured values go through [`strexp_match`], whose record walk honours
//! the `abs_struct` field-forgetting level of [`MatchConfig`].

use crate::config::MatchConfig;
use shale_heap::{ExprId, ExprKind, ExprManager, FieldName, Ident, Strexp, Sub};

/// Outcome of a successful unification step: the grown substitution and the
/// free variables still unbound.
pub type UnifyState = (Sub, Vec<Ident>);

fn check_equal(
    tm: &mut ExprManager,
    e1: ExprId,
    sub: &Sub,
    vars: &[Ident],
    e2: ExprId,
) -> Option<UnifyState> {
    let e2_inst = sub.apply(tm, e2);
    if e1 == e2_inst {
        Some((sub.clone(), vars.to_vec()))
    } else {
        None
    }
}

/// Match `e1` against the pattern expression `e2` under `sub`, binding
/// primed variables drawn from `vars`.
///
/// On success the returned substitution `sub'` satisfies
/// `apply(sub', e2) == e1`, and the returned variable list is `vars` minus
/// the newly bound identifiers.
pub fn exp_match(
    tm: &mut ExprManager,
    e1: ExprId,
    sub: &Sub,
    vars: &[Ident],
    e2: ExprId,
) -> Option<UnifyState> {
    let k1 = tm.kind(e1).clone();
    let k2 = tm.kind(e2).clone();
    match (k1, k2) {
        (_, ExprKind::Var(id2)) if id2.is_primed() && vars.contains(&id2) => {
            let sub_new = match sub.extend(id2, e1) {
                Some(s) => s,
                // Only reachable when the caller passed a duplicated
                // free-variable list.
                None => panic!("free-variable set contains {id2} twice"),
            };
            let vars_new = vars.iter().copied().filter(|&id| id != id2).collect();
            Some((sub_new, vars_new))
        }
        (_, ExprKind::Var(_)) => check_equal(tm, e1, sub, vars, e2),
        (ExprKind::Const(_), _) | (_, ExprKind::Const(_)) => check_equal(tm, e1, sub, vars, e2),
        (ExprKind::Sizeof(_), _) | (_, ExprKind::Sizeof(_)) => check_equal(tm, e1, sub, vars, e2),
        (ExprKind::Lvar(_), _) | (_, ExprKind::Lvar(_)) => check_equal(tm, e1, sub, vars, e2),
        // Patterns never abstract over the heap-side position itself.
        (ExprKind::Var(_), _) => None,
        (ExprKind::Cast(_, e1p), ExprKind::Cast(_, e2p)) => exp_match(tm, e1p, sub, vars, e2p),
        (ExprKind::UnOp(o1, e1p, _), ExprKind::UnOp(o2, e2p, _)) if o1 == o2 => {
            exp_match(tm, e1p, sub, vars, e2p)
        }
        (ExprKind::BinOp(b1, x1, y1), ExprKind::BinOp(b2, x2, y2)) if b1 == b2 => {
            let (sub1, vars1) = exp_match(tm, x1, sub, vars, x2)?;
            exp_match(tm, y1, &sub1, &vars1, y2)
        }
        (ExprKind::Lfield(e1p, f1, _), ExprKind::Lfield(e2p, f2, _)) if f1 == f2 => {
            exp_match(tm, e1p, sub, vars, e2p)
        }
        (ExprKind::Lindex(b1, i1), ExprKind::Lindex(b2, i2)) => {
            let (sub1, vars1) = exp_match(tm, b1, sub, vars, b2)?;
            exp_match(tm, i1, &sub1, &vars1, i2)
        }
        _ => None,
    }
}

/// Match two expression lists pointwise, threading the substitution left to
/// right. A length mismatch is a caller bug and aborts.
pub fn exp_list_match(
    tm: &mut ExprManager,
    es1: &[ExprId],
    sub: &Sub,
    vars: &[Ident],
    es2: &[ExprId],
) -> Option<UnifyState> {
    if es1.len() != es2.len() {
        panic!(
            "expression lists of different lengths ({} vs {})",
            es1.len(),
            es2.len()
        );
    }
    let mut cur = (sub.clone(), vars.to_vec());
    for (&e1, &e2) in es1.iter().zip(es2) {
        cur = exp_match(tm, e1, &cur.0, &cur.1, e2)?;
    }
    Some(cur)
}

/// Match a heap-side structured value against a pattern-side one.
pub fn strexp_match(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    se1: &Strexp,
    sub: &Sub,
    vars: &[Ident],
    se2: &Strexp,
) -> Option<UnifyState> {
    match (se1, se2) {
        (Strexp::Atom(e1, _), Strexp::Atom(e2, _)) => exp_match(tm, *e1, sub, vars, *e2),
        (Strexp::Record(fsel1, _), Strexp::Record(fsel2, _)) => {
            fsel_match(tm, cfg, fsel1, sub, vars, fsel2)
        }
        (
            Strexp::Array {
                size: size1,
                cells: isel1,
                ..
            },
            Strexp::Array {
                size: size2,
                cells: isel2,
                ..
            },
        ) => {
            let (sub1, vars1) = exp_match(tm, *size1, sub, vars, *size2)?;
            isel_match(tm, cfg, isel1, &sub1, &vars1, isel2)
        }
        _ => None,
    }
}

/// Merge walk over two sorted field lists.
///
/// At `abs_struct > 0` the heap side may carry extra fields: a smaller
/// left-side field is dropped, and a pattern that runs out early still
/// succeeds. At level 0 both tolerances are off.
fn fsel_match(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    fsel1: &[(FieldName, Strexp)],
    sub: &Sub,
    vars: &[Ident],
    fsel2: &[(FieldName, Strexp)],
) -> Option<UnifyState> {
    match (fsel1, fsel2) {
        ([], []) => Some((sub.clone(), vars.to_vec())),
        ([], [_, ..]) => None,
        ([_, ..], []) => {
            if cfg.abs_struct > 0 {
                Some((sub.clone(), vars.to_vec()))
            } else {
                None
            }
        }
        ([(f1, se1), rest1 @ ..], [(f2, se2), rest2 @ ..]) => {
            if f1 == f2 {
                let (sub1, vars1) = strexp_match(tm, cfg, se1, sub, vars, se2)?;
                fsel_match(tm, cfg, rest1, &sub1, &vars1, rest2)
            } else if f1 < f2 && cfg.abs_struct > 0 {
                fsel_match(tm, cfg, rest1, sub, vars, fsel2)
            } else {
                None
            }
        }
    }
}

/// Lock-step walk over two array-cell lists.
///
/// Indices are not unified: the pattern-side index must already be ground
/// under the substitution and equal to the heap-side index. A free variable
/// surviving in a substituted index is a caller bug and aborts.
fn isel_match(
    tm: &mut ExprManager,
    cfg: &MatchConfig,
    isel1: &[(ExprId, Strexp)],
    sub: &Sub,
    vars: &[Ident],
    isel2: &[(ExprId, Strexp)],
) -> Option<UnifyState> {
    match (isel1, isel2) {
        ([], []) => Some((sub.clone(), vars.to_vec())),
        ([], [_, ..]) | ([_, ..], []) => None,
        ([(idx1, se1), rest1 @ ..], [(idx2, se2), rest2 @ ..]) => {
            let idx2_inst = sub.apply(tm, *idx2);
            for &id in vars {
                if tm.ident_in_expr(id, idx2_inst) {
                    panic!(
                        "array index {} still contains free variable {id}",
                        tm.expr_to_string(idx2_inst)
                    );
                }
            }
            if *idx1 != idx2_inst {
                return None;
            }
            let (sub1, vars1) = strexp_match(tm, cfg, se1, sub, vars, se2)?;
            isel_match(tm, cfg, rest1, &sub1, &vars1, rest2)
        }
    }
}
