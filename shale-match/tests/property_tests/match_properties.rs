//! Property-based tests for unification and matching
//!
//! The central law: whenever `exp_match(e1, sub, vars, e2)` succeeds with
//! `(sub', vars')`, applying `sub'` to the pattern yields the heap side,
//! the new bindings all come from `vars`, and `vars'` is what is left.

use proptest::prelude::*;
use shale_heap::{
    BinOp, ExprId, ExprManager, HeapPred, Ident, Inst, Prop, Strexp, Sub, UnOp,
};
use shale_match::{HPat, MatchConfig, exp_match, find_partial_iso, prop_match_with_impl};

#[derive(Debug, Clone)]
enum Shape {
    Int(i64),
    Lvar(u8),
    Neg(Box<Shape>),
    Add(Box<Shape>, Box<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-20i64..20).prop_map(Shape::Int),
        (0u8..3).prop_map(Shape::Lvar),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Neg(Box::new(s))),
            (inner.clone(), inner).prop_map(|(a, b)| Shape::Add(Box::new(a), Box::new(b))),
        ]
    })
}

fn build(tm: &mut ExprManager, shape: &Shape) -> ExprId {
    match shape {
        Shape::Int(n) => tm.mk_int(*n),
        Shape::Lvar(k) => {
            let name = format!("v{k}");
            tm.mk_lvar(&name)
        }
        Shape::Neg(s) => {
            let inner = build(tm, s);
            tm.mk_unop(UnOp::Neg, inner, None)
        }
        Shape::Add(a, b) => {
            let lhs = build(tm, a);
            let rhs = build(tm, b);
            tm.mk_binop(BinOp::PlusA, lhs, rhs)
        }
    }
}

/// Build the pattern `heap_shape` with its left-most leaf replaced by `v`,
/// returning (heap expression, pattern expression).
fn puncture(tm: &mut ExprManager, shape: &Shape, v: Ident) -> (ExprId, ExprId) {
    match shape {
        Shape::Int(_) | Shape::Lvar(_) => {
            let heap = build(tm, shape);
            let pat = tm.mk_var(v);
            (heap, pat)
        }
        Shape::Neg(s) => {
            let (h, p) = puncture(tm, s, v);
            (tm.mk_unop(UnOp::Neg, h, None), tm.mk_unop(UnOp::Neg, p, None))
        }
        Shape::Add(a, b) => {
            let (ha, pa) = puncture(tm, a, v);
            let hb = build(tm, b);
            let heap = tm.mk_binop(BinOp::PlusA, ha, hb);
            let pat = tm.mk_binop(BinOp::PlusA, pa, hb);
            (heap, pat)
        }
    }
}

proptest! {
    /// Ground self-match always succeeds without touching the state.
    #[test]
    fn ground_expressions_match_themselves(shape in shape_strategy()) {
        let mut tm = ExprManager::new();
        let e = build(&mut tm, &shape);
        let v = tm.fresh_primed();
        let out = exp_match(&mut tm, e, &Sub::empty(), &[v], e);
        prop_assert_eq!(out, Some((Sub::empty(), vec![v])));
    }

    /// Soundness: a successful match makes the pattern equal to the heap
    /// side under the returned substitution, consuming exactly the bound
    /// variables from the free set.
    #[test]
    fn exp_match_is_sound(shape in shape_strategy()) {
        let mut tm = ExprManager::new();
        let v = tm.fresh_primed();
        let spare = tm.fresh_primed();
        let (heap, pat) = puncture(&mut tm, &shape, v);
        let (sub, vars_left) =
            exp_match(&mut tm, heap, &Sub::empty(), &[v, spare], pat).unwrap();
        prop_assert_eq!(sub.apply(&mut tm, pat), heap);
        for id in sub.domain_sorted() {
            prop_assert!(id == v || id == spare);
        }
        prop_assert_eq!(vars_left, vec![spare]);
    }

    /// A mismatching ground pattern is rejected.
    #[test]
    fn distinct_ground_expressions_do_not_match(a in shape_strategy(), b in shape_strategy()) {
        let mut tm = ExprManager::new();
        let ea = build(&mut tm, &a);
        let eb = build(&mut tm, &b);
        prop_assume!(ea != eb);
        prop_assert!(exp_match(&mut tm, ea, &Sub::empty(), &[], eb).is_none());
    }

    /// Matching a one-cell heap against the punctured pattern binds the
    /// hole and consumes the cell.
    #[test]
    fn points_to_match_consumes_the_cell(shape in shape_strategy()) {
        let mut tm = ExprManager::new();
        let cfg = MatchConfig::default();
        let v = tm.fresh_primed();
        let (heap_val, pat_val) = puncture(&mut tm, &shape, v);
        let x = tm.mk_lvar("x");
        let ty = tm.mk_sizeof("int");
        let heap = Prop::from_sigma(vec![HeapPred::PointsTo {
            root: x,
            value: Strexp::atom(heap_val),
            ty,
        }]);
        let pat = HPat {
            pred: HeapPred::PointsTo {
                root: x,
                value: Strexp::atom(pat_val),
                ty,
            },
            impl_flag: false,
        };
        let always = |_: &Prop, _: &Sub| true;
        let (sub, leftover) =
            prop_match_with_impl(&mut tm, &cfg, heap, &always, vec![v], &pat, &[]).unwrap();
        prop_assert!(leftover.is_emp());
        prop_assert_eq!(sub.apply(&mut tm, pat_val), heap_val);
    }

    /// Isomorphism coverage: the two related sub-heaps have equal size,
    /// share no root, and together with the leftover repartition the input.
    #[test]
    fn iso_partitions_the_heap(extra in 0usize..3) {
        let mut tm = ExprManager::new();
        let cfg = MatchConfig::default();
        let a = tm.mk_lvar("a");
        let b = tm.mk_lvar("b");
        let nil = tm.mk_int(0);
        let ty = tm.mk_sizeof("node");
        let fld = tm.field("next");
        let cell = |tm: &mut ExprManager, root: ExprId| HeapPred::PointsTo {
            root,
            value: Strexp::record(vec![(fld, Strexp::atom(nil))], Inst::None),
            ty,
        };
        let mut sigma = vec![cell(&mut tm, a), cell(&mut tm, b)];
        for k in 0..extra {
            let name = format!("spare{k}");
            let root = tm.mk_lvar(&name);
            sigma.push(cell(&mut tm, root));
        }
        let (_, sigma1, sigma2, leftover) = find_partial_iso(
            &mut tm,
            &cfg,
            &|u, w| u == w,
            vec![],
            vec![(a, b)],
            sigma.clone(),
        )
        .unwrap();
        prop_assert_eq!(sigma1.len(), sigma2.len());
        for p in &sigma1 {
            for q in &sigma2 {
                prop_assert!(p.root() != q.root());
            }
        }
        let mut reunion = sigma1;
        reunion.extend(sigma2);
        reunion.extend(leftover);
        prop_assert_eq!(reunion.len(), sigma.len());
        for pred in &sigma {
            prop_assert!(reunion.contains(pred));
        }
    }
}
