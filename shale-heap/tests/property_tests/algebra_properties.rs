//! Property-based tests for the expression arena and substitutions
//!
//! These pin down the hash-consing contract (structural equality is handle
//! equality) and the substitution laws the matcher relies on.

use proptest::prelude::*;
use shale_heap::{BinOp, ExprId, ExprManager, Sub, UnOp};

/// A buildable expression recipe, independent of any arena.
#[derive(Debug, Clone)]
enum Shape {
    Int(i64),
    Lvar(u8),
    Neg(Box<Shape>),
    Add(Box<Shape>, Box<Shape>),
    Index(Box<Shape>, Box<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-50i64..50).prop_map(Shape::Int),
        (0u8..4).prop_map(Shape::Lvar),
    ];
    leaf.prop_recursive(3, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Shape::Neg(Box::new(s))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Shape::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Shape::Index(Box::new(a), Box::new(b))),
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
        Shape::Index(a, b) => {
            let base = build(tm, a);
            let idx = build(tm, b);
            tm.mk_lindex(base, idx)
        }
    }
}

proptest! {
    /// Building the same shape twice yields the same handle.
    #[test]
    fn hash_consing_is_deterministic(shape in shape_strategy()) {
        let mut tm = ExprManager::new();
        let e1 = build(&mut tm, &shape);
        let e2 = build(&mut tm, &shape);
        prop_assert_eq!(e1, e2);
    }

    /// A ground expression is untouched by any substitution.
    #[test]
    fn ground_expressions_are_substitution_fixpoints(shape in shape_strategy()) {
        let mut tm = ExprManager::new();
        let e = build(&mut tm, &shape);
        let v = tm.fresh_primed();
        let seven = tm.mk_int(7);
        let sub = Sub::from_pairs([(v, seven)]);
        prop_assert_eq!(sub.apply(&mut tm, e), e);
    }

    /// Substitution replaces every occurrence of a variable, and applying
    /// the result again changes nothing (idempotence on ground images).
    #[test]
    fn substitution_is_idempotent(shape in shape_strategy(), image in shape_strategy()) {
        let mut tm = ExprManager::new();
        let v = tm.fresh_primed();
        let pv = tm.mk_var(v);
        let ground = build(&mut tm, &shape);
        // e = ground + v', so the variable occurs somewhere inside.
        let e = tm.mk_binop(BinOp::PlusA, ground, pv);
        let img = build(&mut tm, &image);
        let sub = Sub::from_pairs([(v, img)]);
        let once = sub.apply(&mut tm, e);
        let twice = sub.apply(&mut tm, once);
        prop_assert_eq!(once, twice);
        prop_assert!(!tm.ident_in_expr(v, once));
    }

    /// The occurs check sees a variable exactly when substitution for it
    /// changes the expression.
    #[test]
    fn occurs_check_agrees_with_substitution(shape in shape_strategy(), deep in any::<bool>()) {
        let mut tm = ExprManager::new();
        let v = tm.fresh_primed();
        let pv = tm.mk_var(v);
        let ground = build(&mut tm, &shape);
        let e = if deep {
            tm.mk_lindex(ground, pv)
        } else {
            ground
        };
        let zero = tm.mk_int(0);
        let sub = Sub::from_pairs([(v, zero)]);
        let applied = sub.apply(&mut tm, e);
        prop_assert_eq!(tm.ident_in_expr(v, e), applied != e);
    }

    /// Fresh identifiers from one manager never collide.
    #[test]
    fn fresh_identifiers_are_unique(n in 1usize..64) {
        let mut tm = ExprManager::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..n {
            prop_assert!(seen.insert(tm.fresh_primed()));
        }
    }
}
