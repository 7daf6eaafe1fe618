//! shale-heap: symbolic-heap term algebra
//!
//! This crate provides the term algebra a separation-logic shape analyser
//! works over: hash-consed expressions, structured values, heap predicates
//! (points-to facts and list segments), substitutions, and normalised heaps
//! with a focus iterator. The matcher in `shale-match` consumes these types
//! but never depends on how they are stored.
//!
//! # Examples
//!
//! ## Building expressions
//!
//! ```
//! use shale_heap::ExprManager;
//!
//! let mut tm = ExprManager::new();
//! let x = tm.mk_lvar("x");
//! let seven = tm.mk_int(7);
//!
//! // Hash-consing: equal structure means equal handle.
//! assert_eq!(tm.mk_int(7), seven);
//! assert_ne!(x, seven);
//! ```
//!
//! ## A one-cell heap
//!
//! ```
//! use shale_heap::{ExprManager, HeapPred, Prop, Strexp};
//!
//! let mut tm = ExprManager::new();
//! let x = tm.mk_lvar("x");
//! let seven = tm.mk_int(7);
//! let ty = tm.mk_sizeof("int");
//! let heap = Prop::from_sigma(vec![HeapPred::PointsTo {
//!     root: x,
//!     value: Strexp::atom(seven),
//!     ty,
//! }]);
//! assert!(!heap.is_emp());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod expr;
pub mod hpred;
pub mod ident;
pub mod prop;
pub mod strexp;
pub mod sub;

pub use error::{HeapError, Result};
pub use expr::{BinOp, Const, ExprId, ExprKind, ExprManager, UnOp};
pub use hpred::{DllPara, HeapPred, LsegPara, SegKind};
pub use ident::{FieldName, Ident, IdentKind, Pvar, TypeName};
pub use prop::{MatchState, Prop, PropIter};
pub use strexp::{Inst, Strexp};
pub use sub::Sub;
