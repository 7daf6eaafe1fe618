//! shale-match: symbolic-heap pattern matching
//!
//! The unification-driven matcher of the shale shape analyser. Given a
//! symbolic heap and a pattern (heap predicates with free primed
//! variables), [`prop_match_with_impl`] decides whether the heap entails an
//! instance of the pattern, returning the witnessing substitution and the
//! leftover heap. The crate also computes structural isomorphisms between
//! sub-heaps ([`find_partial_iso`]) and synthesises list-segment parameters
//! from concrete shapes ([`hpara_create`]), the two steps behind list
//! abstraction.
//!
//! Everything is a pure function over immutable inputs: failure to match is
//! the `None` alternative, contract violations (malformed heaps, duplicate
//! free variables) abort with a diagnostic.
//!
//! # Example
//!
//! ```
//! use shale_heap::{ExprManager, HeapPred, Prop, Strexp, Sub};
//! use shale_match::{HPat, MatchConfig, prop_match_with_impl};
//!
//! let mut tm = ExprManager::new();
//! let x = tm.mk_lvar("x");
//! let seven = tm.mk_int(7);
//! let ty = tm.mk_sizeof("int");
//!
//! // Heap: x |-> 7. Pattern: x |-> v' with v' free.
//! let heap = Prop::from_sigma(vec![HeapPred::PointsTo {
//!     root: x,
//!     value: Strexp::atom(seven),
//!     ty,
//! }]);
//! let v = tm.fresh_primed();
//! let pv = tm.mk_var(v);
//! let pat = HPat {
//!     pred: HeapPred::PointsTo {
//!         root: x,
//!         value: Strexp::atom(pv),
//!         ty,
//!     },
//!     impl_flag: false,
//! };
//!
//! let cfg = MatchConfig::default();
//! let always = |_: &Prop, _: &Sub| true;
//! let (sub, leftover) =
//!     prop_match_with_impl(&mut tm, &cfg, heap, &always, vec![v], &pat, &[]).unwrap();
//! assert_eq!(sub.lookup(v), Some(seven));
//! assert!(leftover.is_emp());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod create;
pub mod hpara;
pub mod iso;
pub mod spatial;
pub mod unify;

pub use config::MatchConfig;
pub use create::{hpara_create, hpara_dll_create};
pub use hpara::{hpara_dll_iso, hpara_dll_match, hpara_iso, hpara_match};
pub use iso::{
    Corres, IsoMode, find_partial_iso, find_partial_iso_from_two_sigmas, hpred_lift_to_pe,
    sigma_lift_to_pe, sigma_remove_hpred,
};
pub use spatial::{HPat, SideCondition, prop_match_with_impl};
pub use unify::{UnifyState, exp_list_match, exp_match, strexp_match};
