//! Normalised symbolic heaps and the focus iterator
//!
//! A [`Prop`] is the matcher's view of a symbolic heap: the pure
//! substitution recorded by normalisation plus the spatial conjunction.
//! [`PropIter`] is a cursor over the spatial part with focus, advance and
//! remove operations; `find` additionally stashes the substitution and
//! free-variable set produced by a successful filter so the matcher can
//! resume from them.

use crate::expr::ExprManager;
use crate::hpred::HeapPred;
use crate::ident::Ident;
use crate::sub::Sub;

/// A normalised symbolic heap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prop {
    /// Pure substitution part.
    pub sub: Sub,
    /// Spatial conjunction.
    pub sigma: Vec<HeapPred>,
}

impl Prop {
    /// The empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// A heap with the given spatial part and an empty pure part.
    pub fn from_sigma(sigma: Vec<HeapPred>) -> Self {
        Self {
            sub: Sub::empty(),
            sigma,
        }
    }

    /// Whether the spatial part is empty.
    pub fn is_emp(&self) -> bool {
        self.sigma.is_empty()
    }
}

/// Match state carried by a focused iterator: the substitution and the
/// remaining free variables produced by the filter that accepted the focus.
pub type MatchState = (Sub, Vec<Ident>);

/// A cursor over a heap's spatial conjunction.
#[derive(Debug, Clone)]
pub struct PropIter {
    sub: Sub,
    sigma: Vec<HeapPred>,
    pos: usize,
    state: Option<MatchState>,
}

impl PropIter {
    /// Focus on the first spatial predicate.
    ///
    /// When the spatial part is empty there is nothing to focus on and the
    /// heap is handed back unchanged.
    pub fn create(prop: Prop) -> std::result::Result<PropIter, Prop> {
        if prop.sigma.is_empty() {
            return Err(prop);
        }
        Ok(PropIter {
            sub: prop.sub,
            sigma: prop.sigma,
            pos: 0,
            state: None,
        })
    }

    /// Advance one position; `None` when the focus was on the last predicate.
    pub fn next(mut self) -> Option<PropIter> {
        if self.pos + 1 >= self.sigma.len() {
            return None;
        }
        self.pos += 1;
        self.state = None;
        Some(self)
    }

    /// The focused predicate.
    pub fn current(&self) -> &HeapPred {
        &self.sigma[self.pos]
    }

    /// The match state stashed by the last successful [`PropIter::find`].
    ///
    /// Panics when no filter has accepted the focus; asking for state off an
    /// unfocused iterator is a caller bug.
    pub fn state(&self) -> &MatchState {
        match &self.state {
            Some(st) => st,
            None => panic!("prop iterator holds no match state"),
        }
    }

    /// Advance (starting at the current focus) to the first predicate the
    /// filter accepts, stashing the filter's result as the match state.
    pub fn find<F>(mut self, tm: &mut ExprManager, mut filter: F) -> Option<PropIter>
    where
        F: FnMut(&mut ExprManager, &HeapPred) -> Option<MatchState>,
    {
        while self.pos < self.sigma.len() {
            if let Some(st) = filter(tm, &self.sigma[self.pos]) {
                self.state = Some(st);
                return Some(self);
            }
            self.pos += 1;
        }
        None
    }

    /// Reify back to a heap, keeping the focused predicate.
    pub fn to_prop(self) -> Prop {
        Prop {
            sub: self.sub,
            sigma: self.sigma,
        }
    }

    /// Drop the focused predicate and reify back to a heap.
    pub fn remove_curr_then_to_prop(mut self) -> Prop {
        self.sigma.remove(self.pos);
        Prop {
            sub: self.sub,
            sigma: self.sigma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strexp::Strexp;

    fn sample_sigma(tm: &mut ExprManager) -> Vec<HeapPred> {
        let ty = tm.mk_sizeof("int");
        ["x", "y", "z"]
            .iter()
            .map(|name| {
                let root = tm.mk_lvar(name);
                let zero = tm.mk_int(0);
                HeapPred::PointsTo {
                    root,
                    value: Strexp::atom(zero),
                    ty,
                }
            })
            .collect()
    }

    #[test]
    fn create_rejects_empty_spatial_part() {
        let p = Prop::new();
        assert!(PropIter::create(p.clone()).is_err());
        assert_eq!(PropIter::create(p.clone()).unwrap_err(), p);
    }

    #[test]
    fn create_then_to_prop_is_identity() {
        let mut tm = ExprManager::new();
        let p = Prop::from_sigma(sample_sigma(&mut tm));
        let iter = PropIter::create(p.clone()).unwrap();
        assert_eq!(iter.to_prop(), p);
    }

    #[test]
    fn next_walks_every_position() {
        let mut tm = ExprManager::new();
        let sigma = sample_sigma(&mut tm);
        let mut iter = PropIter::create(Prop::from_sigma(sigma.clone())).unwrap();
        assert_eq!(iter.current(), &sigma[0]);
        iter = iter.next().unwrap();
        assert_eq!(iter.current(), &sigma[1]);
        iter = iter.next().unwrap();
        assert_eq!(iter.current(), &sigma[2]);
        assert!(iter.next().is_none());
    }

    #[test]
    fn find_stops_on_accepted_focus_and_stashes_state() {
        let mut tm = ExprManager::new();
        let sigma = sample_sigma(&mut tm);
        let wanted = sigma[1].root();
        let iter = PropIter::create(Prop::from_sigma(sigma.clone())).unwrap();
        let found = iter
            .find(&mut tm, |_, pred| {
                (pred.root() == wanted).then(|| (Sub::empty(), vec![]))
            })
            .unwrap();
        assert_eq!(found.current(), &sigma[1]);
        assert_eq!(found.state(), &(Sub::empty(), vec![]));
    }

    #[test]
    fn find_exhausts_on_no_match() {
        let mut tm = ExprManager::new();
        let sigma = sample_sigma(&mut tm);
        let iter = PropIter::create(Prop::from_sigma(sigma)).unwrap();
        assert!(iter.find(&mut tm, |_, _| None).is_none());
    }

    #[test]
    fn remove_curr_drops_exactly_the_focus() {
        let mut tm = ExprManager::new();
        let sigma = sample_sigma(&mut tm);
        let iter = PropIter::create(Prop::from_sigma(sigma.clone()))
            .unwrap()
            .next()
            .unwrap();
        let p = iter.remove_curr_then_to_prop();
        assert_eq!(p.sigma, vec![sigma[0].clone(), sigma[2].clone()]);
    }

    #[test]
    #[should_panic(expected = "no match state")]
    fn state_on_unfocused_iterator_aborts() {
        let mut tm = ExprManager::new();
        let iter = PropIter::create(Prop::from_sigma(sample_sigma(&mut tm))).unwrap();
        let _ = iter.state();
    }
}
