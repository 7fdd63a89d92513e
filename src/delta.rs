//! Transition relations.
//!
//! Both representations keep a forward index `(state, symbol) -> destinations` and an
//! inverse index `(state, symbol) -> sources`, kept in sync by the insert/remove helpers,
//! so successor and predecessor queries are equally cheap.
//!
//! - [`DetDelta`] is map-backed: at most one destination per `(state, symbol)`, no epsilon arcs.
//! - [`NondetDelta`] is set-backed: any number of destinations, epsilon arcs allowed.
//!
//! States are arena indices; adjacency is stored per state index.

use std::collections::BTreeMap;

use crate::alphabet::Symbol;
use crate::state::State;

/// Read-only view shared by both transition representations.
pub trait Delta<S: Symbol>: Clone {
    /// Whether the representation guarantees determinism.
    const DETERMINISTIC: bool;

    fn state_count(&self) -> usize;

    /// Destinations of `state` on `symbol` (sorted, no duplicates).
    fn successors(&self, state: State, symbol: &S) -> &[State];

    /// Sources reaching `state` on `symbol` (sorted, no duplicates).
    fn predecessors(&self, state: State, symbol: &S) -> &[State];

    /// Outgoing arcs of `state`, grouped by symbol, in symbol order.
    fn arcs_from<'a>(&'a self, state: State) -> Box<dyn Iterator<Item = (&'a S, &'a [State])> + 'a>;

    /// Incoming arcs of `state`, grouped by symbol, in symbol order.
    fn arcs_to<'a>(&'a self, state: State) -> Box<dyn Iterator<Item = (&'a S, &'a [State])> + 'a>;

    fn transition_count(&self) -> usize {
        (0..self.state_count())
            .map(|i| self.arcs_from(State::from(i)).map(|(_, ds)| ds.len()).sum::<usize>())
            .sum()
    }

    /// Whether `state` has an outgoing arc labeled `symbol`.
    fn has_arc(&self, state: State, symbol: &S) -> bool {
        !self.successors(state, symbol).is_empty()
    }
}

fn insert_sorted(list: &mut Vec<State>, state: State) -> bool {
    match list.binary_search(&state) {
        Ok(_) => false,
        Err(pos) => {
            list.insert(pos, state);
            true
        }
    }
}

fn remove_sorted(list: &mut Vec<State>, state: State) -> bool {
    match list.binary_search(&state) {
        Ok(pos) => {
            list.remove(pos);
            true
        }
        Err(_) => false,
    }
}

/// Set-backed transition relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NondetDelta<S> {
    forward: Vec<BTreeMap<S, Vec<State>>>,
    backward: Vec<BTreeMap<S, Vec<State>>>,
}

impl<S: Symbol> Default for NondetDelta<S> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<S: Symbol> NondetDelta<S> {
    pub fn new(states: usize) -> Self {
        Self {
            forward: vec![BTreeMap::new(); states],
            backward: vec![BTreeMap::new(); states],
        }
    }

    pub fn add_state(&mut self) -> State {
        let state = State::from(self.forward.len());
        self.forward.push(BTreeMap::new());
        self.backward.push(BTreeMap::new());
        state
    }

    /// Adds the arc `from --symbol--> to`. Returns `false` if it was already present.
    pub fn insert(&mut self, from: State, symbol: S, to: State) -> bool {
        let added = insert_sorted(self.forward[from.index()].entry(symbol.clone()).or_default(), to);
        if added {
            insert_sorted(self.backward[to.index()].entry(symbol).or_default(), from);
        }
        added
    }

    /// Removes the arc `from --symbol--> to`. Returns `false` if it was absent.
    pub fn remove(&mut self, from: State, symbol: &S, to: State) -> bool {
        let removed = match self.forward[from.index()].get_mut(symbol) {
            Some(dests) => remove_sorted(dests, to),
            None => false,
        };
        if removed {
            if self.forward[from.index()][symbol].is_empty() {
                self.forward[from.index()].remove(symbol);
            }
            let sources = self.backward[to.index()].get_mut(symbol).expect("inverse index out of sync");
            remove_sorted(sources, from);
            if sources.is_empty() {
                self.backward[to.index()].remove(symbol);
            }
        }
        removed
    }

    /// Removes every arc incident to `state`, leaving the state itself in place.
    pub fn isolate(&mut self, state: State) {
        let outgoing: Vec<(S, Vec<State>)> = std::mem::take(&mut self.forward[state.index()]).into_iter().collect();
        for (symbol, dests) in outgoing {
            for dest in dests {
                if let Some(sources) = self.backward[dest.index()].get_mut(&symbol) {
                    remove_sorted(sources, state);
                    if sources.is_empty() {
                        self.backward[dest.index()].remove(&symbol);
                    }
                }
            }
        }
        let incoming: Vec<(S, Vec<State>)> = std::mem::take(&mut self.backward[state.index()]).into_iter().collect();
        for (symbol, sources) in incoming {
            for source in sources {
                if let Some(dests) = self.forward[source.index()].get_mut(&symbol) {
                    remove_sorted(dests, state);
                    if dests.is_empty() {
                        self.forward[source.index()].remove(&symbol);
                    }
                }
            }
        }
    }

    /// Whether at most one destination exists per `(state, symbol)` and no arc is labeled `epsilon`.
    pub fn is_deterministic(&self, epsilon: &S) -> bool {
        self.forward
            .iter()
            .all(|arcs| arcs.iter().all(|(symbol, dests)| symbol != epsilon && dests.len() <= 1))
    }
}

impl<S: Symbol> Delta<S> for NondetDelta<S> {
    const DETERMINISTIC: bool = false;

    fn state_count(&self) -> usize {
        self.forward.len()
    }

    fn successors(&self, state: State, symbol: &S) -> &[State] {
        self.forward[state.index()].get(symbol).map_or(&[], |v| v.as_slice())
    }

    fn predecessors(&self, state: State, symbol: &S) -> &[State] {
        self.backward[state.index()].get(symbol).map_or(&[], |v| v.as_slice())
    }

    fn arcs_from<'a>(&'a self, state: State) -> Box<dyn Iterator<Item = (&'a S, &'a [State])> + 'a> {
        Box::new(self.forward[state.index()].iter().map(|(s, ds)| (s, ds.as_slice())))
    }

    fn arcs_to<'a>(&'a self, state: State) -> Box<dyn Iterator<Item = (&'a S, &'a [State])> + 'a> {
        Box::new(self.backward[state.index()].iter().map(|(s, ds)| (s, ds.as_slice())))
    }
}

/// Map-backed transition relation with at most one destination per `(state, symbol)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetDelta<S> {
    forward: Vec<BTreeMap<S, State>>,
    backward: Vec<BTreeMap<S, Vec<State>>>,
}

impl<S: Symbol> DetDelta<S> {
    pub fn new(states: usize) -> Self {
        Self {
            forward: vec![BTreeMap::new(); states],
            backward: vec![BTreeMap::new(); states],
        }
    }

    /// Converts a set-backed relation, if it is deterministic with respect to `epsilon`.
    pub fn from_nondet(delta: &NondetDelta<S>, epsilon: &S) -> Option<Self> {
        if !delta.is_deterministic(epsilon) {
            return None;
        }
        let forward = delta
            .forward
            .iter()
            .map(|arcs| arcs.iter().map(|(s, ds)| (s.clone(), ds[0])).collect())
            .collect();
        Some(Self {
            forward,
            backward: delta.backward.clone(),
        })
    }

    /// The unique destination of `state` on `symbol`, if any.
    pub fn successor(&self, state: State, symbol: &S) -> Option<State> {
        self.forward[state.index()].get(symbol).copied()
    }

    /// Sets the destination of `state` on `symbol`, replacing the previous one.
    pub fn set(&mut self, from: State, symbol: S, to: State) {
        if let Some(old) = self.forward[from.index()].insert(symbol.clone(), to) {
            if let Some(sources) = self.backward[old.index()].get_mut(&symbol) {
                remove_sorted(sources, from);
                if sources.is_empty() {
                    self.backward[old.index()].remove(&symbol);
                }
            }
        }
        insert_sorted(self.backward[to.index()].entry(symbol).or_default(), from);
    }

    pub fn add_state(&mut self) -> State {
        let state = State::from(self.forward.len());
        self.forward.push(BTreeMap::new());
        self.backward.push(BTreeMap::new());
        state
    }
}

impl<S: Symbol> Delta<S> for DetDelta<S> {
    const DETERMINISTIC: bool = true;

    fn state_count(&self) -> usize {
        self.forward.len()
    }

    fn successors(&self, state: State, symbol: &S) -> &[State] {
        self.forward[state.index()].get(symbol).map_or(&[], std::slice::from_ref)
    }

    fn predecessors(&self, state: State, symbol: &S) -> &[State] {
        self.backward[state.index()].get(symbol).map_or(&[], |v| v.as_slice())
    }

    fn arcs_from<'a>(&'a self, state: State) -> Box<dyn Iterator<Item = (&'a S, &'a [State])> + 'a> {
        Box::new(self.forward[state.index()].iter().map(|(s, d)| (s, std::slice::from_ref(d))))
    }

    fn arcs_to<'a>(&'a self, state: State) -> Box<dyn Iterator<Item = (&'a S, &'a [State])> + 'a> {
        Box::new(self.backward[state.index()].iter().map(|(s, ds)| (s, ds.as_slice())))
    }

    fn transition_count(&self) -> usize {
        self.forward.iter().map(|arcs| arcs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn q(i: u32) -> State {
        State::new(i)
    }

    #[test]
    fn test_insert_keeps_inverse_in_sync() {
        let mut delta = NondetDelta::new(3);
        assert!(delta.insert(q(0), 'a', q(1)));
        assert!(delta.insert(q(0), 'a', q(2)));
        assert!(!delta.insert(q(0), 'a', q(1)));
        assert!(delta.insert(q(2), 'b', q(1)));

        assert_eq!(delta.successors(q(0), &'a'), &[q(1), q(2)]);
        assert_eq!(delta.predecessors(q(1), &'a'), &[q(0)]);
        assert_eq!(delta.predecessors(q(1), &'b'), &[q(2)]);
        assert_eq!(delta.transition_count(), 3);
        assert!(!delta.is_deterministic(&'e'));
    }

    #[test]
    fn test_remove_and_isolate() {
        let mut delta = NondetDelta::new(3);
        delta.insert(q(0), 'a', q(1));
        delta.insert(q(1), 'b', q(2));
        delta.insert(q(2), 'a', q(1));

        assert!(delta.remove(q(0), &'a', q(1)));
        assert!(!delta.remove(q(0), &'a', q(1)));
        assert!(delta.predecessors(q(1), &'a').contains(&q(2)));

        delta.isolate(q(1));
        assert_eq!(delta.transition_count(), 0);
        assert!(delta.predecessors(q(2), &'b').is_empty());
    }

    #[test]
    fn test_det_conversion() {
        let mut delta = NondetDelta::new(2);
        delta.insert(q(0), 'a', q(1));
        delta.insert(q(1), 'a', q(1));
        let det = DetDelta::from_nondet(&delta, &'e').unwrap();
        assert_eq!(det.successor(q(0), &'a'), Some(q(1)));
        assert_eq!(det.predecessors(q(1), &'a'), &[q(0), q(1)]);

        delta.insert(q(0), 'e', q(1));
        assert!(DetDelta::from_nondet(&delta, &'e').is_none());
    }

    #[test]
    fn test_det_set_replaces() {
        let mut det = DetDelta::new(3);
        det.set(q(0), 'a', q(1));
        det.set(q(0), 'a', q(2));
        assert_eq!(det.successors(q(0), &'a'), &[q(2)]);
        assert!(det.predecessors(q(1), &'a').is_empty());
        assert_eq!(det.transition_count(), 1);
    }
}
