//! Automaton algorithms.
//!
//! Everything here builds a fresh automaton; operands are never modified.
//!
//! Deterministic-only operations ([`complete`][Dfa::complete],
//! [`complement`][Dfa::complement], [`count_words`][Dfa::count_words]) are defined
//! on [`Dfa`]. Their [`Fsa`] counterparts fail with [`FsaError::Unsupported`] on the
//! nondeterministic representation instead of determinizing behind the caller's back.

use std::collections::{BTreeSet, HashMap, VecDeque};

use log::debug;
use num_bigint::BigUint;

use crate::alphabet::{Alphabet, Symbol};
use crate::delta::{DetDelta, Delta};
use crate::errors::FsaError;
use crate::fsa::{Automaton, Dfa, Fsa, FsaBuilder};
use crate::state::State;

impl<S: Symbol, D: Delta<S>> Automaton<S, D> {
    /// Subset construction over epsilon-closures.
    ///
    /// The result is partial: the empty subset is never materialized.
    pub fn determinize(&self) -> Dfa<S> {
        let alphabet = self.alphabet().clone();
        let mut delta = DetDelta::new(0);
        let mut accept = Vec::new();
        let mut table: HashMap<BTreeSet<State>, State> = HashMap::new();
        let mut queue = VecDeque::new();

        let initial = self.epsilon_closure(self.start_states().iter().copied());
        let start = delta.add_state();
        accept.push(initial.iter().any(|&s| self.is_accept(s)));
        table.insert(initial.clone(), start);
        queue.push_back(initial);

        while let Some(subset) = queue.pop_front() {
            let from = table[&subset];
            for symbol in alphabet.symbols() {
                let next = self.step(&subset, symbol);
                if next.is_empty() {
                    continue;
                }
                let to = match table.get(&next) {
                    Some(&to) => to,
                    None => {
                        let to = delta.add_state();
                        accept.push(next.iter().any(|&s| self.is_accept(s)));
                        table.insert(next.clone(), to);
                        queue.push_back(next);
                        to
                    }
                };
                delta.set(from, symbol.clone(), to);
            }
        }

        debug!("determinize: {} states -> {} states", self.state_count(), table.len());
        let names = vec![None; accept.len()];
        Automaton::from_parts(alphabet, names, vec![start], accept, delta)
    }

    /// A shortest accepted word (epsilon letters omitted), or `None` if the language is empty.
    ///
    /// Breadth-first over states where epsilon arcs cost nothing, so the word found has
    /// the fewest proper letters.
    pub fn shortest_word(&self) -> Option<Vec<S>> {
        let n = self.state_count();
        let mut dist = vec![usize::MAX; n];
        let mut parent: Vec<Option<(State, Option<S>)>> = vec![None; n];
        let mut queue = VecDeque::new();
        for &s in self.start_states() {
            dist[s.index()] = 0;
            queue.push_back(s);
        }

        let mut target = None;
        while let Some(state) = queue.pop_front() {
            if self.is_accept(state) {
                target = Some(state);
                break;
            }
            let d = dist[state.index()];
            for (symbol, dests) in self.delta().arcs_from(state) {
                let epsilon = self.alphabet().is_epsilon(symbol);
                let cost = if epsilon { d } else { d + 1 };
                for &next in dests {
                    if cost < dist[next.index()] {
                        dist[next.index()] = cost;
                        parent[next.index()] = Some((state, (!epsilon).then(|| symbol.clone())));
                        if epsilon {
                            queue.push_front(next);
                        } else {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        let mut state = target?;
        let mut word = Vec::new();
        while let Some((prev, symbol)) = &parent[state.index()] {
            if let Some(symbol) = symbol {
                word.push(symbol.clone());
            }
            state = *prev;
        }
        word.reverse();
        Some(word)
    }

    /// Removes states that are unreachable from a start state or cannot reach an accept state.
    ///
    /// An automaton with an empty language trims down to [`Fsa::empty`].
    pub fn trim(&self) -> Fsa<S> {
        let reachable = self.reachable_states();
        let coreachable = self.coreachable_states();
        let keep: Vec<State> = reachable.intersection(&coreachable).copied().collect();
        if !self.start_states().iter().any(|s| keep.contains(s)) {
            return Fsa::empty(self.alphabet().clone());
        }

        let mut builder = FsaBuilder::new(self.alphabet().clone());
        let mut mapping = HashMap::new();
        for &state in &keep {
            let copy = match self.state_name(state) {
                Some(name) => builder.named(name),
                None => builder.add_state(),
            };
            mapping.insert(state, copy);
        }
        for &state in &keep {
            let from = mapping[&state];
            if self.is_start(state) {
                builder.add_start_state(from);
            }
            if self.is_accept(state) {
                builder.add_accept_state(from);
            }
            for (symbol, dests) in self.delta().arcs_from(state) {
                for dest in dests {
                    if let Some(&to) = mapping.get(dest) {
                        builder.add_transition(from, symbol.clone(), to);
                    }
                }
            }
        }
        debug!("trim: {} states -> {} states", self.state_count(), keep.len());
        builder.build().expect("trimmed automaton keeps a start state")
    }
}

impl<S: Symbol> Dfa<S> {
    /// Adds a non-accepting sink absorbing every missing transition.
    ///
    /// Returns a plain copy when the automaton is already complete.
    pub fn complete(&self) -> Dfa<S> {
        if self.is_complete() {
            return self.clone();
        }
        let mut delta = self.delta().clone();
        let sink = delta.add_state();
        for &state in self.incomplete_states() {
            for symbol in self.alphabet().symbols() {
                if self.successor(state, symbol).is_none() {
                    delta.set(state, symbol.clone(), sink);
                }
            }
        }
        for symbol in self.alphabet().symbols() {
            delta.set(sink, symbol.clone(), sink);
        }
        let mut accept: Vec<bool> = self.states().map(|s| self.is_accept(s)).collect();
        accept.push(false);
        let mut names: Vec<Option<String>> = self.states().map(|s| self.state_name(s).map(str::to_string)).collect();
        names.push(None);
        Automaton::from_parts(self.alphabet().clone(), names, vec![self.start()], accept, delta)
    }

    /// Completes, then swaps accepting and non-accepting states.
    pub fn complement(&self) -> Dfa<S> {
        let complete = self.complete();
        let accept = complete.states().map(|s| !complete.is_accept(s)).collect();
        let names = complete.states().map(|s| complete.state_name(s).map(str::to_string)).collect();
        Automaton::from_parts(
            complete.alphabet().clone(),
            names,
            vec![complete.start()],
            accept,
            complete.delta().clone(),
        )
    }

    /// Number of accepted words of exactly `length` letters.
    pub fn count_words(&self, length: usize) -> BigUint {
        let mut counts = vec![BigUint::ZERO; self.state_count()];
        counts[self.start().index()] = BigUint::from(1u32);
        for _ in 0..length {
            let mut next = vec![BigUint::ZERO; self.state_count()];
            for state in self.states() {
                if counts[state.index()] == BigUint::ZERO {
                    continue;
                }
                for (_, dests) in self.delta().arcs_from(state) {
                    next[dests[0].index()] += &counts[state.index()];
                }
            }
            counts = next;
        }
        self.accept_states().map(|s| counts[s.index()].clone()).sum()
    }
}

impl<S: Symbol> Fsa<S> {
    pub fn complete(&self) -> Result<Dfa<S>, FsaError> {
        Ok(self.require_dfa("complete")?.complete())
    }

    pub fn complement(&self) -> Result<Dfa<S>, FsaError> {
        Ok(self.require_dfa("complement")?.complement())
    }

    pub fn count_words(&self, length: usize) -> Result<BigUint, FsaError> {
        Ok(self.require_dfa("count_words")?.count_words(length))
    }

    pub fn trim(&self) -> Fsa<S> {
        match self {
            Fsa::Deterministic(a) => a.trim(),
            Fsa::Nondeterministic(a) => a.trim(),
        }
    }

    pub fn shortest_word(&self) -> Option<Vec<S>> {
        match self {
            Fsa::Deterministic(a) => a.shortest_word(),
            Fsa::Nondeterministic(a) => a.shortest_word(),
        }
    }
}

/// Generic synchronized product.
///
/// Explores pairs of states reachable from `start(a) × start(b)`. An epsilon arc on
/// either side advances that side alone and yields an epsilon arc in the product.
/// For proper symbols `(x, y)`, `decider` picks the product label, or `None` for no
/// transition. A product state is accepting when `accept(a accepts, b accepts)` holds.
pub fn product<A, B, T>(
    a: &Fsa<A>,
    b: &Fsa<B>,
    alphabet: Alphabet<T>,
    decider: impl Fn(&A, &B) -> Option<T>,
    accept: impl Fn(bool, bool) -> bool,
) -> Result<Fsa<T>, FsaError>
where
    A: Symbol,
    B: Symbol,
    T: Symbol,
{
    let mut builder = FsaBuilder::new(alphabet.clone());
    let mut table: HashMap<(State, State), State> = HashMap::new();
    let mut queue = VecDeque::new();

    let mut visit = |builder: &mut FsaBuilder<T>, pair: (State, State), queue: &mut VecDeque<(State, State)>| {
        *table.entry(pair).or_insert_with(|| {
            let state = builder.add_state();
            if accept(a.is_accept(pair.0), b.is_accept(pair.1)) {
                builder.add_accept_state(state);
            }
            queue.push_back(pair);
            state
        })
    };

    for &p in a.start_states() {
        for &q in b.start_states() {
            let state = visit(&mut builder, (p, q), &mut queue);
            builder.add_start_state(state);
        }
    }

    let epsilon = alphabet.epsilon().clone();
    let mut explored = 0usize;
    while let Some((p, q)) = queue.pop_front() {
        let from = visit(&mut builder, (p, q), &mut queue);
        explored += 1;
        for (x, dests_a) in a.arcs_from(p) {
            if a.alphabet().is_epsilon(x) {
                for &p2 in dests_a {
                    let to = visit(&mut builder, (p2, q), &mut queue);
                    builder.add_transition(from, epsilon.clone(), to);
                }
                continue;
            }
            for (y, dests_b) in b.arcs_from(q) {
                if b.alphabet().is_epsilon(y) {
                    continue;
                }
                let Some(label) = decider(x, y) else {
                    continue;
                };
                for &p2 in dests_a {
                    for &q2 in dests_b {
                        let to = visit(&mut builder, (p2, q2), &mut queue);
                        builder.add_transition(from, label.clone(), to);
                    }
                }
            }
        }
        for &q2 in b.successors(q, b.alphabet().epsilon()) {
            let to = visit(&mut builder, (p, q2), &mut queue);
            builder.add_transition(from, epsilon.clone(), to);
        }
    }

    debug!("product: {} x {} states -> {} states", a.state_count(), b.state_count(), explored);
    builder.build()
}

fn require_same_alphabet<S: Symbol>(a: &Fsa<S>, b: &Fsa<S>) -> Result<(), FsaError> {
    if a.alphabet() != b.alphabet() {
        return Err(FsaError::InvalidDefinition(format!(
            "alphabets differ: {} vs {}",
            a.alphabet(),
            b.alphabet()
        )));
    }
    Ok(())
}

/// Automaton accepting the words accepted by both operands.
pub fn intersection<S: Symbol>(a: &Fsa<S>, b: &Fsa<S>) -> Result<Fsa<S>, FsaError> {
    require_same_alphabet(a, b)?;
    product(a, b, a.alphabet().clone(), |x, y| (x == y).then(|| x.clone()), |p, q| p && q)
}

/// Automaton accepting the words accepted by either operand.
///
/// Both operands are determinized and completed first, so a run never blocks on one side.
pub fn union<S: Symbol>(a: &Fsa<S>, b: &Fsa<S>) -> Result<Fsa<S>, FsaError> {
    require_same_alphabet(a, b)?;
    let a = Fsa::from(a.determinize().complete());
    let b = Fsa::from(b.determinize().complete());
    product(&a, &b, a.alphabet().clone(), |x, y| (x == y).then(|| x.clone()), |p, q| p || q)
}
