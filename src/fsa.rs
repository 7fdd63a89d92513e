//! Finite-state automata.
//!
//! An automaton is an alphabet, an arena of states, a set of start states, a set of
//! accept states and a transition relation. The relation comes in two concrete
//! representations (see [`delta`][crate::delta]), which gives two automaton types:
//!
//! - [`Dfa`]: a single start state, at most one destination per `(state, symbol)`,
//!   no epsilon arcs;
//! - [`Nfa`]: everything else.
//!
//! [`Fsa`] is the sum of the two. [`FsaBuilder::build`] decides once, from the
//! accumulated relation, which representation to produce. Algorithms that need a
//! deterministic operand take a [`Dfa`] (or fail with [`FsaError::Unsupported`] when
//! handed an [`Fsa`] holding an [`Nfa`]), so determinization is always explicit.
//!
//! Automata are immutable after construction. Derived properties (emptiness, the set
//! of incomplete states) are computed on first use and memoized.
//!
//! # Example
//!
//! ```
//! use fsa_prover::alphabet::Alphabet;
//! use fsa_prover::fsa::FsaBuilder;
//!
//! let alphabet = Alphabet::new("e", ["a", "b"]);
//! let mut builder = FsaBuilder::new(alphabet);
//! let q0 = builder.named("q0");
//! let q1 = builder.named("q1");
//! builder.add_start_state(q0).add_accept_state(q1);
//! builder.add_transition(q0, "a", q1).add_transition(q1, "b", q0);
//! let fsa = builder.build().unwrap();
//!
//! assert!(fsa.is_deterministic());
//! assert!(fsa.accepts(&["a", "b", "a"]));
//! assert!(!fsa.accepts(&["a", "b"]));
//! ```

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::OnceLock;

use crate::alphabet::{Alphabet, Symbol};
use crate::delta::{DetDelta, Delta, NondetDelta};
use crate::errors::FsaError;
use crate::state::State;

/// An automaton over symbols `S` with transition representation `D`.
#[derive(Debug, Clone)]
pub struct Automaton<S, D> {
    alphabet: Alphabet<S>,
    names: Vec<Option<String>>,
    start: Vec<State>,
    accept: Vec<bool>,
    delta: D,
    accepts_none: OnceLock<bool>,
    incomplete: OnceLock<Vec<State>>,
}

/// Deterministic automaton (map-backed relation).
pub type Dfa<S> = Automaton<S, DetDelta<S>>;

/// Nondeterministic automaton (set-backed relation).
pub type Nfa<S> = Automaton<S, NondetDelta<S>>;

impl<S: Symbol, D: Delta<S>> Automaton<S, D> {
    pub(crate) fn from_parts(alphabet: Alphabet<S>, names: Vec<Option<String>>, start: Vec<State>, accept: Vec<bool>, delta: D) -> Self {
        debug_assert_eq!(names.len(), delta.state_count());
        debug_assert_eq!(accept.len(), delta.state_count());
        Self {
            alphabet,
            names,
            start,
            accept,
            delta,
            accepts_none: OnceLock::new(),
            incomplete: OnceLock::new(),
        }
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        &self.alphabet
    }

    pub fn delta(&self) -> &D {
        &self.delta
    }

    pub fn state_count(&self) -> usize {
        self.delta.state_count()
    }

    pub fn states(&self) -> impl Iterator<Item = State> {
        (0..self.state_count()).map(State::from)
    }

    pub fn start_states(&self) -> &[State] {
        &self.start
    }

    pub fn is_start(&self, state: State) -> bool {
        self.start.binary_search(&state).is_ok()
    }

    pub fn is_accept(&self, state: State) -> bool {
        self.accept[state.index()]
    }

    pub fn accept_states(&self) -> impl Iterator<Item = State> + '_ {
        self.states().filter(|&s| self.is_accept(s))
    }

    pub fn is_deterministic(&self) -> bool {
        D::DETERMINISTIC
    }

    /// Display name of a state (its builder name, or `q<index>`).
    pub fn name(&self, state: State) -> String {
        match &self.names[state.index()] {
            Some(name) => name.clone(),
            None => state.to_string(),
        }
    }

    /// The builder-assigned name of a state, if any.
    pub fn state_name(&self, state: State) -> Option<&str> {
        self.names[state.index()].as_deref()
    }

    /// All states reachable from `states` through epsilon arcs (including `states`).
    pub fn epsilon_closure(&self, states: impl IntoIterator<Item = State>) -> BTreeSet<State> {
        let mut closure: BTreeSet<State> = states.into_iter().collect();
        if D::DETERMINISTIC {
            return closure;
        }
        let epsilon = self.alphabet.epsilon();
        let mut queue: VecDeque<State> = closure.iter().copied().collect();
        while let Some(state) = queue.pop_front() {
            for &next in self.delta.successors(state, epsilon) {
                if closure.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        closure
    }

    /// Epsilon-closed image of `states` under `symbol`.
    pub fn step(&self, states: &BTreeSet<State>, symbol: &S) -> BTreeSet<State> {
        let image = states
            .iter()
            .flat_map(|&s| self.delta.successors(s, symbol).iter().copied());
        self.epsilon_closure(image)
    }

    /// Whether the automaton accepts `word`. Epsilon letters are skipped; letters
    /// outside the alphabet are rejected.
    pub fn accepts(&self, word: &[S]) -> bool {
        let mut current = self.epsilon_closure(self.start.iter().copied());
        for symbol in word {
            if self.alphabet.is_epsilon(symbol) {
                continue;
            }
            current = self.step(&current, symbol);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|&s| self.is_accept(s))
    }

    /// Whether the language is empty (memoized).
    pub fn accepts_none(&self) -> bool {
        *self.accepts_none.get_or_init(|| {
            let reachable = self.reachable_states();
            !reachable.iter().any(|&s| self.is_accept(s))
        })
    }

    /// States reachable from a start state (all arcs, epsilon included).
    pub fn reachable_states(&self) -> BTreeSet<State> {
        let mut seen: BTreeSet<State> = self.start.iter().copied().collect();
        let mut queue: VecDeque<State> = self.start.iter().copied().collect();
        while let Some(state) = queue.pop_front() {
            for (_, dests) in self.delta.arcs_from(state) {
                for &next in dests {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// States from which an accept state is reachable (backward search over the inverse index).
    pub fn coreachable_states(&self) -> BTreeSet<State> {
        let mut seen: BTreeSet<State> = self.accept_states().collect();
        let mut queue: VecDeque<State> = seen.iter().copied().collect();
        while let Some(state) = queue.pop_front() {
            for (_, sources) in self.delta.arcs_to(state) {
                for &prev in sources {
                    if seen.insert(prev) {
                        queue.push_back(prev);
                    }
                }
            }
        }
        seen
    }

    /// States lacking an outgoing arc on some proper symbol (memoized).
    pub fn incomplete_states(&self) -> &[State] {
        self.incomplete.get_or_init(|| {
            self.states()
                .filter(|&s| self.alphabet.symbols().any(|symbol| !self.delta.has_arc(s, symbol)))
                .collect()
        })
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete_states().is_empty()
    }

    pub fn transition_count(&self) -> usize {
        self.delta.transition_count()
    }

    /// A builder pre-filled with a copy of this automaton.
    pub fn to_builder(&self) -> FsaBuilder<S> {
        let mut builder = FsaBuilder::new(self.alphabet.clone());
        for state in self.states() {
            let copy = builder.add_state();
            builder.names[copy.index()] = self.names[state.index()].clone();
            if let Some(name) = &self.names[state.index()] {
                builder.by_name.insert(name.clone(), copy);
            }
        }
        for &s in &self.start {
            builder.add_start_state(s);
        }
        for s in self.accept_states() {
            builder.add_accept_state(s);
        }
        for state in self.states() {
            for (symbol, dests) in self.delta.arcs_from(state) {
                for &dest in dests {
                    builder.add_transition(state, symbol.clone(), dest);
                }
            }
        }
        builder
    }
}

impl<S: Symbol> Dfa<S> {
    /// The unique start state.
    pub fn start(&self) -> State {
        self.start[0]
    }

    pub fn successor(&self, state: State, symbol: &S) -> Option<State> {
        self.delta.successor(state, symbol)
    }

    /// The state reached after reading `word`, if the run does not block.
    pub fn run(&self, word: &[S]) -> Option<State> {
        let mut current = self.start();
        for symbol in word {
            if self.alphabet.is_epsilon(symbol) {
                continue;
            }
            current = self.successor(current, symbol)?;
        }
        Some(current)
    }
}

impl<S: Symbol, D: Delta<S>> fmt::Display for Automaton<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |states: &mut dyn Iterator<Item = State>| {
            states.map(|s| self.name(s)).collect::<Vec<_>>().join(", ")
        };
        writeln!(f, "start: {}", join(&mut self.start.iter().copied()))?;
        writeln!(f, "accept: {}", join(&mut self.accept_states()))?;
        for state in self.states() {
            for (symbol, dests) in self.delta.arcs_from(state) {
                for &dest in dests {
                    writeln!(f, "{} -{:?}-> {}", self.name(state), symbol, self.name(dest))?;
                }
            }
        }
        Ok(())
    }
}

/// A finite automaton in one of its two representations.
#[derive(Debug, Clone)]
pub enum Fsa<S: Symbol> {
    Deterministic(Dfa<S>),
    Nondeterministic(Nfa<S>),
}

macro_rules! dispatch {
    ($self:expr, $a:ident => $body:expr) => {
        match $self {
            Fsa::Deterministic($a) => $body,
            Fsa::Nondeterministic($a) => $body,
        }
    };
}

impl<S: Symbol> Fsa<S> {
    /// The automaton accepting nothing: a single non-accepting start state.
    pub fn empty(alphabet: Alphabet<S>) -> Self {
        let mut builder = FsaBuilder::new(alphabet);
        let q = builder.add_state();
        builder.add_start_state(q);
        builder.build().expect("a single start state is always valid")
    }

    /// The automaton accepting every word over the alphabet.
    pub fn universal(alphabet: Alphabet<S>) -> Self {
        let mut builder = FsaBuilder::new(alphabet.clone());
        let q = builder.add_state();
        builder.add_start_state(q).add_accept_state(q);
        for symbol in alphabet.symbols() {
            builder.add_transition(q, symbol.clone(), q);
        }
        builder.build().expect("a single start state is always valid")
    }

    /// The automaton accepting exactly the given words.
    pub fn from_words<'w>(alphabet: Alphabet<S>, words: impl IntoIterator<Item = &'w [S]>) -> Result<Self, FsaError>
    where
        S: 'w,
    {
        let mut builder = FsaBuilder::new(alphabet.clone());
        let root = builder.add_state();
        builder.add_start_state(root);
        let mut trie: HashMap<(State, S), State> = HashMap::new();
        for word in words {
            let word = alphabet.normalize_word(word)?;
            let mut current = root;
            for symbol in word {
                current = match trie.get(&(current, symbol.clone())) {
                    Some(&next) => next,
                    None => {
                        let next = builder.add_state();
                        builder.add_transition(current, symbol.clone(), next);
                        trie.insert((current, symbol), next);
                        next
                    }
                };
            }
            builder.add_accept_state(current);
        }
        builder.build()
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        dispatch!(self, a => a.alphabet())
    }

    pub fn state_count(&self) -> usize {
        dispatch!(self, a => a.state_count())
    }

    pub fn states(&self) -> impl Iterator<Item = State> {
        (0..self.state_count()).map(State::from)
    }

    pub fn start_states(&self) -> &[State] {
        dispatch!(self, a => a.start_states())
    }

    pub fn is_start(&self, state: State) -> bool {
        dispatch!(self, a => a.is_start(state))
    }

    pub fn is_accept(&self, state: State) -> bool {
        dispatch!(self, a => a.is_accept(state))
    }

    pub fn is_deterministic(&self) -> bool {
        matches!(self, Fsa::Deterministic(_))
    }

    pub fn name(&self, state: State) -> String {
        dispatch!(self, a => a.name(state))
    }

    pub fn state_name(&self, state: State) -> Option<&str> {
        dispatch!(self, a => a.state_name(state))
    }

    pub fn successors(&self, state: State, symbol: &S) -> &[State] {
        dispatch!(self, a => a.delta().successors(state, symbol))
    }

    pub fn predecessors(&self, state: State, symbol: &S) -> &[State] {
        dispatch!(self, a => a.delta().predecessors(state, symbol))
    }

    pub fn arcs_from(&self, state: State) -> Box<dyn Iterator<Item = (&S, &[State])> + '_> {
        dispatch!(self, a => a.delta().arcs_from(state))
    }

    pub fn arcs_to(&self, state: State) -> Box<dyn Iterator<Item = (&S, &[State])> + '_> {
        dispatch!(self, a => a.delta().arcs_to(state))
    }

    pub fn epsilon_closure(&self, states: impl IntoIterator<Item = State>) -> BTreeSet<State> {
        dispatch!(self, a => a.epsilon_closure(states))
    }

    pub fn step(&self, states: &BTreeSet<State>, symbol: &S) -> BTreeSet<State> {
        dispatch!(self, a => a.step(states, symbol))
    }

    pub fn accepts(&self, word: &[S]) -> bool {
        dispatch!(self, a => a.accepts(word))
    }

    pub fn accepts_none(&self) -> bool {
        dispatch!(self, a => a.accepts_none())
    }

    pub fn reachable_states(&self) -> BTreeSet<State> {
        dispatch!(self, a => a.reachable_states())
    }

    pub fn coreachable_states(&self) -> BTreeSet<State> {
        dispatch!(self, a => a.coreachable_states())
    }

    pub fn transition_count(&self) -> usize {
        dispatch!(self, a => a.transition_count())
    }

    pub fn to_builder(&self) -> FsaBuilder<S> {
        dispatch!(self, a => a.to_builder())
    }

    /// The deterministic representation, if this is one.
    pub fn as_dfa(&self) -> Option<&Dfa<S>> {
        match self {
            Fsa::Deterministic(dfa) => Some(dfa),
            Fsa::Nondeterministic(_) => None,
        }
    }

    /// The deterministic representation, or [`FsaError::Unsupported`] naming `operation`.
    pub fn require_dfa(&self, operation: &'static str) -> Result<&Dfa<S>, FsaError> {
        self.as_dfa().ok_or(FsaError::Unsupported {
            operation,
            representation: "nondeterministic",
        })
    }

    /// Determinizes; a deterministic automaton is returned as-is (borrowed, not copied).
    pub fn determinize(&self) -> Cow<'_, Dfa<S>> {
        match self {
            Fsa::Deterministic(dfa) => Cow::Borrowed(dfa),
            Fsa::Nondeterministic(nfa) => Cow::Owned(nfa.determinize()),
        }
    }

    /// Same as [`determinize`][Self::determinize], consuming `self`.
    pub fn into_dfa(self) -> Dfa<S> {
        match self {
            Fsa::Deterministic(dfa) => dfa,
            Fsa::Nondeterministic(nfa) => nfa.determinize(),
        }
    }
}

impl<S: Symbol> From<Dfa<S>> for Fsa<S> {
    fn from(dfa: Dfa<S>) -> Self {
        Fsa::Deterministic(dfa)
    }
}

impl<S: Symbol> From<Nfa<S>> for Fsa<S> {
    fn from(nfa: Nfa<S>) -> Self {
        Fsa::Nondeterministic(nfa)
    }
}

impl<S: Symbol> fmt::Display for Fsa<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, a => a.fmt(f))
    }
}

/// Incremental automaton builder.
///
/// Mutators never fail on the spot; the first problem found (an unknown symbol, a
/// state that does not belong to this builder) is reported by [`build`][Self::build].
#[derive(Debug, Clone)]
pub struct FsaBuilder<S: Symbol> {
    alphabet: Alphabet<S>,
    names: Vec<Option<String>>,
    by_name: HashMap<String, State>,
    start: BTreeSet<State>,
    accept: BTreeSet<State>,
    delta: NondetDelta<S>,
    error: Option<FsaError>,
}

impl<S: Symbol> FsaBuilder<S> {
    pub fn new(alphabet: Alphabet<S>) -> Self {
        Self {
            alphabet,
            names: Vec::new(),
            by_name: HashMap::new(),
            start: BTreeSet::new(),
            accept: BTreeSet::new(),
            delta: NondetDelta::default(),
            error: None,
        }
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        &self.alphabet
    }

    pub fn state_count(&self) -> usize {
        self.names.len()
    }

    /// Adds a fresh anonymous state.
    pub fn add_state(&mut self) -> State {
        self.names.push(None);
        self.delta.add_state()
    }

    /// Returns the state with the given name, creating it on first use.
    pub fn named(&mut self, name: &str) -> State {
        if let Some(&state) = self.by_name.get(name) {
            return state;
        }
        let state = self.add_state();
        self.names[state.index()] = Some(name.to_string());
        self.by_name.insert(name.to_string(), state);
        state
    }

    fn check_state(&mut self, state: State) -> bool {
        if state.index() < self.state_count() {
            return true;
        }
        if self.error.is_none() {
            self.error = Some(FsaError::InvalidDefinition(format!("dangling state {}", state)));
        }
        false
    }

    pub fn add_start_state(&mut self, state: State) -> &mut Self {
        if self.check_state(state) {
            self.start.insert(state);
        }
        self
    }

    pub fn add_accept_state(&mut self, state: State) -> &mut Self {
        if self.check_state(state) {
            self.accept.insert(state);
        }
        self
    }

    pub fn add_start_states(&mut self, states: impl IntoIterator<Item = State>) -> &mut Self {
        for state in states {
            self.add_start_state(state);
        }
        self
    }

    pub fn add_accept_states(&mut self, states: impl IntoIterator<Item = State>) -> &mut Self {
        for state in states {
            self.add_accept_state(state);
        }
        self
    }

    pub fn add_transition(&mut self, from: State, symbol: S, to: State) -> &mut Self {
        if !self.check_state(from) || !self.check_state(to) {
            return self;
        }
        if !self.alphabet.contains(&symbol) {
            if self.error.is_none() {
                self.error = Some(FsaError::UnknownSymbol(format!("{:?}", symbol)));
            }
            return self;
        }
        // Epsilon self-loops do not change the language.
        if from == to && self.alphabet.is_epsilon(&symbol) {
            return self;
        }
        self.delta.insert(from, symbol, to);
        self
    }

    pub fn add_epsilon_transition(&mut self, from: State, to: State) -> &mut Self {
        let epsilon = self.alphabet.epsilon().clone();
        self.add_transition(from, epsilon, to)
    }

    pub fn remove_transition(&mut self, from: State, symbol: &S, to: State) -> &mut Self {
        if self.check_state(from) && self.check_state(to) {
            self.delta.remove(from, symbol, to);
        }
        self
    }

    pub fn is_start(&self, state: State) -> bool {
        self.start.contains(&state)
    }

    pub fn is_accept(&self, state: State) -> bool {
        self.accept.contains(&state)
    }

    pub fn successors(&self, state: State, symbol: &S) -> &[State] {
        self.delta.successors(state, symbol)
    }

    fn into_parts(self) -> Result<(Alphabet<S>, Vec<Option<String>>, Vec<State>, Vec<bool>, NondetDelta<S>), FsaError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.start.is_empty() {
            return Err(FsaError::InvalidDefinition("no start state".to_string()));
        }
        let mut accept = vec![false; self.names.len()];
        for s in &self.accept {
            accept[s.index()] = true;
        }
        let start = self.start.into_iter().collect();
        Ok((self.alphabet, self.names, start, accept, self.delta))
    }

    /// Builds the automaton, choosing the deterministic representation when the
    /// relation allows it (one start state, no epsilon arcs, at most one destination
    /// per `(state, symbol)`).
    pub fn build(self) -> Result<Fsa<S>, FsaError> {
        let (alphabet, names, start, accept, delta) = self.into_parts()?;
        if start.len() == 1 {
            if let Some(det) = DetDelta::from_nondet(&delta, alphabet.epsilon()) {
                return Ok(Fsa::Deterministic(Automaton::from_parts(alphabet, names, start, accept, det)));
            }
        }
        Ok(Fsa::Nondeterministic(Automaton::from_parts(alphabet, names, start, accept, delta)))
    }

    /// Builds the set-backed representation regardless of the relation's shape.
    pub fn build_nondeterministic(self) -> Result<Nfa<S>, FsaError> {
        let (alphabet, names, start, accept, delta) = self.into_parts()?;
        Ok(Automaton::from_parts(alphabet, names, start, accept, delta))
    }

    /// Builds the map-backed representation, failing if the relation is not deterministic.
    pub fn build_deterministic(self) -> Result<Dfa<S>, FsaError> {
        match self.build()? {
            Fsa::Deterministic(dfa) => Ok(dfa),
            Fsa::Nondeterministic(_) => Err(FsaError::InvalidDefinition(
                "relation is not deterministic".to_string(),
            )),
        }
    }
}
