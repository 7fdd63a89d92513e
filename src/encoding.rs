//! Bounded SAT encoding of deterministic automata.
//!
//! [`FsaEncoding`] describes "some DFA with exactly `n` states over this alphabet" as a
//! set of Boolean indicator variables inside a [`SatSolver`]:
//!
//! - `transition[from][symbol][to]`: the arc `from --symbol--> to` exists;
//! - `accept[state]`: the state is accepting.
//!
//! State 0 is the start state. The indicators are allocated once; every later
//! constraint only adds clauses over them (and over fresh auxiliary variables), so an
//! encoding stays valid across any number of refinement rounds on the same solver.
//!
//! Construction already enforces determinism (no epsilon arcs, at most one destination
//! per `(state, symbol)`), at least one accept state, and a symmetry-breaking order on
//! the non-start states.
//!
//! The encoding does not own the solver: every method borrows it, so two encodings
//! (invariant and order) can share one solver instance.

use log::debug;

use crate::alphabet::{Alphabet, Symbol, EPSILON_INDEX};
use crate::errors::{ProverError, SolverError};
use crate::fsa::{Dfa, FsaBuilder};
use crate::lit::Lit;
use crate::sat::{Model, SatSolver, SolveResult};
use crate::state::State;

const START: usize = 0;

#[derive(Debug, Clone)]
pub struct FsaEncoding<S> {
    alphabet: Alphabet<S>,
    states: usize,
    /// `transitions[from][symbol][to]`
    transitions: Vec<Vec<Vec<Lit>>>,
    accepts: Vec<Lit>,
    no_unreachable: bool,
    no_dead_end: bool,
}

/// Direction of a distance encoding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Distance {
    /// From the start state along arcs.
    FromStart,
    /// To an accept state along arcs.
    ToAccept,
}

impl<S: Symbol> FsaEncoding<S> {
    /// Allocates the indicators of an `states`-state DFA over `alphabet`.
    ///
    /// # Panics
    ///
    /// Panics if `states == 0`.
    pub fn new(solver: &mut impl SatSolver, states: usize, alphabet: Alphabet<S>) -> Result<Self, ProverError> {
        assert!(states > 0, "An encoding needs at least one state");
        let symbols = alphabet.len();
        let mut transitions = Vec::with_capacity(states);
        for _ in 0..states {
            let mut row = Vec::with_capacity(symbols);
            for _ in 0..symbols {
                row.push(solver.new_variables(states)?);
            }
            transitions.push(row);
        }
        let accepts = solver.new_variables(states)?;

        let mut encoding = Self {
            alphabet,
            states,
            transitions,
            accepts,
            no_unreachable: false,
            no_dead_end: false,
        };
        solver.add_clause(&encoding.accepts)?;
        encoding.ensure_determinism(solver)?;
        encoding.ensure_no_symmetric_instance(solver)?;
        debug!(
            "encoding: {} states over {} symbols, {} variables so far",
            states,
            symbols,
            solver.num_variables()
        );
        Ok(encoding)
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        &self.alphabet
    }

    pub fn state_count(&self) -> usize {
        self.states
    }

    /// Indicator of the arc `from --symbol--> to`, `symbol` being an alphabet code.
    pub fn transition_literal(&self, from: usize, symbol: usize, to: usize) -> Lit {
        self.transitions[from][symbol][to]
    }

    pub fn accept_literal(&self, state: usize) -> Lit {
        self.accepts[state]
    }

    fn ensure_determinism(&mut self, solver: &mut impl SatSolver) -> Result<(), ProverError> {
        for from in 0..self.states {
            for &to in &self.transitions[from][EPSILON_INDEX] {
                solver.set_false(to)?;
            }
            for symbol in 1..self.alphabet.len() {
                solver.add_at_most(&self.transitions[from][symbol], 1)?;
            }
        }
        Ok(())
    }

    /// Orders the non-start states by the key `accept ‖ self-loop bits`, which
    /// removes automorphic copies without excluding any language.
    fn ensure_no_symmetric_instance(&mut self, solver: &mut impl SatSolver) -> Result<(), ProverError> {
        let key = |state: usize| -> Vec<Lit> {
            let mut bits = vec![self.accepts[state]];
            bits.extend((1..self.alphabet.len()).map(|s| self.transitions[state][s][state]));
            bits
        };
        for state in (2..self.states).rev() {
            solver.add_greater_equal_binary(&key(state), &key(state - 1))?;
        }
        Ok(())
    }

    /// One-hot distance indicators per state, `distances[state][d]`.
    fn distance_indicators(&self, solver: &mut impl SatSolver) -> Result<Vec<Vec<Lit>>, ProverError> {
        let mut distances = Vec::with_capacity(self.states);
        for _ in 0..self.states {
            let one_hot = solver.new_variables(self.states)?;
            solver.add_exactly(&one_hot, 1)?;
            distances.push(one_hot);
        }
        Ok(distances)
    }

    /// If `required` holds, `state` sits at some distance `d > 0` realized by an arc
    /// from (or to) a neighbor at distance `d - 1`.
    fn encode_distance_by_arc(
        &self,
        solver: &mut impl SatSolver,
        required: Lit,
        state: usize,
        distances: &[Vec<Lit>],
        direction: Distance,
    ) -> Result<(), ProverError> {
        let mut causes = Vec::new();
        for neighbor in 0..self.states {
            for symbol in 1..self.alphabet.len() {
                let arc = match direction {
                    Distance::FromStart => self.transitions[neighbor][symbol][state],
                    Distance::ToAccept => self.transitions[state][symbol][neighbor],
                };
                for d in 1..self.states {
                    let cause = solver.new_variable()?;
                    let neighbor_before = distances[neighbor][d - 1];
                    let here = distances[state][d];
                    // cause <-> arc & neighbor_before & here
                    solver.add_implication(cause, arc)?;
                    solver.add_implication(cause, neighbor_before)?;
                    solver.add_implication(cause, here)?;
                    solver.add_clause(&[-arc, -neighbor_before, -here, cause])?;
                    causes.push(cause);
                }
            }
        }
        solver.add_clause_if(required, &causes)?;
        Ok(())
    }

    /// Every state is reachable from the start state. Idempotent.
    pub fn ensure_no_unreachable_state(&mut self, solver: &mut impl SatSolver) -> Result<(), ProverError> {
        if self.no_unreachable {
            return Ok(());
        }
        let distances = self.distance_indicators(solver)?;
        solver.set_true(distances[START][0])?;
        let required = solver.true_literal()?;
        for state in 0..self.states {
            if state != START {
                self.encode_distance_by_arc(solver, required, state, &distances, Distance::FromStart)?;
            }
        }
        self.no_unreachable = true;
        Ok(())
    }

    /// Every state reaches an accept state. Idempotent.
    pub fn ensure_no_dead_end_state(&mut self, solver: &mut impl SatSolver) -> Result<(), ProverError> {
        if self.no_dead_end {
            return Ok(());
        }
        let distances = self.distance_indicators(solver)?;
        for state in 0..self.states {
            let accept = self.accepts[state];
            solver.add_equivalence(accept, distances[state][0])?;
            self.encode_distance_by_arc(solver, -accept, state, &distances, Distance::ToAccept)?;
        }
        self.no_dead_end = true;
        Ok(())
    }

    /// Both [`ensure_no_unreachable_state`][Self::ensure_no_unreachable_state] and
    /// [`ensure_no_dead_end_state`][Self::ensure_no_dead_end_state].
    pub fn ensure_no_dangling_states(&mut self, solver: &mut impl SatSolver) -> Result<(), ProverError> {
        self.ensure_no_unreachable_state(solver)?;
        self.ensure_no_dead_end_state(solver)
    }

    fn encode_word(&self, word: &[S]) -> Result<Vec<usize>, ProverError> {
        let word = self.alphabet.normalize_word(word)?;
        Ok(word.iter().map(|s| self.alphabet.encode(s).unwrap_or(EPSILON_INDEX)).collect())
    }

    /// `activation → the automaton accepts word`
    fn accept_word_if(&self, solver: &mut impl SatSolver, activation: Lit, word: &[usize]) -> Result<(), ProverError> {
        let mut steps = Vec::with_capacity(word.len() + 1);
        for _ in 0..=word.len() {
            let step = solver.new_variables(self.states)?;
            solver.add_clause_if(activation, &step)?;
            steps.push(step);
        }
        solver.add_implication(activation, steps[0][START])?;

        for (head, &symbol) in word.iter().enumerate() {
            for qi in 0..self.states {
                for qj in 0..self.states {
                    let arc = self.transitions[qi][symbol][qj];
                    solver.add_clause_if(activation, &[-steps[head][qi], -steps[head + 1][qj], arc])?;
                }
            }
        }

        let last = &steps[word.len()];
        for state in 0..self.states {
            solver.add_clause_if(activation, &[-last[state], self.accepts[state]])?;
        }
        Ok(())
    }

    /// `activation → the automaton rejects word`
    ///
    /// Tracks every state the run may occupy; `failed[i]` records that the run blocked
    /// before reading letter `i`, after which nothing is required of it.
    fn reject_word_if(&self, solver: &mut impl SatSolver, activation: Lit, word: &[usize]) -> Result<(), ProverError> {
        let blocked_at = solver.new_variables(word.len())?;
        let failed = solver.new_variables(word.len() + 1)?;
        solver.add_implication(activation, -failed[0])?;
        for i in 0..word.len() {
            // failed[i + 1] <-> blocked_at[i] | failed[i]
            solver.add_clause_if(activation, &[-failed[i + 1], blocked_at[i], failed[i]])?;
            solver.add_clause_if(activation, &[-blocked_at[i], failed[i + 1]])?;
            solver.add_clause_if(activation, &[-failed[i], failed[i + 1]])?;
        }

        let mut steps = Vec::with_capacity(word.len() + 1);
        for i in 0..=word.len() {
            let step = solver.new_variables(self.states)?;
            let mut somewhere = vec![failed[i]];
            somewhere.extend_from_slice(&step);
            solver.add_clause_if(activation, &somewhere)?;
            steps.push(step);
        }
        solver.add_implication(activation, steps[0][START])?;

        for (head, &symbol) in word.iter().enumerate() {
            for qi in 0..self.states {
                for qj in 0..self.states {
                    let arc = self.transitions[qi][symbol][qj];
                    // The run follows every available arc.
                    solver.add_clause_if(activation, &[-steps[head][qi], -arc, steps[head + 1][qj]])?;
                    // It cannot block where an arc is available.
                    solver.add_clause_if(activation, &[-steps[head][qi], -arc, -blocked_at[head]])?;
                }
            }
        }

        let last = &steps[word.len()];
        for state in 0..self.states {
            solver.add_clause_if(activation, &[failed[word.len()], -last[state], -self.accepts[state]])?;
        }
        Ok(())
    }

    /// Forces `word` into the language.
    pub fn ensure_accepting_word(&mut self, solver: &mut impl SatSolver, word: &[S]) -> Result<(), ProverError> {
        let word = self.encode_word(word)?;
        let activation = solver.new_variable()?;
        self.accept_word_if(solver, activation, &word)?;
        solver.set_true(activation)?;
        Ok(())
    }

    /// Forces `word` out of the language.
    pub fn ensure_not_accepting_word(&mut self, solver: &mut impl SatSolver, word: &[S]) -> Result<(), ProverError> {
        let word = self.encode_word(word)?;
        let activation = solver.new_variable()?;
        self.reject_word_if(solver, activation, &word)?;
        solver.set_true(activation)?;
        Ok(())
    }

    /// Makes `indicator` equivalent to "the automaton accepts `word`".
    pub fn whether_accept_word(
        &mut self,
        solver: &mut impl SatSolver,
        indicator: Lit,
        word: &[S],
    ) -> Result<(), ProverError> {
        let word = self.encode_word(word)?;
        self.accept_word_if(solver, indicator, &word)?;
        self.reject_word_if(solver, -indicator, &word)
    }

    /// A fresh variable equivalent to "the automaton accepts `word`".
    pub fn accepts_word_literal(&mut self, solver: &mut impl SatSolver, word: &[S]) -> Result<Lit, ProverError> {
        let indicator = solver.new_variable()?;
        self.whether_accept_word(solver, indicator, word)?;
        Ok(indicator)
    }

    /// Rejects every non-empty word spelled only with `symbols`, and the empty word too
    /// when `symbols` contains epsilon.
    ///
    /// `pure[q]` holds when `q` can be reached from the start reading only `symbols`;
    /// the start state has two flags, for the empty prefix and for a non-empty one.
    pub fn ensure_no_word_purely_made_of(&mut self, solver: &mut impl SatSolver, symbols: &[S]) -> Result<(), ProverError> {
        let mut codes = Vec::with_capacity(symbols.len());
        for code in symbols.iter().filter_map(|s| self.alphabet.encode(s)) {
            if code == EPSILON_INDEX {
                solver.set_false(self.accepts[START])?;
            } else {
                codes.push(code);
            }
        }

        let pure = solver.new_variables(self.states + 1)?;
        solver.set_true(pure[START])?;
        let start_again = pure[self.states];
        for qi in 0..self.states {
            let accept = self.accepts[qi];
            if qi == START {
                solver.add_implication(accept, -start_again)?;
            } else {
                solver.add_implication(accept, -pure[qi])?;
            }
            for qj in 0..self.states {
                let reached = if qj == START { start_again } else { pure[qj] };
                for &symbol in &codes {
                    let arc = self.transitions[qi][symbol][qj];
                    solver.add_clause_if_all(&[pure[qi], arc], &[reached])?;
                }
            }
        }
        Ok(())
    }

    fn indicators(&self) -> impl Iterator<Item = Lit> + '_ {
        self.transitions
            .iter()
            .flat_map(|row| row.iter().flat_map(|dests| dests.iter().copied()))
            .chain(self.accepts.iter().copied())
    }

    /// Excludes the automaton of the current model from future solutions.
    ///
    /// Does nothing when the solver holds no model.
    pub fn block_current_instance(&mut self, solver: &mut impl SatSolver) -> Result<(), ProverError> {
        let Some(model) = solver.model() else {
            return Ok(());
        };
        let current: Vec<Lit> = self.indicators().map(|lit| lit.with_sign(model.value(lit))).collect();
        solver.add_blocking_clause(&current)?;
        Ok(())
    }

    /// Reads the automaton out of a model. States are named `s0`, `s1`, ...
    pub fn decode(&self, model: &Model) -> Result<Dfa<S>, ProverError> {
        let mut builder = FsaBuilder::new(self.alphabet.clone());
        let states: Vec<State> = (0..self.states).map(|i| builder.named(&format!("s{}", i))).collect();
        builder.add_start_state(states[START]);
        for (i, &state) in states.iter().enumerate() {
            if model.value(self.accept_literal(i)) {
                builder.add_accept_state(state);
            }
            for symbol in 1..self.alphabet.len() {
                for (j, &dest) in states.iter().enumerate() {
                    if model.value(self.transition_literal(i, symbol, j)) {
                        builder.add_transition(state, self.alphabet.decode(symbol).clone(), dest);
                    }
                }
            }
        }
        Ok(builder.build_deterministic()?)
    }

    /// Solves and decodes; `None` if the instance is unsatisfiable.
    ///
    /// An interrupted solve fails with [`SolverError::Interrupted`], so it is never
    /// mistaken for unsatisfiability.
    pub fn resolve(&self, solver: &mut impl SatSolver) -> Result<Option<Dfa<S>>, ProverError> {
        match solver.solve()? {
            SolveResult::Satisfiable => match solver.model() {
                Some(model) => Ok(Some(self.decode(model)?)),
                None => Err(SolverError::Interrupted.into()),
            },
            SolveResult::Unsatisfiable => Ok(None),
            SolveResult::TimedOut => Err(SolverError::Interrupted.into()),
        }
    }
}
