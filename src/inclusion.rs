//! Language inclusion with witnesses.
//!
//! `check_inclusion(subsumer, includer)` decides `L(subsumer) ⊆ L(includer)`. When the
//! inclusion fails, the result carries a shortest word accepted by `subsumer` and
//! rejected by `includer`.
//!
//! The search is a breadth-first walk over pairs `(p, q)` where `p` is a state of the
//! subsumer and `q` a state of the completed, determinized includer. A `q` of `None`
//! stands for "the includer read a symbol outside its alphabet" and never accepts.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::alphabet::Symbol;
use crate::fsa::{Dfa, Fsa};
use crate::state::State;

/// Outcome of an inclusion check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inclusion<S> {
    Included,
    /// A word accepted by the subsumer and rejected by the includer.
    Counterexample(Vec<S>),
}

impl<S> Inclusion<S> {
    pub fn is_included(&self) -> bool {
        matches!(self, Inclusion::Included)
    }

    pub fn counterexample(&self) -> Option<&[S]> {
        match self {
            Inclusion::Included => None,
            Inclusion::Counterexample(word) => Some(word),
        }
    }
}

/// Decides `L(subsumer) ⊆ L(includer)`.
pub fn check_inclusion<S: Symbol>(subsumer: &Fsa<S>, includer: &Fsa<S>) -> Inclusion<S> {
    if subsumer.accepts_none() {
        return Inclusion::Included;
    }
    if includer.accepts_none() {
        // The subsumer is non-empty, so it has a shortest word.
        return match subsumer.shortest_word() {
            Some(word) => Inclusion::Counterexample(word),
            None => Inclusion::Included,
        };
    }
    let includer = includer.determinize().complete();
    check_inclusion_dfa(subsumer, &includer)
}

/// Same as [`check_inclusion`], for an includer that is already deterministic.
pub fn check_inclusion_dfa<S: Symbol>(subsumer: &Fsa<S>, includer: &Dfa<S>) -> Inclusion<S> {
    if subsumer.accepts_none() {
        return Inclusion::Included;
    }
    if is_universal_over(includer, subsumer) {
        return Inclusion::Included;
    }

    type Pair = (State, Option<State>);
    let mut parent: HashMap<Pair, Option<(Pair, Option<S>)>> = HashMap::new();
    let mut queue: VecDeque<Pair> = VecDeque::new();
    for &p in subsumer.start_states() {
        let pair = (p, Some(includer.start()));
        if parent.insert(pair, None).is_none() {
            queue.push_back(pair);
        }
    }

    while let Some(pair @ (p, q)) = queue.pop_front() {
        let includer_accepts = q.is_some_and(|q| includer.is_accept(q));
        if subsumer.is_accept(p) && !includer_accepts {
            debug!("inclusion: counterexample found after {} pairs", parent.len());
            return Inclusion::Counterexample(backtrace(&parent, pair));
        }
        for (symbol, dests) in subsumer.arcs_from(p) {
            let (next_q, letter) = if subsumer.alphabet().is_epsilon(symbol) {
                (q, None)
            } else {
                (q.and_then(|q| includer.successor(q, symbol)), Some(symbol.clone()))
            };
            for &next_p in dests {
                let next = (next_p, next_q);
                if !parent.contains_key(&next) {
                    parent.insert(next, Some((pair, letter.clone())));
                    queue.push_back(next);
                }
            }
        }
    }

    debug!("inclusion: holds, {} pairs explored", parent.len());
    Inclusion::Included
}

/// Whether `includer` accepts every word the subsumer can spell.
fn is_universal_over<S: Symbol>(includer: &Dfa<S>, subsumer: &Fsa<S>) -> bool {
    includer.is_complete()
        && subsumer.alphabet().symbols().all(|s| includer.alphabet().contains(s))
        && includer.reachable_states().iter().all(|&s| includer.is_accept(s))
}

fn backtrace<S: Symbol>(
    parent: &HashMap<(State, Option<State>), Option<((State, Option<State>), Option<S>)>>,
    mut pair: (State, Option<State>),
) -> Vec<S> {
    let mut word = Vec::new();
    while let Some(Some((prev, letter))) = parent.get(&pair) {
        if let Some(letter) = letter {
            word.push(letter.clone());
        }
        pair = *prev;
    }
    word.reverse();
    word
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::alphabet::Alphabet;
    use crate::fsa::FsaBuilder;

    fn alphabet() -> Alphabet<char> {
        Alphabet::new('e', ['a', 'b'])
    }

    /// `a*`
    fn only_a() -> Fsa<char> {
        let mut builder = FsaBuilder::new(alphabet());
        let q = builder.add_state();
        builder.add_start_state(q).add_accept_state(q).add_transition(q, 'a', q);
        builder.build().unwrap()
    }

    /// Words containing at least one `a` (nondeterministic).
    fn some_a() -> Fsa<char> {
        let mut builder = FsaBuilder::new(alphabet());
        let q0 = builder.add_state();
        let q1 = builder.add_state();
        builder.add_start_state(q0).add_accept_state(q1);
        builder.add_transition(q0, 'a', q0).add_transition(q0, 'b', q0);
        builder.add_transition(q0, 'a', q1);
        builder.add_transition(q1, 'a', q1).add_transition(q1, 'b', q1);
        builder.build().unwrap()
    }

    #[test]
    fn test_trivial_cases() {
        let empty = Fsa::empty(alphabet());
        let all = Fsa::universal(alphabet());
        assert!(check_inclusion(&empty, &only_a()).is_included());
        assert!(check_inclusion(&only_a(), &all).is_included());
        assert_eq!(check_inclusion(&only_a(), &empty), Inclusion::Counterexample(vec![]));
    }

    #[test]
    fn test_witness_is_shortest() {
        let result = check_inclusion(&only_a(), &some_a());
        assert_eq!(result, Inclusion::Counterexample(vec![]));

        let result = check_inclusion(&some_a(), &only_a());
        let word = result.counterexample().unwrap().to_vec();
        assert!(some_a().accepts(&word));
        assert!(!only_a().accepts(&word));
        assert_eq!(word.len(), 2);
    }

    #[test]
    fn test_inclusion_holds() {
        let aa = Fsa::from_words(alphabet(), [&['a', 'a'][..], &['a'][..]]).unwrap();
        assert!(check_inclusion(&aa, &only_a()).is_included());
        assert!(check_inclusion(&aa, &some_a()).is_included());
    }

    #[test]
    fn test_subsumer_with_epsilon() {
        let mut builder = FsaBuilder::new(alphabet());
        let q0 = builder.add_state();
        let q1 = builder.add_state();
        builder.add_start_state(q0).add_accept_state(q1);
        builder.add_epsilon_transition(q0, q1).add_transition(q1, 'b', q1);
        let b_star = builder.build().unwrap();
        let result = check_inclusion(&b_star, &some_a());
        assert_eq!(result, Inclusion::Counterexample(vec![]));
        assert!(check_inclusion(&b_star, &Fsa::universal(alphabet())).is_included());
    }

    #[test]
    fn test_foreign_symbols_are_rejected() {
        let wide = Alphabet::new('e', ['a', 'b', 'c']);
        let c_word = Fsa::from_words(wide.clone(), [&['c'][..]]).unwrap();
        let includer = Fsa::universal(alphabet());
        let result = check_inclusion(&c_word, &includer);
        assert_eq!(result, Inclusion::Counterexample(vec!['c']));
    }
}
