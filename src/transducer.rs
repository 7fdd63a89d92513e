//! Length-preserving transducers.
//!
//! A transducer is an automaton over pairs `(input, output)`; its alphabet is the
//! [`product`][Alphabet::product] of a configuration alphabet, with `(ε, ε)` as epsilon.
//! Projections, images and composition are derived on demand, nothing is stored.
//!
//! Word images are computed layer by layer: after reading `i` letters, each reachable
//! state holds the set of partial images that lead to it. The `(state, position)` layers
//! play the role of a memo table, so no suffix is explored twice and the stack stays flat.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::debug;

use crate::alphabet::{Alphabet, Symbol};
use crate::errors::FsaError;
use crate::fsa::{Fsa, FsaBuilder};
use crate::ops::product;
use crate::state::State;

/// An automaton over `(input, output)` pairs.
pub type Transducer<S> = Fsa<(S, S)>;

/// Zips two words of equal length into a word of pairs.
///
/// # Panics
///
/// Panics if the lengths differ.
pub fn pair_word<S: Symbol>(input: &[S], output: &[S]) -> Vec<(S, S)> {
    assert_eq!(input.len(), output.len(), "Transducer words must have equal length");
    input.iter().cloned().zip(output.iter().cloned()).collect()
}

/// Splits a word of pairs into its input and output words.
pub fn unzip<S: Symbol>(word: &[(S, S)]) -> (Vec<S>, Vec<S>) {
    word.iter().cloned().unzip()
}

/// The configuration alphabet a pair alphabet is made of.
pub fn component_alphabet<S: Symbol>(alphabet: &Alphabet<(S, S)>) -> Alphabet<S> {
    let epsilon = alphabet.epsilon().0.clone();
    let symbols = alphabet.symbols().flat_map(|(a, b)| [a.clone(), b.clone()]);
    Alphabet::new(epsilon, symbols)
}

/// Composition: `(x, z)` is accepted iff some `y` has `(x, y)` in `first` and `(y, z)` in `second`.
pub fn compose<S: Symbol>(first: &Transducer<S>, second: &Transducer<S>) -> Result<Transducer<S>, FsaError> {
    let alphabet = first.alphabet().clone();
    product(
        first,
        second,
        alphabet,
        |(a, b), (c, d)| (b == c).then(|| (a.clone(), d.clone())),
        |p, q| p && q,
    )
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

type Layer<S> = BTreeMap<State, BTreeSet<Vec<S>>>;

/// Propagates partial images along epsilon arcs until nothing changes.
fn close_layer<S: Symbol>(transducer: &Transducer<S>, layer: &mut Layer<S>) {
    let epsilon = transducer.alphabet().epsilon().clone();
    let mut queue: VecDeque<State> = layer.keys().copied().collect();
    while let Some(state) = queue.pop_front() {
        let images = layer[&state].clone();
        for &next in transducer.successors(state, &epsilon) {
            let entry = layer.entry(next).or_default();
            let before = entry.len();
            entry.extend(images.iter().cloned());
            if entry.len() != before {
                queue.push_back(next);
            }
        }
    }
}

fn image<S: Symbol>(transducer: &Transducer<S>, word: &[S], direction: Direction) -> BTreeSet<Vec<S>> {
    let mut layer: Layer<S> = transducer
        .start_states()
        .iter()
        .map(|&s| (s, BTreeSet::from([Vec::new()])))
        .collect();
    close_layer(transducer, &mut layer);

    for letter in word {
        let mut next: Layer<S> = BTreeMap::new();
        for (&state, images) in &layer {
            for ((a, b), dests) in transducer.arcs_from(state) {
                let (read, written) = match direction {
                    Direction::Forward => (a, b),
                    Direction::Backward => (b, a),
                };
                if read != letter {
                    continue;
                }
                for &dest in dests {
                    let entry = next.entry(dest).or_default();
                    for image in images {
                        let mut extended = image.clone();
                        extended.push(written.clone());
                        entry.insert(extended);
                    }
                }
            }
        }
        if next.is_empty() {
            return BTreeSet::new();
        }
        close_layer(transducer, &mut next);
        layer = next;
    }

    layer
        .into_iter()
        .filter(|(state, _)| transducer.is_accept(*state))
        .flat_map(|(_, images)| images)
        .collect()
}

/// All `y` with `(word, y)` accepted.
pub fn post_image<S: Symbol>(transducer: &Transducer<S>, word: &[S]) -> BTreeSet<Vec<S>> {
    let result = image(transducer, word, Direction::Forward);
    debug!("post_image of {:?}: {} words", word, result.len());
    result
}

/// All `x` with `(x, word)` accepted.
pub fn pre_image<S: Symbol>(transducer: &Transducer<S>, word: &[S]) -> BTreeSet<Vec<S>> {
    let result = image(transducer, word, Direction::Backward);
    debug!("pre_image of {:?}: {} words", word, result.len());
    result
}

/// Automaton accepting `{ y | (x, y) accepted, x ∈ L(fsa) }`.
pub fn post_image_fsa<S: Symbol>(transducer: &Transducer<S>, fsa: &Fsa<S>) -> Result<Fsa<S>, FsaError> {
    product(
        fsa,
        transducer,
        fsa.alphabet().clone(),
        |x, (a, b)| (x == a).then(|| b.clone()),
        |p, q| p && q,
    )
}

/// Automaton accepting `{ x | (x, y) accepted, y ∈ L(fsa) }`.
pub fn pre_image_fsa<S: Symbol>(transducer: &Transducer<S>, fsa: &Fsa<S>) -> Result<Fsa<S>, FsaError> {
    product(
        fsa,
        transducer,
        fsa.alphabet().clone(),
        |y, (a, b)| (y == b).then(|| a.clone()),
        |p, q| p && q,
    )
}

/// Restricts the transducer to pairs whose input is accepted by `fsa`.
pub fn filter_by_input<S: Symbol>(transducer: &Transducer<S>, fsa: &Fsa<S>) -> Result<Transducer<S>, FsaError> {
    product(
        transducer,
        fsa,
        transducer.alphabet().clone(),
        |(a, b), x| (a == x).then(|| (a.clone(), b.clone())),
        |p, q| p && q,
    )
}

/// Restricts the transducer to pairs whose output is accepted by `fsa`.
pub fn filter_by_output<S: Symbol>(transducer: &Transducer<S>, fsa: &Fsa<S>) -> Result<Transducer<S>, FsaError> {
    product(
        transducer,
        fsa,
        transducer.alphabet().clone(),
        |(a, b), y| (b == y).then(|| (a.clone(), b.clone())),
        |p, q| p && q,
    )
}

fn project<S: Symbol>(transducer: &Transducer<S>, pick: impl Fn(&(S, S)) -> S) -> Fsa<S> {
    let alphabet = component_alphabet(transducer.alphabet());
    let mut builder = FsaBuilder::new(alphabet.clone());
    for state in transducer.states() {
        match transducer.state_name(state) {
            Some(name) => builder.named(name),
            None => builder.add_state(),
        };
    }
    builder.add_start_states(transducer.start_states().iter().copied());
    builder.add_accept_states(transducer.states().filter(|&s| transducer.is_accept(s)));
    for state in transducer.states() {
        for (pair, dests) in transducer.arcs_from(state) {
            let symbol = if transducer.alphabet().is_epsilon(pair) {
                alphabet.epsilon().clone()
            } else {
                pick(pair)
            };
            for &dest in dests {
                builder.add_transition(state, symbol.clone(), dest);
            }
        }
    }
    builder.build().expect("projection keeps the start states")
}

/// Automaton accepting the inputs of the transducer (its domain).
pub fn project_input<S: Symbol>(transducer: &Transducer<S>) -> Fsa<S> {
    project(transducer, |(a, _)| a.clone())
}

/// Automaton accepting the outputs of the transducer (its range).
pub fn project_output<S: Symbol>(transducer: &Transducer<S>) -> Fsa<S> {
    project(transducer, |(_, b)| b.clone())
}
