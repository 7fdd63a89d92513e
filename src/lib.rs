//! # fsa-prover: automata-based progress proofs
//!
//! **`fsa-prover`** searches for progress proofs of parameterized systems whose
//! configurations are words and whose steps are length-preserving transducers.
//!
//! ## What is a progress proof?
//!
//! Given initial configurations `I₀`, final configurations `F`, a scheduler and a
//! process (both transducers), a proof is a pair of automata:
//!
//! - an **invariant** `I ⊇ I₀` closed under the combined step, and
//! - a **strict order** `O` over configuration pairs, transitive and irreflexive,
//!   such that every non-final configuration in `I` can step to something below it.
//!
//! Since `O` is well-founded on words of a fixed length, every run eventually reaches `F`.
//!
//! ## How the search works
//!
//! Candidate automata of bounded size are described by boolean variables
//! ([`encoding`]) and found by a SAT solver ([`cadical`]). Each candidate is checked
//! ([`checks`]); a failed check produces a counterexample whose refinement clauses rule
//! the candidate out, and the solver is asked again ([`prover`]).
//!
//! ## Basic Usage
//!
//! ```
//! use fsa_prover::alphabet::Alphabet;
//! use fsa_prover::fsa::Fsa;
//! use fsa_prover::inclusion::check_inclusion;
//!
//! let alphabet = Alphabet::new("e", ["a", "b"]);
//! let small = Fsa::from_words(alphabet.clone(), [&["a"][..]]).unwrap();
//! let large = Fsa::from_words(alphabet, [&["a"][..], &["b"][..]]).unwrap();
//!
//! assert!(check_inclusion(&small, &large).is_included());
//! assert_eq!(check_inclusion(&large, &small).counterexample(), Some(&["b"][..]));
//! ```
//!
//! ## Core Components
//!
//! - **[`fsa`]**, **[`ops`]**, **[`inclusion`]**, **[`transducer`]**: automata and their algorithms.
//! - **[`sat`]**, **[`cadical`]**, **[`encoding`]**: the bounded automaton encoder.
//! - **[`problem`]**, **[`checks`]**, **[`prover`]**: the proof search.
//! - **[`dot`]**: Graphviz output.

pub mod alphabet;
pub mod cadical;
pub mod checks;
pub mod delta;
pub mod dot;
pub mod encoding;
pub mod errors;
pub mod fsa;
pub mod inclusion;
pub mod lit;
pub mod ops;
pub mod problem;
pub mod prover;
pub mod sat;
pub mod state;
pub mod transducer;
