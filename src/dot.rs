//! Automaton to DOT (Graphviz) conversion.
//!
//! The generated graph follows these conventions:
//! - **States** are circles labeled with their names; accept states are double circles
//! - **Start states** get an incoming arrow from an invisible point node
//! - **Arcs** between the same pair of states are merged into one edge whose label
//!   lists the symbols; epsilon arcs are dashed
//!
//! # Examples
//!
//! ```
//! use fsa_prover::alphabet::Alphabet;
//! use fsa_prover::fsa::Fsa;
//!
//! let fsa = Fsa::from_words(Alphabet::new("e", ["a", "b"]), [&["a", "b"][..]]).unwrap();
//! let dot = fsa.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("digraph {"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::alphabet::Symbol;
use crate::delta::Delta;
use crate::fsa::{Automaton, Fsa};
use crate::state::State;

/// Configuration options for DOT output generation.
///
/// ```
/// use fsa_prover::dot::DotConfig;
///
/// let config = DotConfig {
///     rankdir: "TB",
///     ..DotConfig::default()
/// };
/// assert_eq!(config.accept_shape, "doublecircle");
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for non-accepting states (default: "circle")
    pub state_shape: &'static str,
    /// Shape for accepting states (default: "doublecircle")
    pub accept_shape: &'static str,
    /// Layout direction (default: "LR")
    pub rankdir: &'static str,
    /// Style for epsilon arcs (default: "dashed")
    pub epsilon_edge_style: &'static str,
    /// Label printed for the epsilon symbol (default: "ε")
    pub epsilon_label: &'static str,
    /// Separator between symbols on a merged edge (default: ", ")
    pub symbol_separator: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "circle",
            accept_shape: "doublecircle",
            rankdir: "LR",
            epsilon_edge_style: "dashed",
            epsilon_label: "ε",
            symbol_separator: ", ",
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl<S: Symbol, D: Delta<S>> Automaton<S, D> {
    /// Converts the automaton to DOT format with the default configuration.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the automaton to DOT format.
    ///
    /// Symbols are printed with their `Debug` representation.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir={};", config.rankdir)?;

        for state in self.states() {
            let shape = if self.is_accept(state) {
                config.accept_shape
            } else {
                config.state_shape
            };
            writeln!(
                dot,
                "{} [shape={}, label=\"{}\"];",
                state.index(),
                shape,
                escape(&self.name(state))
            )?;
        }

        for (i, &start) in self.start_states().iter().enumerate() {
            writeln!(dot, "init{} [shape=point];", i)?;
            writeln!(dot, "init{} -> {};", i, start.index())?;
        }

        for state in self.states() {
            // Merge parallel arcs; epsilon ones stay separate to get their own style.
            let mut edges = BTreeMap::<(State, bool), Vec<String>>::new();
            for (symbol, dests) in self.delta().arcs_from(state) {
                let epsilon = self.alphabet().is_epsilon(symbol);
                let label = if epsilon {
                    config.epsilon_label.to_string()
                } else {
                    format!("{:?}", symbol)
                };
                for &dest in dests {
                    edges.entry((dest, epsilon)).or_default().push(label.clone());
                }
            }
            for ((dest, epsilon), labels) in edges {
                let label = escape(&labels.join(config.symbol_separator));
                if epsilon {
                    writeln!(
                        dot,
                        "{} -> {} [label=\"{}\", style={}];",
                        state.index(),
                        dest.index(),
                        label,
                        config.epsilon_edge_style
                    )?;
                } else {
                    writeln!(dot, "{} -> {} [label=\"{}\"];", state.index(), dest.index(), label)?;
                }
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl<S: Symbol> Fsa<S> {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        match self {
            Fsa::Deterministic(dfa) => dfa.to_dot_with_config(config),
            Fsa::Nondeterministic(nfa) => nfa.to_dot_with_config(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::alphabet::Alphabet;
    use crate::fsa::FsaBuilder;

    fn sample() -> Fsa<&'static str> {
        let mut builder = FsaBuilder::new(Alphabet::new("e", ["a", "b"]));
        let q0 = builder.named("q0");
        let q1 = builder.named("q1");
        builder.add_start_state(q0).add_accept_state(q1);
        builder.add_transition(q0, "a", q1).add_transition(q0, "b", q1);
        builder.add_epsilon_transition(q1, q0);
        builder.build().unwrap()
    }

    #[test]
    fn test_to_dot_basic() {
        let dot = sample().to_dot().unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("1 [shape=doublecircle, label=\"q1\"];"));
        assert!(dot.contains("init0 -> 0;"));
    }

    #[test]
    fn test_parallel_arcs_are_merged() {
        let dot = sample().to_dot().unwrap();
        assert!(dot.contains("0 -> 1 [label=\"\\\"a\\\", \\\"b\\\"\"];"), "{}", dot);
        assert!(dot.contains("1 -> 0 [label=\"ε\", style=dashed];"), "{}", dot);
    }

    #[test]
    fn test_to_dot_with_config() {
        let config = DotConfig {
            rankdir: "TB",
            epsilon_label: "eps",
            ..DotConfig::default()
        };
        let dot = sample().to_dot_with_config(&config).unwrap();
        assert!(dot.contains("rankdir=TB;"));
        assert!(dot.contains("label=\"eps\""));
    }

    /// Helper test to write a DOT file for manual inspection (disabled by default)
    #[test]
    #[ignore]
    fn test_write_dot_file() {
        let dot = sample().to_dot().unwrap();
        std::fs::write("test_output.dot", &dot).unwrap();
        println!("DOT output:\n{}", dot);
    }
}
