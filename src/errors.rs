//! Error types.
//!
//! Three layers of failure are kept apart:
//!
//! - [`FsaError`]: malformed automaton definitions (rejected eagerly by the builder)
//!   and deterministic-only operations invoked on the nondeterministic representation.
//! - [`SolverError`]: resource ceilings and immediate contradictions in the SAT layer.
//! - [`ProverError`]: everything that can abort a proof attempt.
//!
//! A failed verification condition is *not* an error: it is the value that drives
//! the search loop (see [`Check`][crate::checks::Check]).

use thiserror::Error;

/// Errors raised while building or transforming automata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsaError {
    /// The accumulated definition does not describe a valid automaton.
    #[error("invalid automaton definition: {0}")]
    InvalidDefinition(String),

    /// A transition label or a word letter is not a member of the alphabet.
    #[error("symbol {0} is not in the alphabet")]
    UnknownSymbol(String),

    /// The operation needs a representation the operand does not have.
    #[error("{operation} is unsupported for the {representation} representation")]
    Unsupported {
        operation: &'static str,
        representation: &'static str,
    },
}

/// Errors raised by the SAT layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    /// Allocating more variables would exceed the configured ceiling.
    #[error("variable limit exceeded: requested {requested}, limit is {limit}")]
    VariableLimit { requested: usize, limit: usize },

    /// A literal refers to variable 0 or to a variable that was never allocated.
    #[error("invalid literal {0}")]
    InvalidLiteral(i32),

    /// The clause is falsified by unit clauses already present.
    #[error("clause contradicts existing unit clauses")]
    Contradiction,

    /// A cardinality constraint was asked for a degree that cannot hold.
    #[error("cardinality constraint of degree {degree} over {len} literals")]
    EmptyCardinality { degree: usize, len: usize },

    /// The solver stopped on its deadline or cancellation flag without an answer.
    #[error("solver interrupted before reaching an answer")]
    Interrupted,
}

/// Errors that abort a proof attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProverError {
    #[error(transparent)]
    Fsa(#[from] FsaError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The problem definition is inconsistent (alphabets disagree, empty bounds, ...).
    #[error("invalid problem: {0}")]
    InvalidProblem(String),
}
