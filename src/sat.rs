//! The SAT solver interface.
//!
//! [`SatSolver`] is the only seam between the encoder/prover and a concrete solver.
//! Implementors provide variable allocation, clause addition, solving, model access and
//! reset; everything else (implications, cardinality constraints, blocking clauses,
//! binary comparison) is derived here in terms of [`add_clause`][SatSolver::add_clause].
//!
//! Variables are 1-indexed and literals are signed, see [`Lit`].

use std::time::Duration;

use crate::errors::SolverError;
use crate::lit::{Lit, Var};

/// Result of a [`solve`][SatSolver::solve] call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SolveResult {
    Satisfiable,
    Unsatisfiable,
    /// The solver was interrupted (deadline or cancellation) before reaching an answer.
    TimedOut,
}

/// A satisfying assignment, indexed by variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Value of a variable; variables beyond the model are false.
    pub fn var_value(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    /// Whether the literal is satisfied.
    pub fn value(&self, lit: Lit) -> bool {
        self.var_value(lit.var()) == lit.is_positive()
    }

    /// The literals made true, one per variable.
    pub fn literals(&self) -> impl Iterator<Item = Lit> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| Var::new(i as u32 + 1).pos().with_sign(v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Configuration of a solver instance.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock budget for a single `solve` call (default: none).
    pub timeout: Option<Duration>,
    /// Ceiling on allocated variables (default: 1 000 000).
    pub max_variables: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_variables: 1_000_000,
        }
    }
}

impl SolverConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_variables(mut self, max_variables: usize) -> Self {
        self.max_variables = max_variables;
        self
    }
}

/// An incremental SAT solver.
pub trait SatSolver {
    /// Number of variables allocated so far.
    fn num_variables(&self) -> usize;

    /// Allocates `count` fresh variables with contiguous indices, returned as positive literals.
    ///
    /// Fails with [`SolverError::VariableLimit`] if the ceiling would be exceeded.
    fn new_variables(&mut self, count: usize) -> Result<Vec<Lit>, SolverError>;

    /// Adds a disjunctive clause.
    ///
    /// Fails with [`SolverError::InvalidLiteral`] on unallocated variables and with
    /// [`SolverError::Contradiction`] if the clause is falsified by known unit clauses.
    fn add_clause(&mut self, clause: &[Lit]) -> Result<(), SolverError>;

    fn solve(&mut self) -> Result<SolveResult, SolverError>;

    /// The model of the last satisfiable `solve` call, if it is still current.
    fn model(&self) -> Option<&Model>;

    /// Drops every clause and variable; numbering restarts from 1.
    fn reset(&mut self);

    fn new_variable(&mut self) -> Result<Lit, SolverError> {
        Ok(self.new_variables(1)?[0])
    }

    /// A fresh variable forced to true.
    fn true_literal(&mut self) -> Result<Lit, SolverError> {
        let lit = self.new_variable()?;
        self.set_true(lit)?;
        Ok(lit)
    }

    fn set_true(&mut self, lit: Lit) -> Result<(), SolverError> {
        self.add_clause(&[lit])
    }

    fn set_false(&mut self, lit: Lit) -> Result<(), SolverError> {
        self.add_clause(&[-lit])
    }

    /// `a → b`
    fn add_implication(&mut self, a: Lit, b: Lit) -> Result<(), SolverError> {
        self.add_clause(&[-a, b])
    }

    /// `a ↔ b`
    fn add_equivalence(&mut self, a: Lit, b: Lit) -> Result<(), SolverError> {
        self.add_clause(&[-a, b])?;
        self.add_clause(&[a, -b])
    }

    /// `condition → (l1 ∨ l2 ∨ ...)`
    fn add_clause_if(&mut self, condition: Lit, clause: &[Lit]) -> Result<(), SolverError> {
        let mut guarded = Vec::with_capacity(clause.len() + 1);
        guarded.push(-condition);
        guarded.extend_from_slice(clause);
        self.add_clause(&guarded)
    }

    /// `(c1 ∧ c2 ∧ ...) → (l1 ∨ l2 ∨ ...)`
    fn add_clause_if_all(&mut self, conditions: &[Lit], clause: &[Lit]) -> Result<(), SolverError> {
        let mut guarded: Vec<Lit> = conditions.iter().map(|&c| -c).collect();
        guarded.extend_from_slice(clause);
        self.add_clause(&guarded)
    }

    /// Forbids the conjunction of `lits`.
    fn add_blocking_clause(&mut self, lits: &[Lit]) -> Result<(), SolverError> {
        let negated: Vec<Lit> = lits.iter().map(|&l| -l).collect();
        self.add_clause(&negated)
    }

    /// At most `degree` of `lits` are true.
    ///
    /// Degree 1 uses the pairwise encoding; larger degrees use a sequential counter.
    fn add_at_most(&mut self, lits: &[Lit], degree: usize) -> Result<(), SolverError> {
        let n = lits.len();
        if degree >= n {
            return Ok(());
        }
        if degree == 0 {
            for &l in lits {
                self.set_false(l)?;
            }
            return Ok(());
        }
        if degree == 1 {
            for i in 0..n {
                for j in i + 1..n {
                    self.add_clause(&[-lits[i], -lits[j]])?;
                }
            }
            return Ok(());
        }

        // counter[i][j]: at least j+1 of lits[0..=i] are true.
        let k = degree;
        let mut counter = Vec::with_capacity(n - 1);
        for _ in 0..n - 1 {
            counter.push(self.new_variables(k)?);
        }
        self.add_clause(&[-lits[0], counter[0][0]])?;
        for j in 1..k {
            self.set_false(counter[0][j])?;
        }
        for i in 1..n - 1 {
            self.add_clause(&[-lits[i], counter[i][0]])?;
            self.add_clause(&[-counter[i - 1][0], counter[i][0]])?;
            for j in 1..k {
                self.add_clause(&[-lits[i], -counter[i - 1][j - 1], counter[i][j]])?;
                self.add_clause(&[-counter[i - 1][j], counter[i][j]])?;
            }
            self.add_clause(&[-lits[i], -counter[i - 1][k - 1]])?;
        }
        self.add_clause(&[-lits[n - 1], -counter[n - 2][k - 1]])
    }

    /// At least `degree` of `lits` are true.
    fn add_at_least(&mut self, lits: &[Lit], degree: usize) -> Result<(), SolverError> {
        let n = lits.len();
        if degree == 0 {
            return Ok(());
        }
        if degree > n {
            return Err(SolverError::EmptyCardinality { degree, len: n });
        }
        if degree == 1 {
            return self.add_clause(lits);
        }
        let negated: Vec<Lit> = lits.iter().map(|&l| -l).collect();
        self.add_at_most(&negated, n - degree)
    }

    /// Exactly `degree` of `lits` are true.
    fn add_exactly(&mut self, lits: &[Lit], degree: usize) -> Result<(), SolverError> {
        self.add_at_least(lits, degree)?;
        self.add_at_most(lits, degree)
    }

    /// `a ≥ b` as unsigned binary numbers, most significant bit first.
    ///
    /// # Panics
    ///
    /// Panics if the operands differ in width.
    fn add_greater_equal_binary(&mut self, a: &[Lit], b: &[Lit]) -> Result<(), SolverError> {
        assert_eq!(a.len(), b.len(), "Operands must have the same width");
        if a.is_empty() {
            return Ok(());
        }
        // equal[i]: a and b agree on the first i+1 bits.
        let equal = self.new_variables(a.len() - 1)?;
        for i in 0..a.len() {
            let prefix_equal = if i == 0 { None } else { Some(equal[i - 1]) };
            let guard: Vec<Lit> = prefix_equal.map(|e| -e).into_iter().collect();
            let mut clause = guard.clone();
            clause.extend([a[i], -b[i]]);
            self.add_clause(&clause)?;
            if i + 1 < a.len() {
                let mut both_true = guard.clone();
                both_true.extend([-a[i], -b[i], equal[i]]);
                self.add_clause(&both_true)?;
                let mut both_false = guard;
                both_false.extend([a[i], b[i], equal[i]]);
                self.add_clause(&both_false)?;
            }
        }
        Ok(())
    }
}
