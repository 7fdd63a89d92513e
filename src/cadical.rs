//! [`SatSolver`] backed by the CaDiCaL solver.
//!
//! Besides forwarding clauses, the wrapper keeps track of unit clauses so that a
//! clause falsified by them is reported as [`SolverError::Contradiction`] on the spot,
//! and enforces the variable ceiling from [`SolverConfig`].
//!
//! Solving can be interrupted by a deadline (from [`SolverConfig::timeout`]) or by an
//! external cancellation flag; either way the result is [`SolveResult::TimedOut`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cadical::Callbacks;
use log::debug;

use crate::errors::SolverError;
use crate::lit::{Lit, Var};
use crate::sat::{Model, SatSolver, SolveResult, SolverConfig};

/// Termination callback polled by CaDiCaL during search.
#[derive(Debug, Default)]
pub struct Interrupt {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Callbacks for Interrupt {
    fn terminate(&mut self) -> bool {
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return true;
            }
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}

pub struct CadicalSolver {
    solver: cadical::Solver<Interrupt>,
    config: SolverConfig,
    cancel: Option<Arc<AtomicBool>>,
    num_vars: usize,
    num_clauses: usize,
    units: HashMap<Var, bool>,
    model: Option<Model>,
}

impl Default for CadicalSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl CadicalSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            solver: cadical::Solver::default(),
            config,
            cancel: None,
            num_vars: 0,
            num_clauses: 0,
            units: HashMap::new(),
            model: None,
        }
    }

    /// Attaches a flag that interrupts `solve` once set.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn num_clauses(&self) -> usize {
        self.num_clauses
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn check(&self, lit: Lit) -> Result<(), SolverError> {
        if lit.var().id() as usize > self.num_vars {
            return Err(SolverError::InvalidLiteral(lit.to_dimacs()));
        }
        Ok(())
    }

    fn unit_value(&self, lit: Lit) -> Option<bool> {
        self.units.get(&lit.var()).map(|&v| v == lit.is_positive())
    }
}

impl SatSolver for CadicalSolver {
    fn num_variables(&self) -> usize {
        self.num_vars
    }

    fn new_variables(&mut self, count: usize) -> Result<Vec<Lit>, SolverError> {
        let requested = self.num_vars + count;
        if requested > self.config.max_variables {
            return Err(SolverError::VariableLimit {
                requested,
                limit: self.config.max_variables,
            });
        }
        let first = self.num_vars as u32 + 1;
        self.num_vars = requested;
        Ok((first..first + count as u32).map(|id| Var::new(id).pos()).collect())
    }

    fn add_clause(&mut self, clause: &[Lit]) -> Result<(), SolverError> {
        for &lit in clause {
            self.check(lit)?;
        }
        if clause.iter().any(|&l| self.unit_value(l) == Some(true)) {
            return Ok(());
        }
        let open: Vec<Lit> = clause.iter().copied().filter(|&l| self.unit_value(l).is_none()).collect();
        match open.as_slice() {
            [] => return Err(SolverError::Contradiction),
            [unit] => {
                self.units.insert(unit.var(), unit.is_positive());
            }
            _ => {}
        }
        self.solver.add_clause(open.iter().map(|l| l.to_dimacs()));
        self.num_clauses += 1;
        self.model = None;
        Ok(())
    }

    fn solve(&mut self) -> Result<SolveResult, SolverError> {
        if self.is_cancelled() {
            return Ok(SolveResult::TimedOut);
        }
        let start = Instant::now();
        self.solver.set_callbacks(Some(Interrupt {
            deadline: self.config.timeout.map(|t| start + t),
            cancel: self.cancel.clone(),
        }));
        let result = match self.solver.solve() {
            Some(true) => {
                let max = self.solver.max_variable();
                let values = (1..=self.num_vars as i32)
                    .map(|v| v <= max && self.solver.value(v) == Some(true))
                    .collect();
                self.model = Some(Model::new(values));
                SolveResult::Satisfiable
            }
            Some(false) => {
                self.model = None;
                SolveResult::Unsatisfiable
            }
            None => {
                self.model = None;
                SolveResult::TimedOut
            }
        };
        debug!(
            "solve: {:?} with {} vars and {} clauses in {:.3}s",
            result,
            self.num_vars,
            self.num_clauses,
            start.elapsed().as_secs_f64()
        );
        Ok(result)
    }

    fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn reset(&mut self) {
        self.solver = cadical::Solver::default();
        self.num_vars = 0;
        self.num_clauses = 0;
        self.units.clear();
        self.model = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_log::test;

    use super::*;

    fn model_count(solver: &mut CadicalSolver, vars: &[Lit]) -> usize {
        let mut count = 0;
        while solver.solve().unwrap() == SolveResult::Satisfiable {
            count += 1;
            let model = solver.model().unwrap().clone();
            let current: Vec<Lit> = vars.iter().map(|&v| v.with_sign(model.value(v))).collect();
            if solver.add_blocking_clause(&current).is_err() {
                break;
            }
        }
        count
    }

    #[test]
    fn test_allocation() {
        let mut solver = CadicalSolver::new(SolverConfig::default().with_max_variables(5));
        let vars = solver.new_variables(3).unwrap();
        assert_eq!(vars.iter().map(|l| l.to_dimacs()).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            solver.new_variables(3),
            Err(SolverError::VariableLimit { requested: 6, limit: 5 })
        );
        assert_eq!(
            solver.add_clause(&[Lit::from_dimacs(4)]),
            Err(SolverError::InvalidLiteral(4))
        );
        solver.reset();
        assert_eq!(solver.num_variables(), 0);
        assert_eq!(solver.new_variable().unwrap().to_dimacs(), 1);
    }

    #[test]
    fn test_contradiction() {
        let mut solver = CadicalSolver::default();
        let x = solver.new_variable().unwrap();
        let y = solver.new_variable().unwrap();
        solver.set_true(x).unwrap();
        solver.add_clause(&[-x, y]).unwrap();
        assert_eq!(solver.set_false(x), Err(SolverError::Contradiction));
        assert_eq!(solver.solve().unwrap(), SolveResult::Satisfiable);
        let model = solver.model().unwrap();
        assert!(model.value(x));
        assert!(model.value(y));
    }

    #[test]
    fn test_unsat() {
        let mut solver = CadicalSolver::default();
        let vars = solver.new_variables(2).unwrap();
        solver.add_clause(&[vars[0], vars[1]]).unwrap();
        solver.add_clause(&[-vars[0], vars[1]]).unwrap();
        solver.add_clause(&[vars[0], -vars[1]]).unwrap();
        solver.add_clause(&[-vars[0], -vars[1]]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveResult::Unsatisfiable);
        assert!(solver.model().is_none());
    }

    #[test]
    fn test_cardinality() {
        for n in 1..=5 {
            for k in 0..=n {
                let mut solver = CadicalSolver::default();
                let vars = solver.new_variables(n).unwrap();
                solver.add_exactly(&vars, k).unwrap();
                let expected = (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1));
                assert_eq!(model_count(&mut solver, &vars), expected, "n={} k={}", n, k);
            }
        }
    }

    #[test]
    fn test_at_least_too_many() {
        let mut solver = CadicalSolver::default();
        let vars = solver.new_variables(2).unwrap();
        assert_eq!(
            solver.add_at_least(&vars, 3),
            Err(SolverError::EmptyCardinality { degree: 3, len: 2 })
        );
    }

    #[test]
    fn test_greater_equal_binary() {
        // Count pairs (a, b) of 3-bit numbers with a >= b: 8 * 9 / 2.
        let mut solver = CadicalSolver::default();
        let a = solver.new_variables(3).unwrap();
        let b = solver.new_variables(3).unwrap();
        solver.add_greater_equal_binary(&a, &b).unwrap();
        let all: Vec<Lit> = a.iter().chain(&b).copied().collect();
        assert_eq!(model_count(&mut solver, &all), 36);
    }

    #[test]
    fn test_cancel() {
        let cancel = Arc::new(AtomicBool::new(true));
        let mut solver = CadicalSolver::new(SolverConfig::default().with_timeout(Duration::from_secs(1)))
            .with_cancel(cancel.clone());
        let x = solver.new_variable().unwrap();
        solver.add_clause(&[x]).unwrap();
        assert_eq!(solver.solve().unwrap(), SolveResult::TimedOut);
        cancel.store(false, Ordering::Relaxed);
        assert_eq!(solver.solve().unwrap(), SolveResult::Satisfiable);
    }
}
