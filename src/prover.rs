//! The counterexample-guided search for progress proofs.
//!
//! For each size pair `(inv, ord)`, in the order given by [`Problem::size_pairs`], the
//! prover encodes an `inv`-state invariant and an `ord`-state order into one fresh
//! solver instance and alternates:
//!
//! 1. solve, decode the two candidates;
//! 2. check the four conditions ([`Conditions::verify`]);
//! 3. if all pass, report the proof; otherwise add the refinements of every
//!    counterexample to the same instance and go back to 1.
//!
//! An unsatisfiable instance, or a refinement clause contradicting known units, means
//! the size pair holds no proof. A solver timeout gives up on the size pair without
//! concluding anything; such pairs are listed in [`Outcome::NoProof`].
//!
//! # Example
//!
//! ```no_run
//! use fsa_prover::prover::{Outcome, Prover, ProverConfig};
//! # fn problem() -> fsa_prover::problem::Problem<&'static str> { unimplemented!() }
//!
//! let prover = Prover::new(problem(), ProverConfig::default()).unwrap();
//! match prover.prove().unwrap() {
//!     Outcome::Proof { invariant, order } => println!("{}\n{}", invariant, order),
//!     Outcome::NoProof { timed_out } => println!("no proof ({} sizes timed out)", timed_out.len()),
//!     Outcome::Cancelled => println!("cancelled"),
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::alphabet::{Alphabet, Symbol};
use crate::cadical::CadicalSolver;
use crate::checks::{Conditions, Counterexample, Verdict};
use crate::encoding::FsaEncoding;
use crate::errors::{ProverError, SolverError};
use crate::fsa::{Dfa, Fsa};
use crate::problem::Problem;
use crate::sat::{SatSolver, SolveResult, SolverConfig};

/// Prover configuration.
#[derive(Debug, Clone, Default)]
pub struct ProverConfig {
    /// Configuration of the solver instances.
    pub solver: SolverConfig,
    /// Re-apply every counterexample found so far to each new size pair before its first solve.
    pub replay_counterexamples: bool,
    /// Once set, the running solve is interrupted and the search stops.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ProverConfig {
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_replay(mut self, replay: bool) -> Self {
        self.replay_counterexamples = replay;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Result of [`Prover::prove`].
#[derive(Debug, Clone)]
pub enum Outcome<S: Symbol> {
    Proof { invariant: Dfa<S>, order: Dfa<(S, S)> },
    /// Every size pair was searched; `timed_out` lists those abandoned on a timeout.
    NoProof { timed_out: Vec<(usize, usize)> },
    Cancelled,
}

impl<S: Symbol> Outcome<S> {
    pub fn is_proof(&self) -> bool {
        matches!(self, Outcome::Proof { .. })
    }
}

/// Outcome of the search at one size pair.
enum Search<S: Symbol> {
    Found(Dfa<S>, Dfa<(S, S)>),
    Exhausted,
    TimedOut,
}

pub struct Prover<S: Symbol> {
    problem: Problem<S>,
    config: ProverConfig,
    conditions: Conditions<S>,
    order_alphabet: Alphabet<(S, S)>,
    reflexive: Vec<(S, S)>,
}

impl<S: Symbol> Prover<S> {
    /// Precomputes the problem automata shared by every size pair.
    pub fn new(problem: Problem<S>, config: ProverConfig) -> Result<Self, ProverError> {
        let conditions = Conditions::new(&problem)?;
        let order_alphabet = problem.alphabet().product();
        let reflexive = problem.alphabet().diagonal();
        Ok(Self {
            problem,
            config,
            conditions,
            order_alphabet,
            reflexive,
        })
    }

    pub fn problem(&self) -> &Problem<S> {
        &self.problem
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    fn is_cancelled(&self) -> bool {
        self.config.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn new_solver(&self) -> CadicalSolver {
        let solver = CadicalSolver::new(self.config.solver.clone());
        match &self.config.cancel {
            Some(cancel) => solver.with_cancel(Arc::clone(cancel)),
            None => solver,
        }
    }

    /// Runs the search over all size pairs.
    pub fn prove(&self) -> Result<Outcome<S>, ProverError> {
        let mut solver = self.new_solver();
        let mut learned = Vec::new();
        let mut timed_out = Vec::new();

        for (inv, ord) in self.problem.size_pairs() {
            if self.is_cancelled() {
                info!("search cancelled");
                return Ok(Outcome::Cancelled);
            }
            info!("searching in state spaces {} & {}", inv, ord);
            solver.reset();
            match self.search(&mut solver, inv, ord, &mut learned) {
                Ok(Search::Found(invariant, order)) => {
                    info!("proof found with {} & {} states", inv, ord);
                    return Ok(Outcome::Proof { invariant, order });
                }
                Ok(Search::Exhausted) | Err(ProverError::Solver(SolverError::Contradiction)) => {
                    debug!("state spaces {} & {} exhausted", inv, ord);
                }
                Ok(Search::TimedOut) => {
                    if self.is_cancelled() {
                        info!("search cancelled");
                        return Ok(Outcome::Cancelled);
                    }
                    warn!("solver timed out in state spaces {} & {}", inv, ord);
                    timed_out.push((inv, ord));
                }
                Err(e) => return Err(e),
            }
        }

        info!("no proof found ({} size pairs timed out)", timed_out.len());
        Ok(Outcome::NoProof { timed_out })
    }

    fn search(
        &self,
        solver: &mut CadicalSolver,
        inv: usize,
        ord: usize,
        learned: &mut Vec<Counterexample<S>>,
    ) -> Result<Search<S>, ProverError> {
        let mut invariant_encoding = FsaEncoding::new(solver, inv, self.problem.alphabet().clone())?;
        invariant_encoding.ensure_no_dangling_states(solver)?;
        invariant_encoding.ensure_not_accepting_word(solver, &[])?;
        let mut order_encoding = FsaEncoding::new(solver, ord, self.order_alphabet.clone())?;
        order_encoding.ensure_no_dangling_states(solver)?;
        order_encoding.ensure_not_accepting_word(solver, &[])?;
        order_encoding.ensure_no_word_purely_made_of(solver, &self.reflexive)?;

        if self.config.replay_counterexamples {
            debug!("replaying {} counterexamples", learned.len());
            for counterexample in learned.iter() {
                counterexample.refine(solver, &mut invariant_encoding, &mut order_encoding)?;
            }
        }

        let mut rounds = 0usize;
        loop {
            match solver.solve()? {
                SolveResult::Unsatisfiable => return Ok(Search::Exhausted),
                SolveResult::TimedOut => return Ok(Search::TimedOut),
                SolveResult::Satisfiable => {}
            }
            rounds += 1;
            let Some(model) = solver.model().cloned() else {
                return Ok(Search::Exhausted);
            };
            let invariant = invariant_encoding.decode(&model)?;
            let order = order_encoding.decode(&model)?;
            debug!("round {}: candidates\n{}\n{}", rounds, invariant, order);

            let verdict = self.conditions.verify(&invariant, &order)?;
            if verdict.passed() {
                return Ok(Search::Found(invariant, order));
            }
            for counterexample in verdict.into_counterexamples() {
                counterexample.refine(solver, &mut invariant_encoding, &mut order_encoding)?;
                if self.config.replay_counterexamples {
                    learned.push(counterexample);
                }
            }
        }
    }

    /// Checks a given candidate pair against the four conditions, without searching.
    pub fn verify(&self, invariant: &Fsa<S>, order: &Fsa<(S, S)>) -> Result<Verdict<S>, ProverError> {
        if invariant.alphabet() != self.problem.alphabet() {
            return Err(ProverError::InvalidProblem(format!(
                "invariant is over {}, expected {}",
                invariant.alphabet(),
                self.problem.alphabet()
            )));
        }
        if order.alphabet() != &self.order_alphabet {
            return Err(ProverError::InvalidProblem(
                "order is not over pairs of configuration symbols".to_string(),
            ));
        }
        self.conditions.verify(&invariant.determinize(), &order.determinize())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::fsa::FsaBuilder;
    use crate::transducer::Transducer;

    fn alphabet() -> Alphabet<&'static str> {
        Alphabet::new("e", ["two", "one", "done"])
    }

    fn relation(pairs: &[(&'static str, &'static str)]) -> Transducer<&'static str> {
        let mut builder = FsaBuilder::new(alphabet().product());
        let q0 = builder.add_state();
        let q1 = builder.add_state();
        builder.add_start_state(q0).add_accept_state(q1);
        for &pair in pairs {
            builder.add_transition(q0, pair, q1);
        }
        builder.build().unwrap()
    }

    fn problem(process: &[(&'static str, &'static str)]) -> Problem<&'static str> {
        let initial = Fsa::from_words(alphabet(), [&["two"][..]]).unwrap();
        let final_configs = Fsa::from_words(alphabet(), [&["done"][..]]).unwrap();
        let scheduler = relation(&[("two", "two"), ("one", "one"), ("done", "done")]);
        Problem::new(initial, final_configs, scheduler, relation(process), 1..=3, 2..=3).unwrap()
    }

    #[test]
    fn test_countdown_proof() {
        let prover = Prover::new(problem(&[("two", "one"), ("one", "done")]), ProverConfig::default()).unwrap();
        let Outcome::Proof { invariant, order } = prover.prove().unwrap() else {
            panic!("expected a proof");
        };
        assert!(invariant.accepts(&["two"]));
        assert!(invariant.accepts(&["one"]));
        assert!(order.accepts(&[("two", "one")]));
        assert!(!order.accepts(&[("one", "one")]));
        let verdict = prover.verify(&Fsa::from(invariant), &Fsa::from(order)).unwrap();
        assert!(verdict.passed());
    }

    #[test]
    fn test_replay_finds_same_kind_of_proof() {
        let config = ProverConfig::default().with_replay(true);
        let prover = Prover::new(problem(&[("two", "one"), ("one", "done")]), config).unwrap();
        assert!(prover.prove().unwrap().is_proof());
    }

    #[test]
    fn test_no_progress() {
        let prover = Prover::new(problem(&[("two", "two")]), ProverConfig::default()).unwrap();
        match prover.prove().unwrap() {
            Outcome::NoProof { timed_out } => assert!(timed_out.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cancelled() {
        let cancel = Arc::new(AtomicBool::new(true));
        let config = ProverConfig::default().with_cancel(cancel);
        let prover = Prover::new(problem(&[("two", "one"), ("one", "done")]), config).unwrap();
        assert!(matches!(prover.prove().unwrap(), Outcome::Cancelled));
    }

    #[test]
    fn test_verify_rejects_foreign_alphabet() {
        let prover = Prover::new(problem(&[("two", "one")]), ProverConfig::default()).unwrap();
        let other = Fsa::universal(Alphabet::new("e", ["x"]));
        let order = Fsa::universal(alphabet().product());
        assert!(matches!(
            prover.verify(&other, &order),
            Err(ProverError::InvalidProblem(_))
        ));
    }
}
