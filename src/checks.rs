//! Verification conditions of a progress proof and the refinements they induce.
//!
//! A candidate proof is an invariant `I` over configurations and a strict order `O`
//! over pairs of configurations. Four conditions make it a proof:
//!
//! 1. **initial**: every initial configuration is in `I`;
//! 2. **transition**: one behavior step from `I` stays in `I`;
//! 3. **transitivity**: `O ∘ O ⊆ O`;
//! 4. **progress**: every non-final configuration in `I` has a behavior step to a
//!    configuration below it in `O`.
//!
//! Each check yields a [`Check`]: a pass, or a [`Counterexample`] that knows how to turn
//! itself into clauses over the two encodings ([`Counterexample::refine`]). Failing a
//! check is the normal case during search, so none of this is an error.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::alphabet::{Alphabet, Symbol};
use crate::encoding::FsaEncoding;
use crate::errors::ProverError;
use crate::fsa::{Dfa, Fsa};
use crate::inclusion::{check_inclusion, check_inclusion_dfa, Inclusion};
use crate::ops::intersection;
use crate::problem::Problem;
use crate::sat::SatSolver;
use crate::transducer::{compose, post_image, post_image_fsa, pre_image, project_input, pair_word, unzip, Transducer};

/// A violated condition, with enough data to exclude the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counterexample<S> {
    /// An initial configuration outside the invariant.
    Initial { config: Vec<S> },
    /// A configuration reached in one step from the invariant but outside it, with
    /// every configuration that steps to it.
    Transition { config: Vec<S>, causes: Vec<Vec<S>> },
    /// `x > y` and `y > z` may hold for one of `middles`, but `x > z` does not.
    Transitivity { x: Vec<S>, middles: Vec<Vec<S>>, z: Vec<S> },
    /// A non-final configuration in the invariant none of whose successors is below it.
    Progress { config: Vec<S>, successors: Vec<Vec<S>> },
}

/// Outcome of a single condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<S> {
    Pass,
    Fail(Counterexample<S>),
    /// The problem does not ask for this condition.
    Skipped,
}

impl<S> Check<S> {
    /// Whether the condition holds or was not asked for.
    pub fn passed(&self) -> bool {
        !matches!(self, Check::Fail(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Check::Pass => "pass",
            Check::Fail(_) => "fail",
            Check::Skipped => "--",
        }
    }
}

/// Outcome of all four conditions on one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict<S> {
    pub initial: Check<S>,
    pub transition: Check<S>,
    pub transitivity: Check<S>,
    pub progress: Check<S>,
}

impl<S> Verdict<S> {
    pub fn passed(&self) -> bool {
        self.initial.passed() && self.transition.passed() && self.transitivity.passed() && self.progress.passed()
    }

    pub fn into_counterexamples(self) -> Vec<Counterexample<S>> {
        [self.initial, self.transition, self.transitivity, self.progress]
            .into_iter()
            .filter_map(|check| match check {
                Check::Fail(cex) => Some(cex),
                Check::Pass | Check::Skipped => None,
            })
            .collect()
    }
}

/// The problem automata in the shape the checks need, computed once.
#[derive(Debug, Clone)]
pub struct Conditions<S: Symbol> {
    alphabet: Alphabet<S>,
    initial: Fsa<S>,
    nonfinal: Dfa<S>,
    behavior: Transducer<S>,
    encloses_behavior: bool,
}

impl<S: Symbol> Conditions<S> {
    /// Determinizes the initial configurations, complements the final ones and
    /// composes scheduler and process into one behavior step.
    pub fn new(problem: &Problem<S>) -> Result<Self, ProverError> {
        let initial = Fsa::from(problem.initial().determinize().into_owned());
        let nonfinal = problem.final_configs().determinize().complement();
        let behavior = compose(problem.scheduler(), problem.process())?;
        let behavior = Fsa::from(behavior.into_dfa());
        debug!(
            "conditions: initial {} states, non-final {} states, behavior {} states",
            initial.state_count(),
            nonfinal.state_count(),
            behavior.state_count()
        );
        Ok(Self {
            alphabet: problem.alphabet().clone(),
            initial,
            nonfinal,
            behavior,
            encloses_behavior: problem.encloses_behavior(),
        })
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        &self.alphabet
    }

    pub fn behavior(&self) -> &Transducer<S> {
        &self.behavior
    }

    pub fn check_initial(&self, invariant: &Dfa<S>) -> Check<S> {
        match check_inclusion_dfa(&self.initial, invariant) {
            Inclusion::Included => Check::Pass,
            Inclusion::Counterexample(config) => Check::Fail(Counterexample::Initial { config }),
        }
    }

    pub fn check_transition(&self, invariant: &Dfa<S>) -> Result<Check<S>, ProverError> {
        let invariant = Fsa::from(invariant.clone());
        let post = post_image_fsa(&self.behavior, &invariant)?;
        Ok(match check_inclusion(&post, &invariant) {
            Inclusion::Included => Check::Pass,
            Inclusion::Counterexample(config) => {
                let causes = pre_image(&self.behavior, &config).into_iter().collect();
                Check::Fail(Counterexample::Transition { config, causes })
            }
        })
    }

    pub fn check_transitivity(&self, order: &Dfa<(S, S)>) -> Result<Check<S>, ProverError> {
        let order = Fsa::from(order.clone());
        let twice = compose(&order, &order)?;
        Ok(match check_inclusion(&twice, &order) {
            Inclusion::Included => Check::Pass,
            Inclusion::Counterexample(pairs) => {
                let (x, z) = unzip(&pairs);
                let above: BTreeSet<Vec<S>> = post_image(&order, &x);
                let below: BTreeSet<Vec<S>> = pre_image(&order, &z);
                let middles = above.intersection(&below).cloned().collect();
                Check::Fail(Counterexample::Transitivity { x, middles, z })
            }
        })
    }

    pub fn check_progress(&self, invariant: &Dfa<S>, order: &Dfa<(S, S)>) -> Result<Check<S>, ProverError> {
        let decreasing = intersection(&self.behavior, &Fsa::from(order.clone()))?;
        let can_decrease = project_input(&decreasing).determinize().complement();
        let pending = intersection(&Fsa::from(invariant.clone()), &Fsa::from(self.nonfinal.clone()))?;
        let stuck = intersection(&pending, &Fsa::from(can_decrease))?;
        Ok(match stuck.shortest_word() {
            None => Check::Pass,
            Some(config) => {
                let successors = post_image(&self.behavior, &config).into_iter().collect();
                Check::Fail(Counterexample::Progress { config, successors })
            }
        })
    }

    /// Runs all four conditions; the transition one only if the problem asks for it.
    pub fn verify(&self, invariant: &Dfa<S>, order: &Dfa<(S, S)>) -> Result<Verdict<S>, ProverError> {
        let verdict = Verdict {
            initial: self.check_initial(invariant),
            transition: if self.encloses_behavior {
                self.check_transition(invariant)?
            } else {
                Check::Skipped
            },
            transitivity: self.check_transitivity(order)?,
            progress: self.check_progress(invariant, order)?,
        };
        info!(
            "checks: initial {}, transition {}, transitivity {}, progress {}",
            verdict.initial.label(),
            verdict.transition.label(),
            verdict.transitivity.label(),
            verdict.progress.label()
        );
        Ok(verdict)
    }
}

impl<S: Symbol> Counterexample<S> {
    /// Adds clauses excluding every candidate that fails the same way.
    pub fn refine(
        &self,
        solver: &mut impl SatSolver,
        invariant: &mut FsaEncoding<S>,
        order: &mut FsaEncoding<(S, S)>,
    ) -> Result<(), ProverError> {
        match self {
            Counterexample::Initial { config } => {
                debug!("refine: invariant must accept {:?}", config);
                invariant.ensure_accepting_word(solver, config)?;
            }
            Counterexample::Transition { config, causes } => {
                debug!("refine: {:?} joins the invariant with any of {} causes", config, causes.len());
                let reached = invariant.accepts_word_literal(solver, config)?;
                for cause in causes {
                    let source = invariant.accepts_word_literal(solver, cause)?;
                    solver.add_implication(source, reached)?;
                }
            }
            Counterexample::Transitivity { x, middles, z } => {
                debug!("refine: transitivity through {} middles", middles.len());
                let xz = order.accepts_word_literal(solver, &pair_word(x, z))?;
                for y in middles {
                    let xy = order.accepts_word_literal(solver, &pair_word(x, y))?;
                    let yz = order.accepts_word_literal(solver, &pair_word(y, z))?;
                    solver.add_clause(&[-xy, -yz, xz])?;
                }
            }
            Counterexample::Progress { config, successors } => {
                if successors.is_empty() {
                    debug!("refine: {:?} is stuck, dropping it from the invariant", config);
                    invariant.ensure_not_accepting_word(solver, config)?;
                } else {
                    debug!("refine: {:?} must decrease to one of {} successors", config, successors.len());
                    let member = invariant.accepts_word_literal(solver, config)?;
                    let mut clause = vec![-member];
                    for next in successors {
                        clause.push(order.accepts_word_literal(solver, &pair_word(config, next))?);
                    }
                    solver.add_clause(&clause)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::fsa::FsaBuilder;

    type Word = Vec<&'static str>;

    fn alphabet() -> Alphabet<&'static str> {
        Alphabet::new("e", ["two", "one", "done"])
    }

    /// One-letter relation given by its pairs.
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

    fn language(words: &[&[&'static str]]) -> Dfa<&'static str> {
        Fsa::from_words(alphabet(), words.iter().copied()).unwrap().into_dfa()
    }

    fn problem() -> Problem<&'static str> {
        let initial = Fsa::from_words(alphabet(), [&["two"][..]]).unwrap();
        let final_configs = Fsa::from_words(alphabet(), [&["done"][..]]).unwrap();
        let scheduler = relation(&[("two", "two"), ("one", "one"), ("done", "done")]);
        let process = relation(&[("two", "one"), ("one", "done")]);
        Problem::new(initial, final_configs, scheduler, process, 1..=3, 2..=3).unwrap()
    }

    fn conditions() -> Conditions<&'static str> {
        Conditions::new(&problem()).unwrap()
    }

    fn order_of(pairs: &[(&'static str, &'static str)]) -> Dfa<(&'static str, &'static str)> {
        relation(pairs).into_dfa()
    }

    #[test]
    fn test_valid_proof() {
        let conditions = conditions();
        let invariant = language(&[&["two"], &["one"], &["done"]]);
        let order = order_of(&[("two", "one"), ("one", "done"), ("two", "done")]);
        let verdict = conditions.verify(&invariant, &order).unwrap();
        assert!(verdict.passed(), "{:?}", verdict);
        assert!(verdict.into_counterexamples().is_empty());
    }

    #[test]
    fn test_initial_and_transition_failures() {
        let conditions = conditions();
        let invariant = language(&[&["one"]]);
        assert_eq!(
            conditions.check_initial(&invariant),
            Check::Fail(Counterexample::Initial { config: vec!["two"] })
        );
        assert_eq!(
            conditions.check_transition(&invariant).unwrap(),
            Check::Fail(Counterexample::Transition {
                config: vec!["done"],
                causes: vec![vec!["one"]],
            })
        );
    }

    #[test]
    fn test_transitivity_failure() {
        let conditions = conditions();
        let order = order_of(&[("two", "one"), ("one", "done")]);
        let expected: (Word, Vec<Word>, Word) = (vec!["two"], vec![vec!["one"]], vec!["done"]);
        match conditions.check_transitivity(&order).unwrap() {
            Check::Fail(Counterexample::Transitivity { x, middles, z }) => {
                assert_eq!((x, middles, z), expected);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_progress_failure() {
        let conditions = conditions();
        let invariant = language(&[&["two"], &["one"], &["done"]]);
        let order = order_of(&[("two", "one")]);
        assert_eq!(
            conditions.check_progress(&invariant, &order).unwrap(),
            Check::Fail(Counterexample::Progress {
                config: vec!["one"],
                successors: vec![vec!["done"]],
            })
        );

        let invariant = language(&[&["two"], &["two", "two"]]);
        let order = order_of(&[("two", "one")]);
        assert_eq!(
            conditions.check_progress(&invariant, &order).unwrap(),
            Check::Fail(Counterexample::Progress {
                config: vec!["two", "two"],
                successors: vec![],
            })
        );
    }

    #[test]
    fn test_transition_skipped_without_enclosure() {
        let invariant = language(&[&["two"], &["one"]]);
        let order = order_of(&[("two", "one"), ("one", "done"), ("two", "done")]);

        let verdict = conditions().verify(&invariant, &order).unwrap();
        assert!(matches!(verdict.transition, Check::Fail(Counterexample::Transition { .. })));
        assert!(!verdict.passed());

        let loose = Conditions::new(&problem().with_behavior_enclosure(false)).unwrap();
        let verdict = loose.verify(&invariant, &order).unwrap();
        assert_eq!(verdict.transition, Check::Skipped);
        assert!(verdict.passed(), "{:?}", verdict);
        assert!(verdict.into_counterexamples().is_empty());
    }
}
