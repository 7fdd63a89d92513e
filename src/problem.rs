//! Progress problems.

use std::ops::RangeInclusive;

use crate::alphabet::{Alphabet, Symbol};
use crate::errors::ProverError;
use crate::fsa::Fsa;
use crate::transducer::Transducer;

/// Smallest invariant size worth searching.
pub const MIN_INVARIANT_SIZE: usize = 1;

/// Smallest order size worth searching; a one-state order is either empty or reflexive.
pub const MIN_ORDER_SIZE: usize = 2;

/// A progress problem over configurations spelled with symbols `S`.
#[derive(Debug, Clone)]
pub struct Problem<S: Symbol> {
    initial: Fsa<S>,
    final_configs: Fsa<S>,
    scheduler: Transducer<S>,
    process: Transducer<S>,
    invariant_sizes: RangeInclusive<usize>,
    order_sizes: RangeInclusive<usize>,
    encloses_behavior: bool,
}

impl<S: Symbol> Problem<S> {
    /// Validates and assembles a problem.
    ///
    /// The configuration automata must share one alphabet, and both transducers must
    /// be over the pairs of that alphabet. Size lower bounds are raised to
    /// [`MIN_INVARIANT_SIZE`] and [`MIN_ORDER_SIZE`]; the resulting ranges must not be empty.
    pub fn new(
        initial: Fsa<S>,
        final_configs: Fsa<S>,
        scheduler: Transducer<S>,
        process: Transducer<S>,
        invariant_sizes: RangeInclusive<usize>,
        order_sizes: RangeInclusive<usize>,
    ) -> Result<Self, ProverError> {
        let alphabet = initial.alphabet();
        if final_configs.alphabet() != alphabet {
            return Err(ProverError::InvalidProblem(format!(
                "final configurations are over {}, initial ones over {}",
                final_configs.alphabet(),
                alphabet
            )));
        }
        let pairs = alphabet.product();
        for (name, transducer) in [("scheduler", &scheduler), ("process", &process)] {
            if transducer.alphabet() != &pairs {
                return Err(ProverError::InvalidProblem(format!(
                    "{} is not over pairs of {}",
                    name, alphabet
                )));
            }
        }

        let invariant_sizes = (*invariant_sizes.start()).max(MIN_INVARIANT_SIZE)..=*invariant_sizes.end();
        let order_sizes = (*order_sizes.start()).max(MIN_ORDER_SIZE)..=*order_sizes.end();
        if invariant_sizes.is_empty() {
            return Err(ProverError::InvalidProblem(format!(
                "empty invariant size range {:?}",
                invariant_sizes
            )));
        }
        if order_sizes.is_empty() {
            return Err(ProverError::InvalidProblem(format!("empty order size range {:?}", order_sizes)));
        }

        Ok(Self {
            initial,
            final_configs,
            scheduler,
            process,
            invariant_sizes,
            order_sizes,
            encloses_behavior: true,
        })
    }

    /// Whether the invariant must be closed under the behavior (on by default).
    ///
    /// When off, the transition condition is neither checked nor refined, and the
    /// invariant only has to cover the initial configurations and make progress.
    pub fn with_behavior_enclosure(mut self, encloses: bool) -> Self {
        self.encloses_behavior = encloses;
        self
    }

    pub fn encloses_behavior(&self) -> bool {
        self.encloses_behavior
    }

    pub fn alphabet(&self) -> &Alphabet<S> {
        self.initial.alphabet()
    }

    pub fn initial(&self) -> &Fsa<S> {
        &self.initial
    }

    pub fn final_configs(&self) -> &Fsa<S> {
        &self.final_configs
    }

    pub fn scheduler(&self) -> &Transducer<S> {
        &self.scheduler
    }

    pub fn process(&self) -> &Transducer<S> {
        &self.process
    }

    pub fn invariant_sizes(&self) -> RangeInclusive<usize> {
        self.invariant_sizes.clone()
    }

    pub fn order_sizes(&self) -> RangeInclusive<usize> {
        self.order_sizes.clone()
    }

    /// Size pairs `(invariant, order)` in search order: by `inv² + ord²`, then by `inv`, then by `ord`.
    pub fn size_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .invariant_sizes()
            .flat_map(|i| self.order_sizes().map(move |o| (i, o)))
            .collect();
        pairs.sort_by_key(|&(i, o)| (i * i + o * o, i, o));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn alphabet() -> Alphabet<char> {
        Alphabet::new('e', ['a', 'b'])
    }

    fn identity() -> Transducer<char> {
        Fsa::universal(Alphabet::new(('e', 'e'), alphabet().diagonal()))
    }

    #[test]
    fn test_size_pairs() {
        let all = Fsa::universal(alphabet());
        let t = Fsa::universal(alphabet().product());
        let problem = Problem::new(all.clone(), all, t.clone(), t, 0..=3, 0..=3).unwrap();
        assert_eq!(problem.invariant_sizes(), 1..=3);
        assert_eq!(problem.order_sizes(), 2..=3);
        assert_eq!(
            problem.size_pairs(),
            vec![(1, 2), (2, 2), (1, 3), (2, 3), (3, 2), (3, 3)]
        );
    }

    #[test]
    fn test_validation() {
        let all = Fsa::universal(alphabet());
        let t = Fsa::universal(alphabet().product());
        let other = Fsa::universal(Alphabet::new('e', ['a']));
        assert!(matches!(
            Problem::new(all.clone(), other, t.clone(), t.clone(), 1..=2, 2..=2),
            Err(ProverError::InvalidProblem(_))
        ));
        assert!(matches!(
            Problem::new(all.clone(), all.clone(), t.clone(), t.clone(), 1..=2, 0..=1),
            Err(ProverError::InvalidProblem(_))
        ));
        assert!(matches!(
            Problem::new(all.clone(), all.clone(), identity(), t.clone(), 1..=1, 2..=2),
            Err(ProverError::InvalidProblem(_))
        ));
        assert!(Problem::new(all.clone(), all, t.clone(), t, 1..=1, 2..=2).is_ok());
    }

    #[test]
    fn test_behavior_enclosure_flag() {
        let all = Fsa::universal(alphabet());
        let t = Fsa::universal(alphabet().product());
        let problem = Problem::new(all.clone(), all, t.clone(), t, 1..=1, 2..=2).unwrap();
        assert!(problem.encloses_behavior());
        assert!(!problem.with_behavior_enclosure(false).encloses_behavior());
    }
}
