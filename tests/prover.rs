use test_log::test;

use fsa_prover::alphabet::Alphabet;
use fsa_prover::fsa::{Fsa, FsaBuilder};
use fsa_prover::problem::Problem;
use fsa_prover::prover::{Outcome, Prover, ProverConfig};
use fsa_prover::transducer::{post_image, Transducer};

// Configurations are rows of processes; `t` holds the token, `n` does not.

fn alphabet() -> Alphabet<&'static str> {
    Alphabet::new("e", ["t", "n"])
}

fn identity() -> Transducer<&'static str> {
    let mut builder = FsaBuilder::new(alphabet().product());
    let q = builder.named("id");
    builder.add_start_state(q).add_accept_state(q);
    for pair in alphabet().diagonal() {
        builder.add_transition(q, pair, q);
    }
    builder.build().unwrap()
}

/// The token moves one position to the right.
fn pass_token() -> Transducer<&'static str> {
    let mut builder = FsaBuilder::new(alphabet().product());
    let before = builder.named("before");
    let moving = builder.named("moving");
    let after = builder.named("after");
    builder.add_start_state(before).add_accept_state(after);
    builder
        .add_transition(before, ("n", "n"), before)
        .add_transition(before, ("t", "n"), moving)
        .add_transition(moving, ("n", "t"), after)
        .add_transition(after, ("n", "n"), after);
    builder.build().unwrap()
}

/// The token holder drops the token.
fn drop_token() -> Transducer<&'static str> {
    let mut builder = FsaBuilder::new(alphabet().product());
    let before = builder.named("before");
    let after = builder.named("after");
    builder.add_start_state(before).add_accept_state(after);
    builder
        .add_transition(before, ("n", "n"), before)
        .add_transition(before, ("t", "n"), after)
        .add_transition(after, ("n", "n"), after);
    builder.build().unwrap()
}

/// `n^i t n^j` with `i` and `j` constrained by the flags.
fn token_rows(leading: bool, trailing: bool) -> Fsa<&'static str> {
    let mut builder = FsaBuilder::new(alphabet());
    let q0 = builder.add_state();
    let q1 = builder.add_state();
    builder.add_start_state(q0).add_accept_state(q1);
    builder.add_transition(q0, "t", q1);
    if leading {
        builder.add_transition(q0, "n", q0);
    }
    if trailing {
        builder.add_transition(q1, "n", q1);
    }
    builder.build().unwrap()
}

fn problem(process: Transducer<&'static str>, order_sizes: std::ops::RangeInclusive<usize>) -> Problem<&'static str> {
    let initial = token_rows(false, true);
    let final_configs = token_rows(true, false);
    Problem::new(initial, final_configs, identity(), process, 1..=3, order_sizes).unwrap()
}

#[test]
fn test_token_passing_has_proof() {
    let prover = Prover::new(problem(pass_token(), 2..=3), ProverConfig::default()).unwrap();
    let Outcome::Proof { invariant, order } = prover.prove().unwrap() else {
        panic!("expected a proof");
    };
    log::info!("invariant:\n{}", invariant);
    log::info!("order:\n{}", order);

    assert!(invariant.accepts(&["t", "n", "n"]));
    assert!(invariant.accepts(&["n", "t", "n"]));
    assert!(invariant.accepts(&["n", "n", "t"]));
    // Tokenless rows are stuck and cannot be in the invariant.
    assert!(!invariant.accepts(&["n", "n"]));
    assert!(!invariant.accepts(&[]));
    assert!(order.accepts(&[("t", "n"), ("n", "t")]));
    assert!(!order.accepts(&[("t", "t"), ("n", "n")]));

    for config in [vec!["t", "n", "n"], vec!["n", "t", "n"]] {
        let successors = post_image(&pass_token(), &config);
        assert_eq!(successors.len(), 1);
    }

    let verdict = prover
        .verify(&Fsa::from(invariant), &Fsa::from(order))
        .unwrap();
    assert!(verdict.passed());
}

#[test]
fn test_dropped_token_has_no_proof() {
    let prover = Prover::new(problem(drop_token(), 2..=2), ProverConfig::default().with_replay(true)).unwrap();
    match prover.prove().unwrap() {
        Outcome::NoProof { timed_out } => assert!(timed_out.is_empty()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_verify_hand_written_proof() {
    let prover = Prover::new(problem(pass_token(), 2..=3), ProverConfig::default()).unwrap();
    let invariant = token_rows(true, true);

    let mut builder = FsaBuilder::new(alphabet().product());
    let q0 = builder.add_state();
    let q1 = builder.add_state();
    let q2 = builder.add_state();
    builder.add_start_state(q0).add_accept_state(q2);
    builder
        .add_transition(q0, ("n", "n"), q0)
        .add_transition(q0, ("t", "n"), q1)
        .add_transition(q1, ("n", "n"), q1)
        .add_transition(q1, ("n", "t"), q2)
        .add_transition(q2, ("n", "n"), q2);
    let order = builder.build().unwrap();

    assert!(prover.verify(&invariant, &order).unwrap().passed());

    // Without the trailing `n` loop in the middle, the order is not transitive.
    let mut builder = order.to_builder();
    builder.remove_transition(q1, &("n", "n"), q1);
    let short_order = builder.build().unwrap();
    let verdict = prover.verify(&invariant, &short_order).unwrap();
    assert!(!verdict.transitivity.passed());
}

#[test]
fn test_empty_configuration_cannot_progress() {
    // The empty row only steps to itself, so no order can place anything below it.
    let mut builder = FsaBuilder::new(alphabet());
    let q = builder.add_state();
    builder.add_start_state(q).add_accept_state(q);
    let initial = builder.build().unwrap();
    let final_configs = Fsa::from_words(alphabet(), [&["t"][..]]).unwrap();

    let problem = Problem::new(initial, final_configs, identity(), identity(), 1..=2, 2..=3).unwrap();
    let prover = Prover::new(problem, ProverConfig::default()).unwrap();
    match prover.prove().unwrap() {
        Outcome::NoProof { timed_out } => assert!(timed_out.is_empty()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_loose_invariant_still_needs_progress() {
    let problem = problem(pass_token(), 2..=3).with_behavior_enclosure(false);
    let prover = Prover::new(problem, ProverConfig::default()).unwrap();
    let Outcome::Proof { invariant, order } = prover.prove().unwrap() else {
        panic!("expected a proof");
    };
    assert!(invariant.accepts(&["t", "n"]));
    assert!(order.accepts(&[("t", "n"), ("n", "t")]));
    let verdict = prover.verify(&Fsa::from(invariant), &Fsa::from(order)).unwrap();
    assert!(verdict.passed());
}
