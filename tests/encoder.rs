use std::collections::HashSet;

use test_log::test;

use fsa_prover::alphabet::Alphabet;
use fsa_prover::cadical::CadicalSolver;
use fsa_prover::encoding::FsaEncoding;
use fsa_prover::sat::SatSolver;

fn alphabet() -> Alphabet<&'static str> {
    Alphabet::new("e", ["a1", "a2"])
}

#[test]
fn test_enumerated_automata_respect_sample_words() {
    let accepted: [&[&str]; 2] = [&["a1", "a2"], &["a2", "a2"]];
    let rejected: [&[&str]; 1] = [&["a2", "a1"]];

    let mut solver = CadicalSolver::default();
    let mut encoding = FsaEncoding::new(&mut solver, 2, alphabet()).unwrap();
    for word in accepted {
        encoding.ensure_accepting_word(&mut solver, word).unwrap();
    }
    for word in rejected {
        encoding.ensure_not_accepting_word(&mut solver, word).unwrap();
    }

    let mut seen = HashSet::new();
    while let Some(dfa) = encoding.resolve(&mut solver).unwrap() {
        assert_eq!(dfa.state_count(), 2);
        for word in accepted {
            assert!(dfa.accepts(word), "{:?} rejected by\n{}", word, dfa);
        }
        for word in rejected {
            assert!(!dfa.accepts(word), "{:?} accepted by\n{}", word, dfa);
        }
        assert!(seen.insert(dfa.to_string()), "repeated automaton\n{}", dfa);
        if encoding.block_current_instance(&mut solver).is_err() {
            break;
        }
        assert!(seen.len() < 1000);
    }
    assert!(!seen.is_empty());
    log::info!("{} automata enumerated", seen.len());
}

#[test]
fn test_dangling_states_are_excluded() {
    let mut solver = CadicalSolver::default();
    let mut encoding = FsaEncoding::new(&mut solver, 3, alphabet()).unwrap();
    encoding.ensure_no_dangling_states(&mut solver).unwrap();
    encoding.ensure_not_accepting_word(&mut solver, &[]).unwrap();

    let mut count = 0;
    while let Some(dfa) = encoding.resolve(&mut solver).unwrap() {
        let reachable = dfa.reachable_states();
        let coreachable = dfa.coreachable_states();
        for state in dfa.states() {
            assert!(reachable.contains(&state), "{} unreachable in\n{}", state, dfa);
            assert!(coreachable.contains(&state), "{} is a dead end in\n{}", state, dfa);
        }
        assert!(!dfa.accepts(&[]));
        count += 1;
        if count == 200 || encoding.block_current_instance(&mut solver).is_err() {
            break;
        }
    }
    assert!(count > 0);
}

#[test]
fn test_too_small_for_samples() {
    // A one-state automaton cannot tell "a1" from "a1 a1".
    let mut solver = CadicalSolver::default();
    let mut encoding = FsaEncoding::new(&mut solver, 1, alphabet()).unwrap();
    encoding.ensure_accepting_word(&mut solver, &["a1"]).unwrap();
    let rejected = encoding.ensure_not_accepting_word(&mut solver, &["a1", "a1"]);
    if rejected.is_ok() {
        assert!(encoding.resolve(&mut solver).unwrap().is_none());
    }
    assert!(solver.num_variables() > 0);
}
