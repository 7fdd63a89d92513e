use std::time::Duration;

use clap::Parser;

use fsa_prover::alphabet::Alphabet;
use fsa_prover::fsa::{Fsa, FsaBuilder};
use fsa_prover::problem::Problem;
use fsa_prover::prover::{Outcome, Prover, ProverConfig};
use fsa_prover::sat::SolverConfig;
use fsa_prover::transducer::Transducer;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Largest invariant to search.
    #[arg(long, value_name = "INT", default_value = "3")]
    max_invariant: usize,

    /// Largest order to search.
    #[arg(long, value_name = "INT", default_value = "3")]
    max_order: usize,

    /// Solver timeout per call, in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Replay earlier counterexamples at each new size pair.
    #[arg(long)]
    replay: bool,

    /// Let the holder drop the token instead of passing it (no proof exists).
    #[arg(long)]
    lossy: bool,

    /// Do not require the invariant to be closed under the scheduler and process steps.
    #[arg(long)]
    loose: bool,

    /// Print the proof automata in DOT format.
    #[arg(long)]
    dot: bool,
}

fn alphabet() -> Alphabet<char> {
    Alphabet::new('_', ['t', 'n'])
}

fn identity() -> Transducer<char> {
    let mut builder = FsaBuilder::new(alphabet().product());
    let q = builder.named("idle");
    builder.add_start_state(q).add_accept_state(q);
    for pair in alphabet().diagonal() {
        builder.add_transition(q, pair, q);
    }
    builder.build().expect("identity is well-formed")
}

fn process(lossy: bool) -> Transducer<char> {
    let mut builder = FsaBuilder::new(alphabet().product());
    let before = builder.named("before");
    let after = builder.named("after");
    builder.add_start_state(before).add_accept_state(after);
    builder.add_transition(before, ('n', 'n'), before);
    builder.add_transition(after, ('n', 'n'), after);
    if lossy {
        builder.add_transition(before, ('t', 'n'), after);
    } else {
        let moving = builder.named("moving");
        builder.add_transition(before, ('t', 'n'), moving);
        builder.add_transition(moving, ('n', 't'), after);
    }
    builder.build().expect("process is well-formed")
}

/// Rows `t n*` (initial) or `n* t` (final).
fn rows(token_first: bool) -> Fsa<char> {
    let mut builder = FsaBuilder::new(alphabet());
    let q0 = builder.named("head");
    let q1 = builder.named("tail");
    builder.add_start_state(q0).add_accept_state(q1);
    builder.add_transition(q0, 't', q1);
    if token_first {
        builder.add_transition(q1, 'n', q1);
    } else {
        builder.add_transition(q0, 'n', q0);
    }
    builder.build().expect("rows are well-formed")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let problem = Problem::new(
        rows(true),
        rows(false),
        identity(),
        process(args.lossy),
        1..=args.max_invariant,
        2..=args.max_order,
    )?
    .with_behavior_enclosure(!args.loose);
    println!("size pairs = {:?}", problem.size_pairs());

    let mut solver = SolverConfig::default();
    if let Some(seconds) = args.timeout {
        solver = solver.with_timeout(Duration::from_secs(seconds));
    }
    let config = ProverConfig::default().with_solver(solver).with_replay(args.replay);
    let prover = Prover::new(problem, config)?;

    match prover.prove()? {
        Outcome::Proof { invariant, order } => {
            println!("invariant ({} states):\n{}", invariant.state_count(), invariant);
            println!("order ({} states):\n{}", order.state_count(), order);
            for length in 1..=4 {
                println!(
                    "configurations of length {} in the invariant: {}",
                    length,
                    invariant.count_words(length)
                );
            }
            if args.dot {
                println!("{}", invariant.to_dot()?);
                println!("{}", order.to_dot()?);
            }
        }
        Outcome::NoProof { timed_out } => {
            println!("no proof found");
            if !timed_out.is_empty() {
                println!("timed out at {:?}", timed_out);
            }
        }
        Outcome::Cancelled => println!("cancelled"),
    }

    println!("Total time: {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
