use clap::{Parser, Subcommand};
use rally_engine::CancelToken;
use rally_training::{CoevolutionTrainer, ParallelScheduler, RunOutcome};
use tracing::{info, warn};

use crate::config::RallyConfig;

use self::{
    coevolve::CoevolveArg, duel::DuelArg, evaluate::EvaluateArg, promote::PromoteArg,
    show_config::ShowConfigArg, train::TrainArg,
};

mod coevolve;
mod duel;
mod evaluate;
mod promote;
mod show_config;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log more; repeat for trace output
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(long, short, global = true)]
    quiet: bool,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train a single population against heuristic opponents
    ///
    /// Press Esc, q or Ctrl-C to stop cleanly. This needs stdin to be a terminal; otherwise
    /// the process can only be killed, which drops the champion of the running phase.
    Train(#[clap(flatten)] TrainArg),
    /// Co-evolve two populations against each other's champions
    ///
    /// Press Esc, q or Ctrl-C to stop cleanly. This needs stdin to be a terminal; otherwise
    /// the process can only be killed, which drops the champion of the running phase.
    /// Checkpoints of completed phases are kept either way.
    Coevolve(#[clap(flatten)] CoevolveArg),
    /// Score a checkpoint with the fitness evaluator
    Evaluate(#[clap(flatten)] EvaluateArg),
    /// Play a headless match between two controllers
    Duel(#[clap(flatten)] DuelArg),
    /// Copy a side checkpoint into the best slot
    Promote(#[clap(flatten)] PromoteArg),
    /// Print the effective configuration as JSON
    Config(#[clap(flatten)] ShowConfigArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    crate::logging::init(args.verbose, args.quiet);
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::Coevolve(arg) => coevolve::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
        Mode::Duel(arg) => duel::run(&arg)?,
        Mode::Promote(arg) => promote::run(&arg)?,
        Mode::Config(arg) => show_config::run(&arg)?,
    }
    Ok(())
}

fn build_trainer(config: &RallyConfig, cancel: CancelToken) -> CoevolutionTrainer<ParallelScheduler> {
    let scheduler = config
        .workers
        .map_or_else(ParallelScheduler::default, ParallelScheduler::new);
    CoevolutionTrainer::new(
        config.physics.clone(),
        config.fitness.clone(),
        config.network,
        config.coevolution.clone(),
        scheduler,
    )
    .with_cancel_token(cancel)
}

fn report_outcome(outcome: RunOutcome, config: &RallyConfig) {
    match outcome {
        RunOutcome::Done => info!(
            checkpoint_dir = %config.checkpoint_dir.display(),
            "training finished"
        ),
        RunOutcome::Interrupted { round, side } => warn!(
            round,
            side = side.as_ref().map(ToString::to_string),
            "training interrupted, checkpoints saved so far are kept"
        ),
    }
}
