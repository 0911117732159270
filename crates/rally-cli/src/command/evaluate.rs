use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use rally_engine::CancelToken;
use rally_evaluator::{FitnessEvaluator, FitnessReport, Opponent};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use crate::{config::ConfigArg, interrupt::InterruptWatcher, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Checkpoint file to evaluate
    checkpoint: PathBuf,
    /// Checkpoint file of a frozen opponent; randomized heuristics when omitted
    #[arg(long)]
    opponent: Option<PathBuf>,
    /// Seed of the evaluation's random draws
    #[arg(long, default_value_t = 0)]
    eval_seed: u64,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let EvaluateArg {
        config,
        checkpoint,
        opponent,
        eval_seed,
        json,
    } = arg;
    let config = config.resolve()?;

    let candidate = util::read_checkpoint(checkpoint)?;
    let network = candidate.network()?;
    let opponent = match opponent {
        Some(path) => {
            let frozen = util::read_checkpoint(path)?;
            Opponent::frozen(Arc::new(frozen.network()?), frozen.layout)
                .with_context(|| format!("Unusable opponent: {}", path.display()))?
        }
        None => Opponent::RandomHeuristic,
    };
    let evaluator = FitnessEvaluator::new(
        config.physics.clone(),
        config.fitness.clone(),
        candidate.layout,
        opponent,
    );

    let cancel = CancelToken::new();
    let mut rng = Pcg32::seed_from_u64(*eval_seed);
    let report = {
        let _watcher = InterruptWatcher::spawn(cancel.clone())?;
        evaluator.evaluate_detailed(&network, &mut rng, &cancel)?
    };

    if *json {
        util::Output::save_json(&report, None)?;
    } else {
        print_report(&report, candidate.fitness);
    }
    Ok(())
}

fn print_report(report: &FitnessReport, saved_fitness: f32) {
    println!("Trials:");
    for trial in &report.trials {
        let opponent = trial.opponent.map_or_else(
            || "frozen".to_owned(),
            |p| format!("lag {:.2}, error {:.1}", p.lag, p.error),
        );
        println!(
            "  {:<5} serve {:<5}  reward {:>8.3}  points {:>2}:{:<2}  hits {:>3}  ({opponent})",
            trial.setup.controlled.to_string(),
            trial.setup.serve.to_string(),
            trial.reward,
            trial.points_for,
            trial.points_against,
            trial.hits,
        );
    }
    println!("Fitness:       {:.3}", report.fitness);
    println!("Saved fitness: {saved_fitness:.3}");
}
