use rally_engine::CancelToken;
use rally_training::{FileCheckpointStore, GeneticOptimizerFactory};

use crate::{config::ConfigArg, interrupt::InterruptWatcher};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Number of generations; defaults to the configured generations per round
    #[arg(long)]
    generations: Option<usize>,
    /// Start from the current best checkpoint instead of a random population
    #[arg(long)]
    resume: bool,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        config,
        generations,
        resume,
    } = arg;
    let config = config.resolve()?;
    let generations = generations.unwrap_or(config.coevolution.generations_per_round);

    let cancel = CancelToken::new();
    let trainer = super::build_trainer(&config, cancel.clone());
    let mut store = FileCheckpointStore::new(&config.checkpoint_dir);
    let mut factory = GeneticOptimizerFactory::new(config.genetic.clone());

    let outcome = {
        let _watcher = InterruptWatcher::spawn(cancel)?;
        trainer.train_champion(&mut store, &mut factory, generations, *resume)?
    };
    super::report_outcome(outcome, &config);
    Ok(())
}
