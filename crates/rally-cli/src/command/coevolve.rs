use rally_engine::CancelToken;
use rally_training::{FileCheckpointStore, GeneticOptimizerFactory};

use crate::{config::ConfigArg, interrupt::InterruptWatcher};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CoevolveArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Number of rounds; each round trains side A, then side B
    #[arg(long)]
    rounds: Option<usize>,
    /// Generations per side and round
    #[arg(long)]
    generations: Option<usize>,
}

pub(crate) fn run(arg: &CoevolveArg) -> anyhow::Result<()> {
    let CoevolveArg {
        config,
        rounds,
        generations,
    } = arg;
    let mut config = config.resolve()?;
    if let Some(rounds) = rounds {
        config.coevolution.rounds = *rounds;
    }
    if let Some(generations) = generations {
        config.coevolution.generations_per_round = *generations;
    }

    let cancel = CancelToken::new();
    let trainer = super::build_trainer(&config, cancel.clone());
    let mut store = FileCheckpointStore::new(&config.checkpoint_dir);
    let mut factory = GeneticOptimizerFactory::new(config.genetic.clone());

    let outcome = {
        let _watcher = InterruptWatcher::spawn(cancel)?;
        trainer.run(&mut store, &mut factory)?
    };
    super::report_outcome(outcome, &config);
    Ok(())
}
