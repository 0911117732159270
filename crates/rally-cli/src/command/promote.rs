use anyhow::Context;
use rally_training::{CheckpointSlot, CheckpointStore, FileCheckpointStore, TrainingSide};
use tracing::info;

use crate::config::ConfigArg;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum SideArg {
    #[default]
    A,
    B,
}

impl From<SideArg> for TrainingSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::A => TrainingSide::A,
            SideArg::B => TrainingSide::B,
        }
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PromoteArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Side whose checkpoint becomes the overall best
    #[arg(long, value_enum)]
    side: SideArg,
}

pub(crate) fn run(arg: &PromoteArg) -> anyhow::Result<()> {
    let PromoteArg { config, side } = arg;
    let config = config.resolve()?;
    let side = TrainingSide::from(*side);

    let mut store = FileCheckpointStore::new(&config.checkpoint_dir);
    let replaced = promote(&mut store, side).with_context(|| {
        format!(
            "Failed to promote side {side} in {}",
            config.checkpoint_dir.display()
        )
    })?;
    info!(%side, replaced, "side checkpoint promoted to best");
    Ok(())
}

/// Returns whether an existing best checkpoint was replaced.
fn promote(store: &mut dyn CheckpointStore, side: TrainingSide) -> anyhow::Result<bool> {
    let replaced = store.exists(CheckpointSlot::Best);
    store.clone_slot(side.slot(), CheckpointSlot::Best)?;
    Ok(replaced)
}
