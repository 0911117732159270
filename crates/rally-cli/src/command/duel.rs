use std::{convert::Infallible, path::PathBuf, str::FromStr, time::Duration};

use rally_engine::{CancelToken, Controller, GameState, MatchSession, Motion, PhysicsConfig, Side};
use rally_evaluator::{
    FeedForwardNetwork, HeuristicController, HeuristicParams, NetworkController, NetworkLayout,
    TrialBudget,
};
use tracing::info;

use crate::{config::ConfigArg, interrupt::InterruptWatcher, util};

/// A paddle for a duel: `perfect`, `casual`, or the path of a checkpoint file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlayerSpec {
    Heuristic(HeuristicParams),
    Checkpoint(PathBuf),
}

impl FromStr for PlayerSpec {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "perfect" => Self::Heuristic(HeuristicParams::PERFECT),
            "casual" => Self::Heuristic(HeuristicParams::CASUAL),
            path => Self::Checkpoint(PathBuf::from(path)),
        })
    }
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DuelArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Left paddle
    #[arg(long, default_value = "casual")]
    left: PlayerSpec,
    /// Right paddle
    #[arg(long, default_value = "casual")]
    right: PlayerSpec,
    /// Simulated match length in seconds
    #[arg(long, default_value_t = 60)]
    seconds: u64,
    /// Seed of serve directions and heuristic noise
    #[arg(long, default_value_t = 0)]
    match_seed: u64,
}

enum Player<'a> {
    Heuristic(HeuristicController),
    Network(NetworkController<'a>),
}

impl Controller for Player<'_> {
    fn decide(&mut self, state: &GameState) -> Motion {
        match self {
            Self::Heuristic(c) => c.decide(state),
            Self::Network(c) => c.decide(state),
        }
    }
}

/// A player's network is loaded before the match so that controllers can borrow it.
struct Loaded {
    spec: PlayerSpec,
    network: Option<(FeedForwardNetwork, NetworkLayout)>,
}

impl Loaded {
    fn load(spec: &PlayerSpec) -> anyhow::Result<Self> {
        let network = match spec {
            PlayerSpec::Heuristic(_) => None,
            PlayerSpec::Checkpoint(path) => {
                let checkpoint = util::read_checkpoint(path)?;
                Some((checkpoint.network()?, checkpoint.layout))
            }
        };
        Ok(Self {
            spec: spec.clone(),
            network,
        })
    }

    fn player(
        &self,
        side: Side,
        physics: &PhysicsConfig,
        dead_zone: f32,
        seed: u64,
    ) -> anyhow::Result<Player<'_>> {
        match (&self.spec, &self.network) {
            (_, Some((network, layout))) => Ok(Player::Network(NetworkController::new(
                side, network, *layout, physics,
            )?)),
            (PlayerSpec::Heuristic(params), None) => Ok(Player::Heuristic(
                HeuristicController::new(side, *params, dead_zone, seed),
            )),
            (PlayerSpec::Checkpoint(path), None) => {
                anyhow::bail!("Checkpoint not loaded: {}", path.display())
            }
        }
    }
}

pub(crate) fn run(arg: &DuelArg) -> anyhow::Result<()> {
    let DuelArg {
        config,
        left,
        right,
        seconds,
        match_seed,
    } = arg;
    let config = config.resolve()?;
    let physics = &config.physics;
    let dead_zone = config.fitness.heuristic_dead_zone;

    let left = Loaded::load(left)?;
    let right = Loaded::load(right)?;
    let mut left = left.player(Side::Left, physics, dead_zone, match_seed.wrapping_add(1))?;
    let mut right = right.player(Side::Right, physics, dead_zone, match_seed.wrapping_add(2))?;

    let dt = config.fitness.dt();
    let ticks = TrialBudget::Simulated(Duration::from_secs(*seconds))
        .simulated_ticks(config.fitness.tick_rate);
    let mut session = MatchSession::with_seed(physics, *match_seed);
    let cancel = CancelToken::new();
    {
        let _watcher = InterruptWatcher::spawn(cancel.clone())?;
        for _ in 0..ticks {
            let Ok(tick) = session.tick_checked(dt, &cancel, &mut left, &mut right) else {
                info!(ticks = session.ticks(), "duel stopped early");
                break;
            };
            if let Some(scorer) = tick.scorer {
                info!(
                    %scorer,
                    left = session.stats().points(Side::Left),
                    right = session.stats().points(Side::Right),
                    "point"
                );
            }
        }
    }

    let stats = session.stats();
    println!(
        "Score: left {} - {} right",
        stats.points(Side::Left),
        stats.points(Side::Right)
    );
    println!(
        "Hits:  left {} - {} right",
        stats.hits(Side::Left),
        stats.hits(Side::Right)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_spec() {
        assert_eq!(
            "perfect".parse::<PlayerSpec>().unwrap(),
            PlayerSpec::Heuristic(HeuristicParams::PERFECT)
        );
        assert_eq!(
            "casual".parse::<PlayerSpec>().unwrap(),
            PlayerSpec::Heuristic(HeuristicParams::CASUAL)
        );
        assert_eq!(
            "data/best.json".parse::<PlayerSpec>().unwrap(),
            PlayerSpec::Checkpoint(PathBuf::from("data/best.json"))
        );
    }

    #[test]
    fn test_heuristic_player() {
        let loaded = Loaded::load(&PlayerSpec::Heuristic(HeuristicParams::PERFECT)).unwrap();
        let physics = PhysicsConfig::default();
        let player = loaded.player(Side::Left, &physics, 8.0, 0).unwrap();
        assert!(matches!(player, Player::Heuristic(_)));
    }
}
