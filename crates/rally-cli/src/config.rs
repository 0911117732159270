use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context;
use rally_engine::PhysicsConfig;
use rally_evaluator::{DecisionEncoding, FeatureSet, FitnessConfig, NetworkConfig};
use rally_training::{CoevolutionConfig, GeneticParams};
use serde::{Deserialize, Serialize};

/// Everything a run can be configured with.
///
/// Every field is optional in the JSON file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RallyConfig {
    pub physics: PhysicsConfig,
    pub fitness: FitnessConfig,
    pub network: NetworkConfig,
    pub genetic: GeneticParams,
    pub coevolution: CoevolutionConfig,
    pub checkpoint_dir: PathBuf,
    /// Evaluation threads; defaults to the number of CPUs.
    pub workers: Option<usize>,
}

impl Default for RallyConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            fitness: FitnessConfig::default(),
            network: NetworkConfig::default(),
            genetic: GeneticParams::default(),
            coevolution: CoevolutionConfig::default(),
            checkpoint_dir: PathBuf::from("./data/checkpoints"),
            workers: None,
        }
    }
}

impl RallyConfig {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

/// Options shared by every command that reads the configuration.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// Path to a JSON config file; see `rally config`
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Directory holding the checkpoints
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,
    /// Base seed for every random draw
    #[arg(long)]
    seed: Option<u64>,
    /// Number of evaluation threads
    #[arg(long)]
    workers: Option<usize>,
    /// Population size
    #[arg(long)]
    population: Option<usize>,
    /// Hidden layer width of new networks
    #[arg(long)]
    hidden: Option<usize>,
    /// Network inputs of new networks: `basic` (5) or `extended` (8)
    #[arg(long)]
    feature_set: Option<FeatureSet>,
    /// Network outputs of new networks: `argmax3` or `threshold1`
    #[arg(long)]
    encoding: Option<DecisionEncoding>,
}

impl ConfigArg {
    /// Reads the config file, if any, and applies the command-line overrides.
    pub(crate) fn resolve(&self) -> anyhow::Result<RallyConfig> {
        let mut config = match &self.config {
            Some(path) => RallyConfig::read(path)?,
            None => RallyConfig::default(),
        };
        if let Some(dir) = &self.checkpoint_dir {
            config.checkpoint_dir.clone_from(dir);
        }
        if let Some(seed) = self.seed {
            config.coevolution.seed = Some(seed);
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(population) = self.population {
            config.genetic.population_size = population;
        }
        if let Some(hidden) = self.hidden {
            config.network.hidden = hidden;
        }
        if let Some(features) = self.feature_set {
            config.network.layout.features = features;
        }
        if let Some(encoding) = self.encoding {
            config.network.layout.encoding = encoding;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use rally_evaluator::{NetworkLayout, TrialBudget};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rally.json");
        fs::write(
            &path,
            r#"{ "coevolution": { "rounds": 4 }, "network": { "hidden": 12 } }"#,
        )
        .unwrap();

        let config = RallyConfig::read(&path).unwrap();
        assert_eq!(config.coevolution.rounds, 4);
        assert_eq!(config.coevolution.generations_per_round, 10);
        assert_eq!(config.network.hidden, 12);
        assert_eq!(config.network.layout, NetworkLayout::CURRENT);
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut config = RallyConfig::default();
        config.fitness.trial_budget = TrialBudget::WallClock(Duration::from_secs(3));
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: RallyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = RallyConfig::read(Path::new("/nonexistent/rally.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rally.json"));
    }

    #[test]
    fn test_overrides() {
        let arg = ConfigArg {
            seed: Some(9),
            population: Some(12),
            checkpoint_dir: Some(PathBuf::from("elsewhere")),
            ..ConfigArg::default()
        };
        let config = arg.resolve().unwrap();
        assert_eq!(config.coevolution.seed, Some(9));
        assert_eq!(config.genetic.population_size, 12);
        assert_eq!(config.checkpoint_dir, PathBuf::from("elsewhere"));
        assert_eq!(config.network.layout, NetworkLayout::CURRENT);
    }

    #[derive(Debug, clap::Parser)]
    struct Cli {
        #[clap(flatten)]
        config: ConfigArg,
    }

    #[test]
    fn test_legacy_layout_from_flags() {
        use clap::Parser as _;

        let cli =
            Cli::try_parse_from(["rally", "--feature-set", "basic", "--encoding", "threshold1"])
                .unwrap();
        let config = cli.config.resolve().unwrap();
        assert_eq!(config.network.layout, NetworkLayout::LEGACY);

        assert!(Cli::try_parse_from(["rally", "--encoding", "softmax"]).is_err());
    }
}
