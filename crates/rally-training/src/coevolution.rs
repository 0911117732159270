//! Co-evolutionary training of two populations.
//!
//! Two populations, A and B, take turns. Each turn evolves one population for a fixed
//! number of generations against the frozen champion of the other one and then replaces
//! its own checkpoint with the result:
//!
//! ```text
//! Bootstrap → TrainA(0) → TrainB(0) → TrainA(1) → ... → TrainB(rounds - 1) → Done
//!                 ↘            ↘                                ↘
//!                        Interrupted (cancel token tripped)
//! ```
//!
//! - **Bootstrap** - If an overall-best checkpoint exists, it is copied into both side
//!   slots so that both populations start from the same prior knowledge.
//! - **Train** - The other side's checkpoint is loaded as a frozen opponent. A missing or
//!   unusable checkpoint falls back to the randomized heuristic opponent. The optimizer is
//!   seeded from the side's own checkpoint only if that checkpoint comes from this run:
//!   the bootstrap copy in round 0, the previous round's champion afterwards. Side
//!   checkpoints left over from earlier runs never seed round 0.
//! - **Interrupted** - Reached when the cancel token trips during a train phase. The side
//!   in training is not saved; checkpoints written earlier stay on disk.
//!
//! A checkpoint write failure aborts the run with an error.

use std::sync::Arc;

use rally_engine::{CancelToken, PhysicsConfig};
use rally_evaluator::{FitnessConfig, FitnessEvaluator, NetworkConfig, Opponent};
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    Checkpoint, CheckpointError, CheckpointLoadError, CheckpointSlot, CheckpointStore, Genome,
    NetworkFitness, OptimizerError, OptimizerFactory, Scheduler, ScoredGenome, TrainingContext,
    TrainingSide,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoevolutionConfig {
    pub rounds: usize,
    pub generations_per_round: usize,
    /// Base seed of every random draw in a run; random when absent.
    pub seed: Option<u64>,
}

impl Default for CoevolutionConfig {
    fn default() -> Self {
        Self {
            rounds: 1,
            generations_per_round: 10,
            seed: None,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("checkpoint error")]
    Checkpoint(CheckpointError),
    #[display("optimizer error")]
    Optimizer(OptimizerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Phase {
    #[display("bootstrap")]
    Bootstrap,
    #[display("round {round}: training side A")]
    TrainA { round: usize },
    #[display("round {round}: training side B")]
    TrainB { round: usize },
    #[display("done")]
    Done,
    #[display("interrupted in round {round} while training side {side}")]
    Interrupted { round: usize, side: TrainingSide },
}

impl Phase {
    /// Phase following a successfully completed `self`.
    #[must_use]
    pub fn next(self, rounds: usize) -> Self {
        match self {
            Self::Bootstrap if rounds == 0 => Self::Done,
            Self::Bootstrap => Self::TrainA { round: 0 },
            Self::TrainA { round } => Self::TrainB { round },
            Self::TrainB { round } if round + 1 < rounds => Self::TrainA { round: round + 1 },
            Self::TrainB { .. } | Self::Done => Self::Done,
            Self::Interrupted { .. } => self,
        }
    }

    /// Round and side being trained, if this is a train phase.
    #[must_use]
    pub fn training(self) -> Option<(usize, TrainingSide)> {
        match self {
            Self::TrainA { round } => Some((round, TrainingSide::A)),
            Self::TrainB { round } => Some((round, TrainingSide::B)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    /// `side` is `None` for single-population training.
    Interrupted {
        round: usize,
        side: Option<TrainingSide>,
    },
}

#[derive(Debug)]
pub struct CoevolutionTrainer<S> {
    physics: PhysicsConfig,
    fitness: FitnessConfig,
    network: NetworkConfig,
    config: CoevolutionConfig,
    scheduler: S,
    cancel: CancelToken,
    base_seed: u64,
}

impl<S> CoevolutionTrainer<S>
where
    S: Scheduler,
{
    pub fn new(
        physics: PhysicsConfig,
        fitness: FitnessConfig,
        network: NetworkConfig,
        config: CoevolutionConfig,
        scheduler: S,
    ) -> Self {
        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Self {
            physics,
            fitness,
            network,
            config,
            scheduler,
            cancel: CancelToken::new(),
            base_seed,
        }
    }

    /// Uses `cancel` instead of a private token, so that another thread can stop the run.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    #[must_use]
    pub fn config(&self) -> &CoevolutionConfig {
        &self.config
    }

    /// Runs the co-evolution state machine to completion or interruption.
    pub fn run(
        &self,
        store: &mut dyn CheckpointStore,
        factory: &mut dyn OptimizerFactory,
    ) -> Result<RunOutcome, TrainingError> {
        let rounds = self.config.rounds;
        info!(
            rounds,
            generations_per_round = self.config.generations_per_round,
            total_generations = rounds * self.config.generations_per_round * 2,
            base_seed = self.base_seed,
            "starting co-evolution"
        );

        let mut bootstrapped = false;
        let mut phase = Phase::Bootstrap;
        loop {
            info!(%phase, "entering phase");
            phase = match (phase, phase.training()) {
                (Phase::Bootstrap, _) => {
                    bootstrapped = self.bootstrap(store)?;
                    phase.next(rounds)
                }
                (_, Some((round, side))) => {
                    let seed_from_own = bootstrapped || round > 0;
                    if self.train_side(round, side, seed_from_own, store, factory)? {
                        phase.next(rounds)
                    } else {
                        Phase::Interrupted { round, side }
                    }
                }
                (Phase::Interrupted { round, side }, _) => {
                    warn!(%phase, "training interrupted");
                    return Ok(RunOutcome::Interrupted {
                        round,
                        side: Some(side),
                    });
                }
                _ => return Ok(RunOutcome::Done),
            };
        }
    }

    /// Evolves a single population against the randomized heuristic and saves the
    /// champion to the overall-best slot.
    ///
    /// With `resume`, an existing best checkpoint of the configured shape seeds the
    /// population.
    pub fn train_champion(
        &self,
        store: &mut dyn CheckpointStore,
        factory: &mut dyn OptimizerFactory,
        generations: usize,
        resume: bool,
    ) -> Result<RunOutcome, TrainingError> {
        let context = TrainingContext::new(self.base_seed);
        let seed = if resume {
            self.seed_genome(store, CheckpointSlot::Best)
        } else {
            None
        };
        info!(
            generations,
            seeded = seed.is_some(),
            base_seed = self.base_seed,
            "training champion against heuristic opponents"
        );

        let Some(best) =
            self.evolve(&context, Opponent::RandomHeuristic, seed, generations, factory)?
        else {
            warn!("training interrupted");
            return Ok(RunOutcome::Interrupted {
                round: 0,
                side: None,
            });
        };
        self.save(store, CheckpointSlot::Best, best)?;
        Ok(RunOutcome::Done)
    }

    /// Returns whether the best checkpoint was copied into both side slots.
    fn bootstrap(&self, store: &mut dyn CheckpointStore) -> Result<bool, TrainingError> {
        match store.load(CheckpointSlot::Best) {
            Ok(_) => {
                for side in [TrainingSide::A, TrainingSide::B] {
                    store.clone_slot(CheckpointSlot::Best, side.slot())?;
                }
                info!("both sides start from the best checkpoint");
                Ok(true)
            }
            Err(CheckpointLoadError::Missing { .. }) => {
                info!("no best checkpoint, both sides start from scratch");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "ignoring unusable best checkpoint");
                Ok(false)
            }
        }
    }

    /// Returns `false` when interrupted.
    ///
    /// With `seed_from_own`, the side's own checkpoint seeds the optimizer.
    fn train_side(
        &self,
        round: usize,
        side: TrainingSide,
        seed_from_own: bool,
        store: &mut dyn CheckpointStore,
        factory: &mut dyn OptimizerFactory,
    ) -> Result<bool, TrainingError> {
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        let context = TrainingContext::new(self.base_seed).with_side(round, side);
        let opponent = self.opponent_for(&*store, side);
        let seed = if seed_from_own {
            self.seed_genome(&*store, side.slot())
        } else {
            None
        };
        info!(
            round,
            %side,
            opponent = if opponent.is_frozen() { "frozen champion" } else { "heuristic" },
            seeded = seed.is_some(),
            "training side"
        );

        let generations = self.config.generations_per_round;
        let Some(best) = self.evolve(&context, opponent, seed, generations, factory)? else {
            return Ok(false);
        };
        self.save(store, side.slot(), best)?;
        Ok(true)
    }

    /// Frozen champion of the side opposing `side`, or the heuristic fallback.
    pub fn opponent_for(&self, store: &dyn CheckpointStore, side: TrainingSide) -> Opponent {
        let slot = side.other().slot();
        let checkpoint = match store.load(slot) {
            Ok(checkpoint) => checkpoint,
            Err(e) if e.is_missing() => {
                info!(%slot, "no opponent checkpoint, using heuristic opponent");
                return Opponent::RandomHeuristic;
            }
            Err(e) => {
                warn!(%slot, error = %e, "unusable opponent checkpoint, using heuristic opponent");
                return Opponent::RandomHeuristic;
            }
        };
        let opponent = checkpoint
            .network()
            .and_then(|network| Opponent::frozen(Arc::new(network), checkpoint.layout));
        match opponent {
            Ok(opponent) => opponent,
            Err(e) => {
                warn!(%slot, error = %e, "unusable opponent network, using heuristic opponent");
                Opponent::RandomHeuristic
            }
        }
    }

    fn seed_genome(&self, store: &dyn CheckpointStore, slot: CheckpointSlot) -> Option<Genome> {
        match store.load(slot) {
            Ok(checkpoint)
                if checkpoint.layout == self.network.layout
                    && checkpoint.shape == self.network.shape() =>
            {
                Some(checkpoint.genome)
            }
            Ok(_) => {
                warn!(%slot, "checkpoint has a different network layout, not seeding from it");
                None
            }
            Err(e) if e.is_missing() => None,
            Err(e) => {
                warn!(%slot, error = %e, "not seeding from unusable checkpoint");
                None
            }
        }
    }

    /// Returns `None` when interrupted.
    fn evolve(
        &self,
        context: &TrainingContext,
        opponent: Opponent,
        seed: Option<Genome>,
        generations: usize,
        factory: &mut dyn OptimizerFactory,
    ) -> Result<Option<ScoredGenome>, TrainingError> {
        let shape = self.network.shape();
        let evaluator = FitnessEvaluator::new(
            self.physics.clone(),
            self.fitness.clone(),
            self.network.layout,
            opponent,
        );
        let fitness = NetworkFitness::new(evaluator, shape);
        let mut optimizer = factory.build(context, shape.param_count(), seed)?;

        let result = optimizer.run(generations, &mut |generation, candidates| {
            let context = context.with_generation(generation);
            self.scheduler
                .evaluate(&context, candidates, &fitness, &self.cancel)
        });
        match result {
            Ok(_) if self.cancel.is_cancelled() => Ok(None),
            Ok(best) => Ok(Some(best)),
            Err(e) if e.is_cancelled() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(
        &self,
        store: &mut dyn CheckpointStore,
        slot: CheckpointSlot,
        best: ScoredGenome,
    ) -> Result<(), TrainingError> {
        let fitness = best.fitness;
        let checkpoint = Checkpoint::new(best, self.network.layout, self.network.shape());
        store
            .save(slot, &checkpoint)
            .map_err(CheckpointError::from)?;
        info!(%slot, fitness, "checkpoint saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use rally_evaluator::{NetworkLayout, TrialBudget};

    use crate::{
        Candidate, CheckpointSaveError, GenomeId, MemoryCheckpointStore, Optimizer,
        SequentialScheduler, StoreEvent,
    };

    use super::*;

    /// Evaluates one fixed genome per generation.
    struct FixedOptimizer {
        genome: Genome,
    }

    impl Optimizer for FixedOptimizer {
        fn run(
            &mut self,
            generations: usize,
            evaluate: &mut crate::optimizer::EvaluatePopulation<'_>,
        ) -> Result<ScoredGenome, OptimizerError> {
            let mut population = vec![Candidate::new(self.genome.clone())];
            for generation in 0..generations {
                evaluate(generation, &mut population)?;
            }
            population[0].scored().ok_or(OptimizerError::NoGenerations)
        }
    }

    fn network() -> NetworkConfig {
        NetworkConfig {
            layout: NetworkLayout::CURRENT,
            hidden: 2,
        }
    }

    fn trainer(rounds: usize) -> CoevolutionTrainer<SequentialScheduler> {
        let fitness = FitnessConfig {
            trial_budget: TrialBudget::Simulated(Duration::from_millis(100)),
            ..FitnessConfig::default()
        };
        let config = CoevolutionConfig {
            rounds,
            generations_per_round: 2,
            seed: Some(1),
        };
        CoevolutionTrainer::new(
            PhysicsConfig::default(),
            fitness,
            network(),
            config,
            SequentialScheduler,
        )
    }

    fn checkpoint(value: f32) -> Checkpoint {
        let shape = network().shape();
        let genome = Genome::new(GenomeId(0), vec![value; shape.param_count()]);
        Checkpoint::new(
            ScoredGenome {
                genome,
                fitness: 0.0,
            },
            network().layout,
            shape,
        )
    }

    type SeedLog = Mutex<Vec<(TrainingContext, Option<Genome>)>>;

    fn fixed_factory(
        log: &SeedLog,
    ) -> impl FnMut(&TrainingContext, usize, Option<Genome>) -> Result<Box<dyn Optimizer>, OptimizerError>
    + '_ {
        move |context: &TrainingContext, param_count: usize, seed: Option<Genome>| {
            log.lock().unwrap().push((*context, seed.clone()));
            let genome = seed.unwrap_or_else(|| Genome::new(GenomeId(0), vec![0.1; param_count]));
            Ok(Box::new(FixedOptimizer { genome }) as Box<dyn Optimizer>)
        }
    }

    #[test]
    fn test_one_round_with_best_checkpoint() {
        let mut store = MemoryCheckpointStore::new();
        store.insert(CheckpointSlot::Best, checkpoint(0.3));
        let log = SeedLog::default();
        let outcome = trainer(1)
            .run(&mut store, &mut fixed_factory(&log))
            .unwrap();

        assert_eq!(outcome, RunOutcome::Done);
        assert_eq!(
            store.saved_slots(),
            [CheckpointSlot::SideA, CheckpointSlot::SideB]
        );
        assert_eq!(
            &store.events()[..2],
            [
                StoreEvent::Cloned {
                    from: CheckpointSlot::Best,
                    to: CheckpointSlot::SideA
                },
                StoreEvent::Cloned {
                    from: CheckpointSlot::Best,
                    to: CheckpointSlot::SideB
                },
            ]
        );
        // both sides were seeded from the bootstrapped champion
        let log = log.into_inner().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|(_, seed)| seed.is_some()));
        assert_eq!(log[0].0.side, Some(TrainingSide::A));
        assert_eq!(log[1].0.side, Some(TrainingSide::B));
    }

    #[test]
    fn test_rounds_without_best_checkpoint() {
        let mut store = MemoryCheckpointStore::new();
        let log = SeedLog::default();
        let outcome = trainer(2)
            .run(&mut store, &mut fixed_factory(&log))
            .unwrap();

        assert_eq!(outcome, RunOutcome::Done);
        assert_eq!(
            store.saved_slots(),
            [
                CheckpointSlot::SideA,
                CheckpointSlot::SideB,
                CheckpointSlot::SideA,
                CheckpointSlot::SideB
            ]
        );
        let log = log.into_inner().unwrap();
        let seeded: Vec<_> = log
            .iter()
            .map(|(ctx, seed)| (ctx.round, ctx.side, seed.is_some()))
            .collect();
        assert_eq!(
            seeded,
            [
                (0, Some(TrainingSide::A), false),
                (0, Some(TrainingSide::B), false),
                (1, Some(TrainingSide::A), true),
                (1, Some(TrainingSide::B), true),
            ]
        );
    }

    #[test]
    fn test_leftover_side_checkpoint_does_not_seed_first_round() {
        let mut store = MemoryCheckpointStore::new();
        store.insert(CheckpointSlot::SideA, checkpoint(0.4));
        let log = SeedLog::default();
        let outcome = trainer(2)
            .run(&mut store, &mut fixed_factory(&log))
            .unwrap();

        assert_eq!(outcome, RunOutcome::Done);
        let log = log.into_inner().unwrap();
        let seeded: Vec<_> = log
            .iter()
            .map(|(ctx, seed)| (ctx.round, ctx.side, seed.is_some()))
            .collect();
        assert_eq!(
            seeded,
            [
                (0, Some(TrainingSide::A), false),
                (0, Some(TrainingSide::B), false),
                (1, Some(TrainingSide::A), true),
                (1, Some(TrainingSide::B), true),
            ]
        );
        // round 1 continues from this run's round 0 champion, not the leftover file
        let (_, seed) = &log[2];
        assert_ne!(seed.as_ref().map(|g| g.params[0]), Some(0.4));
    }

    #[test]
    fn test_zero_rounds() {
        let mut store = MemoryCheckpointStore::new();
        let log = SeedLog::default();
        let outcome = trainer(0)
            .run(&mut store, &mut fixed_factory(&log))
            .unwrap();
        assert_eq!(outcome, RunOutcome::Done);
        assert!(store.events().is_empty());
    }

    #[test]
    fn test_interrupt_during_side_b() {
        let trainer = trainer(1);
        let cancel = trainer.cancel_token().clone();
        let mut store = MemoryCheckpointStore::new();
        let mut factory = |context: &TrainingContext,
                           param_count: usize,
                           _: Option<Genome>|
         -> Result<Box<dyn Optimizer>, OptimizerError> {
            if context.side == Some(TrainingSide::B) {
                cancel.cancel();
            }
            let genome = Genome::new(GenomeId(0), vec![0.0; param_count]);
            Ok(Box::new(FixedOptimizer { genome }) as Box<dyn Optimizer>)
        };
        let outcome = trainer.run(&mut store, &mut factory).unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Interrupted {
                round: 0,
                side: Some(TrainingSide::B)
            }
        );
        assert_eq!(store.saved_slots(), [CheckpointSlot::SideA]);
    }

    #[test]
    fn test_save_failure_aborts() {
        let mut store = MemoryCheckpointStore::new().fail_saves_to(CheckpointSlot::SideA);
        let log = SeedLog::default();
        let err = trainer(1)
            .run(&mut store, &mut fixed_factory(&log))
            .unwrap_err();
        assert!(matches!(
            err,
            TrainingError::Checkpoint(CheckpointError::Save(CheckpointSaveError::Io { .. }))
        ));
        assert!(store.saved_slots().is_empty());
        assert_eq!(log.into_inner().unwrap().len(), 1);
    }

    #[test]
    fn test_opponent_fallback() {
        let trainer = trainer(1);
        let mut store = MemoryCheckpointStore::new();
        assert!(!trainer.opponent_for(&store, TrainingSide::B).is_frozen());

        store.insert(CheckpointSlot::SideA, checkpoint(0.2));
        assert!(trainer.opponent_for(&store, TrainingSide::B).is_frozen());
        assert!(!trainer.opponent_for(&store, TrainingSide::A).is_frozen());

        let mut corrupt = checkpoint(0.2);
        corrupt.genome.params.truncate(3);
        store.insert(CheckpointSlot::SideA, corrupt);
        assert!(!trainer.opponent_for(&store, TrainingSide::B).is_frozen());
    }

    #[test]
    fn test_seed_ignores_other_layouts() {
        let trainer = trainer(1);
        let mut store = MemoryCheckpointStore::new();
        let layout = NetworkLayout::LEGACY;
        let shape = layout.shape(2);
        let legacy = Checkpoint::new(
            ScoredGenome {
                genome: Genome::new(GenomeId(0), vec![0.0; shape.param_count()]),
                fitness: 0.0,
            },
            layout,
            shape,
        );
        store.insert(CheckpointSlot::SideA, legacy);
        assert!(trainer.seed_genome(&store, CheckpointSlot::SideA).is_none());
        store.insert(CheckpointSlot::SideA, checkpoint(0.0));
        assert!(trainer.seed_genome(&store, CheckpointSlot::SideA).is_some());
    }

    #[test]
    fn test_train_champion() {
        let mut store = MemoryCheckpointStore::new();
        let log = SeedLog::default();
        let outcome = trainer(1)
            .train_champion(&mut store, &mut fixed_factory(&log), 2, false)
            .unwrap();
        assert_eq!(outcome, RunOutcome::Done);
        assert_eq!(store.saved_slots(), [CheckpointSlot::Best]);
        assert_eq!(log.into_inner().unwrap()[0].0.side, None);
    }

    #[test]
    fn test_train_champion_interrupted() {
        let trainer = trainer(1);
        trainer.cancel_token().cancel();
        let mut store = MemoryCheckpointStore::new();
        let log = SeedLog::default();
        let outcome = trainer
            .train_champion(&mut store, &mut fixed_factory(&log), 2, true)
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Interrupted { side: None, .. }));
        assert!(store.events().is_empty());
    }

    #[test]
    fn test_phase_transitions() {
        assert_eq!(Phase::Bootstrap.next(2), Phase::TrainA { round: 0 });
        assert_eq!(Phase::Bootstrap.next(0), Phase::Done);
        assert_eq!(Phase::TrainA { round: 0 }.next(2), Phase::TrainB { round: 0 });
        assert_eq!(Phase::TrainB { round: 0 }.next(2), Phase::TrainA { round: 1 });
        assert_eq!(Phase::TrainB { round: 1 }.next(2), Phase::Done);
        assert_eq!(Phase::Done.next(2), Phase::Done);
        assert_eq!(
            Phase::TrainB { round: 1 }.training(),
            Some((1, TrainingSide::B))
        );
    }
}
