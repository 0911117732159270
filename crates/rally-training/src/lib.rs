//! Training system that evolves decision networks for the paddle game.
//!
//! # How Training Works
//!
//! 1. **Population** - An [`Optimizer`] proposes a population of [`Genome`]s (flat
//!    network parameter vectors)
//! 2. **Evaluation** - A [`Scheduler`] scores every genome with a [`GenomeFitness`],
//!    normally the fitness evaluator of `rally-evaluator`
//! 3. **Reproduction** - The optimizer breeds the next generation from the scores
//! 4. **Persistence** - The best genome is written to a [`CheckpointStore`]
//!
//! [`CoevolutionTrainer`] drives this loop for two populations that take turns training
//! against each other's frozen champion.
//!
//! # Architecture
//!
//! ```text
//! CoevolutionTrainer (rounds × {side A, side B})
//!     ↓ builds
//! Optimizer (GeneticOptimizer)
//!     ↓ asks to score each generation
//! Scheduler (ParallelScheduler / SequentialScheduler)
//!     ↓ calls per genome
//! GenomeFitness → FitnessEvaluator (rally-evaluator)
//!     ↓ against
//! frozen champion of the other side (CheckpointStore) or randomized heuristic
//! ```
//!
//! # Reproducibility
//!
//! Each genome is evaluated with its own RNG, seeded from the run's base seed, the
//! generation and the genome id ([`TrainingContext::genome_rng`]). Scores therefore do not
//! depend on how genomes are spread over worker threads.
//!
//! # Cancellation
//!
//! A [`CancelToken`](rally_engine::CancelToken) is checked on every simulation tick. A
//! tripped token unwinds through the scheduler and the optimizer and ends the run as
//! [`RunOutcome::Interrupted`]; checkpoints written before that point are kept, the side
//! in training is not saved.

pub use self::{
    checkpoint::{
        Checkpoint, CheckpointError, CheckpointLoadError, CheckpointSaveError, CheckpointSlot,
        CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, StoreEvent,
    },
    coevolution::{CoevolutionConfig, CoevolutionTrainer, Phase, RunOutcome, TrainingError},
    context::{TrainingContext, TrainingSide},
    fitness::{GenomeFitness, NetworkFitness},
    genetic::{EvolutionPhase, GeneticOptimizer, GeneticOptimizerFactory, GeneticParams},
    genome::{Candidate, Genome, GenomeId, ScoredGenome},
    optimizer::{Optimizer, OptimizerError, OptimizerFactory},
    progress::ProgressReporter,
    scheduler::{ParallelScheduler, Scheduler, SequentialScheduler},
    summary::FitnessSummary,
};

pub mod checkpoint;
pub mod coevolution;
pub mod context;
pub mod fitness;
pub mod genetic;
pub mod genome;
pub mod optimizer;
pub mod progress;
pub mod scheduler;
pub mod summary;
pub mod weights;
