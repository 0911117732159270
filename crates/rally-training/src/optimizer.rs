use rally_evaluator::EvaluationError;

use crate::{Candidate, Genome, GenomeId, ScoredGenome, TrainingContext};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum OptimizerError {
    #[display("population is empty")]
    EmptyPopulation,
    #[display("at least one generation is required")]
    NoGenerations,
    #[display("invalid optimizer parameter: {reason}")]
    InvalidParams { reason: String },
    #[display("genome has {actual} parameters, expected {expected}")]
    GenomeLength { expected: usize, actual: usize },
    #[display("genome {id} was not scored")]
    Unscored { id: GenomeId },
    #[display("population evaluation failed")]
    #[from]
    Evaluation(EvaluationError),
}

impl OptimizerError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Evaluation(e) if e.is_cancelled())
    }
}

/// Scores a whole generation: `(generation, population)`.
///
/// Must set a fitness on every candidate before returning `Ok`.
pub type EvaluatePopulation<'a> =
    dyn FnMut(usize, &mut [Candidate]) -> Result<(), EvaluationError> + 'a;

/// Black-box search over genomes.
pub trait Optimizer {
    /// Runs `generations` generations and returns the best genome seen.
    fn run(
        &mut self,
        generations: usize,
        evaluate: &mut EvaluatePopulation<'_>,
    ) -> Result<ScoredGenome, OptimizerError>;
}

/// Creates a fresh optimizer for each training phase.
pub trait OptimizerFactory {
    /// `seed` is a genome to start from, such as the phase's previous champion.
    fn build(
        &mut self,
        context: &TrainingContext,
        param_count: usize,
        seed: Option<Genome>,
    ) -> Result<Box<dyn Optimizer>, OptimizerError>;
}

impl<F> OptimizerFactory for F
where
    F: FnMut(&TrainingContext, usize, Option<Genome>) -> Result<Box<dyn Optimizer>, OptimizerError>,
{
    fn build(
        &mut self,
        context: &TrainingContext,
        param_count: usize,
        seed: Option<Genome>,
    ) -> Result<Box<dyn Optimizer>, OptimizerError> {
        self(context, param_count, seed)
    }
}
