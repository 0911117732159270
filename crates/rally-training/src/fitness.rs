use rally_engine::CancelToken;
use rally_evaluator::{EvaluationError, FitnessEvaluator, NetworkShape};
use rand_pcg::Pcg32;

use crate::Genome;

/// Scores one genome.
///
/// Implementations are shared by every worker of a [`Scheduler`](crate::Scheduler), so
/// they must not mutate shared state.
pub trait GenomeFitness: Sync {
    fn fitness(
        &self,
        genome: &Genome,
        rng: &mut Pcg32,
        cancel: &CancelToken,
    ) -> Result<f32, EvaluationError>;
}

impl<F> GenomeFitness for F
where
    F: Fn(&Genome, &mut Pcg32, &CancelToken) -> Result<f32, EvaluationError> + Sync,
{
    fn fitness(
        &self,
        genome: &Genome,
        rng: &mut Pcg32,
        cancel: &CancelToken,
    ) -> Result<f32, EvaluationError> {
        self(genome, rng, cancel)
    }
}

/// Realizes each genome as a network and plays it through a [`FitnessEvaluator`].
#[derive(Debug, Clone)]
pub struct NetworkFitness {
    evaluator: FitnessEvaluator,
    shape: NetworkShape,
}

impl NetworkFitness {
    #[must_use]
    pub fn new(evaluator: FitnessEvaluator, shape: NetworkShape) -> Self {
        Self { evaluator, shape }
    }

    #[must_use]
    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    #[must_use]
    pub fn shape(&self) -> NetworkShape {
        self.shape
    }
}

impl GenomeFitness for NetworkFitness {
    fn fitness(
        &self,
        genome: &Genome,
        rng: &mut Pcg32,
        cancel: &CancelToken,
    ) -> Result<f32, EvaluationError> {
        let network = genome.network(self.shape)?;
        self.evaluator.evaluate(&network, rng, cancel)
    }
}
