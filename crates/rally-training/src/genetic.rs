//! Genetic algorithm over network parameter vectors.
//!
//! The GA uses tournament selection, BLX-α crossover and Gaussian mutation to create new
//! generations, keeping the best genomes unchanged (elitism).
//!
//! # Algorithm Overview
//!
//! 1. **Evaluate Fitness** - The caller scores every candidate of the generation
//! 2. **Elite Selection** - Top performers are copied into the next generation
//! 3. **Tournament Selection** - Parents are the best of `tournament_size` random picks
//! 4. **Crossover (BLX-α)** - Two parents are blended into one child
//! 5. **Mutation** - Gaussian noise is added to some of the child's parameters
//!
//! Elites are carried over without their score and are evaluated again with the rest of
//! the generation. Fitness is noisy (the opponent is randomized per trial), so a lucky
//! score does not keep an elite alive forever.
//!
//! # Evolution Phases
//!
//! The mutation strength shrinks as the run progresses:
//!
//! | Phase           | Share of the run | Sigma scale |
//! |-----------------|------------------|-------------|
//! | `Exploration`   | first 15%        | 1.0         |
//! | `Transition`    | up to 40%        | 0.4         |
//! | `Convergence`   | remainder        | 0.2         |
//!
//! # Seeding
//!
//! [`GeneticOptimizer::with_seed_genome`] starts the run from a known genome instead of
//! random parameters: the seed enters the first generation unchanged and every other
//! member is a mutation of it.
//!
//! # Example
//!
//! ```
//! use rally_training::{Candidate, GeneticOptimizer, GeneticParams, Optimizer};
//!
//! let params = GeneticParams {
//!     population_size: 8,
//!     ..GeneticParams::default()
//! };
//! let mut optimizer = GeneticOptimizer::new(params, 3, 42)?;
//!
//! // maximize -(x0² + x1² + x2²)
//! let best = optimizer.run(20, &mut |_generation, population: &mut [Candidate]| {
//!     for candidate in population {
//!         let score = -candidate.genome().params.iter().map(|p| p * p).sum::<f32>();
//!         candidate.set_fitness(score);
//!     }
//!     Ok(())
//! })?;
//! assert!(best.fitness <= 0.0);
//! # Ok::<(), rally_training::OptimizerError>(())
//! ```

use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_distr::Normal;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Candidate, FitnessSummary, Genome, GenomeId, Optimizer, OptimizerError, OptimizerFactory,
    ScoredGenome, TrainingContext, optimizer::EvaluatePopulation, weights,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    pub population_size: usize,
    /// Number of top candidates copied into the next generation.
    pub elite_count: usize,
    /// Tournament size for selection (larger = stronger selection pressure).
    pub tournament_size: usize,
    /// BLX-α crossover parameter.
    pub blx_alpha: f32,
    /// Probability of mutating each parameter.
    pub mutation_rate: f32,
    /// Standard deviation of the mutation noise during the exploration phase.
    pub mutation_sigma: f32,
    /// Parameters are clamped to `[-weight_limit, weight_limit]`.
    pub weight_limit: f32,
    /// Initial parameters are drawn from `[-initial_range, initial_range]`.
    pub initial_range: f32,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 30,
            elite_count: 2,
            tournament_size: 3,
            blx_alpha: 0.2,
            mutation_rate: 0.3,
            mutation_sigma: 0.3,
            weight_limit: 8.0,
            initial_range: 1.0,
        }
    }
}

impl GeneticParams {
    pub fn validate(&self) -> Result<(), OptimizerError> {
        let invalid = |reason: &str| {
            Err(OptimizerError::InvalidParams {
                reason: reason.to_owned(),
            })
        };
        if self.population_size == 0 {
            return Err(OptimizerError::EmptyPopulation);
        }
        if self.elite_count > self.population_size {
            return invalid("elite_count exceeds population_size");
        }
        if self.tournament_size == 0 {
            return invalid("tournament_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return invalid("mutation_rate must be within [0, 1]");
        }
        if !(self.mutation_sigma.is_finite() && self.mutation_sigma > 0.0) {
            return invalid("mutation_sigma must be positive");
        }
        if !(self.weight_limit.is_finite() && self.weight_limit > 0.0) {
            return invalid("weight_limit must be positive");
        }
        if !(self.initial_range.is_finite() && self.initial_range >= 0.0) {
            return invalid("initial_range must not be negative");
        }
        if !(self.blx_alpha.is_finite() && self.blx_alpha >= 0.0) {
            return invalid("blx_alpha must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionPhase {
    #[default]
    Exploration,
    Transition,
    Convergence,
}

impl EvolutionPhase {
    #[must_use]
    pub fn from_progress(generation: usize, generations: usize) -> Self {
        let percent = generation * 100 / generations.max(1);
        match percent {
            0..15 => Self::Exploration,
            15..40 => Self::Transition,
            _ => Self::Convergence,
        }
    }

    #[must_use]
    pub const fn sigma_scale(self) -> f32 {
        match self {
            Self::Exploration => 1.0,
            Self::Transition => 0.4,
            Self::Convergence => 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneticOptimizer {
    params: GeneticParams,
    param_count: usize,
    rng: Pcg32,
    seed: Option<Genome>,
    next_id: u64,
}

impl GeneticOptimizer {
    /// Optimizer for genomes of `param_count` parameters, with its own RNG seeded by
    /// `rng_seed`.
    pub fn new(
        params: GeneticParams,
        param_count: usize,
        rng_seed: u64,
    ) -> Result<Self, OptimizerError> {
        params.validate()?;
        Ok(Self {
            params,
            param_count,
            rng: Pcg32::seed_from_u64(rng_seed),
            seed: None,
            next_id: 0,
        })
    }

    /// Starts the first generation from `genome`.
    pub fn with_seed_genome(mut self, genome: Genome) -> Result<Self, OptimizerError> {
        if genome.params.len() != self.param_count {
            return Err(OptimizerError::GenomeLength {
                expected: self.param_count,
                actual: genome.params.len(),
            });
        }
        self.seed = Some(genome);
        Ok(self)
    }

    #[must_use]
    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    fn fresh_id(&mut self) -> GenomeId {
        let id = GenomeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn noise(&self, phase: EvolutionPhase) -> Result<Normal<f32>, OptimizerError> {
        Normal::new(0.0, self.params.mutation_sigma * phase.sigma_scale()).map_err(|e| {
            OptimizerError::InvalidParams {
                reason: e.to_string(),
            }
        })
    }

    fn initial_population(&mut self) -> Result<Vec<Candidate>, OptimizerError> {
        let size = self.params.population_size;
        let mut population = Vec::with_capacity(size);
        match self.seed.take() {
            Some(seed) => {
                let noise = self.noise(EvolutionPhase::Exploration)?;
                let id = self.fresh_id();
                population.push(Candidate::new(Genome::new(id, seed.params.clone())));
                while population.len() < size {
                    let mut params = seed.params.clone();
                    weights::mutate(
                        &mut params,
                        &noise,
                        self.params.weight_limit,
                        self.params.mutation_rate,
                        &mut self.rng,
                    );
                    let id = self.fresh_id();
                    population.push(Candidate::new(Genome::new(id, params)));
                }
            }
            None => {
                while population.len() < size {
                    let params =
                        weights::random(&mut self.rng, self.params.initial_range, self.param_count);
                    let id = self.fresh_id();
                    population.push(Candidate::new(Genome::new(id, params)));
                }
            }
        }
        Ok(population)
    }

    /// Breeds the next generation from `population`, which must be sorted best first.
    fn evolve(
        &mut self,
        population: &[Candidate],
        phase: EvolutionPhase,
    ) -> Result<Vec<Candidate>, OptimizerError> {
        debug_assert!(population.is_sorted_by(|a, b| a.fitness() >= b.fitness()));
        let noise = self.noise(phase)?;
        let mut next = Vec::with_capacity(population.len());

        next.extend(
            population[..self.params.elite_count]
                .iter()
                .map(|c| Candidate::new(c.genome().clone())),
        );

        while next.len() < population.len() {
            let p1 = tournament_select(population, self.params.tournament_size, &mut self.rng)
                .ok_or(OptimizerError::EmptyPopulation)?;
            let p2 = tournament_select(population, self.params.tournament_size, &mut self.rng)
                .ok_or(OptimizerError::EmptyPopulation)?;

            let mut child = weights::blx_alpha(
                &p1.genome().params,
                &p2.genome().params,
                self.params.blx_alpha,
                self.params.weight_limit,
                &mut self.rng,
            );
            weights::mutate(
                &mut child,
                &noise,
                self.params.weight_limit,
                self.params.mutation_rate,
                &mut self.rng,
            );
            let id = self.fresh_id();
            next.push(Candidate::new(Genome::new(id, child)));
        }
        Ok(next)
    }
}

impl Optimizer for GeneticOptimizer {
    fn run(
        &mut self,
        generations: usize,
        evaluate: &mut EvaluatePopulation<'_>,
    ) -> Result<ScoredGenome, OptimizerError> {
        if generations == 0 {
            return Err(OptimizerError::NoGenerations);
        }

        let mut population = self.initial_population()?;
        let mut best: Option<ScoredGenome> = None;

        for generation in 0..generations {
            let phase = EvolutionPhase::from_progress(generation, generations);
            evaluate(generation, population.as_mut_slice())?;

            if let Some(unscored) = population.iter().find(|c| c.fitness().is_none()) {
                return Err(OptimizerError::Unscored { id: unscored.id() });
            }
            population.sort_by(|a, b| score(b).total_cmp(&score(a)));

            let champion = population
                .first()
                .and_then(Candidate::scored)
                .ok_or(OptimizerError::EmptyPopulation)?;
            if best.as_ref().is_none_or(|b| champion.fitness > b.fitness) {
                best = Some(champion);
            }

            let scores = population.iter().filter_map(Candidate::fitness);
            if let Some(summary) = FitnessSummary::new(scores) {
                info!(
                    generation,
                    ?phase,
                    max = summary.max,
                    mean = summary.mean,
                    min = summary.min,
                    std_dev = summary.std_dev,
                    "generation evaluated"
                );
            }
            for (rank, candidate) in population.iter().take(5).enumerate() {
                debug!(rank, id = %candidate.id(), fitness = ?candidate.fitness(), "top genome");
            }

            if generation + 1 < generations {
                population = self.evolve(&population, phase)?;
            }
        }

        best.ok_or(OptimizerError::EmptyPopulation)
    }
}

fn tournament_select<'a, R>(
    population: &'a [Candidate],
    tournament_size: usize,
    rng: &mut R,
) -> Option<&'a Candidate>
where
    R: Rng + ?Sized,
{
    population
        .choose_multiple(rng, tournament_size)
        .max_by(|a, b| score(a).total_cmp(&score(b)))
}

fn score(candidate: &Candidate) -> f32 {
    candidate.fitness().unwrap_or(f32::MIN)
}

/// Builds a [`GeneticOptimizer`] per training phase, seeded from the phase's context.
#[derive(Debug, Clone, Default)]
pub struct GeneticOptimizerFactory {
    pub params: GeneticParams,
}

impl GeneticOptimizerFactory {
    #[must_use]
    pub fn new(params: GeneticParams) -> Self {
        Self { params }
    }
}

impl OptimizerFactory for GeneticOptimizerFactory {
    fn build(
        &mut self,
        context: &TrainingContext,
        param_count: usize,
        seed: Option<Genome>,
    ) -> Result<Box<dyn Optimizer>, OptimizerError> {
        let mut optimizer =
            GeneticOptimizer::new(self.params.clone(), param_count, context.stream_seed(1))?;
        if let Some(seed) = seed {
            optimizer = optimizer.with_seed_genome(seed)?;
        }
        Ok(Box::new(optimizer))
    }
}
