use rally_evaluator::{FeedForwardNetwork, NetworkError, NetworkShape};
use serde::{Deserialize, Serialize};

/// Identifier of a genome, unique within one optimizer run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("#{_0}")]
#[serde(transparent)]
pub struct GenomeId(pub u64);

/// Flat parameter vector of a [`FeedForwardNetwork`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: GenomeId,
    pub params: Vec<f32>,
}

impl Genome {
    #[must_use]
    pub fn new(id: GenomeId, params: Vec<f32>) -> Self {
        Self { id, params }
    }

    /// Realizes the genome as a network of the given shape.
    pub fn network(&self, shape: NetworkShape) -> Result<FeedForwardNetwork, NetworkError> {
        FeedForwardNetwork::new(shape, self.params.clone())
    }
}

/// Population member awaiting or holding a fitness score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    genome: Genome,
    fitness: Option<f32>,
}

impl Candidate {
    #[must_use]
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: None,
        }
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub fn id(&self) -> GenomeId {
        self.genome.id
    }

    #[must_use]
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = Some(fitness);
    }

    /// The genome with its score, if it has been scored.
    #[must_use]
    pub fn scored(&self) -> Option<ScoredGenome> {
        self.fitness.map(|fitness| ScoredGenome {
            genome: self.genome.clone(),
            fitness,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredGenome {
    pub genome: Genome,
    pub fitness: f32,
}
