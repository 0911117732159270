use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{CheckpointSlot, GenomeId};

/// One of the two co-evolving populations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum TrainingSide {
    #[display("A")]
    A,
    #[display("B")]
    B,
}

impl TrainingSide {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    #[must_use]
    pub const fn slot(self) -> CheckpointSlot {
        match self {
            Self::A => CheckpointSlot::SideA,
            Self::B => CheckpointSlot::SideB,
        }
    }
}

/// Where a training run currently is.
///
/// Passed explicitly down to the scheduler so that progress reporting and per-genome
/// seeding never depend on global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingContext {
    /// Co-evolution round, starting at 0. Always 0 for single-population training.
    pub round: usize,
    /// Population in training, if co-evolving.
    pub side: Option<TrainingSide>,
    pub generation: usize,
    pub base_seed: u64,
}

impl TrainingContext {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        Self {
            round: 0,
            side: None,
            generation: 0,
            base_seed,
        }
    }

    #[must_use]
    pub fn with_side(self, round: usize, side: TrainingSide) -> Self {
        Self {
            round,
            side: Some(side),
            ..self
        }
    }

    #[must_use]
    pub fn with_generation(self, generation: usize) -> Self {
        Self { generation, ..self }
    }

    /// Seed unique to this round, side and purpose, for anything that is not a single
    /// genome evaluation (such as an optimizer's own RNG).
    #[must_use]
    pub fn stream_seed(&self, stream: u64) -> u64 {
        let side = match self.side {
            None => 0,
            Some(TrainingSide::A) => 1,
            Some(TrainingSide::B) => 2,
        };
        mix(mix(mix(self.base_seed, self.round as u64), side), stream)
    }

    /// RNG for evaluating genome `id` in the current generation.
    #[must_use]
    pub fn genome_rng(&self, id: GenomeId) -> Pcg32 {
        let seed = mix(self.stream_seed(0), self.generation as u64);
        Pcg32::seed_from_u64(mix(seed, id.0))
    }
}

// splitmix64 finalizer over the combined words
fn mix(a: u64, b: u64) -> u64 {
    let mut z = a ^ b.wrapping_add(0x9e37_79b9_7f4a_7c15).wrapping_add(a << 6);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use rand::Rng as _;

    use super::*;

    #[test]
    fn test_genome_rng_is_stable() {
        let ctx = TrainingContext::new(42).with_generation(3);
        let a: u64 = ctx.genome_rng(GenomeId(5)).random();
        let b: u64 = ctx.genome_rng(GenomeId(5)).random();
        assert_eq!(a, b);
    }

    #[test]
    fn test_genome_rng_differs() {
        let ctx = TrainingContext::new(42);
        let base: u64 = ctx.genome_rng(GenomeId(5)).random();
        let other_id: u64 = ctx.genome_rng(GenomeId(6)).random();
        let other_gen: u64 = ctx.with_generation(1).genome_rng(GenomeId(5)).random();
        let other_side: u64 = ctx
            .with_side(0, TrainingSide::A)
            .genome_rng(GenomeId(5))
            .random();
        assert_ne!(base, other_id);
        assert_ne!(base, other_gen);
        assert_ne!(base, other_side);
    }

    #[test]
    fn test_sides() {
        assert_eq!(TrainingSide::A.other(), TrainingSide::B);
        assert_eq!(TrainingSide::B.slot(), CheckpointSlot::SideB);
        assert_eq!(TrainingSide::A.to_string(), "A");
    }
}
