//! Agents and fitness evaluation for the paddle game.
//!
//! This crate sits between the physics engine (`rally-engine`) and the training system
//! (`rally-training`):
//!
//! 1. **Decision networks** ([`decision_network`]) - The opaque scoring function realized
//!    from an evolved genome, plus the [`NetworkLayout`] that says which features it reads
//!    and how its outputs are turned into a [`Motion`](rally_engine::Motion).
//!
//! 2. **Controllers** ([`controller`]) - Heuristic, human and network-driven implementations
//!    of [`rally_engine::Controller`].
//!
//! 3. **Fitness evaluation** ([`fitness_evaluator`]) - Plays four short trials per genome
//!    against an opponent and accumulates a shaped reward ([`shaping`]).
//!
//! # Architecture
//!
//! ```text
//! FitnessEvaluator (mean of 4 trials)
//!     ↓ drives
//! MatchSession (rally-engine)
//!     ↓ queries
//! NetworkController ← DecisionFunction (genome)
//! HeuristicController / frozen NetworkController (opponent)
//! ```
//!
//! # Determinism
//!
//! Every random draw made during an evaluation (opponent parameters, serve jitter,
//! heuristic aiming noise) comes from the RNG passed to
//! [`FitnessEvaluator::evaluate`]. With a seeded RNG and a
//! [`TrialBudget::Simulated`] budget, an evaluation is exactly reproducible.

pub use self::{
    controller::{
        FeatureNormalizer, HeuristicController, HeuristicParams, HumanController, InputSource,
        InputState, NetworkController,
    },
    decision_network::{
        DecisionEncoding, DecisionFunction, FeatureSet, FeedForwardNetwork, NetworkConfig,
        NetworkError, NetworkLayout, NetworkShape,
    },
    fitness_evaluator::{
        EvaluationError, FitnessConfig, FitnessEvaluator, FitnessReport, Opponent, ParamRange,
        TrialBudget, TrialObserver, TrialReport, TrialSetup,
    },
    shaping::ShapingConfig,
};

pub mod controller;
pub mod decision_network;
pub mod fitness_evaluator;
pub mod shaping;
