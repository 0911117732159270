//! [`Controller`](rally_engine::Controller) implementations.
//!
//! - [`HeuristicController`] - Follows the ball through a lagged, noisy estimate. Used as
//!   the randomized training opponent.
//! - [`NetworkController`] - Feeds normalized features to a [`DecisionFunction`] and decodes
//!   its outputs according to a [`NetworkLayout`].
//! - [`HumanController`] - Maps key state from an [`InputSource`] to a motion.
//!
//! [`DecisionFunction`]: crate::DecisionFunction
//! [`NetworkLayout`]: crate::NetworkLayout

pub use self::{heuristic::*, human::*, network::*};

mod heuristic;
mod human;
mod network;
