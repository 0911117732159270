use crate::engine::GameState;

use super::Motion;

/// Steers one paddle from read-only snapshots of the match.
///
/// Implementations may keep private state (smoothing, noise generators) but only ever
/// see a copied [`GameState`], so they cannot reach into the simulation.
pub trait Controller: Send {
    fn decide(&mut self, state: &GameState) -> Motion;
}

impl<F> Controller for F
where
    F: FnMut(&GameState) -> Motion + Send,
{
    fn decide(&mut self, state: &GameState) -> Motion {
        self(state)
    }
}

