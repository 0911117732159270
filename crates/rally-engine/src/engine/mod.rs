//! Match driver: advancing a match tick by tick.
//!
//! - [`MatchSession`] - Owns both paddles, the ball and the score of one match
//! - [`GameState`] - Read-only snapshot handed to controllers every tick
//! - [`TickResult`] - Collision and scoring events produced by one tick
//! - [`MatchStats`] - Points and paddle hits per side
//! - [`CancelToken`] - Cooperative cancellation checked once per tick
//!
//! # Tick Order
//!
//! Every call to [`MatchSession::tick`] performs, in this order:
//!
//! 1. Build a [`GameState`] snapshot and query the left, then the right controller
//! 2. Step both paddles
//! 3. Step the ball (top/bottom bounces happen here)
//! 4. Resolve the left paddle collision, then the right one
//! 5. Check whether a side conceded; if so, credit the point and serve toward the scorer
//!
//! Match termination is the caller's decision; the session never ends on its own.

pub use self::{cancel::*, match_session::*, match_stats::*, state::*};

mod cancel;
mod match_session;
mod match_stats;
mod state;
