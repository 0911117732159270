//! Deterministic two-paddle ball game used as a training environment.
//!
//! The crate is split in two layers:
//!
//! - [`core`] - Physics primitives: [`Paddle`], [`Ball`], playfield geometry
//!   ([`PhysicsConfig`]) and the [`Controller`] seam through which agents steer a paddle.
//! - [`engine`] - The match driver ([`MatchSession`]) that advances a match one tick at a
//!   time and reports collisions and points as a [`TickResult`].
//!
//! Time is never read from a clock here: every step takes an explicit `dt`, so the caller
//! decides whether the simulation follows wall-clock time or a fixed tick rate.
//!
//! # Example
//!
//! ```
//! use rally_engine::{GameState, MatchSession, Motion, PhysicsConfig, Side};
//!
//! let config = PhysicsConfig::default();
//! let mut session = MatchSession::with_seed(&config, 7);
//! session.serve(Side::Right);
//!
//! let mut idle = |_: &GameState| Motion::Stay;
//! let mut chase = |_: &GameState| Motion::Down;
//! for _ in 0..240 {
//!     let tick = session.tick(1.0 / 240.0, &mut idle, &mut chase);
//!     if let Some(scorer) = tick.scorer {
//!         println!("{scorer} scored");
//!     }
//! }
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Returned when a [`CancelToken`] was tripped while a match was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("evaluation cancelled")]
pub struct Cancelled;
