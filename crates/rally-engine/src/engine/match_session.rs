use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{
    Cancelled,
    core::{Ball, Controller, Paddle, PhysicsConfig, Side},
};

use super::{CancelToken, GameState, MatchStats, TickResult};

/// One match between two paddles.
///
/// The session is private to whoever drives it: nothing in it is shared, so
/// independent sessions can run on separate threads without locking.
#[derive(Debug, Clone)]
pub struct MatchSession {
    config: PhysicsConfig,
    left: Paddle,
    right: Paddle,
    ball: Ball,
    stats: MatchStats,
    rng: Pcg32,
    ticks: u64,
}

impl MatchSession {
    /// Creates a match whose serve jitter comes from the thread RNG.
    #[must_use]
    pub fn new(config: &PhysicsConfig) -> Self {
        Self::with_seed(config, rand::rng().random())
    }

    /// Like [`Self::new`], but with a seed for reproducible serves.
    #[must_use]
    pub fn with_seed(config: &PhysicsConfig, seed: u64) -> Self {
        let mut session = Self {
            config: config.clone(),
            left: Paddle::new(config, Side::Left),
            right: Paddle::new(config, Side::Right),
            ball: Ball::new(config),
            stats: MatchStats::new(),
            rng: Pcg32::seed_from_u64(seed),
            ticks: 0,
        };
        session.serve(Side::Right);
        session
    }

    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    #[must_use]
    pub fn paddle(&self, side: Side) -> &Paddle {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    #[must_use]
    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    #[must_use]
    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }

    /// Number of ticks played so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn state(&self) -> GameState {
        GameState::capture(&self.ball, &self.left, &self.right)
    }

    /// Re-centres the ball and serves it toward `toward`, with a random vertical sign.
    pub fn serve(&mut self, toward: Side) {
        let vertical = if self.rng.random_bool(0.5) {
            self.config.serve_vertical
        } else {
            -self.config.serve_vertical
        };
        self.ball.serve(toward, vertical);
    }


    /// Advances the match by `dt` seconds.
    ///
    /// When a side concedes, the point is credited to the other side and the
    /// ball is served toward the scorer.
    pub fn tick<L, R>(&mut self, dt: f32, left: &mut L, right: &mut R) -> TickResult
    where
        L: Controller + ?Sized,
        R: Controller + ?Sized,
    {
        let state = self.state();
        let left_motion = left.decide(&state);
        let right_motion = right.decide(&state);
        self.left.step(left_motion, dt);
        self.right.step(right_motion, dt);

        self.ball.step(dt);
        let collision_left = self.ball.resolve_paddle_collision(&self.left, Side::Left);
        let collision_right = self.ball.resolve_paddle_collision(&self.right, Side::Right);

        let scorer = self.ball.check_scoring().map(Side::opponent);
        if let Some(scorer) = scorer {
            self.serve(scorer);
        }

        let tick = TickResult {
            collision_left,
            collision_right,
            scorer,
        };
        self.stats.record_tick(&tick);
        self.ticks += 1;
        tick
    }

    /// Like [`Self::tick`], but first checks `cancel` and refuses to advance once it
    /// has been tripped.
    pub fn tick_checked<L, R>(
        &mut self,
        dt: f32,
        cancel: &CancelToken,
        left: &mut L,
        right: &mut R,
    ) -> Result<TickResult, Cancelled>
    where
        L: Controller + ?Sized,
        R: Controller + ?Sized,
    {
        cancel.check()?;
        Ok(self.tick(dt, left, right))
    }
}
