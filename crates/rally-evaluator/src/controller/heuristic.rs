use rally_engine::{Controller, GameState, Motion, Side};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Tuning of a [`HeuristicController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicParams {
    /// Smoothing factor in `[0, 1]`; higher values follow the ball faster.
    pub lag: f32,
    /// Half-width of the uniform aiming noise added to the ball height.
    pub error: f32,
}

impl HeuristicParams {
    /// Tracks the ball exactly.
    pub const PERFECT: Self = Self {
        lag: 1.0,
        error: 0.0,
    };
    /// Casual opponent of the interactive game.
    pub const CASUAL: Self = Self {
        lag: 0.22,
        error: 10.0,
    };
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self::CASUAL
    }
}

/// Ball-following AI with latency and aiming noise.
///
/// Each tick the controller blends a noisy reading of the ball height into an
/// exponentially smoothed target, then moves its paddle center toward the target unless it
/// is already within the dead zone.
///
/// The smoothed target starts at `0.0` (the top wall), so a fresh controller first drifts
/// upward before it catches up with the ball.
#[derive(Debug, Clone)]
pub struct HeuristicController {
    side: Side,
    params: HeuristicParams,
    dead_zone: f32,
    smoothed: f32,
    rng: Pcg32,
}

impl HeuristicController {
    #[must_use]
    pub fn new(side: Side, params: HeuristicParams, dead_zone: f32, seed: u64) -> Self {
        Self {
            side,
            params,
            dead_zone,
            smoothed: 0.0,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn params(&self) -> HeuristicParams {
        self.params
    }

    /// Current smoothed target height.
    #[must_use]
    pub fn target(&self) -> f32 {
        self.smoothed
    }
}

impl Controller for HeuristicController {
    fn decide(&mut self, state: &GameState) -> Motion {
        let error = self.params.error.abs();
        let noise = if error > 0.0 {
            self.rng.random_range(-error..=error)
        } else {
            0.0
        };
        let lag = self.params.lag;
        self.smoothed = (1.0 - lag) * self.smoothed + lag * (state.ball_y + noise);

        let paddle_y = state.paddle_y(self.side);
        if paddle_y < self.smoothed - self.dead_zone {
            Motion::Down
        } else if paddle_y > self.smoothed + self.dead_zone {
            Motion::Up
        } else {
            Motion::Stay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(ball_y: f32, paddle_y: f32) -> GameState {
        GameState {
            ball_x: 450.0,
            ball_y,
            ball_vx: 300.0,
            ball_vy: 0.0,
            left_paddle_y: paddle_y,
            right_paddle_y: paddle_y,
        }
    }

    #[test]
    fn test_perfect_tracking() {
        let mut ctrl = HeuristicController::new(Side::Right, HeuristicParams::PERFECT, 8.0, 0);
        assert_eq!(ctrl.decide(&state(400.0, 300.0)), Motion::Down);
        assert_eq!(ctrl.decide(&state(100.0, 300.0)), Motion::Up);
        assert_eq!(ctrl.decide(&state(305.0, 300.0)), Motion::Stay);
        assert_eq!(ctrl.decide(&state(292.0, 300.0)), Motion::Stay);
    }

    #[test]
    fn test_smoothing_starts_at_top() {
        let params = HeuristicParams {
            lag: 0.25,
            error: 0.0,
        };
        let mut ctrl = HeuristicController::new(Side::Left, params, 8.0, 0);
        // target = 0.75 * 0 + 0.25 * 300 = 75, far above the paddle
        assert_eq!(ctrl.decide(&state(300.0, 300.0)), Motion::Up);
        assert!((ctrl.target() - 75.0).abs() < 1e-4);
        // 0.75 * 75 + 0.25 * 300 = 131.25
        ctrl.decide(&state(300.0, 300.0));
        assert!((ctrl.target() - 131.25).abs() < 1e-3);
    }

    #[test]
    fn test_converges_to_ball() {
        let params = HeuristicParams {
            lag: 0.3,
            error: 0.0,
        };
        let mut ctrl = HeuristicController::new(Side::Right, params, 8.0, 0);
        let mut motion = Motion::Up;
        for _ in 0..100 {
            motion = ctrl.decide(&state(300.0, 300.0));
        }
        assert_eq!(motion, Motion::Stay);
    }

    #[test]
    fn test_reads_own_paddle() {
        let mut ctrl = HeuristicController::new(Side::Left, HeuristicParams::PERFECT, 8.0, 0);
        let s = GameState {
            left_paddle_y: 500.0,
            right_paddle_y: 100.0,
            ..state(300.0, 0.0)
        };
        assert_eq!(ctrl.decide(&s), Motion::Up);
    }

    #[test]
    fn test_noise_is_bounded_and_seeded() {
        let params = HeuristicParams {
            lag: 1.0,
            error: 10.0,
        };
        let mut a = HeuristicController::new(Side::Right, params, 8.0, 42);
        let mut b = HeuristicController::new(Side::Right, params, 8.0, 42);
        for _ in 0..200 {
            let ma = a.decide(&state(300.0, 300.0));
            let mb = b.decide(&state(300.0, 300.0));
            assert_eq!(ma, mb);
            assert!((a.target() - 300.0).abs() <= 10.0);
        }
    }
}
