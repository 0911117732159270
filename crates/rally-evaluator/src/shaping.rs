//! Per-tick reward shaping for fitness trials.

use rally_engine::{MatchSession, Side, TickResult};
use serde::{Deserialize, Serialize};

/// Reward constants accumulated by a fitness trial.
///
/// | Event                                                   | Reward                 |
/// |---------------------------------------------------------|------------------------|
/// | every tick                                              | `+survival`            |
/// | controlled paddle hits the ball                         | `+hit`                 |
/// | controlled side scores                                  | `+point_won`           |
/// | controlled side concedes                                | `-point_lost`          |
/// | ball heading toward the controlled side, past midfield  | `-tracking * dy`       |
///
/// `dy` is the vertical distance between the controlled paddle's center and the ball,
/// divided by half the playfield height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    pub survival: f32,
    pub hit: f32,
    pub point_won: f32,
    pub point_lost: f32,
    pub tracking: f32,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            survival: 0.01,
            hit: 2.5,
            point_won: 3.0,
            point_lost: 8.0,
            tracking: 0.003,
        }
    }
}

impl ShapingConfig {
    /// Reward earned by `controlled` for the tick that produced `tick`.
    ///
    /// `session` must be the match right after that tick; the tracking term reads the
    /// post-tick ball and paddle.
    #[must_use]
    pub fn tick_reward(&self, controlled: Side, tick: &TickResult, session: &MatchSession) -> f32 {
        let mut reward = self.survival;

        if tick.collision(controlled) {
            reward += self.hit;
        }

        match tick.scorer {
            Some(scorer) if scorer == controlled => reward += self.point_won,
            Some(_) => reward -= self.point_lost,
            None => {}
        }

        let ball = session.ball();
        let half_width = session.config().width / 2.0;
        let approaching = ball.direction().0 * controlled.toward() > 0.0;
        let past_midfield = match controlled {
            Side::Left => ball.x() < half_width,
            Side::Right => ball.x() > half_width,
        };
        if approaching && past_midfield {
            let paddle_y = session.paddle(controlled).center_y();
            let dy = (paddle_y - ball.y()).abs() / (session.config().height / 2.0);
            reward -= self.tracking * dy;
        }

        reward
    }
}

#[cfg(test)]
mod tests {
    use rally_engine::PhysicsConfig;

    use super::*;

    fn session() -> MatchSession {
        MatchSession::with_seed(&PhysicsConfig::default(), 3)
    }

    #[test]
    fn test_survival_only_on_serve() {
        // fresh serve: ball at midfield, not past it
        let shaping = ShapingConfig::default();
        let session = session();
        let reward = shaping.tick_reward(Side::Right, &TickResult::default(), &session);
        assert!((reward - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_hit_and_points() {
        let shaping = ShapingConfig::default();
        let session = session();
        let hit = TickResult {
            collision_left: true,
            ..TickResult::default()
        };
        assert!((shaping.tick_reward(Side::Left, &hit, &session) - 2.51).abs() < 1e-5);
        assert!((shaping.tick_reward(Side::Right, &hit, &session) - 0.01).abs() < 1e-6);

        let right_scores = TickResult {
            scorer: Some(Side::Right),
            ..TickResult::default()
        };
        assert!((shaping.tick_reward(Side::Right, &right_scores, &session) - 3.01).abs() < 1e-5);
        assert!((shaping.tick_reward(Side::Left, &right_scores, &session) + 7.99).abs() < 1e-5);
    }

    #[test]
    fn test_tracking_penalty() {
        let shaping = ShapingConfig::default();
        let mut session = session();
        let mut idle = |_: &rally_engine::GameState| rally_engine::Motion::Stay;
        let mut idle2 = |_: &rally_engine::GameState| rally_engine::Motion::Stay;
        // serve goes right; play until the ball crosses midfield
        let mut tick = TickResult::default();
        while session.ball().x() <= 450.0 {
            tick = session.tick(1.0 / 240.0, &mut idle, &mut idle2);
        }
        let ball_y = session.ball().y();
        let paddle_y = session.paddle(Side::Right).center_y();
        let expected = 0.01 - 0.003 * (paddle_y - ball_y).abs() / 300.0;
        let reward = shaping.tick_reward(Side::Right, &tick, &session);
        assert!((reward - expected).abs() < 1e-6);
        // the left side is not being approached
        assert!((shaping.tick_reward(Side::Left, &tick, &session) - 0.01).abs() < 1e-6);
    }
}
