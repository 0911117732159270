use serde::Serialize;

use crate::{Ball, Paddle, Side};

/// Read-only snapshot of a match, handed to controllers and renderers.
///
/// All fields are plain copies; holding a `GameState` gives no access to the
/// simulation it was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GameState {
    pub ball_x: f32,
    pub ball_y: f32,
    pub ball_vx: f32,
    pub ball_vy: f32,
    /// Vertical center of the left paddle.
    pub left_paddle_y: f32,
    /// Vertical center of the right paddle.
    pub right_paddle_y: f32,
}

impl GameState {
    #[must_use]
    pub fn capture(ball: &Ball, left: &Paddle, right: &Paddle) -> Self {
        let (ball_vx, ball_vy) = ball.velocity();
        Self {
            ball_x: ball.x(),
            ball_y: ball.y(),
            ball_vx,
            ball_vy,
            left_paddle_y: left.center_y(),
            right_paddle_y: right.center_y(),
        }
    }

    /// Vertical center of `side`'s paddle.
    #[must_use]
    pub fn paddle_y(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.left_paddle_y,
            Side::Right => self.right_paddle_y,
        }
    }

    /// Whether the ball is travelling toward `side`'s goal.
    #[must_use]
    pub fn ball_approaching(&self, side: Side) -> bool {
        self.ball_vx * side.toward() > 0.0
    }
}

/// Events produced by a single tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickResult {
    pub collision_left: bool,
    pub collision_right: bool,
    /// Side credited with a point during this tick.
    pub scorer: Option<Side>,
}

impl TickResult {
    #[must_use]
    pub fn collision(&self, side: Side) -> bool {
        match side {
            Side::Left => self.collision_left,
            Side::Right => self.collision_right,
        }
    }

    /// Side that lost a point during this tick.
    #[must_use]
    pub fn conceded(&self) -> Option<Side> {
        self.scorer.map(Side::opponent)
    }
}
