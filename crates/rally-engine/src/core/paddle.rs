use serde::{Deserialize, Serialize};

use super::{PhysicsConfig, Side};

/// Motion decision for one tick.
///
/// The vertical axis grows downwards, so [`Motion::Up`] moves toward `y = 0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    Up,
    #[default]
    Stay,
    Down,
}

impl Motion {
    /// Signed direction along the vertical axis: `-1`, `0` or `+1`.
    #[must_use]
    pub const fn direction(self) -> i8 {
        match self {
            Self::Up => -1,
            Self::Stay => 0,
            Self::Down => 1,
        }
    }

    /// Maps the sign of `direction` to a motion.
    #[must_use]
    pub const fn from_direction(direction: i8) -> Self {
        match direction {
            i8::MIN..0 => Self::Up,
            0 => Self::Stay,
            1..=i8::MAX => Self::Down,
        }
    }
}

/// A vertically moving paddle, clamped to the playfield.
#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    left: f32,
    center_y: f32,
    width: f32,
    height: f32,
    speed: f32,
    field_height: f32,
}

impl Paddle {
    /// Creates `side`'s paddle, vertically centered.
    #[must_use]
    pub fn new(config: &PhysicsConfig, side: Side) -> Self {
        Self {
            left: config.paddle_left(side),
            center_y: config.height / 2.0,
            width: config.paddle_width,
            height: config.paddle_height,
            speed: config.paddle_speed,
            field_height: config.height,
        }
    }

    #[must_use]
    pub fn center_y(&self) -> f32 {
        self.center_y
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[must_use]
    pub fn left(&self) -> f32 {
        self.left
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn top(&self) -> f32 {
        self.center_y - self.height / 2.0
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.center_y + self.height / 2.0
    }

    /// Moves the paddle center to `y`, clamped so the paddle stays inside the field.
    pub fn set_center_y(&mut self, y: f32) {
        let half = self.height / 2.0;
        self.center_y = y.clamp(half, (self.field_height - half).max(half));
    }

    /// Moves the paddle by `motion * speed * dt`, then clamps it inside the field.
    pub fn step(&mut self, motion: Motion, dt: f32) {
        let delta = f32::from(motion.direction()) * self.speed * dt;
        self.set_center_y(self.center_y + delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paddle() -> (PhysicsConfig, Paddle) {
        let config = PhysicsConfig::default();
        let paddle = Paddle::new(&config, Side::Left);
        (config, paddle)
    }

    #[test]
    fn test_motion_direction_roundtrip() {
        for motion in [Motion::Up, Motion::Stay, Motion::Down] {
            assert_eq!(Motion::from_direction(motion.direction()), motion);
        }
        assert_eq!(Motion::from_direction(-5), Motion::Up);
        assert_eq!(Motion::from_direction(9), Motion::Down);
    }

    #[test]
    fn test_new_paddle_is_centered() {
        let (config, paddle) = paddle();
        assert!((paddle.center_y() - 300.0).abs() < f32::EPSILON);
        assert!((paddle.left() - config.paddle_margin).abs() < f32::EPSILON);

        let right = Paddle::new(&config, Side::Right);
        assert!((right.right() - (config.width - config.paddle_margin)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_step_moves_by_speed_times_dt() {
        let (_, mut paddle) = paddle();
        paddle.step(Motion::Down, 0.1);
        assert!((paddle.center_y() - 342.0).abs() < 1e-4);
        paddle.step(Motion::Up, 0.05);
        assert!((paddle.center_y() - 321.0).abs() < 1e-4);
        paddle.step(Motion::Stay, 10.0);
        assert!((paddle.center_y() - 321.0).abs() < 1e-4);
    }

    #[test]
    fn test_step_stays_within_field() {
        let (config, mut paddle) = paddle();
        let max_top = config.height - config.paddle_height;
        let dts = [0.0, 0.001, 1.0 / 240.0, 1.0 / 60.0, 0.1, 0.5, 3.0, 100.0];
        for &dt in &dts {
            for motion in [Motion::Up, Motion::Down, Motion::Down, Motion::Stay] {
                paddle.step(motion, dt);
                assert!(paddle.top() >= 0.0, "top {} for dt {dt}", paddle.top());
                assert!(paddle.top() <= max_top, "top {} for dt {dt}", paddle.top());
            }
        }
    }

    #[test]
    fn test_clamped_at_both_walls() {
        let (config, mut paddle) = paddle();
        paddle.step(Motion::Up, 10.0);
        assert!(paddle.top().abs() < f32::EPSILON);
        paddle.step(Motion::Down, 10.0);
        assert!((paddle.bottom() - config.height).abs() < f32::EPSILON);
    }
}
