use serde::{Deserialize, Serialize};

use super::Side;

/// Playfield geometry and ball/paddle dynamics.
///
/// All lengths are in playfield units (pixels of the reference 900×600 table),
/// speeds in units per second and angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Playfield width.
    pub width: f32,
    /// Playfield height.
    pub height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Distance between a goal line and the outer face of its paddle.
    pub paddle_margin: f32,
    /// Vertical paddle speed.
    pub paddle_speed: f32,
    pub ball_radius: f32,
    /// Ball speed right after a serve.
    pub serve_speed: f32,
    /// Speed gained on every paddle hit.
    pub speed_increment: f32,
    /// Upper bound of the ball speed.
    pub max_speed: f32,
    /// Exit angle (from the horizontal) when the ball hits a paddle edge.
    pub max_bounce_angle_deg: f32,
    /// Minimum absolute vertical component of a unit serve direction.
    pub min_serve_vertical: f32,
    /// Vertical component of the (unnormalized) serve direction; its sign is random.
    pub serve_vertical: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 600.0,
            paddle_width: 14.0,
            paddle_height: 100.0,
            paddle_margin: 36.0,
            paddle_speed: 420.0,
            ball_radius: 9.0,
            serve_speed: 420.0,
            speed_increment: 24.0,
            max_speed: 1000.0,
            max_bounce_angle_deg: 60.0,
            min_serve_vertical: 0.15,
            serve_vertical: 0.25,
        }
    }
}

impl PhysicsConfig {
    /// X coordinate of the left edge of `side`'s paddle.
    #[must_use]
    pub fn paddle_left(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.paddle_margin,
            Side::Right => self.width - self.paddle_margin - self.paddle_width,
        }
    }

    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}
