use super::{Paddle, PhysicsConfig, Side};

/// Dynamics copied out of [`PhysicsConfig`] when the ball is created.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BallLimits {
    field_width: f32,
    field_height: f32,
    serve_speed: f32,
    speed_increment: f32,
    max_speed: f32,
    max_bounce_angle: f32,
    min_serve_vertical: f32,
}

impl BallLimits {
    fn new(config: &PhysicsConfig) -> Self {
        Self {
            field_width: config.width,
            field_height: config.height,
            serve_speed: config.serve_speed,
            speed_increment: config.speed_increment,
            max_speed: config.max_speed,
            max_bounce_angle: config.max_bounce_angle_deg.to_radians(),
            min_serve_vertical: config.min_serve_vertical,
        }
    }
}

/// The ball: a circle moving along a unit direction vector at a scalar speed.
///
/// The direction is unit-length after every mutation. Speed only grows within a
/// rally (on paddle hits, up to the configured cap) and is reset by [`Ball::serve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    x: f32,
    y: f32,
    radius: f32,
    dir_x: f32,
    dir_y: f32,
    speed: f32,
    limits: BallLimits,
}

impl Ball {
    /// Creates a ball at the field center, served toward the right side.
    #[must_use]
    pub fn new(config: &PhysicsConfig) -> Self {
        let (x, y) = config.center();
        let mut ball = Self::with_motion(config, (x, y), (1.0, 0.0), config.serve_speed);
        ball.serve(Side::Right, config.serve_vertical);
        ball
    }

    /// Creates a ball with an explicit position, direction (normalized here) and speed.
    #[must_use]
    pub fn with_motion(
        config: &PhysicsConfig,
        (x, y): (f32, f32),
        direction: (f32, f32),
        speed: f32,
    ) -> Self {
        let (dir_x, dir_y) = normalize(direction);
        Self {
            x,
            y,
            radius: config.ball_radius,
            dir_x,
            dir_y,
            speed,
            limits: BallLimits::new(config),
        }
    }

    #[must_use]
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    #[must_use]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Unit direction vector.
    #[must_use]
    pub fn direction(&self) -> (f32, f32) {
        (self.dir_x, self.dir_y)
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Velocity vector (`direction * speed`).
    #[must_use]
    pub fn velocity(&self) -> (f32, f32) {
        (self.dir_x * self.speed, self.dir_y * self.speed)
    }

    #[must_use]
    pub fn left(&self) -> f32 {
        self.x - self.radius
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.radius
    }

    #[must_use]
    pub fn top(&self) -> f32 {
        self.y - self.radius
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.radius
    }

    /// Re-centres the ball and launches it toward `toward` at serve speed.
    ///
    /// `vertical` is the vertical component of the unnormalized direction
    /// `(±1, vertical)`. Serves flatter than the configured minimum vertical fraction
    /// are steepened so a rally cannot go on forever between two still paddles.
    pub fn serve(&mut self, toward: Side, vertical: f32) {
        self.x = self.limits.field_width / 2.0;
        self.y = self.limits.field_height / 2.0;
        self.speed = self.limits.serve_speed;
        let direction = normalize((toward.toward(), vertical));
        (self.dir_x, self.dir_y) = with_min_vertical(direction, self.limits.min_serve_vertical);
    }

    /// Advances the ball by `direction * speed * dt` and bounces it off the top and
    /// bottom walls.
    ///
    /// A bounce clamps the ball back inside the field and flips the sign of the
    /// vertical component; the magnitude is unchanged so no re-normalization happens.
    pub fn step(&mut self, dt: f32) {
        self.x += self.dir_x * self.speed * dt;
        self.y += self.dir_y * self.speed * dt;

        if self.top() <= 0.0 {
            self.y = self.radius;
            self.dir_y = self.dir_y.abs();
        } else if self.bottom() >= self.limits.field_height {
            self.y = self.limits.field_height - self.radius;
            self.dir_y = -self.dir_y.abs();
        }
    }

    /// Whether the ball's circle overlaps the paddle's rectangle.
    #[must_use]
    pub fn intersects(&self, paddle: &Paddle) -> bool {
        let nearest_x = self.x.clamp(paddle.left(), paddle.right());
        let nearest_y = self.y.clamp(paddle.top(), paddle.bottom());
        let dx = self.x - nearest_x;
        let dy = self.y - nearest_y;
        dx * dx + dy * dy < self.radius * self.radius
    }

    /// Reflects the ball off `side`'s paddle if they overlap.
    ///
    /// The exit angle is proportional to the contact offset (ball center relative to
    /// the paddle center, in half paddle heights, clamped to `[-1, 1]`), up to the
    /// configured maximum. The ball always leaves toward the opposite side, is pushed
    /// clear of the paddle face and speeds up by the configured increment.
    ///
    /// Returns `true` when a collision was resolved. The push-out guarantees that an
    /// immediate second call returns `false`.
    pub fn resolve_paddle_collision(&mut self, paddle: &Paddle, side: Side) -> bool {
        if !self.intersects(paddle) {
            return false;
        }

        let offset = ((self.y - paddle.center_y()) / (paddle.height() / 2.0)).clamp(-1.0, 1.0);
        let angle = offset * self.limits.max_bounce_angle;
        (self.dir_x, self.dir_y) = normalize((angle.cos().abs() * side.away(), angle.sin()));

        self.x = match side {
            Side::Left => paddle.right() + self.radius + 1.0,
            Side::Right => paddle.left() - self.radius - 1.0,
        };
        self.speed = f32::min(
            self.speed + self.limits.speed_increment,
            self.limits.max_speed,
        );
        true
    }

    /// Returns the side that conceded, if the ball has fully left the field.
    #[must_use]
    pub fn check_scoring(&self) -> Option<Side> {
        if self.right() < 0.0 {
            Some(Side::Left)
        } else if self.left() > self.limits.field_width {
            Some(Side::Right)
        } else {
            None
        }
    }
}

fn normalize((x, y): (f32, f32)) -> (f32, f32) {
    let magnitude = x.hypot(y);
    if magnitude <= f32::EPSILON {
        (1.0, 0.0)
    } else {
        (x / magnitude, y / magnitude)
    }
}

fn with_min_vertical((x, y): (f32, f32), min_vertical: f32) -> (f32, f32) {
    if y.abs() >= min_vertical {
        return (x, y);
    }
    let y = min_vertical.copysign(y);
    let x = (1.0 - y * y).max(0.0).sqrt().copysign(x);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn config() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    fn assert_unit((x, y): (f32, f32)) {
        assert!((x.hypot(y) - 1.0).abs() < 1e-6, "not unit: ({x}, {y})");
    }

    mod motion {
        use super::*;

        #[test]
        fn test_step_from_center() {
            let config = config();
            let mut ball = Ball::with_motion(&config, (450.0, 300.0), (1.0, 0.2), 420.0);
            ball.step(0.1);
            assert!((ball.x() - 491.18).abs() < 0.05, "x = {}", ball.x());
            assert!((ball.y() - 308.24).abs() < 0.05, "y = {}", ball.y());
            // no bounce: still heading down
            assert!(ball.direction().1 > 0.0);
        }

        #[test]
        fn test_bounce_off_top() {
            let config = config();
            let mut ball = Ball::with_motion(&config, (450.0, 12.0), (0.6, -0.8), 500.0);
            ball.step(0.1);
            assert!((ball.y() - config.ball_radius).abs() < EPS);
            assert!(ball.direction().1 > 0.0);
            assert_unit(ball.direction());
        }

        #[test]
        fn test_bounce_off_bottom() {
            let config = config();
            let mut ball = Ball::with_motion(&config, (450.0, 590.0), (0.6, 0.8), 500.0);
            ball.step(0.1);
            assert!((ball.y() - (config.height - config.ball_radius)).abs() < EPS);
            assert!(ball.direction().1 < 0.0);
        }

        #[test]
        fn test_vertical_position_stays_in_field() {
            let config = config();
            let mut ball = Ball::with_motion(&config, (450.0, 300.0), (0.3, 0.95), 1000.0);
            for i in 0..2000 {
                let dt = if i % 7 == 0 { 0.25 } else { 1.0 / 240.0 };
                ball.step(dt);
                assert!(ball.top() >= -EPS, "top {}", ball.top());
                assert!(ball.bottom() <= config.height + EPS, "bottom {}", ball.bottom());
            }
        }

        #[test]
        fn test_zero_direction_defaults_to_horizontal() {
            let ball = Ball::with_motion(&config(), (0.0, 0.0), (0.0, 0.0), 1.0);
            assert_eq!(ball.direction(), (1.0, 0.0));
        }
    }

    mod serve {
        use super::*;

        #[test]
        fn test_serve_resets_ball() {
            let config = config();
            let mut ball = Ball::with_motion(&config, (10.0, 20.0), (-1.0, 0.0), 900.0);
            ball.serve(Side::Left, 0.25);
            assert_eq!(ball.position(), (450.0, 300.0));
            assert!((ball.speed() - config.serve_speed).abs() < f32::EPSILON);
            assert!(ball.direction().0 < 0.0);
            assert_unit(ball.direction());
        }

        #[test]
        fn test_flat_serve_is_steepened() {
            let config = config();
            let mut ball = Ball::new(&config);
            for vertical in [0.0, 0.01, -0.05, 0.1] {
                ball.serve(Side::Right, vertical);
                let (dx, dy) = ball.direction();
                assert!(dx > 0.0);
                assert!(dy.abs() >= config.min_serve_vertical - 1e-6, "dy = {dy}");
                assert_unit((dx, dy));
            }
        }

        #[test]
        fn test_default_serve_keeps_vertical() {
            let config = config();
            let mut ball = Ball::new(&config);
            ball.serve(Side::Right, -0.25);
            let (_, dy) = ball.direction();
            assert!((dy + 0.25 / 1.0625_f32.sqrt()).abs() < 1e-5);
        }
    }

    mod collision {
        use super::*;

        fn paddle_at(config: &PhysicsConfig, side: Side, center_y: f32) -> Paddle {
            let mut paddle = Paddle::new(config, side);
            paddle.set_center_y(center_y);
            paddle
        }

        #[test]
        fn test_center_hit_exits_horizontally() {
            let config = config();
            let paddle = paddle_at(&config, Side::Left, 300.0);
            let mut ball =
                Ball::with_motion(&config, (paddle.right() + 2.0, 300.0), (-1.0, 0.3), 420.0);
            assert!(ball.resolve_paddle_collision(&paddle, Side::Left));
            let (dx, dy) = ball.direction();
            assert!((dx - 1.0).abs() < 1e-6);
            assert!(dy.abs() < 1e-6);

            let paddle = paddle_at(&config, Side::Right, 300.0);
            let mut ball =
                Ball::with_motion(&config, (paddle.left() - 2.0, 300.0), (1.0, -0.3), 420.0);
            assert!(ball.resolve_paddle_collision(&paddle, Side::Right));
            let (dx, dy) = ball.direction();
            assert!((dx + 1.0).abs() < 1e-6);
            assert!(dy.abs() < 1e-6);
        }

        #[test]
        fn test_edge_hit_uses_max_angle() {
            let config = config();
            let paddle = paddle_at(&config, Side::Left, 300.0);
            let mut ball =
                Ball::with_motion(&config, (paddle.right() - 1.0, 356.0), (-1.0, 0.0), 420.0);
            assert!(ball.resolve_paddle_collision(&paddle, Side::Left));
            let (dx, dy) = ball.direction();
            let max = config.max_bounce_angle_deg.to_radians();
            assert!((dx - max.cos()).abs() < 1e-5);
            assert!((dy - max.sin()).abs() < 1e-5);
        }

        #[test]
        fn test_outgoing_direction_is_unit_and_away() {
            let config = config();
            for side in Side::ALL {
                let paddle = paddle_at(&config, side, 250.0);
                let face = match side {
                    Side::Left => paddle.right() + 3.0,
                    Side::Right => paddle.left() - 3.0,
                };
                for i in 0..=40_u8 {
                    let y = 180.0 + f32::from(i) * 3.5;
                    for incoming in [(-1.0, 0.4), (1.0, -0.7), (0.2, 1.0)] {
                        let mut ball = Ball::with_motion(&config, (face, y), incoming, 600.0);
                        if ball.resolve_paddle_collision(&paddle, side) {
                            let (dx, dy) = ball.direction();
                            assert_unit((dx, dy));
                            assert!(dx * side.away() > 0.0, "{side}: dx = {dx}");
                        }
                    }
                }
            }
        }

        #[test]
        fn test_resolution_is_idempotent() {
            let config = config();
            let paddle = paddle_at(&config, Side::Right, 300.0);
            let mut ball =
                Ball::with_motion(&config, (paddle.left(), 320.0), (1.0, 0.1), 500.0);
            assert!(ball.resolve_paddle_collision(&paddle, Side::Right));
            let speed = ball.speed();
            assert!((speed - 524.0).abs() < EPS);
            assert!(!ball.resolve_paddle_collision(&paddle, Side::Right));
            assert!((ball.speed() - speed).abs() < f32::EPSILON);
            assert!(ball.right() < paddle.left());
        }

        #[test]
        fn test_speed_is_capped() {
            let config = config();
            let paddle = paddle_at(&config, Side::Left, 300.0);
            let mut ball = Ball::with_motion(
                &config,
                (paddle.right(), 300.0),
                (-1.0, 0.0),
                config.max_speed - 1.0,
            );
            assert!(ball.resolve_paddle_collision(&paddle, Side::Left));
            assert!((ball.speed() - config.max_speed).abs() < f32::EPSILON);
        }

        #[test]
        fn test_miss_returns_false() {
            let config = config();
            let paddle = paddle_at(&config, Side::Left, 100.0);
            let mut ball =
                Ball::with_motion(&config, (paddle.right() + 2.0, 400.0), (-1.0, 0.0), 420.0);
            let before = ball.clone();
            assert!(!ball.resolve_paddle_collision(&paddle, Side::Left));
            assert_eq!(ball, before);
        }
    }

    mod scoring {
        use super::*;

        #[test]
        fn test_left_exit_concedes_left() {
            let config = config();
            let ball = Ball::with_motion(&config, (-10.0, 300.0), (-1.0, 0.0), 420.0);
            assert_eq!(ball.check_scoring(), Some(Side::Left));
        }

        #[test]
        fn test_right_exit_concedes_right() {
            let config = config();
            let ball = Ball::with_motion(&config, (910.0, 300.0), (1.0, 0.0), 420.0);
            assert_eq!(ball.check_scoring(), Some(Side::Right));
        }

        #[test]
        fn test_partially_out_is_not_a_point() {
            let config = config();
            let ball = Ball::with_motion(&config, (-8.0, 300.0), (-1.0, 0.0), 420.0);
            assert_eq!(ball.check_scoring(), None);
            let ball = Ball::with_motion(&config, (905.0, 300.0), (1.0, 0.0), 420.0);
            assert_eq!(ball.check_scoring(), None);
        }
    }
}
