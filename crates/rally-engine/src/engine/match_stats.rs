use serde::Serialize;

use crate::{Side, TickResult};

/// Points and paddle hits accumulated over a match.
///
/// # Example
///
/// ```
/// use rally_engine::{MatchStats, Side, TickResult};
///
/// let mut stats = MatchStats::new();
/// stats.record_tick(&TickResult {
///     collision_left: true,
///     collision_right: false,
///     scorer: Some(Side::Right),
/// });
///
/// assert_eq!(stats.points(Side::Right), 1);
/// assert_eq!(stats.hits(Side::Left), 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    left_points: usize,
    right_points: usize,
    left_hits: usize,
    right_hits: usize,
}

impl MatchStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left_points: 0,
            right_points: 0,
            left_hits: 0,
            right_hits: 0,
        }
    }

    #[must_use]
    pub const fn points(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_points,
            Side::Right => self.right_points,
        }
    }

    #[must_use]
    pub const fn hits(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left_hits,
            Side::Right => self.right_hits,
        }
    }

    pub fn record_tick(&mut self, tick: &TickResult) {
        if tick.collision_left {
            self.left_hits += 1;
        }
        if tick.collision_right {
            self.right_hits += 1;
        }
        match tick.scorer {
            Some(Side::Left) => self.left_points += 1,
            Some(Side::Right) => self.right_points += 1,
            None => {}
        }
    }
}
