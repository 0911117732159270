use serde::{Deserialize, Serialize};

/// One of the two goals of the playfield.
///
/// A side owns the paddle defending its goal. The left goal is at `x = 0`,
/// the right goal at `x = width`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[display("left")]
    Left,
    #[display("right")]
    Right,
}

impl Side {
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Horizontal direction (`-1.0` or `+1.0`) pointing toward this side's goal.
    #[must_use]
    pub const fn toward(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Horizontal direction pointing away from this side's goal, into the field.
    #[must_use]
    pub const fn away(self) -> f32 {
        -self.toward()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involution() {
        for side in Side::ALL {
            assert_ne!(side.opponent(), side);
            assert_eq!(side.opponent().opponent(), side);
        }
    }

    #[test]
    fn test_directions() {
        assert!(Side::Left.toward() < 0.0);
        assert!(Side::Right.toward() > 0.0);
        assert!((Side::Left.away() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Side::Left).unwrap(), "\"left\"");
        let side: Side = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(side, Side::Right);
    }
}
