use rally_engine::{Controller, GameState, Motion};

/// Raw key state for one player.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
}

impl InputState {
    /// Pressing both keys cancels out.
    #[must_use]
    pub fn motion(self) -> Motion {
        Motion::from_direction(i8::from(self.down) - i8::from(self.up))
    }
}

/// Supplies the current key state, typically from a windowing or terminal backend.
///
/// The conventional bindings are W/S for the left paddle and Up/Down for the right one.
pub trait InputSource: Send {
    fn poll(&mut self) -> InputState;
}

impl<F> InputSource for F
where
    F: FnMut() -> InputState + Send,
{
    fn poll(&mut self) -> InputState {
        self()
    }
}

/// Player-driven controller.
#[derive(Debug, Clone)]
pub struct HumanController<I> {
    source: I,
}

impl<I> HumanController<I>
where
    I: InputSource,
{
    pub fn new(source: I) -> Self {
        Self { source }
    }

    pub fn into_inner(self) -> I {
        self.source
    }
}

impl<I> Controller for HumanController<I>
where
    I: InputSource,
{
    fn decide(&mut self, _state: &GameState) -> Motion {
        self.source.poll().motion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        let cases = [
            (false, false, Motion::Stay),
            (true, false, Motion::Up),
            (false, true, Motion::Down),
            (true, true, Motion::Stay),
        ];
        for (up, down, expected) in cases {
            assert_eq!(InputState { up, down }.motion(), expected);
        }
    }

    #[test]
    fn test_polls_source_each_tick() {
        let mut presses = vec![
            InputState {
                up: false,
                down: true,
            },
            InputState {
                up: true,
                down: false,
            },
        ]
        .into_iter();
        let mut human = HumanController::new(move || presses.next().unwrap_or_default());
        let state = GameState {
            ball_x: 0.0,
            ball_y: 0.0,
            ball_vx: 0.0,
            ball_vy: 0.0,
            left_paddle_y: 300.0,
            right_paddle_y: 300.0,
        };
        assert_eq!(human.decide(&state), Motion::Down);
        assert_eq!(human.decide(&state), Motion::Up);
        assert_eq!(human.decide(&state), Motion::Stay);
    }
}
