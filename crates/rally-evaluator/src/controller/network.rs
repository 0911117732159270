use arrayvec::ArrayVec;
use rally_engine::{Controller, GameState, Motion, PhysicsConfig, Side};

use crate::decision_network::{
    DecisionFunction, FeatureSet, MAX_INPUTS, MAX_OUTPUTS, NetworkError, NetworkLayout,
};

/// Maps raw playfield quantities to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureNormalizer {
    width: f32,
    height: f32,
    max_velocity: f32,
}

impl FeatureNormalizer {
    /// Positions are scaled by the playfield size, velocities by the maximum ball speed.
    #[must_use]
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            max_velocity: config.max_speed,
        }
    }

    fn norm(value: f32, lo: f32, hi: f32) -> f32 {
        2.0 * (value - lo) / (hi - lo) - 1.0
    }

    /// Writes the features `set` describes, as seen from `side`, into `out`.
    pub fn features(
        &self,
        set: FeatureSet,
        side: Side,
        state: &GameState,
        out: &mut ArrayVec<f32, MAX_INPUTS>,
    ) {
        let bx = Self::norm(state.ball_x, 0.0, self.width);
        let by = Self::norm(state.ball_y, 0.0, self.height);
        let vx = Self::norm(state.ball_vx, -self.max_velocity, self.max_velocity);
        let vy = Self::norm(state.ball_vy, -self.max_velocity, self.max_velocity);
        let py = Self::norm(state.paddle_y(side), 0.0, self.height);
        out.clear();
        out.extend([bx, by, vx, vy, py]);

        if set == FeatureSet::Extended {
            let dist_x = match side {
                Side::Left => Self::norm(state.ball_x, 0.0, self.width),
                Side::Right => Self::norm(self.width - state.ball_x, 0.0, self.width),
            };
            let approaching = if state.ball_approaching(side) {
                1.0
            } else {
                -1.0
            };
            out.extend([by - py, dist_x, approaching]);
        }
    }
}

/// Controller driven by a [`DecisionFunction`].
///
/// The network is borrowed, so one network can drive controllers in several concurrent
/// matches.
#[derive(Debug, Clone)]
pub struct NetworkController<'a> {
    side: Side,
    network: &'a dyn DecisionFunction,
    layout: NetworkLayout,
    normalizer: FeatureNormalizer,
}

impl<'a> NetworkController<'a> {
    /// Fails when `network` does not have the input and output counts `layout` needs.
    pub fn new(
        side: Side,
        network: &'a dyn DecisionFunction,
        layout: NetworkLayout,
        config: &PhysicsConfig,
    ) -> Result<Self, NetworkError> {
        layout.check(network)?;
        Ok(Self {
            side,
            network,
            layout,
            normalizer: FeatureNormalizer::new(config),
        })
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn layout(&self) -> NetworkLayout {
        self.layout
    }

    /// Network inputs for `state`.
    #[must_use]
    pub fn features(&self, state: &GameState) -> ArrayVec<f32, MAX_INPUTS> {
        let mut out = ArrayVec::new();
        self.normalizer
            .features(self.layout.features, self.side, state, &mut out);
        out
    }
}

impl Controller for NetworkController<'_> {
    fn decide(&mut self, state: &GameState) -> Motion {
        let inputs = self.features(state);
        let mut outputs = ArrayVec::<f32, MAX_OUTPUTS>::new();
        outputs.extend(std::iter::repeat_n(0.0, self.layout.output_count()));
        self.network.activate(&inputs, &mut outputs);
        self.layout.encoding.decode(&outputs)
    }
}
