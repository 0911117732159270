//! Decision networks: the scoring function an evolved genome realizes.
//!
//! A genome is a flat parameter vector. Together with a [`NetworkShape`] it becomes a
//! [`FeedForwardNetwork`], which the rest of the system only sees through the
//! [`DecisionFunction`] trait.
//!
//! # Layouts
//!
//! Two incompatible network variants exist and both are supported as explicit
//! [`NetworkLayout`]s:
//!
//! | Layout               | Inputs | Outputs | Decision                                   |
//! |----------------------|--------|---------|--------------------------------------------|
//! | [`NetworkLayout::LEGACY`]  | 5 | 1 | single output thresholded at ±0.33            |
//! | [`NetworkLayout::CURRENT`] | 8 | 3 | argmax over (up, stay, down)                  |
//!
//! The layout is chosen per controller and stored with every checkpoint; it is never
//! inferred from the network at call time. Fitness values obtained with different
//! layouts are not comparable: the threshold encoding has a built-in dead band, while
//! the argmax encoding must learn one.
//!
//! # Network
//!
//! [`FeedForwardNetwork`] is fully connected with one optional hidden layer. Every
//! neuron uses `tanh`. Parameters are laid out neuron by neuron, each neuron's
//! incoming weights followed by its bias:
//!
//! ```text
//! [h0: w_0..w_{n_in-1}, b] [h1: ...] ... [o0: w_0..w_{n_hidden-1}, b] ...
//! ```

use std::fmt;

use arrayvec::ArrayVec;
use rally_engine::Motion;
use serde::{Deserialize, Serialize};

/// Largest supported input count (the extended feature set).
pub const MAX_INPUTS: usize = 8;
/// Largest supported output count (the argmax encoding).
pub const MAX_OUTPUTS: usize = 3;
/// Largest supported hidden layer width.
pub const MAX_HIDDEN: usize = 64;

/// Output magnitude beyond which a single-output network moves its paddle.
pub const THRESHOLD: f32 = 0.33;

/// Opaque decision function realized from a genome.
///
/// Implementations must be pure: the same inputs always produce the same outputs,
/// and activation never mutates shared state. This lets one network be shared by
/// reference between concurrent evaluations.
pub trait DecisionFunction: fmt::Debug + Send + Sync {
    fn input_count(&self) -> usize;
    fn output_count(&self) -> usize;

    /// Computes outputs for `inputs`.
    ///
    /// `inputs.len()` must equal [`Self::input_count`] and `outputs.len()` must equal
    /// [`Self::output_count`].
    fn activate(&self, inputs: &[f32], outputs: &mut [f32]);
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NetworkError {
    #[display("expected {expected} network parameters, got {actual}")]
    ParamCount { expected: usize, actual: usize },
    #[display("hidden layer width {hidden} exceeds the maximum of {max}")]
    HiddenTooWide { hidden: usize, max: usize },
    #[display("non-finite network parameter at index {index}")]
    NonFinite { index: usize },
    #[display(
        "network has {inputs} inputs and {outputs} outputs, layout needs {expected_inputs} and {expected_outputs}"
    )]
    LayoutMismatch {
        inputs: usize,
        outputs: usize,
        expected_inputs: usize,
        expected_outputs: usize,
    },
}

/// Which normalized features a network reads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Ball position, ball velocity, own paddle position.
    Basic,
    /// [`FeatureSet::Basic`] plus vertical distance to the ball, horizontal distance to
    /// the own paddle plane and whether the ball is approaching.
    Extended,
}

impl FeatureSet {
    #[must_use]
    pub const fn input_count(self) -> usize {
        match self {
            Self::Basic => 5,
            Self::Extended => 8,
        }
    }
}

/// How network outputs become a [`Motion`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum DecisionEncoding {
    /// Three outputs scored as (up, stay, down); the highest wins, the first on ties.
    Argmax3,
    /// One output: above [`THRESHOLD`] moves down, below `-THRESHOLD` moves up.
    Threshold1,
}

impl DecisionEncoding {
    #[must_use]
    pub const fn output_count(self) -> usize {
        match self {
            Self::Argmax3 => 3,
            Self::Threshold1 => 1,
        }
    }

    #[must_use]
    pub fn decode(self, outputs: &[f32]) -> Motion {
        match self {
            Self::Argmax3 => {
                let mut best = 0;
                for (i, value) in outputs.iter().enumerate().skip(1) {
                    if *value > outputs[best] {
                        best = i;
                    }
                }
                match best {
                    0 => Motion::Up,
                    2 => Motion::Down,
                    _ => Motion::Stay,
                }
            }
            Self::Threshold1 => {
                let out = outputs.first().copied().unwrap_or(0.0);
                if out > THRESHOLD {
                    Motion::Down
                } else if out < -THRESHOLD {
                    Motion::Up
                } else {
                    Motion::Stay
                }
            }
        }
    }
}

/// Feature set and decision encoding of a network-driven controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkLayout {
    pub features: FeatureSet,
    pub encoding: DecisionEncoding,
}

impl Default for NetworkLayout {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl NetworkLayout {
    /// Five inputs, one thresholded output.
    pub const LEGACY: Self = Self {
        features: FeatureSet::Basic,
        encoding: DecisionEncoding::Threshold1,
    };
    /// Eight inputs, three outputs decided by argmax.
    pub const CURRENT: Self = Self {
        features: FeatureSet::Extended,
        encoding: DecisionEncoding::Argmax3,
    };

    #[must_use]
    pub const fn input_count(self) -> usize {
        self.features.input_count()
    }

    #[must_use]
    pub const fn output_count(self) -> usize {
        self.encoding.output_count()
    }

    #[must_use]
    pub const fn shape(self, hidden: usize) -> NetworkShape {
        NetworkShape {
            inputs: self.input_count(),
            hidden,
            outputs: self.output_count(),
        }
    }

    /// Checks that `network` reads and writes as many values as this layout needs.
    pub fn check<N>(self, network: &N) -> Result<(), NetworkError>
    where
        N: DecisionFunction + ?Sized,
    {
        if network.input_count() == self.input_count()
            && network.output_count() == self.output_count()
        {
            Ok(())
        } else {
            Err(NetworkError::LayoutMismatch {
                inputs: network.input_count(),
                outputs: network.output_count(),
                expected_inputs: self.input_count(),
                expected_outputs: self.output_count(),
            })
        }
    }
}

/// Network layout plus hidden layer width: everything needed to size a genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub layout: NetworkLayout,
    /// Hidden layer width; `0` connects inputs directly to outputs.
    pub hidden: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            layout: NetworkLayout::CURRENT,
            hidden: 8,
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub const fn shape(&self) -> NetworkShape {
        self.layout.shape(self.hidden)
    }
}

/// Layer sizes of a [`FeedForwardNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkShape {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
}

impl NetworkShape {
    /// Number of parameters (weights and biases) a genome of this shape carries.
    #[must_use]
    pub const fn param_count(&self) -> usize {
        if self.hidden == 0 {
            (self.inputs + 1) * self.outputs
        } else {
            (self.inputs + 1) * self.hidden + (self.hidden + 1) * self.outputs
        }
    }
}

/// Fully connected `tanh` network with at most one hidden layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardNetwork {
    shape: NetworkShape,
    params: Vec<f32>,
}

impl FeedForwardNetwork {
    /// Builds a network from a flat parameter vector.
    pub fn new(shape: NetworkShape, params: Vec<f32>) -> Result<Self, NetworkError> {
        if shape.hidden > MAX_HIDDEN {
            return Err(NetworkError::HiddenTooWide {
                hidden: shape.hidden,
                max: MAX_HIDDEN,
            });
        }
        if params.len() != shape.param_count() {
            return Err(NetworkError::ParamCount {
                expected: shape.param_count(),
                actual: params.len(),
            });
        }
        if let Some(index) = params.iter().position(|p| !p.is_finite()) {
            return Err(NetworkError::NonFinite { index });
        }
        Ok(Self { shape, params })
    }

    #[must_use]
    pub fn shape(&self) -> NetworkShape {
        self.shape
    }

    #[must_use]
    pub fn params(&self) -> &[f32] {
        &self.params
    }
}

fn dense_tanh(inputs: &[f32], params: &[f32], outputs: &mut [f32]) {
    for (out, neuron) in outputs.iter_mut().zip(params.chunks_exact(inputs.len() + 1)) {
        let (weights, bias) = neuron.split_at(inputs.len());
        let sum = bias[0]
            + weights
                .iter()
                .zip(inputs)
                .map(|(w, x)| w * x)
                .sum::<f32>();
        *out = sum.tanh();
    }
}

impl DecisionFunction for FeedForwardNetwork {
    fn input_count(&self) -> usize {
        self.shape.inputs
    }

    fn output_count(&self) -> usize {
        self.shape.outputs
    }

    fn activate(&self, inputs: &[f32], outputs: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.shape.inputs);
        debug_assert_eq!(outputs.len(), self.shape.outputs);

        if self.shape.hidden == 0 {
            dense_tanh(inputs, &self.params, outputs);
            return;
        }

        let split = (self.shape.inputs + 1) * self.shape.hidden;
        let (hidden_params, output_params) = self.params.split_at(split);
        let mut hidden = ArrayVec::<f32, MAX_HIDDEN>::new();
        hidden.extend(std::iter::repeat_n(0.0, self.shape.hidden));
        dense_tanh(inputs, hidden_params, &mut hidden);
        dense_tanh(&hidden, output_params, outputs);
    }
}
