// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

pub mod linear;
pub mod neural_net;

use std::{fmt, path::Path, str::FromStr};

pub use linear::{LinearGradient, LinearModel};
pub use neural_net::{NeuralNetworkGradient, NeuralNetworkModel};

use crate::{ranking::LearningRate, ConfigError, Result};

/// A scoring function whose parameters can be trained by gradient descent.
///
/// The parameters are only ever changed through [`DifferentiableModel::apply_gradient`],
/// so a model can be shared immutably between the workers computing a pass.
pub trait DifferentiableModel: Send + Sync + Sized {
    type Gradient: GradientAccumulator<Model = Self>;

    fn dimensions(&self) -> usize;

    /// Forward pass. `features.len()` must equal [`DifferentiableModel::dimensions`].
    fn score(&self, features: &[f64]) -> f64;

    /// A zeroed accumulator shaped like the parameters of the model.
    fn new_gradient(&self) -> Self::Gradient;

    /// Subtract the accumulated deltas from the parameters.
    fn apply_gradient(&mut self, gradient: &Self::Gradient);

    /// Step size used by accumulators for the next update.
    fn learning_rate(&self) -> f64;
}

/// Additive store of parameter deltas.
///
/// Accumulation is a pure sum, so accumulators filled by different workers
/// can be combined with [`GradientAccumulator::merge`] in any order.
pub trait GradientAccumulator: Clone + Send + PartialEq + fmt::Debug {
    type Model: DifferentiableModel<Gradient = Self>;

    /// Accumulate the contribution of one document whose model output is `y`,
    /// scaled by `multiplier` (the derivative of the cost w.r.t. the score).
    fn update(&mut self, model: &Self::Model, features: &[f64], y: f64, multiplier: f64);

    fn merge(&mut self, other: &Self);

    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    Linear,
    NeuralNetwork { hidden: usize },
}

impl FromStr for ModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();

        if name == "linreg" || name == "linear" {
            return Ok(ModelKind::Linear);
        }

        // nn:<neurons> or nn_<neurons>
        if let Some(rest) = name.strip_prefix("nn") {
            let neurons = rest
                .strip_prefix(':')
                .or_else(|| rest.strip_prefix('_'))
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ConfigError::UnknownModel(s.to_string()))?;

            if neurons == 0 {
                return Err(ConfigError::InvalidHiddenWidth(neurons));
            }

            return Ok(ModelKind::NeuralNetwork { hidden: neurons });
        }

        Err(ConfigError::UnknownModel(s.to_string()))
    }
}

impl TryFrom<String> for ModelKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelKind> for String {
    fn from(value: ModelKind) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Linear => write!(f, "linreg"),
            ModelKind::NeuralNetwork { hidden } => write!(f, "nn:{hidden}"),
        }
    }
}

/// A trained model of any kind. This is what gets persisted to disk.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub enum Model {
    Linear(LinearModel),
    NeuralNetwork(NeuralNetworkModel),
}

impl Model {
    pub fn new(
        kind: ModelKind,
        dimensions: usize,
        learning_rate: LearningRate,
    ) -> Result<Self, ConfigError> {
        Ok(match kind {
            ModelKind::Linear => Model::Linear(LinearModel::new(dimensions, learning_rate)),
            ModelKind::NeuralNetwork { hidden } => Model::NeuralNetwork(NeuralNetworkModel::new(
                dimensions,
                hidden,
                learning_rate,
            )?),
        })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Linear(_) => ModelKind::Linear,
            Model::NeuralNetwork(model) => ModelKind::NeuralNetwork {
                hidden: model.hidden(),
            },
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Model::Linear(model) => model.dimensions(),
            Model::NeuralNetwork(model) => model.dimensions(),
        }
    }

    pub fn score(&self, features: &[f64]) -> f64 {
        match self {
            Model::Linear(model) => model.score(features),
            Model::NeuralNetwork(model) => model.score(features),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())?;
        std::fs::write(path, bytes)?;

        Ok(())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let (model, _) = bincode::decode_from_slice(&bytes, bincode::config::standard())?;

        Ok(model)
    }
}

impl From<LinearModel> for Model {
    fn from(model: LinearModel) -> Self {
        Model::Linear(model)
    }
}

impl From<NeuralNetworkModel> for Model {
    fn from(model: NeuralNetworkModel) -> Self {
        Model::NeuralNetwork(model)
    }
}
