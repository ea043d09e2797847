// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

pub mod activation;
pub mod algorithms;
pub mod evaluation;
pub mod learning_rate;
pub mod models;
pub mod stopping;
pub mod trainer;

pub use activation::Sigma;
pub use algorithms::{Algorithm, AlgorithmKind, LtrAlgorithm};
pub use evaluation::{EvaluationMeasure, Metric, MetricKind, Ndcg};
pub use learning_rate::LearningRate;
pub use models::{
    DifferentiableModel, GradientAccumulator, LinearModel, Model, ModelKind, NeuralNetworkModel,
};
pub use stopping::StoppingCondition;
pub use trainer::{PassReport, Phase, Trainer, UpdateGranularity};
