// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

//! Pairwise learning-to-rank training.
//!
//! Documents are grouped by query id and a differentiable scoring model is
//! trained so that, within each group, documents are ordered by their graded
//! relevance. See [`ranking::trainer::Trainer`] for the training loop.

use thiserror::Error;

pub mod config;
pub mod dataset;
pub mod entrypoint;
pub mod ranking;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("model {0:?} is not implemented; select one of linreg, nn:<neurons>")]
    UnknownModel(String),

    #[error("algorithm {0:?} is not implemented; select one of ranknet_old, ranknet, lambdarank")]
    UnknownAlgorithm(String),

    #[error("evaluation metric {0:?} is not implemented; select ndcg")]
    UnknownMetric(String),

    #[error("reader {0:?} is not implemented; select one of csv, letor, yahoo")]
    UnknownReader(String),

    #[error("the number of hidden neurons must be positive, got {0}")]
    InvalidHiddenWidth(usize),

    #[error("invalid learning rate {0:?}")]
    InvalidLearningRate(String),

    #[error("the metric cutoff must be positive")]
    InvalidCutoff,

    #[error("invalid stopping condition {0:?}")]
    InvalidStoppingCondition(String),

    #[error("invalid update granularity {0:?}; select one of iteration, group")]
    InvalidUpdateGranularity(String),
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read dataset")]
    Io(#[from] std::io::Error),

    #[error("malformed input on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("no documents were read from the dataset")]
    Empty,

    #[error("dataset has {found} features but the model expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
