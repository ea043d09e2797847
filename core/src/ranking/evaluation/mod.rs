// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

mod ndcg;

use std::{fmt, str::FromStr};

pub use ndcg::{Ndcg, NdcgSwaps};

use crate::ConfigError;

/// Ranking quality of a single query group.
///
/// `ranked` holds the relevance grades of the group's documents in the
/// order the model ranks them (descending score).
pub trait EvaluationMeasure: Send + Sync {
    fn evaluate(&self, ranked: &[u32]) -> f64;

    /// Absolute change of [`EvaluationMeasure::evaluate`] if the documents at
    /// ranks `i` and `j` traded places. `ranked` is left untouched.
    fn delta_if_swapped(&self, ranked: &[u32], i: usize, j: usize) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Ndcg { cutoff: usize },
}

impl MetricKind {
    /// Resolve a metric name together with its cutoff (the `k` in NDCG@k).
    pub fn new(name: &str, cutoff: usize) -> Result<Self, ConfigError> {
        if cutoff == 0 {
            return Err(ConfigError::InvalidCutoff);
        }

        match name.trim().to_ascii_lowercase().as_str() {
            "ndcg" => Ok(MetricKind::Ndcg { cutoff }),
            _ => Err(ConfigError::UnknownMetric(name.to_string())),
        }
    }
}

impl FromStr for MetricKind {
    type Err = ConfigError;

    /// Parses `ndcg@<k>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, cutoff) = s
            .split_once('@')
            .ok_or_else(|| ConfigError::UnknownMetric(s.to_string()))?;
        let cutoff = cutoff
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidCutoff)?;

        Self::new(name, cutoff)
    }
}

/// The evaluation measure chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Ndcg(Ndcg),
}

impl From<MetricKind> for Metric {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Ndcg { cutoff } => Metric::Ndcg(Ndcg::new(cutoff)),
        }
    }
}

impl Metric {
    pub fn swaps<'a>(&self, ranked: &'a [u32]) -> Swaps<'a> {
        match self {
            Metric::Ndcg(ndcg) => Swaps::Ndcg(ndcg.swaps(ranked)),
        }
    }
}

impl EvaluationMeasure for Metric {
    fn evaluate(&self, ranked: &[u32]) -> f64 {
        match self {
            Metric::Ndcg(ndcg) => ndcg.evaluate(ranked),
        }
    }

    fn delta_if_swapped(&self, ranked: &[u32], i: usize, j: usize) -> f64 {
        match self {
            Metric::Ndcg(ndcg) => ndcg.delta_if_swapped(ranked, i, j),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Ndcg(ndcg) => write!(f, "{ndcg}"),
        }
    }
}

/// Swap deltas for one ranking, with the per-group normalisation computed once.
pub enum Swaps<'a> {
    Ndcg(NdcgSwaps<'a>),
}

impl<'a> Swaps<'a> {
    pub fn delta(&self, i: usize, j: usize) -> f64 {
        match self {
            Swaps::Ndcg(swaps) => swaps.delta(i, j),
        }
    }
}
