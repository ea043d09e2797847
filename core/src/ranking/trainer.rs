// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

//! Drives an [`LtrAlgorithm`] over every query group of a dataset.
//!
//! With [`UpdateGranularity::Iteration`] the groups of a pass are processed in
//! parallel against one snapshot of the model. Every worker folds its groups
//! into a private accumulator, the accumulators are merged and the sum is
//! applied once all groups are done. Nothing mutates the model while scores
//! are being computed.

use std::{fmt, str::FromStr};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    dataset::{Dataset, Group},
    ranking::{
        algorithms::ScoredGroup, Algorithm, DifferentiableModel, GradientAccumulator, LtrAlgorithm,
    },
    ConfigError,
};

use super::{evaluation::Metric, StoppingCondition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Training,
    Validation,
    Testing,
}

impl Phase {
    /// Only training passes change the model.
    pub fn updates_model(&self) -> bool {
        matches!(self, Phase::Training)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Training => write!(f, "training"),
            Phase::Validation => write!(f, "validation"),
            Phase::Testing => write!(f, "testing"),
        }
    }
}

/// When accumulated gradients are applied to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UpdateGranularity {
    /// Once per pass, after all groups have been processed.
    #[default]
    Iteration,
    /// After every group. Groups are processed sequentially.
    Group,
}

impl FromStr for UpdateGranularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iteration" => Ok(UpdateGranularity::Iteration),
            "group" => Ok(UpdateGranularity::Group),
            _ => Err(ConfigError::InvalidUpdateGranularity(s.to_string())),
        }
    }
}

impl TryFrom<String> for UpdateGranularity {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UpdateGranularity> for String {
    fn from(value: UpdateGranularity) -> Self {
        value.to_string()
    }
}

impl fmt::Display for UpdateGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateGranularity::Iteration => write!(f, "iteration"),
            UpdateGranularity::Group => write!(f, "group"),
        }
    }
}

/// Summary of one pass over a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub phase: Phase,
    pub iteration: usize,
    pub groups: usize,
    /// Groups without relevance variance. They yield no pairs.
    pub skipped: usize,
    pub pairs: usize,
    /// Mean of the per-group metric, computed with the model as it was at the
    /// start of the pass.
    pub metric: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PassStats {
    groups: usize,
    skipped: usize,
    pairs: usize,
    metric_sum: f64,
}

impl PassStats {
    fn merge(self, other: Self) -> Self {
        Self {
            groups: self.groups + other.groups,
            skipped: self.skipped + other.skipped,
            pairs: self.pairs + other.pairs,
            metric_sum: self.metric_sum + other.metric_sum,
        }
    }
}

pub struct Trainer<M: DifferentiableModel> {
    model: M,
    algorithm: Algorithm,
    metric: Metric,
    stopping: StoppingCondition,
    granularity: UpdateGranularity,
}

impl<M: DifferentiableModel> Trainer<M> {
    pub fn new(model: M, algorithm: Algorithm, metric: Metric) -> Self {
        Self {
            model,
            algorithm,
            metric,
            stopping: StoppingCondition::default(),
            granularity: UpdateGranularity::default(),
        }
    }

    pub fn with_stopping_condition(mut self, stopping: StoppingCondition) -> Self {
        self.stopping = stopping;
        self
    }

    pub fn with_granularity(mut self, granularity: UpdateGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Run training passes over `dataset` until the stopping condition is met.
    pub fn train(&mut self, dataset: &Dataset, niters: usize) -> Vec<PassReport> {
        let mut reports: Vec<PassReport> = Vec::new();
        let mut metrics = Vec::new();

        while !self.stopping.should_stop(&metrics, niters) {
            let report = self.run_pass(dataset, Phase::Training, reports.len());

            metrics.push(report.metric);
            reports.push(report);
        }

        if reports.len() < niters {
            info!(
                "{} met after {} of {} iterations",
                self.stopping,
                reports.len(),
                niters
            );
        }

        reports
    }

    /// Visit every query group of `dataset` once. The accumulated gradient is
    /// applied to the model only when `phase` is [`Phase::Training`].
    pub fn run_pass(&mut self, dataset: &Dataset, phase: Phase, iteration: usize) -> PassReport {
        let stats = match self.granularity {
            UpdateGranularity::Iteration => self.iteration_pass(dataset, phase),
            UpdateGranularity::Group => self.group_pass(dataset, phase),
        };

        let report = PassReport {
            phase,
            iteration,
            groups: stats.groups,
            skipped: stats.skipped,
            pairs: stats.pairs,
            metric: if stats.groups == 0 {
                0.0
            } else {
                stats.metric_sum / stats.groups as f64
            },
        };

        if phase.updates_model() && report.skipped > 0 {
            warn!(
                "{} of {} query groups have no relevance variance",
                report.skipped, report.groups
            );
        }

        info!(
            "{} pass {}: {} = {:.6} over {} groups ({} pairs)",
            phase, iteration, self.metric, report.metric, report.groups, report.pairs
        );

        report
    }

    fn process_group(&self, group: Group<'_>, gradient: &mut M::Gradient) -> PassStats {
        let scored = ScoredGroup::new(group, &self.model);
        let pairs = self
            .algorithm
            .train_on_group(&scored, &self.model, gradient);

        PassStats {
            groups: 1,
            skipped: usize::from(!group.has_relevance_variance()),
            pairs,
            metric_sum: scored.evaluate(&self.metric),
        }
    }

    fn iteration_pass(&mut self, dataset: &Dataset, phase: Phase) -> PassStats {
        let (gradient, stats) = {
            let this = &*self;

            (0..dataset.num_groups())
                .into_par_iter()
                .fold(
                    || (this.model.new_gradient(), PassStats::default()),
                    |(mut gradient, stats), idx| {
                        let group_stats = this.process_group(dataset.group(idx), &mut gradient);
                        (gradient, stats.merge(group_stats))
                    },
                )
                .reduce(
                    || (this.model.new_gradient(), PassStats::default()),
                    |(mut gradient, stats), (other, other_stats)| {
                        gradient.merge(&other);
                        (gradient, stats.merge(other_stats))
                    },
                )
        };

        if phase.updates_model() && stats.pairs > 0 {
            self.model.apply_gradient(&gradient);
            debug!("applied gradient of {} pairs", stats.pairs);
        }

        stats
    }

    fn group_pass(&mut self, dataset: &Dataset, phase: Phase) -> PassStats {
        let mut gradient = self.model.new_gradient();
        let mut stats = PassStats::default();

        for group in dataset.groups() {
            let group_stats = self.process_group(group, &mut gradient);

            if phase.updates_model() && group_stats.pairs > 0 {
                self.model.apply_gradient(&gradient);
                debug!(
                    "applied gradient of {} pairs from query {}",
                    group_stats.pairs,
                    group.qid()
                );
            }

            gradient.reset();
            stats = stats.merge(group_stats);
        }

        stats
    }
}
