// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::{fmt, str::FromStr};

use crate::ConfigError;

const DEFAULT_THRESHOLD: f64 = 1e-4;

/// Decides after every training pass whether another one should follow.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StoppingCondition {
    /// Run exactly the configured number of iterations.
    #[default]
    Iterations,
    /// Also stop early once the aggregate metric moves less than `threshold`
    /// between two consecutive passes.
    Convergence { threshold: f64 },
}

impl StoppingCondition {
    /// `metrics` holds the aggregate metric of every finished pass, oldest first.
    pub fn should_stop(&self, metrics: &[f64], niters: usize) -> bool {
        if metrics.len() >= niters {
            return true;
        }

        match self {
            StoppingCondition::Iterations => false,
            StoppingCondition::Convergence { threshold } => match metrics {
                [.., prev, last] => (last - prev).abs() < *threshold,
                _ => false,
            },
        }
    }
}

impl FromStr for StoppingCondition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidStoppingCondition(s.to_string());
        let trimmed = s.trim().to_ascii_lowercase();

        let (name, arg) = match trimmed.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (trimmed.as_str(), None),
        };

        match (name, arg) {
            ("iterations" | "0", None) => Ok(StoppingCondition::Iterations),
            ("convergence" | "1", None) => Ok(StoppingCondition::Convergence {
                threshold: DEFAULT_THRESHOLD,
            }),
            ("convergence", Some(threshold)) => {
                let threshold = threshold.parse::<f64>().map_err(|_| invalid())?;

                if !threshold.is_finite() || threshold <= 0.0 {
                    return Err(invalid());
                }

                Ok(StoppingCondition::Convergence { threshold })
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for StoppingCondition {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StoppingCondition> for String {
    fn from(value: StoppingCondition) -> Self {
        value.to_string()
    }
}

impl fmt::Display for StoppingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoppingCondition::Iterations => write!(f, "iterations"),
            StoppingCondition::Convergence { threshold } => write!(f, "convergence:{threshold}"),
        }
    }
}
