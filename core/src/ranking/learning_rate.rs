// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::{fmt, str::FromStr};

use crate::ConfigError;

const DEFAULT_RATE: f64 = 0.01;

/// Step size policy. `t` is the number of gradient applications a model
/// has received so far.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(try_from = "String", into = "String")]
pub enum LearningRate {
    Constant { rate: f64 },
    /// `initial / (1 + decay * t)`
    InverseTime { initial: f64, decay: f64 },
    /// `initial * gamma^t`
    Exponential { initial: f64, gamma: f64 },
}

impl Default for LearningRate {
    fn default() -> Self {
        Self::Constant { rate: DEFAULT_RATE }
    }
}

impl LearningRate {
    /// Decaying schedules bottom out at `f64::MIN_POSITIVE`, never 0.
    pub fn rate(&self, t: usize) -> f64 {
        let rate = match *self {
            LearningRate::Constant { rate } => rate,
            LearningRate::InverseTime { initial, decay } => initial / (1.0 + decay * t as f64),
            LearningRate::Exponential { initial, gamma } => {
                initial * gamma.powi(t.min(i32::MAX as usize) as i32)
            }
        };

        rate.max(f64::MIN_POSITIVE)
    }
}

fn parse_param(s: &str, input: &str) -> Result<f64, ConfigError> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::InvalidLearningRate(input.to_string()))
}

impl FromStr for LearningRate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidLearningRate(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();

        let lr = match parts.as_slice() {
            [""] | ["constant"] => Self::default(),
            ["constant", rate] => Self::Constant {
                rate: parse_param(rate, s)?,
            },
            ["decay", initial, decay] => Self::InverseTime {
                initial: parse_param(initial, s)?,
                decay: parse_param(decay, s)?,
            },
            ["exponential", initial, gamma] => Self::Exponential {
                initial: parse_param(initial, s)?,
                gamma: parse_param(gamma, s)?,
            },
            _ => return Err(invalid()),
        };

        let valid = match lr {
            LearningRate::Constant { rate } => rate > 0.0,
            LearningRate::InverseTime { initial, decay } => initial > 0.0 && decay >= 0.0,
            LearningRate::Exponential { initial, gamma } => {
                initial > 0.0 && gamma > 0.0 && gamma <= 1.0
            }
        };

        if valid {
            Ok(lr)
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for LearningRate {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LearningRate> for String {
    fn from(value: LearningRate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for LearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningRate::Constant { rate } => write!(f, "constant:{rate}"),
            LearningRate::InverseTime { initial, decay } => write!(f, "decay:{initial}:{decay}"),
            LearningRate::Exponential { initial, gamma } => {
                write!(f, "exponential:{initial}:{gamma}")
            }
        }
    }
}
