// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    dataset::{CsvColumns, ReaderKind},
    ranking::{
        AlgorithmKind, LearningRate, MetricKind, ModelKind, StoppingCondition, UpdateGranularity,
    },
    ConfigError, Result,
};

pub mod defaults {
    use crate::ranking::{AlgorithmKind, ModelKind};

    pub fn niters() -> usize {
        10
    }

    pub fn cutoff() -> usize {
        20
    }

    pub fn error() -> String {
        "ndcg".to_string()
    }

    pub fn mlmodel() -> ModelKind {
        ModelKind::Linear
    }

    pub fn algorithm() -> AlgorithmKind {
        AlgorithmKind::Factorized
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    pub train_data: PathBuf,
    pub eval_data: Option<PathBuf>,
    pub test_data: Option<PathBuf>,

    /// One of csv, letor, yahoo.
    pub reader: String,

    #[serde(default = "defaults::niters")]
    pub niters: usize,

    /// The `k` in NDCG@k.
    #[serde(default = "defaults::cutoff")]
    pub cutoff: usize,

    /// Name of the evaluation metric.
    #[serde(default = "defaults::error")]
    pub error: String,

    #[serde(default = "defaults::mlmodel")]
    pub mlmodel: ModelKind,

    #[serde(default = "defaults::algorithm")]
    pub algorithm: AlgorithmKind,

    #[serde(default)]
    pub learning_rate: LearningRate,

    #[serde(default)]
    pub stopping_condition: StoppingCondition,

    #[serde(default)]
    pub update: UpdateGranularity,

    pub save_model: Option<PathBuf>,

    /// Column layout for the csv reader.
    #[serde(default)]
    pub csv: CsvColumns,
}

impl TrainConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let config = Self::parse(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;

        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;

        Ok(config)
    }

    /// Check the options that are not resolved while deserializing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reader_kind()?;
        self.metric()?;

        Ok(())
    }

    pub fn reader_kind(&self) -> Result<ReaderKind, ConfigError> {
        Ok(self.reader.parse::<ReaderKind>()?.with_columns(self.csv))
    }

    pub fn metric(&self) -> Result<MetricKind, ConfigError> {
        MetricKind::new(&self.error, self.cutoff)
    }
}
