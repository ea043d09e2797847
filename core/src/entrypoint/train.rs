// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use anyhow::Context;
use tracing::info;

use crate::{
    config::TrainConfig,
    dataset::{Dataset, ReaderKind},
    ranking::{Algorithm, DifferentiableModel, Metric, Model, PassReport, Phase, Trainer},
    Result,
};

/// Everything produced by [`run`].
#[derive(Debug)]
pub struct TrainingRun {
    pub model: Model,
    pub training: Vec<PassReport>,
    pub validation: Option<PassReport>,
    pub testing: Option<PassReport>,
}

pub fn run(config: &TrainConfig) -> Result<TrainingRun> {
    let reader = config.reader_kind()?;
    let metric = Metric::from(config.metric()?);

    let train = Dataset::open(&config.train_data, &reader).with_context(|| {
        format!(
            "failed to load training data from {}",
            config.train_data.display()
        )
    })?;

    let model = Model::new(config.mlmodel, train.dimensions(), config.learning_rate)?;

    info!(
        "training {} model with {} ({}, {}, {} updates)",
        config.mlmodel, config.algorithm, metric, config.stopping_condition, config.update
    );

    let trained = match model {
        Model::Linear(model) => run_with(model, config, &reader, metric, &train)?,
        Model::NeuralNetwork(model) => run_with(model, config, &reader, metric, &train)?,
    };

    if let Some(path) = &config.save_model {
        trained
            .model
            .save(path)
            .with_context(|| format!("failed to save model to {}", path.display()))?;

        info!("saved model to {}", path.display());
    }

    Ok(trained)
}

fn run_with<M>(
    model: M,
    config: &TrainConfig,
    reader: &ReaderKind,
    metric: Metric,
    train: &Dataset,
) -> Result<TrainingRun>
where
    M: DifferentiableModel + Into<Model>,
{
    let mut trainer = Trainer::new(model, Algorithm::new(config.algorithm, metric), metric)
        .with_stopping_condition(config.stopping_condition)
        .with_granularity(config.update);

    let training = trainer.train(train, config.niters);

    let validation = config
        .eval_data
        .as_ref()
        .map(|path| held_out_pass(&mut trainer, path, reader, Phase::Validation))
        .transpose()?;

    let testing = config
        .test_data
        .as_ref()
        .map(|path| held_out_pass(&mut trainer, path, reader, Phase::Testing))
        .transpose()?;

    Ok(TrainingRun {
        model: trainer.into_model().into(),
        training,
        validation,
        testing,
    })
}

/// A pass over a dataset the model was not trained on.
pub(crate) fn held_out_pass<M: DifferentiableModel>(
    trainer: &mut Trainer<M>,
    path: &std::path::Path,
    reader: &ReaderKind,
    phase: Phase,
) -> Result<PassReport> {
    let mut dataset = Dataset::open(path, reader)
        .with_context(|| format!("failed to load {phase} data from {}", path.display()))?;
    dataset.conform(trainer.model().dimensions())?;

    Ok(trainer.run_pass(&dataset, phase, 0))
}
