// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::path::Path;

use anyhow::Context;

use crate::{
    dataset::ReaderKind,
    entrypoint::train::held_out_pass,
    ranking::{
        Algorithm, AlgorithmKind, DifferentiableModel, Metric, MetricKind, Model, PassReport,
        Phase, Trainer,
    },
    Result,
};

/// Score the dataset at `data` with a saved model and report NDCG@`cutoff`.
pub fn run<P: AsRef<Path>, D: AsRef<Path>>(
    model_path: P,
    data: D,
    reader: &ReaderKind,
    cutoff: usize,
) -> Result<PassReport> {
    let model_path = model_path.as_ref();
    let model = Model::open(model_path)
        .with_context(|| format!("failed to open model {}", model_path.display()))?;
    let metric = Metric::from(MetricKind::new("ndcg", cutoff)?);

    match model {
        Model::Linear(model) => test_pass(model, data.as_ref(), reader, metric),
        Model::NeuralNetwork(model) => test_pass(model, data.as_ref(), reader, metric),
    }
}

fn test_pass<M: DifferentiableModel>(
    model: M,
    data: &Path,
    reader: &ReaderKind,
    metric: Metric,
) -> Result<PassReport> {
    let algorithm = Algorithm::new(AlgorithmKind::Factorized, metric);
    let mut trainer = Trainer::new(model, algorithm, metric);

    held_out_pass(&mut trainer, data, reader, Phase::Testing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{LearningRate, LinearModel};

    #[test]
    fn evaluate_saved_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.bin");
        let data = dir.path().join("test.csv");

        Model::from(LinearModel::with_weights(
            vec![1.0, -1.0],
            LearningRate::default(),
        ))
        .save(&model_path)
        .unwrap();

        std::fs::write(&data, "q1,d1,0.9,0.1,2\nq1,d2,0.1,0.9,0\nq2,d3,0.2,0.8,1\nq2,d4,0.8,0.2,0\n")
            .unwrap();

        let report = run(&model_path, &data, &"csv".parse().unwrap(), 10).unwrap();

        assert_eq!(report.phase, Phase::Testing);
        assert_eq!(report.groups, 2);
        // q1 is ranked perfectly, q2 upside down
        let q2 = (1.0 / 3f64.log2()) / 1.0;
        assert!((report.metric - (1.0 + q2) / 2.0).abs() < 1e-12);

        assert!(run(&model_path, &data, &"csv".parse().unwrap(), 0).is_err());
    }
}
