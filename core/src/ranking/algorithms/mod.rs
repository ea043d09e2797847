// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

//! Pairwise training strategies.
//!
//! All of them minimise the pairwise logistic cost
//! `C = log(1 + exp(-(s_i - s_j)))` for every pair where document `i` is more
//! relevant than document `j`. The derivative of `C` with respect to a
//! document's score (its lambda) is what gets pushed into the model's
//! gradient accumulator as the multiplier.

mod lambdarank;
mod ranknet;
mod ranknet_lambda;

use std::{fmt, str::FromStr};

pub use lambdarank::LambdaRank;
pub use ranknet::RankNet;
pub use ranknet_lambda::RankNetLambda;

use crate::{
    dataset::Group,
    ranking::{
        evaluation::Metric, DifferentiableModel, EvaluationMeasure, GradientAccumulator,
    },
    ConfigError,
};

pub trait LtrAlgorithm: Send + Sync {
    /// Accumulate the gradient of one query group into `gradient`.
    /// Returns the number of preference pairs that contributed.
    fn train_on_group<M: DifferentiableModel>(
        &self,
        group: &ScoredGroup<'_>,
        model: &M,
        gradient: &mut M::Gradient,
    ) -> usize;
}

/// A query group together with the model's scores for its documents.
pub struct ScoredGroup<'a> {
    group: Group<'a>,
    scores: Vec<f64>,
}

impl<'a> ScoredGroup<'a> {
    pub fn new<M: DifferentiableModel>(group: Group<'a>, model: &M) -> Self {
        let scores = group.iter().map(|doc| model.score(&doc.features)).collect();

        Self { group, scores }
    }

    pub fn group(&self) -> Group<'a> {
        self.group
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn features(&self, idx: usize) -> &'a [f64] {
        &self.group.get(idx).features
    }

    pub fn relevance(&self, idx: usize) -> u32 {
        self.group.get(idx).relevance
    }

    /// Document indices by descending score. Ties keep the input order.
    pub fn ranking(&self) -> Vec<usize> {
        let mut ranking: Vec<usize> = (0..self.len()).collect();
        ranking.sort_by(|&a, &b| self.scores[b].total_cmp(&self.scores[a]));
        ranking
    }

    /// Relevance grades in the order given by `ranking`.
    pub fn ranked_relevances(&self, ranking: &[usize]) -> Vec<u32> {
        ranking.iter().map(|&idx| self.relevance(idx)).collect()
    }

    /// Evaluate the current ranking of the group.
    pub fn evaluate<E: EvaluationMeasure>(&self, measure: &E) -> f64 {
        measure.evaluate(&self.ranked_relevances(&self.ranking()))
    }
}

/// `1 / (1 + exp(s_better - s_worse))`, the magnitude of the derivative of
/// the pairwise logistic cost for a correctly labelled pair.
#[inline]
pub(crate) fn pair_lambda(better: f64, worse: f64) -> f64 {
    1.0 / (1.0 + (better - worse).exp())
}

/// Sum the (optionally weighted) pairwise lambdas per document.
///
/// Documents are sorted by relevance once; the partners ranked above a
/// document by relevance are collected in a forward pass and the partners
/// below it in a backward pass. `weight(i, j)` scales the term of the pair of
/// documents `i` and `j`.
///
/// The model sees one accumulator update per document instead of two per
/// pair, but the scalar pair terms are still evaluated for every pair. The
/// logistic term of a pair depends on both scores, so it does not reduce to
/// prefix sums without giving up exact agreement with [`RankNet`].
///
/// Returns the lambda of every document and the number of pairs.
pub(crate) fn factorized_lambdas<W>(group: &ScoredGroup<'_>, weight: W) -> (Vec<f64>, usize)
where
    W: Fn(usize, usize) -> f64,
{
    let n = group.len();
    let scores = group.scores();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&idx| std::cmp::Reverse(group.relevance(idx)));

    let mut lambdas = vec![0.0; n];
    let mut pairs = 0;

    // partners that are more relevant
    let mut bucket_start = 0;
    for pos in 0..n {
        let i = order[pos];

        if pos > 0 && group.relevance(order[pos - 1]) != group.relevance(i) {
            bucket_start = pos;
        }

        for &j in &order[..bucket_start] {
            lambdas[i] += weight(j, i) * pair_lambda(scores[j], scores[i]);
        }

        pairs += bucket_start;
    }

    // partners that are less relevant
    let mut bucket_end = n;
    for pos in (0..n).rev() {
        let i = order[pos];

        if pos + 1 < n && group.relevance(order[pos + 1]) != group.relevance(i) {
            bucket_end = pos + 1;
        }

        for &j in &order[bucket_end..] {
            lambdas[i] -= weight(i, j) * pair_lambda(scores[i], scores[j]);
        }
    }

    (lambdas, pairs)
}

/// One accumulator update per document with a non-zero lambda.
pub(crate) fn accumulate_lambdas<M: DifferentiableModel>(
    group: &ScoredGroup<'_>,
    lambdas: &[f64],
    model: &M,
    gradient: &mut M::Gradient,
) {
    for (idx, lambda) in lambdas.iter().enumerate() {
        if *lambda != 0.0 {
            gradient.update(model, group.features(idx), group.scores()[idx], *lambda);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlgorithmKind {
    /// Every pair is pushed through the model on its own.
    Plain,
    /// Pairwise lambdas are summed per document before touching the model.
    Factorized,
    /// As `Factorized`, with each pair weighted by the metric change of swapping it.
    MetricWeighted,
}

impl FromStr for AlgorithmKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ranknet_old" | "plain" => Ok(AlgorithmKind::Plain),
            "ranknet" | "factorized" => Ok(AlgorithmKind::Factorized),
            "lambdarank" | "metric_weighted" => Ok(AlgorithmKind::MetricWeighted),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for AlgorithmKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlgorithmKind> for String {
    fn from(value: AlgorithmKind) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmKind::Plain => write!(f, "ranknet_old"),
            AlgorithmKind::Factorized => write!(f, "ranknet"),
            AlgorithmKind::MetricWeighted => write!(f, "lambdarank"),
        }
    }
}

pub enum Algorithm {
    Plain(RankNet),
    Factorized(RankNetLambda),
    MetricWeighted(LambdaRank),
}

impl Algorithm {
    pub fn new(kind: AlgorithmKind, metric: Metric) -> Self {
        match kind {
            AlgorithmKind::Plain => Algorithm::Plain(RankNet),
            AlgorithmKind::Factorized => Algorithm::Factorized(RankNetLambda),
            AlgorithmKind::MetricWeighted => Algorithm::MetricWeighted(LambdaRank::new(metric)),
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Algorithm::Plain(_) => AlgorithmKind::Plain,
            Algorithm::Factorized(_) => AlgorithmKind::Factorized,
            Algorithm::MetricWeighted(_) => AlgorithmKind::MetricWeighted,
        }
    }
}

impl LtrAlgorithm for Algorithm {
    fn train_on_group<M: DifferentiableModel>(
        &self,
        group: &ScoredGroup<'_>,
        model: &M,
        gradient: &mut M::Gradient,
    ) -> usize {
        match self {
            Algorithm::Plain(alg) => alg.train_on_group(group, model, gradient),
            Algorithm::Factorized(alg) => alg.train_on_group(group, model, gradient),
            Algorithm::MetricWeighted(alg) => alg.train_on_group(group, model, gradient),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        dataset::{Dataset, Document},
        ranking::{LearningRate, LinearModel, Ndcg, NeuralNetworkModel},
    };
    use proptest::prelude::*;

    pub fn dataset(relevances: &[u32], features: &[Vec<f64>]) -> Dataset {
        let docs = relevances
            .iter()
            .zip(features)
            .enumerate()
            .map(|(idx, (rel, features))| Document::new(idx.to_string(), "q", *rel, features.clone()))
            .collect();

        Dataset::from_documents(docs).unwrap()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn parse_kind() {
        assert_eq!(
            "ranknet_old".parse::<AlgorithmKind>(),
            Ok(AlgorithmKind::Plain)
        );
        assert_eq!(
            "ranknet".parse::<AlgorithmKind>(),
            Ok(AlgorithmKind::Factorized)
        );
        assert_eq!(
            "lambdarank".parse::<AlgorithmKind>(),
            Ok(AlgorithmKind::MetricWeighted)
        );
        assert_eq!(
            "lambdamart".parse::<AlgorithmKind>(),
            Err(ConfigError::UnknownAlgorithm("lambdamart".to_string()))
        );
    }

    #[test]
    fn ranking_by_score() {
        let dataset = dataset(&[0, 1, 2], &[vec![1.0], vec![3.0], vec![2.0]]);
        let model = LinearModel::with_weights(vec![1.0], LearningRate::default());
        let group = ScoredGroup::new(dataset.group(0), &model);

        assert_eq!(group.ranking(), vec![1, 2, 0]);
        assert_eq!(group.ranked_relevances(&group.ranking()), vec![1, 2, 0]);
    }

    #[test]
    fn factorized_lambdas_match_pairwise_sums() {
        let dataset = dataset(
            &[2, 1, 1, 0],
            &[vec![0.3], vec![0.1], vec![0.9], vec![-0.4]],
        );
        let model = LinearModel::with_weights(vec![0.7], LearningRate::default());
        let group = ScoredGroup::new(dataset.group(0), &model);
        let s = group.scores();

        let (lambdas, pairs) = factorized_lambdas(&group, |_, _| 1.0);

        assert_eq!(pairs, 5);
        assert_close(
            &lambdas,
            &[
                -pair_lambda(s[0], s[1]) - pair_lambda(s[0], s[2]) - pair_lambda(s[0], s[3]),
                pair_lambda(s[0], s[1]) - pair_lambda(s[1], s[3]),
                pair_lambda(s[0], s[2]) - pair_lambda(s[2], s[3]),
                pair_lambda(s[0], s[3]) + pair_lambda(s[1], s[3]) + pair_lambda(s[2], s[3]),
            ],
        );
    }

    #[test]
    fn no_variance_no_gradient() {
        let dataset = dataset(&[1, 1, 1], &[vec![0.3], vec![0.1], vec![0.9]]);
        let model = LinearModel::with_weights(vec![0.7], LearningRate::default());
        let group = ScoredGroup::new(dataset.group(0), &model);

        for kind in [
            AlgorithmKind::Plain,
            AlgorithmKind::Factorized,
            AlgorithmKind::MetricWeighted,
        ] {
            let alg = Algorithm::new(kind, Metric::Ndcg(Ndcg::new(10)));
            let mut gradient = model.new_gradient();

            assert_eq!(alg.train_on_group(&group, &model, &mut gradient), 0);
            assert_eq!(gradient, model.new_gradient());
        }
    }

    fn features_strategy() -> impl Strategy<Value = (Vec<u32>, Vec<Vec<f64>>)> {
        (2usize..12).prop_flat_map(|n| {
            (
                prop::collection::vec(0u32..4, n),
                prop::collection::vec(prop::collection::vec(-2.0..2.0f64, 3), n),
            )
        })
    }

    proptest! {
        #[test]
        fn factorized_equals_plain_linear(
            (relevances, features) in features_strategy(),
            weights in prop::collection::vec(-1.0..1.0f64, 3),
        ) {
            let dataset = dataset(&relevances, &features);
            let model = LinearModel::with_weights(weights, LearningRate::Constant { rate: 0.1 });
            let group = ScoredGroup::new(dataset.group(0), &model);

            let mut plain = model.new_gradient();
            let mut factorized = model.new_gradient();

            let plain_pairs = RankNet.train_on_group(&group, &model, &mut plain);
            let factorized_pairs = RankNetLambda.train_on_group(&group, &model, &mut factorized);

            prop_assert_eq!(plain_pairs, factorized_pairs);
            for (a, b) in plain.deltas().iter().zip(factorized.deltas()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }

        #[test]
        fn factorized_equals_plain_neural_net((relevances, features) in features_strategy()) {
            let dataset = dataset(&relevances, &features);
            let model = NeuralNetworkModel::new(3, 4, LearningRate::Constant { rate: 0.1 }).unwrap();
            let group = ScoredGroup::new(dataset.group(0), &model);

            let mut plain = model.new_gradient();
            let mut factorized = model.new_gradient();

            RankNet.train_on_group(&group, &model, &mut plain);
            RankNetLambda.train_on_group(&group, &model, &mut factorized);

            for (a, b) in plain.input_deltas().iter().zip(factorized.input_deltas()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
            for (a, b) in plain.output_deltas().iter().zip(factorized.output_deltas()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
