// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use crate::ranking::{DifferentiableModel, GradientAccumulator};

use super::{pair_lambda, LtrAlgorithm, ScoredGroup};

/// Plain RankNet: every pair of documents with different relevance
/// is a training example of its own, so the model is updated twice per pair.
/// Quadratic in the size of the group.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankNet;

impl LtrAlgorithm for RankNet {
    fn train_on_group<M: DifferentiableModel>(
        &self,
        group: &ScoredGroup<'_>,
        model: &M,
        gradient: &mut M::Gradient,
    ) -> usize {
        let scores = group.scores();
        let mut pairs = 0;

        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (better, worse) = match group.relevance(i).cmp(&group.relevance(j)) {
                    std::cmp::Ordering::Greater => (i, j),
                    std::cmp::Ordering::Less => (j, i),
                    std::cmp::Ordering::Equal => continue,
                };

                let lambda = pair_lambda(scores[better], scores[worse]);

                gradient.update(model, group.features(better), scores[better], -lambda);
                gradient.update(model, group.features(worse), scores[worse], lambda);

                pairs += 1;
            }
        }

        pairs
    }
}
