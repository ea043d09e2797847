// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use crate::ranking::{evaluation::Metric, DifferentiableModel};

use super::{accumulate_lambdas, factorized_lambdas, LtrAlgorithm, ScoredGroup};

/// LambdaRank: the factorized RankNet gradient where every pair is weighted
/// by how much the evaluation metric would change if the two documents
/// traded places in the current ranking.
#[derive(Debug, Clone, Copy)]
pub struct LambdaRank {
    metric: Metric,
}

impl LambdaRank {
    pub fn new(metric: Metric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }
}

impl LtrAlgorithm for LambdaRank {
    fn train_on_group<M: DifferentiableModel>(
        &self,
        group: &ScoredGroup<'_>,
        model: &M,
        gradient: &mut M::Gradient,
    ) -> usize {
        let ranking = group.ranking();

        let mut rank_of = vec![0; group.len()];
        for (rank, &idx) in ranking.iter().enumerate() {
            rank_of[idx] = rank;
        }

        let ranked = group.ranked_relevances(&ranking);
        let swaps = self.metric.swaps(&ranked);

        let (lambdas, pairs) =
            factorized_lambdas(group, |i, j| swaps.delta(rank_of[i], rank_of[j]));
        accumulate_lambdas(group, &lambdas, model, gradient);

        pairs
    }
}
