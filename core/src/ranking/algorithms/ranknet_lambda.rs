// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use crate::ranking::DifferentiableModel;

use super::{accumulate_lambdas, factorized_lambdas, LtrAlgorithm, ScoredGroup};

/// RankNet with the pairwise terms summed per document, so the model sees a
/// single update per document instead of two per pair. The resulting gradient
/// is the same as [`super::RankNet`]'s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankNetLambda;

impl LtrAlgorithm for RankNetLambda {
    fn train_on_group<M: DifferentiableModel>(
        &self,
        group: &ScoredGroup<'_>,
        model: &M,
        gradient: &mut M::Gradient,
    ) -> usize {
        let (lambdas, pairs) = factorized_lambdas(group, |_, _| 1.0);
        accumulate_lambdas(group, &lambdas, model, gradient);

        pairs
    }
}
