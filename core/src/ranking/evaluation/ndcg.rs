// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::fmt;

use itertools::Itertools;

use super::EvaluationMeasure;

pub const MAX_GAIN_GRADE: u32 = 62;

/// Normalized discounted cumulative gain over the top `cutoff` documents,
/// with exponential gain `2^rel - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ndcg {
    cutoff: usize,
}

impl Ndcg {
    pub fn new(cutoff: usize) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    /// Grades above [`MAX_GAIN_GRADE`] share its gain so sums stay finite.
    #[inline]
    fn gain(relevance: u32) -> f64 {
        2f64.powi(relevance.min(MAX_GAIN_GRADE) as i32) - 1.0
    }

    /// Discount of the 0-based `rank`. Ranks beyond the cutoff do not count.
    #[inline]
    fn discount(&self, rank: usize) -> f64 {
        if rank < self.cutoff {
            1.0 / ((rank + 2) as f64).log2()
        } else {
            0.0
        }
    }

    fn dcg<'a>(&self, ranked: impl Iterator<Item = &'a u32>) -> f64 {
        ranked
            .take(self.cutoff)
            .enumerate()
            .map(|(rank, rel)| Self::gain(*rel) * self.discount(rank))
            .sum()
    }

    /// DCG of the best possible ordering of `ranked`.
    pub fn ideal_dcg(&self, ranked: &[u32]) -> f64 {
        self.dcg(ranked.iter().sorted_unstable_by(|a, b| b.cmp(a)))
    }

    /// Precompute what is needed to answer [`EvaluationMeasure::delta_if_swapped`]
    /// for many pairs of the same ranking.
    pub fn swaps<'a>(&self, ranked: &'a [u32]) -> NdcgSwaps<'a> {
        NdcgSwaps {
            ndcg: *self,
            ranked,
            ideal: self.ideal_dcg(ranked),
        }
    }
}

impl EvaluationMeasure for Ndcg {
    fn evaluate(&self, ranked: &[u32]) -> f64 {
        let ideal = self.ideal_dcg(ranked);

        if ideal == 0.0 {
            return 0.0;
        }

        self.dcg(ranked.iter()) / ideal
    }

    fn delta_if_swapped(&self, ranked: &[u32], i: usize, j: usize) -> f64 {
        self.swaps(ranked).delta(i, j)
    }
}

impl fmt::Display for Ndcg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NDCG@{}", self.cutoff)
    }
}

pub struct NdcgSwaps<'a> {
    ndcg: Ndcg,
    ranked: &'a [u32],
    ideal: f64,
}

impl<'a> NdcgSwaps<'a> {
    /// `|NDCG(ranked) - NDCG(ranked with ranks i and j exchanged)|`
    pub fn delta(&self, i: usize, j: usize) -> f64 {
        if self.ideal == 0.0 {
            return 0.0;
        }

        let gain = Ndcg::gain(self.ranked[i]) - Ndcg::gain(self.ranked[j]);
        let discount = self.ndcg.discount(i) - self.ndcg.discount(j);

        (gain * discount).abs() / self.ideal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force_delta(ndcg: &Ndcg, ranked: &[u32], i: usize, j: usize) -> f64 {
        let mut swapped = ranked.to_vec();
        swapped.swap(i, j);

        (ndcg.evaluate(ranked) - ndcg.evaluate(&swapped)).abs()
    }

    #[test]
    fn known_value() {
        let ndcg = Ndcg::new(10);
        let dcg = 3.0 + 7.0 / 3f64.log2();
        let ideal = 7.0 + 3.0 / 3f64.log2();

        assert!((ndcg.evaluate(&[2, 3, 0]) - dcg / ideal).abs() < 1e-12);

        let dcg = 1.0 + 7.0 / 4f64.log2();
        let ideal = 7.0 + 1.0 / 3f64.log2();
        assert!((ndcg.evaluate(&[1, 0, 3]) - dcg / ideal).abs() < 1e-12);
    }

    #[test]
    fn huge_grades_stay_finite() {
        let ndcg = Ndcg::new(10);

        assert_eq!(ndcg.evaluate(&[2000, 0]), 1.0);

        let flipped = ndcg.evaluate(&[0, 2000]);
        assert!(flipped.is_finite() && flipped > 0.0 && flipped < 1.0);

        let delta = ndcg.delta_if_swapped(&[2000, 0], 0, 1);
        assert!((delta - (1.0 - flipped)).abs() < 1e-12);

        assert_eq!(ndcg.delta_if_swapped(&[2000, 70], 0, 1), 0.0);
    }

    #[test]
    fn perfect_ranking() {
        let ndcg = Ndcg::new(3);
        assert_eq!(ndcg.evaluate(&[3, 2, 2, 1, 0]), 1.0);
        assert_eq!(ndcg.evaluate(&[1]), 1.0);
    }

    #[test]
    fn no_relevance_signal() {
        let ndcg = Ndcg::new(5);
        assert_eq!(ndcg.evaluate(&[]), 0.0);
        assert_eq!(ndcg.evaluate(&[0, 0, 0]), 0.0);
        assert_eq!(ndcg.delta_if_swapped(&[0, 0, 0], 0, 2), 0.0);
    }

    #[test]
    fn cutoff_larger_than_group() {
        let ndcg = Ndcg::new(100);
        assert_eq!(ndcg.evaluate(&[2, 1]), 1.0);
        assert!(ndcg.evaluate(&[1, 2]) < 1.0);
    }

    #[test]
    fn swap_below_cutoff_is_free() {
        let ndcg = Ndcg::new(2);
        assert_eq!(ndcg.delta_if_swapped(&[2, 1, 0, 1], 2, 3), 0.0);
        assert!(ndcg.delta_if_swapped(&[2, 1, 0, 1], 1, 2) > 0.0);
    }

    #[test]
    fn delta_does_not_touch_input() {
        let ndcg = Ndcg::new(10);
        let ranked = vec![0, 1, 2];
        let before = ndcg.evaluate(&ranked);

        assert!(ndcg.delta_if_swapped(&ranked, 0, 2) > 0.0);
        assert_eq!(ranked, vec![0, 1, 2]);
        assert_eq!(ndcg.evaluate(&ranked), before);
    }

    proptest! {
        #[test]
        fn delta_matches_swapping(
            ranked in prop::collection::vec(0u32..5, 2..20),
            cutoff in 1usize..25,
            i in 0usize..20,
            j in 0usize..20,
        ) {
            let i = i % ranked.len();
            let j = j % ranked.len();
            let ndcg = Ndcg::new(cutoff);

            let delta = ndcg.delta_if_swapped(&ranked, i, j);
            prop_assert!((delta - brute_force_delta(&ndcg, &ranked, i, j)).abs() < 1e-9);
        }

        #[test]
        fn equal_relevance_swap_is_invariant(
            ranked in prop::collection::vec(0u32..3, 2..20),
            cutoff in 1usize..25,
        ) {
            let ndcg = Ndcg::new(cutoff);
            let score = ndcg.evaluate(&ranked);

            for i in 0..ranked.len() {
                for j in (i + 1)..ranked.len() {
                    if ranked[i] == ranked[j] {
                        let mut swapped = ranked.clone();
                        swapped.swap(i, j);
                        prop_assert_eq!(ndcg.evaluate(&swapped), score);
                    }
                }
            }
        }

        #[test]
        fn promoting_less_relevant_never_helps(
            ranked in prop::collection::vec(0u32..5, 2..20),
            cutoff in 1usize..25,
        ) {
            let ndcg = Ndcg::new(cutoff);
            let score = ndcg.evaluate(&ranked);

            for i in 0..ranked.len() {
                for j in (i + 1)..ranked.len() {
                    if ranked[i] > ranked[j] {
                        let mut swapped = ranked.clone();
                        swapped.swap(i, j);
                        prop_assert!(ndcg.evaluate(&swapped) <= score + 1e-12);
                    }
                }
            }
        }

        #[test]
        fn sorted_is_perfect(ranked in prop::collection::vec(0u32..5, 1..20), cutoff in 1usize..25) {
            let mut ranked = ranked;
            ranked.sort_unstable_by(|a, b| b.cmp(a));
            let ndcg = Ndcg::new(cutoff);

            if ndcg.ideal_dcg(&ranked) > 0.0 {
                prop_assert!((ndcg.evaluate(&ranked) - 1.0).abs() < 1e-12);
            }
        }
    }
}
