// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use crate::ranking::{LearningRate, Sigma};

use super::{DifferentiableModel, GradientAccumulator};

/// `sigma(w · x)`
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct LinearModel {
    weights: Vec<f64>,
    sigma: Sigma,
    learning_rate: LearningRate,
    steps: usize,
}

impl LinearModel {
    pub fn new(dimensions: usize, learning_rate: LearningRate) -> Self {
        Self::with_weights(vec![0.0; dimensions], learning_rate)
    }

    pub fn with_weights(weights: Vec<f64>, learning_rate: LearningRate) -> Self {
        Self {
            weights,
            sigma: Sigma::default(),
            learning_rate,
            steps: 0,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of gradients applied so far.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl DifferentiableModel for LinearModel {
    type Gradient = LinearGradient;

    fn dimensions(&self) -> usize {
        self.weights.len()
    }

    fn score(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(features.len(), self.weights.len());

        let dot: f64 = features
            .iter()
            .zip(&self.weights)
            .map(|(feature, weight)| feature * weight)
            .sum();

        self.sigma.activation(dot)
    }

    fn new_gradient(&self) -> Self::Gradient {
        LinearGradient {
            deltas: vec![0.0; self.weights.len()],
        }
    }

    fn apply_gradient(&mut self, gradient: &Self::Gradient) {
        for (weight, delta) in self.weights.iter_mut().zip(&gradient.deltas) {
            *weight -= delta;
        }

        self.steps += 1;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate.rate(self.steps)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    deltas: Vec<f64>,
}

impl LinearGradient {
    pub fn deltas(&self) -> &[f64] {
        &self.deltas
    }
}

impl GradientAccumulator for LinearGradient {
    type Model = LinearModel;

    fn update(&mut self, model: &LinearModel, features: &[f64], y: f64, multiplier: f64) {
        let scale = model.learning_rate() * multiplier * model.sigma.derivative(y);

        for (delta, feature) in self.deltas.iter_mut().zip(features) {
            *delta += scale * feature;
        }
    }

    fn merge(&mut self, other: &Self) {
        for (delta, other) in self.deltas.iter_mut().zip(&other.deltas) {
            *delta += other;
        }
    }

    fn reset(&mut self) {
        self.deltas.iter_mut().for_each(|delta| *delta = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weights_score_half() {
        let model = LinearModel::new(3, LearningRate::default());
        assert_eq!(model.score(&[1.0, -2.0, 3.0]), 0.5);
    }

    #[test]
    fn update_then_apply() {
        let mut model = LinearModel::new(2, LearningRate::Constant { rate: 0.5 });
        let mut gradient = model.new_gradient();

        // y = 0.5 => y(1-y) = 0.25
        gradient.update(&model, &[1.0, 2.0], 0.5, -1.0);
        assert_eq!(gradient.deltas(), &[-0.125, -0.25]);

        model.apply_gradient(&gradient);
        assert_eq!(model.weights(), &[0.125, 0.25]);
        assert_eq!(model.steps(), 1);
    }

    #[test]
    fn reset_matches_fresh_accumulator() {
        let mut model = LinearModel::with_weights(vec![0.3, -0.1], LearningRate::default());
        let mut gradient = model.new_gradient();

        gradient.update(&model, &[1.0, 1.0], 0.7, 1.0);
        gradient.update(&model, &[0.5, -1.0], 0.2, -0.3);
        model.apply_gradient(&gradient);
        gradient.reset();

        assert_eq!(gradient, model.new_gradient());
        assert!(gradient
            .deltas()
            .iter()
            .all(|delta| delta.to_bits() == 0.0f64.to_bits()));
    }

    #[test]
    fn merge_is_additive() {
        let model = LinearModel::with_weights(vec![0.3, -0.1], LearningRate::default());

        let mut all = model.new_gradient();
        all.update(&model, &[1.0, 2.0], 0.6, 1.0);
        all.update(&model, &[3.0, 4.0], 0.4, -1.0);

        let mut a = model.new_gradient();
        a.update(&model, &[1.0, 2.0], 0.6, 1.0);
        let mut b = model.new_gradient();
        b.update(&model, &[3.0, 4.0], 0.4, -1.0);
        b.merge(&a);

        for (x, y) in all.deltas().iter().zip(b.deltas()) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}
