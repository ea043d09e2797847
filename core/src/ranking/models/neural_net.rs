// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};

use crate::{
    ranking::{LearningRate, Sigma},
    ConfigError,
};

use super::{DifferentiableModel, GradientAccumulator};

/// Weights are drawn from a seeded generator so that runs are reproducible.
const WEIGHT_SEED: u64 = 1001;
const WEIGHT_RANGE: (f64, f64) = (0.1, 1.0);

/// Feed-forward network with a single hidden layer of logistic units and a
/// logistic output unit.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct NeuralNetworkModel {
    dimensions: usize,
    hidden: usize,
    /// input -> hidden weights, row major (`dimensions` x `hidden`)
    w1: Vec<f64>,
    /// hidden -> output weights
    wy: Vec<f64>,
    sigma: Sigma,
    learning_rate: LearningRate,
    steps: usize,
}

impl NeuralNetworkModel {
    pub fn new(
        dimensions: usize,
        hidden: usize,
        learning_rate: LearningRate,
    ) -> Result<Self, ConfigError> {
        if hidden == 0 {
            return Err(ConfigError::InvalidHiddenWidth(hidden));
        }

        let mut rng = StdRng::seed_from_u64(WEIGHT_SEED);
        let unif = Uniform::new_inclusive(WEIGHT_RANGE.0, WEIGHT_RANGE.1);

        let w1 = (0..dimensions * hidden).map(|_| rng.sample(&unif)).collect();
        let wy = (0..hidden).map(|_| rng.sample(&unif)).collect();

        Ok(Self {
            dimensions,
            hidden,
            w1,
            wy,
            sigma: Sigma::default(),
            learning_rate,
            steps: 0,
        })
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    pub fn input_weights(&self) -> &[f64] {
        &self.w1
    }

    pub fn output_weights(&self) -> &[f64] {
        &self.wy
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Forward pass that leaves the hidden layer activations in `hidden`.
    fn forward(&self, features: &[f64], hidden: &mut [f64]) -> f64 {
        debug_assert_eq!(features.len(), self.dimensions);
        debug_assert_eq!(hidden.len(), self.hidden);

        hidden.iter_mut().for_each(|h| *h = 0.0);

        for (x, feature) in features.iter().enumerate() {
            let row = &self.w1[x * self.hidden..(x + 1) * self.hidden];
            for (h, weight) in hidden.iter_mut().zip(row) {
                *h += feature * weight;
            }
        }

        for h in hidden.iter_mut() {
            *h = self.sigma.activation(*h);
        }

        let y = hidden.iter().zip(&self.wy).map(|(h, w)| h * w).sum();
        self.sigma.activation(y)
    }
}

impl DifferentiableModel for NeuralNetworkModel {
    type Gradient = NeuralNetworkGradient;

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn score(&self, features: &[f64]) -> f64 {
        let mut hidden = vec![0.0; self.hidden];
        self.forward(features, &mut hidden)
    }

    fn new_gradient(&self) -> Self::Gradient {
        NeuralNetworkGradient {
            w1: vec![0.0; self.w1.len()],
            wy: vec![0.0; self.wy.len()],
        }
    }

    fn apply_gradient(&mut self, gradient: &Self::Gradient) {
        for (weight, delta) in self.w1.iter_mut().zip(&gradient.w1) {
            *weight -= delta;
        }

        for (weight, delta) in self.wy.iter_mut().zip(&gradient.wy) {
            *weight -= delta;
        }

        self.steps += 1;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate.rate(self.steps)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetworkGradient {
    w1: Vec<f64>,
    wy: Vec<f64>,
}

impl NeuralNetworkGradient {
    pub fn input_deltas(&self) -> &[f64] {
        &self.w1
    }

    pub fn output_deltas(&self) -> &[f64] {
        &self.wy
    }
}

impl GradientAccumulator for NeuralNetworkGradient {
    type Model = NeuralNetworkModel;

    fn update(&mut self, model: &NeuralNetworkModel, features: &[f64], y: f64, multiplier: f64) {
        // the hidden activations are needed for the current weights, so the
        // forward pass has to run again here.
        let mut hidden = vec![0.0; model.hidden];
        model.forward(features, &mut hidden);

        let scale = model.learning_rate() * multiplier;
        let delta_y = model.sigma.derivative(y);

        for (delta, h) in self.wy.iter_mut().zip(&hidden) {
            *delta += scale * delta_y * h;
        }

        for (h, (activation, wy)) in hidden.iter().zip(&model.wy).enumerate() {
            let delta_h = model.sigma.derivative(*activation);
            let back = scale * delta_y * wy * delta_h;

            for (x, feature) in features.iter().enumerate() {
                self.w1[x * model.hidden + h] += back * feature;
            }
        }
    }

    fn merge(&mut self, other: &Self) {
        for (delta, other) in self.w1.iter_mut().zip(&other.w1) {
            *delta += other;
        }

        for (delta, other) in self.wy.iter_mut().zip(&other.wy) {
            *delta += other;
        }
    }

    fn reset(&mut self) {
        self.w1.iter_mut().for_each(|delta| *delta = 0.0);
        self.wy.iter_mut().for_each(|delta| *delta = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NeuralNetworkModel {
        NeuralNetworkModel::new(3, 2, LearningRate::Constant { rate: 0.1 }).unwrap()
    }

    #[test]
    fn zero_hidden_neurons() {
        assert_eq!(
            NeuralNetworkModel::new(3, 0, LearningRate::default()),
            Err(ConfigError::InvalidHiddenWidth(0))
        );
    }

    #[test]
    fn initialization_is_deterministic() {
        let a = model();
        let b = model();

        assert_eq!(a, b);
        assert_eq!(a.input_weights().len(), 6);
        assert_eq!(a.output_weights().len(), 2);
        assert!(a
            .input_weights()
            .iter()
            .chain(a.output_weights())
            .all(|w| (0.1..=1.0).contains(w)));
    }

    #[test]
    fn score_matches_manual_forward_pass() {
        let model = model();
        let sigma = Sigma::default();
        let features = [0.5, -1.0, 2.0];

        let hidden: Vec<f64> = (0..2)
            .map(|h| {
                sigma.activation(
                    (0..3)
                        .map(|x| features[x] * model.input_weights()[x * 2 + h])
                        .sum(),
                )
            })
            .collect();
        let expected = sigma.activation(
            hidden
                .iter()
                .zip(model.output_weights())
                .map(|(h, w)| h * w)
                .sum(),
        );

        assert!((model.score(&features) - expected).abs() < 1e-12);
    }

    #[test]
    fn update_backpropagates() {
        let model = model();
        let sigma = Sigma::default();
        let features = [0.5, -1.0, 2.0];
        let y = model.score(&features);

        let mut gradient = model.new_gradient();
        gradient.update(&model, &features, y, -1.0);

        let mut hidden = vec![0.0; 2];
        model.forward(&features, &mut hidden);
        let delta_y = y * (1.0 - y);

        for h in 0..2 {
            let expected = 0.1 * -1.0 * delta_y * hidden[h];
            assert!((gradient.output_deltas()[h] - expected).abs() < 1e-12);

            for x in 0..3 {
                let expected = 0.1
                    * -1.0
                    * delta_y
                    * model.output_weights()[h]
                    * sigma.derivative(hidden[h])
                    * features[x];
                assert!((gradient.input_deltas()[x * 2 + h] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn descent_raises_score() {
        let mut model = model();
        let features = [0.5, -1.0, 2.0];
        let before = model.score(&features);

        let mut gradient = model.new_gradient();
        gradient.update(&model, &features, before, -1.0);
        model.apply_gradient(&gradient);

        assert!(model.score(&features) > before);
        assert_eq!(model.steps(), 1);
    }

    #[test]
    fn reset_matches_fresh_accumulator() {
        let mut model = model();
        let mut gradient = model.new_gradient();
        let features = [1.0, 2.0, 3.0];

        gradient.update(&model, &features, model.score(&features), 0.7);
        model.apply_gradient(&gradient);
        gradient.reset();

        assert_eq!(gradient, model.new_gradient());
    }
}
