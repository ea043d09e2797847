// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

/// The logistic function `1 / (1 + exp(-k * x))` together with its
/// derivative and inverse.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Sigma {
    k: f64,
}

impl Default for Sigma {
    fn default() -> Self {
        Self { k: 1.0 }
    }
}

impl Sigma {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    pub fn sharpness(&self) -> f64 {
        self.k
    }

    #[inline]
    pub fn activation(&self, x: f64) -> f64 {
        1.0 / (1.0 + (-self.k * x).exp())
    }

    /// Derivative of the logistic function, expressed through its output.
    /// `sigma_x` must be the already computed `activation(x)`.
    #[inline]
    pub fn derivative(&self, sigma_x: f64) -> f64 {
        sigma_x * (1.0 - sigma_x)
    }

    /// Inverse of [`Sigma::activation`]. Only defined for `y` in the open
    /// interval (0, 1); callers must clamp with [`Sigma::clamp`] when the
    /// input can saturate.
    #[inline]
    pub fn logit(&self, y: f64) -> f64 {
        (y.ln() - (1.0 - y).ln()) / self.k
    }

    /// Clamp `y` into the domain of [`Sigma::logit`].
    pub fn clamp(y: f64) -> f64 {
        y.clamp(f64::EPSILON, 1.0 - f64::EPSILON)
    }
}
