//! Emotional state — mood dynamics and the noise source for the Ψ recurrence
//!
//! Mutated only as a side effect of evolution; everything else reads it.

use crate::config::EmotionConfig;
use cognis_core::complex::{self, Complex64, ZERO};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionalState {
    /// Mood in [-1, 1].
    pub mood: f64,
    pub momentum: f64,
    /// Volatility in [0, 1].
    pub volatility: f64,
    pub noise_amplitude: f64,
    pub bias: Complex64,
    /// Maps (real, imag) noise input to (real, imag) output.
    pub weights: [[f64; 2]; 2],
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            mood: 0.0,
            momentum: 0.0,
            volatility: 0.0,
            noise_amplitude: EmotionConfig::default().base_noise,
            bias: ZERO,
            weights: [[1.0, 0.2], [-0.2, 1.0]],
        }
    }
}

impl EmotionalState {
    /// Draw the emotional noise vector: W · (amplitude · scale · r) + bias,
    /// with r uniform on [-1, 1]². Always consumes exactly two draws.
    pub fn sample_noise<R: Rng + ?Sized>(&self, scale: f64, rng: &mut R) -> Complex64 {
        let r0: f64 = rng.gen_range(-1.0..=1.0);
        let r1: f64 = rng.gen_range(-1.0..=1.0);
        let amp = self.noise_amplitude * scale;
        let (x, y) = (r0 * amp, r1 * amp);
        let w = &self.weights;
        let out = Complex64::new(w[0][0] * x + w[0][1] * y, w[1][0] * x + w[1][1] * y);
        complex::add(out, self.bias)
    }

    /// Advance mood toward the target implied by sentiment and experience.
    pub fn update(&mut self, sentiment: f64, experience: f64, experience_gain: f64, cfg: &EmotionConfig) {
        let experience = if experience.is_finite() { experience } else { 0.0 };
        let target = (sentiment + experience_gain * experience).clamp(-1.0, 1.0);

        let previous = self.mood;
        self.momentum =
            cfg.momentum_decay * self.momentum + (1.0 - cfg.momentum_decay) * (target - previous);
        self.mood = (previous + self.momentum).clamp(-1.0, 1.0);

        let swing = (2.0 * (self.mood - previous).abs()).min(1.0);
        self.volatility =
            ((1.0 - cfg.volatility_alpha) * self.volatility + cfg.volatility_alpha * swing).clamp(0.0, 1.0);
        self.noise_amplitude = cfg.base_noise * (1.0 + self.volatility);

        let pull = Complex64::new(0.1 * self.mood, 0.1 * self.momentum);
        self.bias = complex::add(self.bias, complex::scale(complex::sub(pull, self.bias), cfg.bias_drift));
        self.sanitize();
    }

    /// Restore range invariants after a mutation or a load.
    pub fn sanitize(&mut self) {
        fn finite(v: f64, fallback: f64) -> f64 {
            if v.is_finite() {
                v
            } else {
                fallback
            }
        }
        self.mood = finite(self.mood, 0.0).clamp(-1.0, 1.0);
        self.momentum = finite(self.momentum, 0.0).clamp(-2.0, 2.0);
        self.volatility = finite(self.volatility, 0.0).clamp(0.0, 1.0);
        self.noise_amplitude = finite(self.noise_amplitude, 0.0).max(0.0);
        if !complex::is_finite(self.bias) {
            self.bias = ZERO;
        }
    }
}
