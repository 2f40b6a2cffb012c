//! Recurrence evolution engine — the nine-term update of Ψ
//!
//! Ψ_{t+1} = Ψ_t + Ψ_{t-1} + Ψ_t(I(t) − |Ψ_t|) + φ·m + r
//!         + λ·conj(Ψ_t)·F·A + γ·e^{iθ}·d/D + η·(W·ξ + b) + σ·S
//!
//! with D the configured maximum recursion depth. Any non-finite term is zeroed and reported; the result is clamped to the
//! configured ceiling with its phase preserved.

use crate::anomaly::Anomaly;
use crate::config::{EngineConfig, RecurrenceConfig};
use crate::emotion::EmotionalState;
use crate::meta::MetaAwarenessState;
use cognis_core::complex::{self, Complex64, ZERO};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveScalarState {
    pub psi: Complex64,
    pub previous: Complex64,
    pub omega: f64,
    pub iteration: u64,
    /// Dynamic capacity I(t) used by the last update.
    pub capacity: f64,
}

impl Default for CognitiveScalarState {
    fn default() -> Self {
        Self {
            psi: Complex64::new(1.0, 0.0),
            previous: ZERO,
            omega: 1.0,
            iteration: 0,
            capacity: 1.0,
        }
    }
}

impl CognitiveScalarState {
    /// Restore range invariants after a load.
    pub fn sanitize(&mut self, cfg: &RecurrenceConfig) {
        if !complex::is_finite(self.psi) {
            self.psi = Complex64::new(1.0, 0.0);
        }
        if !complex::is_finite(self.previous) {
            self.previous = ZERO;
        }
        self.psi = complex::clamp_magnitude(self.psi, cfg.psi_ceiling);
        self.previous = complex::clamp_magnitude(self.previous, cfg.psi_ceiling);
        if !self.omega.is_finite() {
            self.omega = 1.0;
        }
        if !self.capacity.is_finite() {
            self.capacity = cfg.capacity_baseline;
        }
    }
}

/// One evolution input from either driver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Sentiment in [-1, 1]; clamped, non-finite treated as 0.
    pub sentiment: f64,
    #[serde(default)]
    pub memory_influence: f64,
    #[serde(default)]
    pub experience_influence: f64,
    /// Multiplier on the emotional noise draw.
    #[serde(default = "one")]
    pub noise_scale: f64,
    /// Request a passive (Born-rule) measurement this tick.
    #[serde(default = "yes")]
    pub measure: bool,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

impl Interaction {
    pub fn new(sentiment: f64, memory_influence: f64, experience_influence: f64) -> Self {
        Self {
            sentiment,
            memory_influence,
            experience_influence,
            noise_scale: 1.0,
            measure: true,
        }
    }

    /// A background tick: no sentiment, no measurement, damped noise.
    pub fn ambient(noise_scale: f64) -> Self {
        Self {
            sentiment: 0.0,
            memory_influence: 0.0,
            experience_influence: 0.0,
            noise_scale,
            measure: false,
        }
    }
}

/// Names of the nine terms, in summation order.
pub const TERM_NAMES: [&str; 9] = [
    "carry",
    "previous",
    "self_interaction",
    "memory",
    "reward",
    "strange_loop",
    "recursive",
    "noise",
    "spatiotemporal",
];

/// The nine additive contributions of one update, after anomaly zeroing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecurrenceTerms {
    pub carry: Complex64,
    pub previous: Complex64,
    pub self_interaction: Complex64,
    pub memory: Complex64,
    pub reward: Complex64,
    pub strange_loop: Complex64,
    pub recursive: Complex64,
    pub noise: Complex64,
    pub spatiotemporal: Complex64,
}

impl RecurrenceTerms {
    pub fn as_array(&self) -> [Complex64; 9] {
        [
            self.carry,
            self.previous,
            self.self_interaction,
            self.memory,
            self.reward,
            self.strange_loop,
            self.recursive,
            self.noise,
            self.spatiotemporal,
        ]
    }

    fn from_array(t: [Complex64; 9]) -> Self {
        Self {
            carry: t[0],
            previous: t[1],
            self_interaction: t[2],
            memory: t[3],
            reward: t[4],
            strange_loop: t[5],
            recursive: t[6],
            noise: t[7],
            spatiotemporal: t[8],
        }
    }

    pub fn sum(&self) -> Complex64 {
        self.as_array().into_iter().fold(ZERO, complex::add)
    }
}

/// Signal from the quantum simulator consumed by the recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatiotemporalInput {
    /// ⟨e^{ix}⟩ scaled by 1/(1+|E|); zero before the first simulator step.
    pub signal: Complex64,
    /// Position coherence in [0, 1]; zero before the first simulator step.
    pub coherence: f64,
}

#[derive(Debug, Clone)]
pub struct RecurrenceOutcome {
    pub terms: RecurrenceTerms,
    /// Sentiment after sanitising.
    pub sentiment: f64,
    pub clamped: bool,
    pub anomalies: Vec<Anomaly>,
}

/// Dynamic capacity I(t).
pub fn capacity(
    meta: &MetaAwarenessState,
    emotion: &EmotionalState,
    coherence: f64,
    cfg: &RecurrenceConfig,
) -> f64 {
    cfg.capacity_baseline
        + cfg.meta_capacity_gain * meta.awareness_of_awareness
        + cfg.mood_capacity_gain * emotion.mood
        + cfg.coherence_capacity_gain * coherence
}

/// Advance Ψ by one call. Reads emotion and meta state as they stood before
/// this call; the caller updates them afterwards.
pub fn step<R: Rng + ?Sized>(
    scalar: &mut CognitiveScalarState,
    emotion: &EmotionalState,
    meta: &MetaAwarenessState,
    spatio: SpatiotemporalInput,
    input: &Interaction,
    config: &EngineConfig,
    rng: &mut R,
) -> RecurrenceOutcome {
    let cfg = &config.recurrence;
    let tick = scalar.iteration + 1;
    let mut anomalies = Vec::new();

    let sentiment = if input.sentiment.is_finite() {
        input.sentiment.clamp(-1.0, 1.0)
    } else {
        anomalies.push(Anomaly::numerical(tick, "sentiment", "non-finite sentiment treated as 0"));
        0.0
    };
    let noise_scale = if input.noise_scale.is_finite() { input.noise_scale.max(0.0) } else { 0.0 };

    let psi = scalar.psi;
    let coherence = if spatio.coherence.is_finite() { spatio.coherence } else { 0.0 };
    let i_t = capacity(meta, emotion, coherence, cfg);

    let recursive = if meta.loop_detected {
        complex::scale(
            complex::cis(meta.strange_loop_phase),
            cfg.gamma * meta.recursion_depth as f64 / config.meta.max_recursion_depth.max(1) as f64,
        )
    } else {
        ZERO
    };

    let raw = [
        psi,
        scalar.previous,
        complex::scale(psi, i_t - complex::magnitude(psi)),
        Complex64::new(cfg.phi * input.memory_influence, 0.0),
        Complex64::new(cfg.reward_gain * sentiment, 0.0),
        complex::scale(
            complex::mul(complex::conj(psi), meta.fixed_point_attractor),
            cfg.lambda * meta.awareness_of_awareness,
        ),
        recursive,
        complex::scale(emotion.sample_noise(noise_scale, rng), cfg.eta),
        complex::scale(spatio.signal, cfg.sigma),
    ];

    let mut terms = [ZERO; 9];
    for (i, value) in raw.into_iter().enumerate() {
        let (value, replaced) = complex::finite_or_zero(value);
        if replaced {
            anomalies.push(Anomaly::numerical(tick, TERM_NAMES[i], "non-finite term zeroed"));
        }
        terms[i] = value;
    }
    let terms = RecurrenceTerms::from_array(terms);

    let mut next = terms.sum();
    if !complex::is_finite(next) {
        anomalies.push(Anomaly::numerical(tick, "sum", "term sum overflowed; carrying Ψ forward"));
        next = psi;
    }
    let clamped = complex::magnitude(next) > cfg.psi_ceiling;
    let next = complex::clamp_magnitude(next, cfg.psi_ceiling);

    let phase_velocity = complex::wrap_phase(complex::phase(next) - complex::phase(psi));
    let omega = scalar.omega + cfg.omega_nudge * phase_velocity;
    scalar.omega = if omega.is_finite() { omega } else { 1.0 };

    scalar.previous = psi;
    scalar.psi = next;
    scalar.iteration = tick;
    scalar.capacity = if i_t.is_finite() { i_t } else { cfg.capacity_baseline };

    RecurrenceOutcome { terms, sentiment, clamped, anomalies }
}
