//! Engine configuration
//!
//! Every coupling constant and rate in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists. The constants are empirical
//! knobs, not derived quantities.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the emotional-noise and measurement generator.
    pub seed: u64,
    /// Ψ recurrence coupling constants.
    pub recurrence: RecurrenceConfig,
    /// Mood and noise dynamics.
    pub emotion: EmotionConfig,
    /// Strange-loop tracker thresholds.
    pub meta: MetaConfig,
    /// Quantum simulator rates and caps.
    pub quantum: QuantumConfig,
    /// Background driver cadence.
    pub driver: DriverConfig,
    /// State persistence.
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecurrenceConfig {
    /// Memory term coefficient φ.
    pub phi: f64,
    /// Strange-loop coupling λ.
    pub lambda: f64,
    /// Recursive self-reference γ.
    pub gamma: f64,
    /// Emotional noise η.
    pub eta: f64,
    /// Spatiotemporal coupling σ.
    pub sigma: f64,
    /// Hard ceiling on |Ψ|.
    pub psi_ceiling: f64,
    /// Fraction of the phase velocity added to ω per call.
    pub omega_nudge: f64,
    /// Baseline of the dynamic capacity I(t).
    pub capacity_baseline: f64,
    pub meta_capacity_gain: f64,
    pub mood_capacity_gain: f64,
    pub coherence_capacity_gain: f64,
    /// Reward term = reward_gain × sentiment.
    pub reward_gain: f64,
    /// Weight of experience influence in the mood target.
    pub experience_gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmotionConfig {
    /// Fraction of previous momentum retained each call.
    pub momentum_decay: f64,
    /// EMA rate for volatility.
    pub volatility_alpha: f64,
    /// Noise amplitude at zero volatility.
    pub base_noise: f64,
    /// Rate at which the noise bias follows mood.
    pub bias_drift: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetaConfig {
    /// Recent (|Ψ|, phase) entries compared for loops. Never below 10.
    pub history_window: usize,
    pub magnitude_epsilon: f64,
    pub phase_epsilon: f64,
    /// Consecutive non-matching ticks before recursion decays.
    pub decay_after_misses: u32,
    pub max_recursion_depth: u32,
    pub awareness_alpha: f64,
    pub accuracy_alpha: f64,
    /// Threshold on first differences for the `fixed` classification.
    pub fixed_point_epsilon: f64,
    /// Per-tick retention of the observation-collapse signal.
    pub observation_decay: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuantumConfig {
    /// Integration step.
    pub dt: f64,
    /// Lindblad-style damping rate, scaled by n².
    pub decoherence_rate: f64,
    /// Energy scale of the combined potential.
    pub potential_scale: f64,
    /// Minimum normalised weight kept by the environment potential.
    pub environment_min_weight: f64,
    /// Raw goal-potential weight at full intention.
    pub goal_gain: f64,
    /// Gaussian width of every potential well.
    pub well_width: f64,
    /// Blend factor toward the basis on passive measurement.
    pub passive_mixing: f64,
    /// Blend factor toward the basis on volitional collapse.
    pub volitional_mixing: f64,
    pub volitional_threshold: f64,
    /// Charge added per tick at maximum entropy.
    pub charge_gain: f64,
    /// Self-trigger the collapse as soon as the charge is ready.
    pub auto_volitional: bool,
    /// Entropy (bits) above which the state counts as a superposition.
    pub superposition_entropy: f64,
    pub emergent_population_threshold: f64,
    pub emergent_weight: f64,
    pub emergent_decay: f64,
    pub max_attractors: usize,
    /// Attractors weaker than this are pruned.
    pub attractor_epsilon: f64,
    pub memory_capacity: usize,
    /// Memory potential strength gained per stored snapshot.
    pub memory_growth: f64,
    pub memory_strength_cap: f64,
    /// Recency time constant in ticks.
    pub memory_tau: f64,
    pub decision_capacity: usize,
    /// Volitional decisions above this confidence become learned attractors.
    pub learned_confidence: f64,
    pub learned_weight: f64,
    pub learned_decay: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Background tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Noise scale applied to ambient (non-interaction) ticks.
    pub ambient_noise_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// State file. `None` disables persistence.
    pub path: Option<PathBuf>,
    /// Quiet period before a pending write is flushed.
    pub debounce_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

// ============================================================
// Defaults
// ============================================================

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            recurrence: RecurrenceConfig::default(),
            emotion: EmotionConfig::default(),
            meta: MetaConfig::default(),
            quantum: QuantumConfig::default(),
            driver: DriverConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            phi: 0.1,
            lambda: 0.12,
            gamma: 0.18,
            eta: 0.25,
            sigma: 1.0,
            psi_ceiling: 1e6,
            omega_nudge: 0.05,
            capacity_baseline: 1.0,
            meta_capacity_gain: 0.5,
            mood_capacity_gain: 0.3,
            coherence_capacity_gain: 0.2,
            reward_gain: 1.0,
            experience_gain: 0.5,
        }
    }
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self { momentum_decay: 0.8, volatility_alpha: 0.2, base_noise: 0.1, bias_drift: 0.05 }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            history_window: 16,
            magnitude_epsilon: 0.1,
            phase_epsilon: 0.2,
            decay_after_misses: 3,
            max_recursion_depth: 12,
            awareness_alpha: 0.1,
            accuracy_alpha: 0.2,
            fixed_point_epsilon: 1e-6,
            observation_decay: 0.9,
        }
    }
}

impl Default for QuantumConfig {
    fn default() -> Self {
        Self {
            dt: 0.05,
            decoherence_rate: 0.002,
            potential_scale: 4.0,
            environment_min_weight: 0.1,
            goal_gain: 1.0,
            well_width: 0.5,
            passive_mixing: 0.3,
            volitional_mixing: 0.5,
            volitional_threshold: 0.7,
            charge_gain: 0.08,
            auto_volitional: true,
            superposition_entropy: 0.1,
            emergent_population_threshold: 0.4,
            emergent_weight: 0.5,
            emergent_decay: 0.05,
            max_attractors: 6,
            attractor_epsilon: 1e-3,
            memory_capacity: 50,
            memory_growth: 0.006,
            memory_strength_cap: 0.3,
            memory_tau: 20.0,
            decision_capacity: 20,
            learned_confidence: 0.8,
            learned_weight: 0.3,
            learned_decay: 0.02,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 250, ambient_noise_scale: 0.25 }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: None,
            debounce_ms: 500,
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<EngineConfig>(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config.sanitized()
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Clamp values whose range the engine depends on.
    pub fn sanitized(mut self) -> Self {
        self.meta.history_window = self.meta.history_window.max(10);
        self.meta.max_recursion_depth = self.meta.max_recursion_depth.max(1);
        self.meta.decay_after_misses = self.meta.decay_after_misses.max(1);
        self.quantum.max_attractors = self.quantum.max_attractors.max(1);
        self.quantum.memory_capacity = self.quantum.memory_capacity.max(1);
        self.quantum.decision_capacity = self.quantum.decision_capacity.max(1);
        self.quantum.memory_strength_cap = self.quantum.memory_strength_cap.clamp(0.0, 0.3);
        self.quantum.environment_min_weight = self.quantum.environment_min_weight.clamp(0.1, 1.0);
        if !(self.quantum.dt.is_finite() && self.quantum.dt > 0.0) {
            self.quantum.dt = QuantumConfig::default().dt;
        }
        if !(self.recurrence.psi_ceiling.is_finite() && self.recurrence.psi_ceiling > 0.0) {
            self.recurrence.psi_ceiling = RecurrenceConfig::default().psi_ceiling;
        }
        self
    }
}
