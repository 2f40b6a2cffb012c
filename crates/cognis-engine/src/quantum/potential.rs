//! Evolution potential V(x) — environment, goal and memory wells
//!
//! The three families are mixed with normalised weights. The memory share is
//! capped and the environment always keeps at least its minimum share, so
//! neither goals nor history can fully drown out the present.

use super::basis;
use super::spectral::{grid_position, GRID};
use crate::config::QuantumConfig;
use crate::emotion::EmotionalState;
use crate::meta::MetaAwarenessState;
use cognis_core::{PotentialParams, PotentialWeights, Well, BASIS_COUNT};
use serde::{Deserialize, Serialize};

/// Brainwave-style oscillation bands modulating the environment wells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainwaveState {
    /// Shared oscillator phase, advanced by dt each tick.
    pub phase: f64,
    pub gamma: f64,
    pub beta: f64,
    pub alpha: f64,
    pub theta: f64,
}

impl Default for BrainwaveState {
    fn default() -> Self {
        Self { phase: 0.0, gamma: 0.0, beta: 0.0, alpha: 1.0, theta: 0.0 }
    }
}

const GAMMA_FREQ: f64 = 4.0;
const BETA_FREQ: f64 = 2.0;
const ALPHA_FREQ: f64 = 1.0;
const THETA_FREQ: f64 = 0.5;
const BAND_MODULATION: f64 = 0.25;

impl BrainwaveState {
    pub fn advance(&mut self, emotion: &EmotionalState, meta: &MetaAwarenessState, dt: f64) {
        self.phase = (self.phase + dt) % (std::f64::consts::TAU * 8.0);
        self.gamma = meta.awareness_of_awareness.clamp(0.0, 1.0);
        self.beta = meta.self_model_accuracy.clamp(0.0, 1.0);
        self.alpha = (1.0 - emotion.volatility).clamp(0.0, 1.0);
        self.theta = emotion.volatility.clamp(0.0, 1.0);
        if !self.phase.is_finite() {
            self.phase = 0.0;
        }
    }

    fn modulation(&self, freq: f64) -> f64 {
        1.0 + BAND_MODULATION * (freq * self.phase).sin()
    }
}

/// Well depths for each cognitive mode from the emotional and meta state.
pub fn environment_depths(
    emotion: &EmotionalState,
    meta: &MetaAwarenessState,
    waves: &BrainwaveState,
    max_recursion_depth: u32,
) -> [f64; BASIS_COUNT] {
    let depth_ratio = meta.recursion_depth as f64 / max_recursion_depth.max(1) as f64;
    let depths = [
        waves.gamma * waves.modulation(GAMMA_FREQ),
        0.5 * waves.alpha * waves.modulation(ALPHA_FREQ),
        waves.theta * waves.modulation(THETA_FREQ),
        waves.beta * waves.modulation(BETA_FREQ),
        emotion.mood.abs(),
        0.5 * depth_ratio + 0.5 * meta.fixed_point_convergence * meta.awareness_of_awareness,
    ];
    depths.map(|d| if d.is_finite() { d.max(0.0) } else { 0.0 })
}

pub fn environment_wells(depths: &[f64; BASIS_COUNT]) -> Vec<Well> {
    depths
        .iter()
        .enumerate()
        .map(|(k, &depth)| Well { position: basis::center(k), depth })
        .collect()
}

/// Normalise raw weights: memory capped, environment floored, sum 1.
pub fn normalize_weights(raw: PotentialWeights, environment_min: f64, memory_cap: f64) -> PotentialWeights {
    let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    let (env, goal, mem) = (clean(raw.environment), clean(raw.goal), clean(raw.memory));
    let total = env + goal + mem;
    if total <= 0.0 {
        return PotentialWeights { environment: 1.0, goal: 0.0, memory: 0.0 };
    }
    let (mut e, mut g, mut m) = (env / total, goal / total, mem / total);

    let cap = memory_cap.clamp(0.0, 1.0);
    if m > cap {
        let excess = m - cap;
        m = cap;
        let rest = e + g;
        if rest > 0.0 {
            e += excess * e / rest;
            g += excess * g / rest;
        } else {
            e += excess;
        }
    }

    let floor = environment_min.clamp(0.0, 1.0);
    if e < floor {
        let others = g + m;
        let room = 1.0 - floor;
        if others > 0.0 {
            g *= room / others;
            m *= room / others;
        }
        e = floor;
    }
    PotentialWeights { environment: e, goal: g, memory: m }
}

fn family(wells: &[Well], x: f64, width: f64) -> f64 {
    let two_w2 = 2.0 * width * width;
    -wells
        .iter()
        .map(|w| {
            let d = basis::circular_distance(x, w.position);
            w.depth * (-d * d / two_w2).exp()
        })
        .sum::<f64>()
}

/// Sample V(x) on the integration grid.
pub fn grid(params: &PotentialParams) -> Vec<f64> {
    let w = normalize_weights(params.weights, params.environment_min_weight, params.memory_weight_cap);
    let width = if params.well_width.is_finite() && params.well_width > 0.0 {
        params.well_width
    } else {
        0.5
    };
    (0..GRID)
        .map(|j| {
            let x = grid_position(j);
            let v = params.scale
                * (w.environment * family(&params.environment_wells, x, width)
                    + w.goal * family(&params.goal_wells, x, width)
                    + w.memory * family(&params.memory_wells, x, width));
            if v.is_finite() {
                v
            } else {
                0.0
            }
        })
        .collect()
}

/// Assemble potential parameters from the engine's configuration.
pub fn params(
    environment: Vec<Well>,
    goals: Vec<Well>,
    memory: Vec<Well>,
    intention_strength: f64,
    memory_strength: f64,
    cfg: &QuantumConfig,
) -> PotentialParams {
    PotentialParams {
        environment_wells: environment,
        goal_wells: goals,
        memory_wells: memory,
        weights: PotentialWeights {
            environment: 1.0,
            goal: cfg.goal_gain * intention_strength,
            memory: memory_strength,
        },
        scale: cfg.potential_scale,
        well_width: cfg.well_width,
        environment_min_weight: cfg.environment_min_weight,
        memory_weight_cap: cfg.memory_strength_cap,
        decoherence_rate: cfg.decoherence_rate,
    }
}
