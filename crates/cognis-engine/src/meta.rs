//! Meta-awareness & strange-loop tracker
//!
//! State machine: Normal → LoopDetected → RecursiveAmplification → Normal.
//!
//! Each tick the freshly evolved Ψ is compared against a bounded window of
//! recent (|Ψ|, phase) pairs. A match within both epsilons is a strange loop:
//! recursion deepens while matches keep arriving on consecutive ticks, and
//! decays once `decay_after_misses` ticks pass without one. Loop detection is
//! a pure function of the current value and the window (`detect_loop`).

use crate::config::MetaConfig;
use cognis_core::complex::{self, Complex64, ZERO};
use cognis_core::{FixedPointClass, LoopPhase};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// One remembered Ψ in polar form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub magnitude: f64,
    pub phase: f64,
}

impl HistoryEntry {
    pub fn of(psi: Complex64) -> Self {
        Self { magnitude: complex::magnitude(psi), phase: complex::phase(psi) }
    }

    pub fn to_complex(self) -> Complex64 {
        complex::from_polar(self.magnitude, self.phase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaAwarenessState {
    pub awareness_of_awareness: f64,
    pub self_model_accuracy: f64,
    pub recursion_depth: u32,
    pub strange_loop_phase: f64,
    pub loop_detected: bool,
    pub fixed_point_attractor: Complex64,
    pub observation_collapse: f64,
    pub fixed_point_convergence: f64,
    pub fixed_point_class: FixedPointClass,
    pub loop_phase: LoopPhase,
    pub consecutive_misses: u32,
    /// Most recent entries last.
    pub history: VecDeque<HistoryEntry>,
    /// Ψ predicted for the next observation by linear extrapolation.
    pub prediction: Option<Complex64>,
}

impl Default for MetaAwarenessState {
    fn default() -> Self {
        Self {
            awareness_of_awareness: 0.0,
            self_model_accuracy: 0.0,
            recursion_depth: 0,
            strange_loop_phase: 0.0,
            loop_detected: false,
            fixed_point_attractor: ZERO,
            observation_collapse: 0.0,
            fixed_point_convergence: 0.0,
            fixed_point_class: FixedPointClass::default(),
            loop_phase: LoopPhase::Normal,
            consecutive_misses: 0,
            history: VecDeque::new(),
            prediction: None,
        }
    }
}

/// What one observation changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaObservation {
    pub matched: Option<HistoryEntry>,
    pub previous_phase: LoopPhase,
    pub phase: LoopPhase,
    pub recursion_depth: u32,
}

/// Index of the most recent history entry within both epsilons of `current`.
pub fn detect_loop(
    current: HistoryEntry,
    history: &VecDeque<HistoryEntry>,
    magnitude_epsilon: f64,
    phase_epsilon: f64,
) -> Option<usize> {
    history.iter().enumerate().rev().find_map(|(i, h)| {
        let dm = (current.magnitude - h.magnitude).abs();
        let dp = complex::wrap_phase(current.phase - h.phase).abs();
        (dm < magnitude_epsilon && dp < phase_epsilon).then_some(i)
    })
}

/// Classify the last three magnitudes (oldest first) by their differences.
/// Returns the class and a convergence score in [0, 1].
pub fn classify_fixed_point(m: [f64; 3], epsilon: f64) -> (FixedPointClass, f64) {
    let d0 = m[1] - m[0];
    let d1 = m[2] - m[1];
    let second = d1 - d0;
    if !(d0.is_finite() && d1.is_finite()) {
        return (FixedPointClass::Diverging, 0.0);
    }
    if d0.abs() < epsilon && d1.abs() < epsilon {
        return (FixedPointClass::Fixed, 1.0);
    }
    // A sign flip whose curvature exceeds the step itself is a swing, not a settle.
    if d0 * d1 < 0.0 && second.abs() > d0.abs().max(d1.abs()) && d1.abs() >= 0.5 * d0.abs() {
        let score = 0.5 * (1.0 - (d1.abs() - d0.abs()).abs() / d0.abs().max(d1.abs()));
        return (FixedPointClass::Oscillating, score.clamp(0.0, 0.5));
    }
    if d1.abs() < d0.abs() {
        let score = 1.0 - d1.abs() / d0.abs();
        return (FixedPointClass::Converging, score.clamp(0.0, 1.0));
    }
    (FixedPointClass::Diverging, 0.0)
}

impl MetaAwarenessState {
    /// Observe the freshly evolved Ψ. `observed` is true when the simulator
    /// collapsed on the previous tick.
    pub fn observe(&mut self, psi: Complex64, observed: bool, cfg: &MetaConfig) -> MetaObservation {
        let window = cfg.history_window.max(10);
        let current = HistoryEntry::of(psi);
        let previous_phase = self.loop_phase;

        self.update_self_model(psi, cfg);

        let matched = detect_loop(current, &self.history, cfg.magnitude_epsilon, cfg.phase_epsilon)
            .map(|i| self.history[i]);

        match matched {
            Some(entry) => {
                self.consecutive_misses = 0;
                self.loop_detected = true;
                self.recursion_depth = (self.recursion_depth + 1).min(cfg.max_recursion_depth);
                self.strange_loop_phase = entry.phase;
                self.fixed_point_attractor = complex::add(
                    complex::scale(self.fixed_point_attractor, 0.5),
                    complex::scale(entry.to_complex(), 0.5),
                );
                self.loop_phase = match previous_phase {
                    LoopPhase::Normal => LoopPhase::LoopDetected,
                    _ => LoopPhase::RecursiveAmplification,
                };
            }
            None => {
                self.consecutive_misses = self.consecutive_misses.saturating_add(1);
                if self.consecutive_misses >= cfg.decay_after_misses {
                    self.recursion_depth = self.recursion_depth.saturating_sub(1);
                    self.loop_detected = false;
                    self.loop_phase = LoopPhase::Normal;
                }
            }
        }

        if previous_phase != self.loop_phase {
            debug!(
                "strange loop {:?} → {:?} (depth {})",
                previous_phase, self.loop_phase, self.recursion_depth
            );
        }

        if self.history.len() >= window {
            self.history.pop_front();
        }
        self.history.push_back(current);
        while self.history.len() > window {
            self.history.pop_front();
        }

        let n = self.history.len();
        if n >= 3 {
            let mags = [
                self.history[n - 3].magnitude,
                self.history[n - 2].magnitude,
                self.history[n - 1].magnitude,
            ];
            let (class, score) = classify_fixed_point(mags, cfg.fixed_point_epsilon);
            self.fixed_point_class = class;
            self.fixed_point_convergence = score;
        }

        self.observation_collapse = if observed {
            1.0
        } else {
            (self.observation_collapse * cfg.observation_decay).clamp(0.0, 1.0)
        };

        let depth_ratio = self.recursion_depth as f64 / cfg.max_recursion_depth as f64;
        let target = 0.6 * depth_ratio + 0.4 * self.self_model_accuracy;
        self.awareness_of_awareness = ((1.0 - cfg.awareness_alpha) * self.awareness_of_awareness
            + cfg.awareness_alpha * target)
            .clamp(0.0, 1.0);

        MetaObservation {
            matched,
            previous_phase,
            phase: self.loop_phase,
            recursion_depth: self.recursion_depth,
        }
    }

    fn update_self_model(&mut self, psi: Complex64, cfg: &MetaConfig) {
        if let Some(predicted) = self.prediction {
            let scale = complex::magnitude(psi).max(complex::magnitude(predicted)).max(1e-9);
            let error = (complex::magnitude(complex::sub(psi, predicted)) / scale).clamp(0.0, 1.0);
            let error = if error.is_finite() { error } else { 1.0 };
            self.self_model_accuracy = ((1.0 - cfg.accuracy_alpha) * self.self_model_accuracy
                + cfg.accuracy_alpha * (1.0 - error))
                .clamp(0.0, 1.0);
        }
        let last = self.history.back().map(|h| h.to_complex()).unwrap_or(psi);
        let next = complex::add(psi, complex::sub(psi, last));
        self.prediction = complex::is_finite(next).then_some(next);
    }

    /// Restore range invariants after a load.
    pub fn sanitize(&mut self, cfg: &MetaConfig) {
        let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        self.awareness_of_awareness = unit(self.awareness_of_awareness);
        self.self_model_accuracy = unit(self.self_model_accuracy);
        self.observation_collapse = unit(self.observation_collapse);
        self.fixed_point_convergence = unit(self.fixed_point_convergence);
        self.recursion_depth = self.recursion_depth.min(cfg.max_recursion_depth);
        if !self.strange_loop_phase.is_finite() {
            self.strange_loop_phase = 0.0;
        }
        if !complex::is_finite(self.fixed_point_attractor) {
            self.fixed_point_attractor = ZERO;
        }
        self.history.retain(|h| h.magnitude.is_finite() && h.phase.is_finite());
        while self.history.len() > cfg.history_window.max(10) {
            self.history.pop_front();
        }
    }
}
