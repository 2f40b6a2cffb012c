//! Goal attractors — potential wells that pull the wavefunction toward a mode

use super::basis;
use cognis_core::{CognitiveMode, Error, GoalSource, Result, Well};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// What an attractor aims at: a named basis or a raw position on the circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalTarget {
    Basis(CognitiveMode),
    Position(f64),
}

impl GoalTarget {
    pub fn position(self) -> f64 {
        match self {
            GoalTarget::Basis(mode) => basis::center(mode.index()),
            GoalTarget::Position(x) => x.rem_euclid(TAU),
        }
    }

    /// Basis whose centre is closest to the target.
    pub fn basis(self) -> CognitiveMode {
        match self {
            GoalTarget::Basis(mode) => mode,
            GoalTarget::Position(x) => {
                CognitiveMode::from_index(basis::nearest(x)).unwrap_or(CognitiveMode::Focused)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAttractor {
    pub target_position: f64,
    pub target_basis: CognitiveMode,
    pub weight: f64,
    /// Fraction of the weight lost per tick.
    pub decay_rate: f64,
    pub source: GoalSource,
    /// Logical tick of creation.
    pub created_tick: u64,
}

impl GoalAttractor {
    pub fn new(
        target: GoalTarget,
        weight: f64,
        decay_rate: f64,
        source: GoalSource,
        tick: u64,
    ) -> Result<Self> {
        if let GoalTarget::Position(x) = target {
            if !x.is_finite() {
                return Err(Error::invalid_parameter("goal position must be finite"));
            }
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(Error::invalid_parameter(format!("goal weight must be positive, got {}", weight)));
        }
        if !(decay_rate.is_finite() && (0.0..=1.0).contains(&decay_rate)) {
            return Err(Error::invalid_parameter(format!(
                "goal decay rate must be in [0, 1], got {}",
                decay_rate
            )));
        }
        Ok(Self {
            target_position: target.position(),
            target_basis: target.basis(),
            weight,
            decay_rate,
            source,
            created_tick: tick,
        })
    }
}

/// Ordered, capped list of active attractors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalField {
    attractors: Vec<GoalAttractor>,
}

impl GoalField {
    pub fn iter(&self) -> impl Iterator<Item = &GoalAttractor> {
        self.attractors.iter()
    }

    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    /// Append an attractor. At capacity the weakest existing one is evicted
    /// first (oldest wins the tie) and returned.
    pub fn add(&mut self, attractor: GoalAttractor, cap: usize) -> Option<GoalAttractor> {
        let cap = cap.max(1);
        let mut evicted = None;
        while self.attractors.len() >= cap {
            match self.weakest() {
                Some(i) => evicted = Some(self.attractors.remove(i)),
                None => break,
            }
        }
        self.attractors.push(attractor);
        evicted
    }

    fn weakest(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, a) in self.attractors.iter().enumerate() {
            match best {
                None => best = Some(i),
                Some(b) => {
                    let w = &self.attractors[b];
                    if a.weight < w.weight || (a.weight == w.weight && a.created_tick < w.created_tick) {
                        best = Some(i);
                    }
                }
            }
        }
        best
    }

    /// Multiplicative decay, then prune everything below `epsilon`.
    /// Returns the number of pruned attractors.
    pub fn decay(&mut self, epsilon: f64) -> usize {
        for a in self.attractors.iter_mut() {
            a.weight *= 1.0 - a.decay_rate;
        }
        let before = self.attractors.len();
        self.attractors.retain(|a| a.weight.is_finite() && a.weight >= epsilon);
        before - self.attractors.len()
    }

    /// Heaviest attractor; the earliest in the list wins ties.
    pub fn strongest(&self) -> Option<&GoalAttractor> {
        let mut best: Option<&GoalAttractor> = None;
        for a in &self.attractors {
            if best.map_or(true, |b| a.weight > b.weight) {
                best = Some(a);
            }
        }
        best
    }

    pub fn targets_basis(&self, mode: CognitiveMode) -> bool {
        self.attractors.iter().any(|a| a.target_basis == mode)
    }

    /// min(1, Σ volitional + ½ Σ others)
    pub fn intention(&self) -> f64 {
        let total: f64 = self
            .attractors
            .iter()
            .map(|a| match a.source {
                GoalSource::Volitional => a.weight,
                GoalSource::Emergent | GoalSource::Learned => 0.5 * a.weight,
            })
            .sum();
        if total.is_finite() {
            total.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn wells(&self) -> Vec<Well> {
        self.attractors
            .iter()
            .map(|a| Well { position: a.target_position, depth: a.weight })
            .collect()
    }

    /// Drop invalid entries and trim to the cap after a load.
    pub fn sanitize(&mut self, cap: usize) {
        self.attractors.retain(|a| {
            a.weight.is_finite() && a.weight > 0.0 && a.target_position.is_finite() && a.decay_rate.is_finite()
        });
        for a in self.attractors.iter_mut() {
            a.decay_rate = a.decay_rate.clamp(0.0, 1.0);
        }
        while self.attractors.len() > cap.max(1) {
            match self.weakest() {
                Some(i) => {
                    self.attractors.remove(i);
                }
                None => break,
            }
        }
    }
}
