//! Trajectory memory — the non-Markovian part of the potential
//!
//! Each tick stores where the wavefunction was centred. The recency-weighted
//! histogram of those positions becomes a set of wells, so the state is drawn
//! back toward regions it has visited recently. Strength grows with history
//! size up to a fixed cap.

use cognis_core::Well;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::TAU;

/// Histogram resolution over [0, 2π).
pub const HISTOGRAM_BINS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySnapshot {
    pub tick: u64,
    /// Mean position arg⟨e^{ix}⟩ on [0, 2π).
    pub position: f64,
    /// Localisation |⟨e^{ix}⟩| at the time.
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrajectoryMemory {
    entries: VecDeque<TrajectorySnapshot>,
}

impl TrajectoryMemory {
    pub fn record(&mut self, snapshot: TrajectorySnapshot, capacity: usize) {
        if !(snapshot.position.is_finite() && snapshot.weight.is_finite()) {
            return;
        }
        self.entries.push_back(TrajectorySnapshot {
            position: snapshot.position.rem_euclid(TAU),
            weight: snapshot.weight.clamp(0.0, 1.0),
            ..snapshot
        });
        while self.entries.len() > capacity.max(1) {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrajectorySnapshot> {
        self.entries.iter()
    }

    /// min(cap, growth × len)
    pub fn strength(&self, growth: f64, cap: f64) -> f64 {
        (growth * self.entries.len() as f64).clamp(0.0, cap.max(0.0))
    }

    /// Recency-weighted histogram wells, deepest normalised to 1.
    pub fn wells(&self, now: u64, tau: f64) -> Vec<Well> {
        let tau = if tau.is_finite() && tau > 0.0 { tau } else { 1.0 };
        let bin_width = TAU / HISTOGRAM_BINS as f64;
        let mut bins = [0.0_f64; HISTOGRAM_BINS];
        for e in &self.entries {
            let age = now.saturating_sub(e.tick) as f64;
            let bin = ((e.position / bin_width) as usize).min(HISTOGRAM_BINS - 1);
            bins[bin] += e.weight * (-age / tau).exp();
        }
        let peak = bins.iter().cloned().fold(0.0, f64::max);
        if !(peak.is_finite() && peak > 0.0) {
            return Vec::new();
        }
        bins.iter()
            .enumerate()
            .filter(|(_, &b)| b > 0.0)
            .map(|(i, &b)| Well { position: (i as f64 + 0.5) * bin_width, depth: b / peak })
            .collect()
    }

    pub fn sanitize(&mut self, capacity: usize) {
        self.entries.retain(|e| e.position.is_finite() && e.weight.is_finite());
        while self.entries.len() > capacity.max(1) {
            self.entries.pop_front();
        }
    }
}
