//! Anomaly records — numerical trouble recovered locally, kept for observability

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{error, warn};

/// Bounded anomaly log length.
pub const ANOMALY_LOG_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// A non-finite term was replaced with zero.
    NumericalAnomaly,
    /// The amplitude vector could not be normalised and was rolled back.
    InvariantViolation,
    /// A measurement had no usable population distribution.
    DegenerateMeasurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Iteration counter when the anomaly occurred.
    pub iteration: u64,
    /// Which term or stage produced it.
    pub source: String,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

impl Anomaly {
    pub fn numerical(iteration: u64, source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AnomalyKind::NumericalAnomaly, Severity::Warning, iteration, source, detail)
    }

    pub fn invariant(iteration: u64, source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AnomalyKind::InvariantViolation, Severity::Critical, iteration, source, detail)
    }

    pub fn degenerate(iteration: u64, source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(AnomalyKind::DegenerateMeasurement, Severity::Warning, iteration, source, detail)
    }

    fn new(
        kind: AnomalyKind,
        severity: Severity,
        iteration: u64,
        source: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let anomaly = Self {
            kind,
            severity,
            iteration,
            source: source.into(),
            detail: detail.into(),
            recorded_at: Utc::now(),
        };
        match severity {
            Severity::Warning => warn!(
                "{:?} at iteration {} in {}: {}",
                kind, iteration, anomaly.source, anomaly.detail
            ),
            Severity::Critical => error!(
                "{:?} at iteration {} in {}: {}",
                kind, iteration, anomaly.source, anomaly.detail
            ),
        }
        anomaly
    }
}

/// Ring buffer of the most recent anomalies.
#[derive(Debug, Clone, Default)]
pub struct AnomalyLog {
    entries: VecDeque<Anomaly>,
    total: u64,
}

impl AnomalyLog {
    pub fn extend(&mut self, anomalies: impl IntoIterator<Item = Anomaly>) {
        for anomaly in anomalies {
            if self.entries.len() == ANOMALY_LOG_CAPACITY {
                self.entries.pop_front();
            }
            self.entries.push_back(anomaly);
            self.total += 1;
        }
    }

    pub fn recent(&self) -> impl Iterator<Item = &Anomaly> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Anomalies ever recorded, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }
}
