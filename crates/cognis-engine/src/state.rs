//! The combined cognitive state — one logical unit of mutable state

use crate::config::EngineConfig;
use crate::emotion::EmotionalState;
use crate::meta::MetaAwarenessState;
use crate::quantum::QuantumCognitiveState;
use crate::recurrence::CognitiveScalarState;
use serde::{Deserialize, Serialize};

/// All four state records. Evolution mutates them together; they are
/// persisted and restored together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreState {
    pub scalar: CognitiveScalarState,
    pub meta: MetaAwarenessState,
    pub emotion: EmotionalState,
    pub quantum: QuantumCognitiveState,
}

impl CoreState {
    /// Current logical time.
    pub fn iteration(&self) -> u64 {
        self.scalar.iteration
    }

    /// Re-establish every range invariant, e.g. after loading from disk.
    pub fn sanitize(&mut self, cfg: &EngineConfig) {
        self.scalar.sanitize(&cfg.recurrence);
        self.meta.sanitize(&cfg.meta);
        self.emotion.sanitize();
        self.quantum.sanitize(&cfg.quantum);
    }
}
