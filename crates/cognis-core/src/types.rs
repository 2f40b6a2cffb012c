//! Shared enums for Cognis

use serde::{Deserialize, Serialize};

/// Number of named cognitive modes (basis wavepackets).
pub const BASIS_COUNT: usize = 6;

/// A named cognitive mode. The discriminant is the basis index.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CognitiveMode {
    Focused = 0,
    Diffuse = 1,
    Creative = 2,
    Analytical = 3,
    Emotional = 4,
    Reflective = 5,
}

impl CognitiveMode {
    pub const ALL: [CognitiveMode; BASIS_COUNT] = [
        CognitiveMode::Focused,
        CognitiveMode::Diffuse,
        CognitiveMode::Creative,
        CognitiveMode::Analytical,
        CognitiveMode::Emotional,
        CognitiveMode::Reflective,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            CognitiveMode::Focused => "focused",
            CognitiveMode::Diffuse => "diffuse",
            CognitiveMode::Creative => "creative",
            CognitiveMode::Analytical => "analytical",
            CognitiveMode::Emotional => "emotional",
            CognitiveMode::Reflective => "reflective",
        }
    }
}

impl std::fmt::Display for CognitiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a goal attractor came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoalSource {
    /// Set explicitly through the API.
    Volitional,
    /// Created automatically when a population dominates.
    Emergent,
    /// Created from a confident past decision.
    Learned,
}

/// Meta-awareness loop state machine.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    #[default]
    Normal,
    LoopDetected,
    RecursiveAmplification,
}

/// Classification of the recent |Ψ| trajectory.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixedPointClass {
    Diverging,
    Oscillating,
    #[default]
    Converging,
    Fixed,
}
