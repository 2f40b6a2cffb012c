//! Exchange protocol — snapshots, orchestrator requests, JSON-RPC envelope
//!
//! Snapshot (read-only projection rendered by the transport layer):
//!   { "iteration": 12, "psi": { "magnitude": 1.4, "phase": 0.2, ... }, "meta": {...},
//!     "emotion": {...}, "quantum": { "populations": [...], "entropy": 2.1, ... } }
//!
//! Orchestrator step (alternate execution path for the quantum integrator):
//!   EvolutionRequest { coefficients[31], populations[6], dt, potential } → EvolutionResult
//!
//! Wire format for the transport boundary:
//!   { "id": "req-1", "method": "core.evolve", "params": { "sentiment": 0.5 } }
//!   { "id": "req-1", "result": { ... } }
//!   { "id": "req-1", "error": { "code": -32602, "message": "..." } }
//!   { "event": "tick", "data": { ... } }

use crate::complex::Complex64;
use crate::types::{CognitiveMode, FixedPointClass, GoalSource, LoopPhase, BASIS_COUNT};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only projection of the full cognitive state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub iteration: u64,
    pub psi: PsiView,
    pub omega: f64,
    pub capacity: f64,
    pub meta: MetaView,
    pub emotion: EmotionView,
    pub quantum: QuantumView,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PsiView {
    pub real: f64,
    pub imag: f64,
    pub magnitude: f64,
    pub phase: f64,
}

/// Meta-awareness, with [0,1] quantities expressed as percentages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaView {
    pub awareness_pct: f64,
    pub self_model_accuracy_pct: f64,
    pub recursion_depth: u32,
    pub loop_phase: LoopPhase,
    pub loop_detected: bool,
    pub strange_loop_phase: f64,
    pub observation_collapse_pct: f64,
    pub fixed_point: FixedPointClass,
    pub fixed_point_convergence_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionView {
    pub mood: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub noise_amplitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuantumView {
    pub populations: [f64; BASIS_COUNT],
    pub entropy: f64,
    pub total_coherence: f64,
    pub dominant_basis: CognitiveMode,
    pub in_superposition: bool,
    pub measurement_count: u64,
    pub last_measurement: Option<CognitiveMode>,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub total_energy: f64,
    pub intention_strength: f64,
    pub volitional_charge: f64,
    pub volitional_ready: bool,
    pub attractors: Vec<AttractorView>,
    pub memory_potential_strength: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttractorView {
    pub target_position: f64,
    pub aligned_basis: CognitiveMode,
    pub weight: f64,
    pub source: GoalSource,
}

// ---------------------------------------------------------------------------
// Orchestrator step
// ---------------------------------------------------------------------------

/// One Gaussian well in the periodic potential.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Well {
    /// Centre on [0, 2π).
    pub position: f64,
    /// Well depth (non-negative; the well is attractive).
    pub depth: f64,
}

/// Raw mixing weights for the three potential families.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PotentialWeights {
    pub environment: f64,
    pub goal: f64,
    pub memory: f64,
}

/// Everything needed to build V(x) for one integration step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PotentialParams {
    pub environment_wells: Vec<Well>,
    pub goal_wells: Vec<Well>,
    pub memory_wells: Vec<Well>,
    pub weights: PotentialWeights,
    /// Overall energy scale applied after weight normalisation.
    pub scale: f64,
    /// Gaussian width shared by every well.
    pub well_width: f64,
    /// Lower bound on the normalised environment weight.
    pub environment_min_weight: f64,
    /// Upper bound on the normalised memory weight.
    pub memory_weight_cap: f64,
    pub decoherence_rate: f64,
}

/// Request for a single evolution step from an external orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionRequest {
    pub coefficients: Vec<Complex64>,
    pub populations: Vec<f64>,
    pub dt: f64,
    pub potential: PotentialParams,
}

/// Result of one evolution step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionResult {
    pub coefficients: Vec<Complex64>,
    pub populations: Vec<f64>,
    pub entropy: f64,
    pub total_coherence: f64,
    pub spectral_centroid: f64,
    pub spectral_spread: f64,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub total_energy: f64,
    pub dominant_basis: CognitiveMode,
    pub in_superposition: bool,
    /// L1 distance between the submitted and the resulting populations.
    pub population_shift: f64,
    /// True when the step could not be normalised and the input vector was kept.
    pub rolled_back: bool,
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

/// RPC request from the transport layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// RPC response to the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

pub mod codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL: i32 = -32603;
    pub const COLLAPSE_NOT_READY: i32 = -32001;
}

/// Server-pushed event (no id, no request correlation).
#[derive(Debug, Clone, Serialize)]
pub struct EventMessage {
    pub event: String,
    pub data: serde_json::Value,
}

impl EventMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Snapshot pushed after an evolution.
    pub fn tick(snapshot: &Snapshot) -> Self {
        Self::new(
            "tick",
            serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null),
        )
    }

    /// Collapse notification.
    pub fn collapse(basis: CognitiveMode, volitional: bool, confidence: f64) -> Self {
        Self::new(
            "collapse",
            serde_json::json!({
                "basis": basis,
                "volitional": volitional,
                "confidence": confidence,
            }),
        )
    }
}
