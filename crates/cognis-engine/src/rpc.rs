//! RPC router — dispatches JSON-RPC method calls to the engine
//!
//! Methods: core.evolve, core.snapshot, quantum.submit, goal.set,
//! collapse.trigger, anomalies.list, health, echo.

use crate::driver::EngineHandle;
use crate::quantum::goals::GoalTarget;
use crate::quantum::submit_quantum_evolution;
use crate::recurrence::Interaction;
use crate::version::SCHEMA_VERSION;
use cognis_core::protocol::codes;
use cognis_core::{Error, EvolutionRequest, GoalSource, RpcResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Result type for RPC handlers.
pub type RpcResult = Result<Value, (i32, String)>;

/// Route an RPC method call to the appropriate handler.
pub async fn route_rpc(method: &str, params: Value, handle: &EngineHandle) -> RpcResult {
    match method {
        "core.evolve" => handle_evolve(params, handle).await,
        "core.snapshot" => to_value(handle.snapshot().await),
        "quantum.submit" => handle_quantum_submit(params),
        "goal.set" => handle_goal_set(params, handle).await,
        "collapse.trigger" => handle_collapse(handle).await,
        "anomalies.list" => handle_anomalies(handle).await,
        "health" => handle_health(handle).await,
        "echo" => Ok(params),
        _ => Err((codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))),
    }
}

/// Convert an RPC result to an RpcResponse.
pub fn to_response(id: &str, result: RpcResult) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err((code, message)) => RpcResponse::err(id, code, message),
    }
}

fn to_value<T: serde::Serialize>(value: T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| (codes::INTERNAL, e.to_string()))
}

fn parse<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T, (i32, String)> {
    serde_json::from_value(params).map_err(|e| (codes::INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn map_error(e: Error) -> (i32, String) {
    let code = match e {
        Error::InvalidDimension { .. } | Error::InvalidParameter(_) => codes::INVALID_PARAMS,
        Error::CollapseNotReady { .. } => codes::COLLAPSE_NOT_READY,
        _ => codes::INTERNAL,
    };
    (code, e.to_string())
}

// ---------------------------------------------------------------------------
// core.evolve — one request-triggered evolution
// ---------------------------------------------------------------------------

async fn handle_evolve(params: Value, handle: &EngineHandle) -> RpcResult {
    let input: Interaction = parse(params)?;
    let (report, snapshot) = handle.interact_with_snapshot(input).await;
    Ok(json!({
        "iteration": report.iteration,
        "clamped": report.clamped,
        "anomalies": report.anomalies.len(),
        "passive": report.quantum.passive,
        "volitional": report.quantum.volitional,
        "snapshot": snapshot,
    }))
}

// ---------------------------------------------------------------------------
// quantum.submit — external orchestrator step (no engine state touched)
// ---------------------------------------------------------------------------

fn handle_quantum_submit(params: Value) -> RpcResult {
    let request: EvolutionRequest = parse(params)?;
    let result = submit_quantum_evolution(&request).map_err(map_error)?;
    to_value(result)
}

// ---------------------------------------------------------------------------
// goal.set — add an attractor
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GoalParams {
    target: GoalTarget,
    weight: f64,
    #[serde(default = "default_decay")]
    decay_rate: f64,
    #[serde(default = "default_source")]
    source: GoalSource,
}

fn default_decay() -> f64 {
    0.02
}

fn default_source() -> GoalSource {
    GoalSource::Volitional
}

async fn handle_goal_set(params: Value, handle: &EngineHandle) -> RpcResult {
    let p: GoalParams = parse(params)?;
    let evicted = handle
        .set_goal_attractor(p.target, p.weight, p.decay_rate, p.source)
        .await
        .map_err(map_error)?;
    let snapshot = handle.snapshot().await;
    Ok(json!({
        "evicted": evicted,
        "attractors": snapshot.quantum.attractors,
        "intention_strength": snapshot.quantum.intention_strength,
    }))
}

// ---------------------------------------------------------------------------
// collapse.trigger — volitional collapse on demand
// ---------------------------------------------------------------------------

async fn handle_collapse(handle: &EngineHandle) -> RpcResult {
    let record = handle.trigger_volitional_collapse().await.map_err(map_error)?;
    info!("RPC volitional collapse toward {}", record.basis);
    to_value(record)
}

// ---------------------------------------------------------------------------
// anomalies.list / health
// ---------------------------------------------------------------------------

async fn handle_anomalies(handle: &EngineHandle) -> RpcResult {
    let (total, recent) = handle.anomalies().await;
    Ok(json!({ "total": total, "recent": recent }))
}

async fn handle_health(handle: &EngineHandle) -> RpcResult {
    let snapshot = handle.snapshot().await;
    Ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": SCHEMA_VERSION,
        "iteration": snapshot.iteration,
        "persistence": handle.persister().is_some(),
    }))
}
