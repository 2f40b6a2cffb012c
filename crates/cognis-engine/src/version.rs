//! Persisted-state schema versions and forward migration
//!
//! v1: flat `{ schema_version, scalar, meta, emotion }`, no simulator
//! v2: `{ schema_version, saved_at, state }` with quantum amplitudes and observables
//! v3: adds goal attractors, decision history, trajectory memory, volitional
//!     fields and brainwave state
//!
//! Older blobs are upgraded step by step, missing fields filled with their
//! defaults. A blob newer than this build is refused rather than truncated.

use crate::quantum::potential::BrainwaveState;
use crate::state::CoreState;
use chrono::{DateTime, Utc};
use cognis_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

pub const SCHEMA_VERSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub schema_version: u32,
    #[serde(default)]
    pub saved_at: DateTime<Utc>,
    /// Version the blob was migrated from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_from: Option<u32>,
    pub state: CoreState,
}

impl PersistedState {
    pub fn new(state: CoreState) -> Self {
        Self { schema_version: SCHEMA_VERSION, saved_at: Utc::now(), upgraded_from: None, state }
    }
}

pub fn encode(state: &CoreState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&PersistedState::new(state.clone()))?)
}

/// Parse and migrate a persisted blob of any supported version.
pub fn decode(text: &str) -> Result<PersistedState> {
    let value: Value = serde_json::from_str(text)?;
    let value = migrate(value)?;
    Ok(serde_json::from_value(value)?)
}

fn version_of(root: &Map<String, Value>) -> u32 {
    root.get("schema_version")
        .and_then(Value::as_u64)
        .map(|v| v.min(u32::MAX as u64) as u32)
        .unwrap_or(1)
}

/// Bring a raw blob up to `SCHEMA_VERSION`.
pub fn migrate(value: Value) -> Result<Value> {
    let Value::Object(mut root) = value else {
        return Err(Error::persistence("state blob is not a JSON object"));
    };
    let found = version_of(&root);
    if found > SCHEMA_VERSION {
        return Err(Error::SchemaTooNew { found, supported: SCHEMA_VERSION });
    }
    if found == SCHEMA_VERSION {
        return Ok(Value::Object(root));
    }

    let mut version = found;
    if version == 1 {
        root = migrate_v1_to_v2(root);
        version = 2;
    }
    if version == 2 {
        root = migrate_v2_to_v3(root)?;
        version = 3;
    }
    root.insert("schema_version".into(), json!(version));
    root.insert("upgraded_from".into(), json!(found));
    info!("Migrated persisted state v{} → v{}", found, version);
    Ok(Value::Object(root))
}

fn migrate_v1_to_v2(mut root: Map<String, Value>) -> Map<String, Value> {
    let mut state = Map::new();
    for key in ["scalar", "meta", "emotion"] {
        if let Some(v) = root.remove(key) {
            state.insert(key.into(), v);
        }
    }
    let mut out = Map::new();
    out.insert("schema_version".into(), json!(2));
    if let Some(saved_at) = root.remove("saved_at") {
        out.insert("saved_at".into(), saved_at);
    }
    out.insert("state".into(), Value::Object(state));
    out
}

fn migrate_v2_to_v3(mut root: Map<String, Value>) -> Result<Map<String, Value>> {
    let brainwaves = serde_json::to_value(BrainwaveState::default())?;
    let state = root
        .entry("state")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| Error::persistence("`state` is not a JSON object"))?;
    // Without a simulator section the whole record takes its defaults.
    if let Some(quantum) = state.get_mut("quantum").and_then(Value::as_object_mut) {
        let defaults = [
            ("goals", json!([])),
            ("intention_strength", json!(0.0)),
            ("volitional_charge", json!(0.0)),
            ("volitional_ready", json!(false)),
            ("last_volitional_tick", Value::Null),
            ("decision_history", json!([])),
            ("trajectory", json!([])),
            ("memory_strength", json!(0.0)),
            ("brainwaves", brainwaves),
            ("collapsed_last_tick", json!(false)),
        ];
        for (key, value) in defaults {
            quantum.entry(key).or_insert(value);
        }
    }
    Ok(root)
}
