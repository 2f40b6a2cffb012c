//! Cognis Engine — cognitive-state simulation core
//!
//! Per tick, in order:
//! - Recurrence: the nine-term update of the complex scalar Ψ
//! - Emotion: mood, volatility and the noise source for the next update
//! - Meta-awareness: strange-loop detection over bounded Ψ history
//! - Quantum simulator: split-step evolution of 31 Fourier modes under
//!   environment, goal and memory potentials, with Born-rule and volitional collapse
//!
//! Around the core: TOML config, versioned persistence with a coalescing
//! writer, a shared handle with a fixed-rate background driver, the narrator
//! boundary and a JSON-RPC router.

pub mod anomaly;
pub mod config;
pub mod driver;
pub mod emotion;
pub mod engine;
pub mod meta;
pub mod narrator;
pub mod persist;
pub mod quantum;
pub mod recurrence;
pub mod rpc;
pub mod snapshot;
pub mod state;
pub mod version;

pub use config::EngineConfig;
pub use driver::{BackgroundDriver, EngineHandle};
pub use engine::{evolve, evolve_in_place, CognitiveEngine, TickReport};
pub use quantum::submit_quantum_evolution;
pub use recurrence::Interaction;
pub use snapshot::export_snapshot;
pub use state::CoreState;
