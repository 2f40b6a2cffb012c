//! CognitiveEngine — the single evolution authority over `CoreState`
//!
//! One call runs the whole tick in a fixed order:
//!   recurrence → emotion → meta-awareness → quantum simulator
//! Later stages read what earlier stages wrote, so a call is never re-entrant.
//! The PRNG is owned by the engine and passed down explicitly.

use crate::anomaly::{Anomaly, AnomalyLog};
use crate::config::EngineConfig;
use crate::meta::MetaObservation;
use crate::quantum::goals::{GoalAttractor, GoalTarget};
use crate::quantum::measurement::DecisionRecord;
use crate::quantum::QuantumTickReport;
use crate::recurrence::{self, Interaction, RecurrenceTerms};
use crate::snapshot::export_snapshot;
use crate::state::CoreState;
use cognis_core::{Complex64, GoalSource, Result, Snapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Everything one evolution call did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub iteration: u64,
    pub psi: Complex64,
    pub terms: RecurrenceTerms,
    pub clamped: bool,
    pub meta: MetaObservation,
    pub quantum: QuantumTickReport,
    /// Anomalies from every stage of this call.
    pub anomalies: Vec<Anomaly>,
}

/// Evolve in place. Deterministic in (state, input, config, rng state).
/// `cfg` is range-checked first, as `CognitiveEngine` does on construction.
pub fn evolve_in_place<R: Rng + ?Sized>(
    state: &mut CoreState,
    input: &Interaction,
    cfg: &EngineConfig,
    rng: &mut R,
) -> TickReport {
    let cfg = cfg.clone().sanitized();
    tick(state, input, &cfg, rng)
}

/// One tick under an already sanitized config.
fn tick<R: Rng + ?Sized>(state: &mut CoreState, input: &Interaction, cfg: &EngineConfig, rng: &mut R) -> TickReport {
    let spatio = state.quantum.spatiotemporal_input();
    let outcome = recurrence::step(
        &mut state.scalar,
        &state.emotion,
        &state.meta,
        spatio,
        input,
        cfg,
        rng,
    );

    state.emotion.update(
        outcome.sentiment,
        input.experience_influence,
        cfg.recurrence.experience_gain,
        &cfg.emotion,
    );

    let observed = state.quantum.collapsed_last_tick;
    let meta = state.meta.observe(state.scalar.psi, observed, &cfg.meta);

    let iteration = state.scalar.iteration;
    let mut quantum = state.quantum.tick(iteration, &state.emotion, &state.meta, input.measure, cfg, rng);

    let mut anomalies = outcome.anomalies;
    anomalies.append(&mut quantum.anomalies);

    TickReport {
        iteration,
        psi: state.scalar.psi,
        terms: outcome.terms,
        clamped: outcome.clamped,
        meta,
        quantum,
        anomalies,
    }
}

/// Pure form: returns the successor state and leaves `state` untouched.
pub fn evolve<R: Rng + ?Sized>(
    state: &CoreState,
    input: &Interaction,
    cfg: &EngineConfig,
    rng: &mut R,
) -> (CoreState, TickReport) {
    let mut next = state.clone();
    let report = evolve_in_place(&mut next, input, cfg, rng);
    (next, report)
}

/// Generator seed for a state restored at `iteration`.
pub fn resume_seed(seed: u64, iteration: u64) -> u64 {
    seed ^ iteration.rotate_left(17)
}

pub struct CognitiveEngine {
    state: CoreState,
    config: EngineConfig,
    rng: ChaCha8Rng,
    anomalies: AnomalyLog,
}

impl CognitiveEngine {
    /// Fresh state: Ψ = (1, 0), ω = 1, uniform superposition.
    pub fn new(config: EngineConfig) -> Self {
        Self::from_state(CoreState::default(), config)
    }

    /// Resume from a restored state. Ranges are re-checked and the generator
    /// is reseeded from the configured seed and the restored iteration.
    pub fn from_state(mut state: CoreState, config: EngineConfig) -> Self {
        let config = config.sanitized();
        state.sanitize(&config);
        let rng = ChaCha8Rng::seed_from_u64(resume_seed(config.seed, state.iteration()));
        info!(
            "Cognitive engine ready at iteration {} (seed {})",
            state.iteration(),
            config.seed
        );
        Self { state, config, rng, anomalies: AnomalyLog::default() }
    }

    pub fn state(&self) -> &CoreState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn anomalies(&self) -> &AnomalyLog {
        &self.anomalies
    }

    /// Request-triggered evolution.
    pub fn interact(&mut self, input: &Interaction) -> TickReport {
        let report = tick(&mut self.state, input, &self.config, &mut self.rng);
        self.anomalies.extend(report.anomalies.iter().cloned());
        debug!(
            "tick {} |Ψ|={:.4} entropy={:.3} dominant={}",
            report.iteration,
            report.psi.norm(),
            self.state.quantum.observables.entropy,
            self.state.quantum.dominant_basis
        );
        report
    }

    /// Background perturbation: scaled-down noise, no measurement.
    pub fn ambient_tick(&mut self) -> TickReport {
        let input = Interaction::ambient(self.config.driver.ambient_noise_scale);
        self.interact(&input)
    }

    /// Read-only projection for rendering.
    pub fn snapshot(&self) -> Snapshot {
        export_snapshot(&self.state)
    }

    pub fn set_goal_attractor(
        &mut self,
        target: GoalTarget,
        weight: f64,
        decay_rate: f64,
        source: GoalSource,
    ) -> Result<Option<GoalAttractor>> {
        let tick = self.state.iteration();
        self.state
            .quantum
            .set_goal_attractor(target, weight, decay_rate, source, tick, &self.config.quantum)
    }

    /// Collapse toward the strongest goal now. Fails with `CollapseNotReady`
    /// while the charge is below threshold.
    pub fn trigger_volitional_collapse(&mut self) -> Result<DecisionRecord> {
        let tick = self.state.iteration();
        let (record, anomaly) = self
            .state
            .quantum
            .trigger_volitional_collapse(tick, &self.config.quantum)?;
        self.anomalies.extend(anomaly);
        Ok(record)
    }
}
