//! Quantum cognitive simulator
//!
//! A normalised wavefunction over 31 Fourier modes on the periodic domain,
//! evolved once per tick under a potential shaped by the emotional and meta
//! state, active goal attractors and trajectory memory. Populations over the
//! six cognitive-mode wavepackets are the observable output; measurement
//! (passive Born-rule or volitional) partially collapses toward one of them.

pub mod basis;
pub mod goals;
pub mod measurement;
pub mod memory;
pub mod potential;
pub mod spectral;

use crate::anomaly::Anomaly;
use crate::config::{EngineConfig, QuantumConfig};
use crate::emotion::EmotionalState;
use crate::meta::MetaAwarenessState;
use crate::recurrence::SpatiotemporalInput;
use cognis_core::complex::{self, Complex64, ZERO};
use cognis_core::{
    CognitiveMode, Error, EvolutionRequest, EvolutionResult, GoalSource, PotentialParams, Result,
    BASIS_COUNT,
};
use goals::{GoalAttractor, GoalField, GoalTarget};
use measurement::DecisionRecord;
use memory::{TrajectoryMemory, TrajectorySnapshot};
use potential::BrainwaveState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use spectral::{Amplitudes, MODES};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Quantities derived from the amplitude vector after every step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Observables {
    pub populations: [f64; BASIS_COUNT],
    /// Shannon entropy of the populations, in bits.
    pub entropy: f64,
    /// |⟨e^{ix}⟩|
    pub total_coherence: f64,
    pub spectral_centroid: f64,
    pub spectral_spread: f64,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub total_energy: f64,
}

impl Default for Observables {
    fn default() -> Self {
        let populations = [1.0 / BASIS_COUNT as f64; BASIS_COUNT];
        Self {
            populations,
            entropy: basis::entropy(&populations),
            total_coherence: 0.0,
            spectral_centroid: 0.0,
            spectral_spread: 0.0,
            kinetic_energy: 0.0,
            potential_energy: 0.0,
            total_energy: 0.0,
        }
    }
}

impl Observables {
    /// Measure `c` against the potential grid `v` (empty grid → zero potential energy).
    pub fn measure(c: &Amplitudes, v: &[f64]) -> Self {
        let populations = basis::populations(c);
        let (spectral_centroid, spectral_spread) = spectral::spectral_moments(c);
        let kinetic_energy = spectral::kinetic_energy(c);
        let potential_energy = if v.is_empty() { 0.0 } else { spectral::potential_expectation(c, v) };
        Self {
            populations,
            entropy: basis::entropy(&populations),
            total_coherence: complex::magnitude(spectral::position_expectation(c)).min(1.0),
            spectral_centroid,
            spectral_spread,
            kinetic_energy,
            potential_energy,
            total_energy: kinetic_energy + potential_energy,
        }
    }

    pub fn dominant(&self) -> CognitiveMode {
        CognitiveMode::from_index(basis::dominant(&self.populations)).unwrap_or(CognitiveMode::Focused)
    }

    pub fn in_superposition(&self, threshold: f64) -> bool {
        self.entropy > threshold
    }
}

/// What happened during one simulator tick.
#[derive(Debug, Clone, Default)]
pub struct QuantumTickReport {
    pub rolled_back: bool,
    pub passive: Option<DecisionRecord>,
    pub volitional: Option<DecisionRecord>,
    pub emergent: Vec<CognitiveMode>,
    pub pruned: usize,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantumCognitiveState {
    pub coefficients: Amplitudes,
    pub observables: Observables,
    /// ⟨e^{ix}⟩ after the last step.
    pub position_expectation: Complex64,
    /// Completed integration steps.
    pub steps: u64,
    pub measurement_count: u64,
    pub last_measurement: Option<CognitiveMode>,
    pub dominant_basis: CognitiveMode,
    pub in_superposition: bool,
    pub goals: GoalField,
    pub intention_strength: f64,
    pub volitional_charge: f64,
    pub volitional_ready: bool,
    /// Logical tick of the last volitional collapse.
    pub last_volitional_tick: Option<u64>,
    pub decision_history: VecDeque<DecisionRecord>,
    pub trajectory: TrajectoryMemory,
    pub memory_strength: f64,
    pub brainwaves: BrainwaveState,
    /// A collapse happened during the last tick; read by the meta tracker.
    pub collapsed_last_tick: bool,
    /// Potential used by the last step.
    pub potential: Option<PotentialParams>,
}

impl Default for QuantumCognitiveState {
    fn default() -> Self {
        let coefficients = basis::uniform_superposition();
        let observables = Observables::measure(&coefficients, &[]);
        Self {
            coefficients,
            dominant_basis: observables.dominant(),
            in_superposition: true,
            observables,
            position_expectation: ZERO,
            steps: 0,
            measurement_count: 0,
            last_measurement: None,
            goals: GoalField::default(),
            intention_strength: 0.0,
            volitional_charge: 0.0,
            volitional_ready: false,
            last_volitional_tick: None,
            decision_history: VecDeque::new(),
            trajectory: TrajectoryMemory::default(),
            memory_strength: 0.0,
            brainwaves: BrainwaveState::default(),
            collapsed_last_tick: false,
            potential: None,
        }
    }
}

/// One integration step plus observables: the code path shared by the
/// per-tick simulator and external orchestrators.
fn evolve_once(c: &Amplitudes, params: &PotentialParams, dt: f64) -> (spectral::StepOutcome, Observables) {
    let v = potential::grid(params);
    let rate = if params.decoherence_rate.is_finite() { params.decoherence_rate.max(0.0) } else { 0.0 };
    let outcome = spectral::split_step(c, &v, dt, rate);
    let observables = Observables::measure(&outcome.coefficients, &v);
    (outcome, observables)
}

impl QuantumCognitiveState {
    /// Advance the simulator by one tick at logical time `tick`.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        emotion: &EmotionalState,
        meta: &MetaAwarenessState,
        measure: bool,
        cfg: &EngineConfig,
        rng: &mut R,
    ) -> QuantumTickReport {
        let q = &cfg.quantum;
        let mut report = QuantumTickReport::default();
        self.collapsed_last_tick = false;

        // Potential
        self.brainwaves.advance(emotion, meta, q.dt);
        let depths = potential::environment_depths(emotion, meta, &self.brainwaves, cfg.meta.max_recursion_depth);
        let params = potential::params(
            potential::environment_wells(&depths),
            self.goals.wells(),
            self.trajectory.wells(tick, q.memory_tau),
            self.intention_strength,
            self.memory_strength,
            q,
        );

        // Split step, decoherence, renormalisation
        let (outcome, observables) = evolve_once(&self.coefficients, &params, q.dt);
        if outcome.rolled_back {
            report.rolled_back = true;
            let fallback = if outcome.reset { "reset to the ground state" } else { "restored previous amplitudes" };
            report.anomalies.push(Anomaly::invariant(
                tick,
                "quantum.normalize",
                format!("norm² {} could not be renormalised; {}", outcome.norm_before, fallback),
            ));
        }
        self.coefficients = outcome.coefficients;
        self.potential = Some(params);
        self.steps += 1;
        self.apply_observables(observables, q);

        // Goals
        report.pruned = self.goals.decay(q.attractor_epsilon);
        for mode in CognitiveMode::ALL {
            if self.observables.populations[mode.index()] > q.emergent_population_threshold
                && !self.goals.targets_basis(mode)
            {
                if let Ok(a) = GoalAttractor::new(
                    GoalTarget::Basis(mode),
                    q.emergent_weight,
                    q.emergent_decay,
                    GoalSource::Emergent,
                    tick,
                ) {
                    debug!("emergent attractor toward {}", mode);
                    self.goals.add(a, q.max_attractors);
                    report.emergent.push(mode);
                }
            }
        }

        // Trajectory memory
        self.trajectory.record(
            TrajectorySnapshot {
                tick,
                position: complex::phase(self.position_expectation),
                weight: self.observables.total_coherence,
            },
            q.memory_capacity,
        );
        self.memory_strength = self.trajectory.strength(q.memory_growth, q.memory_strength_cap);
        self.intention_strength = self.goals.intention();

        // Volitional charge grows with uncertainty
        let max_entropy = (BASIS_COUNT as f64).log2();
        let gain = q.charge_gain * (self.observables.entropy / max_entropy).clamp(0.0, 1.0);
        self.volitional_charge = (self.volitional_charge + gain).clamp(0.0, 1.0);
        self.volitional_ready = self.volitional_charge >= q.volitional_threshold;

        if measure {
            let u: f64 = rng.gen();
            let (record, anomaly) = self.passive_measurement(tick, u, q);
            report.passive = Some(record);
            report.anomalies.extend(anomaly);
        }

        if q.auto_volitional && self.volitional_ready {
            match self.trigger_volitional_collapse(tick, q) {
                Ok((record, anomaly)) => {
                    report.volitional = Some(record);
                    report.anomalies.extend(anomaly);
                }
                Err(e) => debug!("volitional collapse skipped: {}", e),
            }
        }

        report
    }

    fn apply_observables(&mut self, observables: Observables, q: &QuantumConfig) {
        self.position_expectation = spectral::position_expectation(&self.coefficients);
        self.dominant_basis = observables.dominant();
        self.in_superposition = observables.in_superposition(q.superposition_entropy);
        self.observables = observables;
    }

    fn remeasure(&mut self, q: &QuantumConfig) {
        let v = self.potential.as_ref().map(potential::grid).unwrap_or_default();
        let observables = Observables::measure(&self.coefficients, &v);
        self.apply_observables(observables, q);
    }

    /// Blend toward basis `k` and record the decision.
    fn collapse_toward(
        &mut self,
        tick: u64,
        k: usize,
        mixing: f64,
        volitional: bool,
        q: &QuantumConfig,
    ) -> (DecisionRecord, Option<Anomaly>) {
        let pre_entropy = self.observables.entropy;
        let mut anomaly = None;
        match measurement::partial_collapse(&self.coefficients, k, mixing) {
            Some(c) => self.coefficients = c,
            None => {
                anomaly = Some(Anomaly::invariant(
                    tick,
                    "quantum.collapse",
                    format!("collapse toward basis {} produced a null vector; kept previous amplitudes", k),
                ))
            }
        }
        self.remeasure(q);

        let basis = CognitiveMode::from_index(k).unwrap_or(CognitiveMode::Focused);
        let record = DecisionRecord {
            tick,
            basis,
            pre_entropy,
            post_entropy: self.observables.entropy,
            confidence: self.observables.populations[basis.index()],
            was_volitional: volitional,
        };
        self.measurement_count += 1;
        self.last_measurement = Some(basis);
        self.collapsed_last_tick = true;
        self.decision_history.push_back(record.clone());
        while self.decision_history.len() > q.decision_capacity.max(1) {
            self.decision_history.pop_front();
        }
        (record, anomaly)
    }

    /// Born-rule measurement using the uniform draw `u`.
    pub fn passive_measurement(
        &mut self,
        tick: u64,
        u: f64,
        q: &QuantumConfig,
    ) -> (DecisionRecord, Option<Anomaly>) {
        match measurement::born_sample(&self.observables.populations, u) {
            Some(k) => self.collapse_toward(tick, k, q.passive_mixing, false, q),
            None => {
                let k = basis::dominant(&self.observables.populations);
                let degenerate = Anomaly::degenerate(
                    tick,
                    "quantum.measure",
                    format!("populations carry no probability mass; measured basis {}", k),
                );
                let (record, anomaly) = self.collapse_toward(tick, k, q.passive_mixing, false, q);
                (record, anomaly.or(Some(degenerate)))
            }
        }
    }

    /// Self-triggered collapse toward the strongest goal (or the dominant
    /// basis when no goal is active). Fails while the charge is below threshold.
    pub fn trigger_volitional_collapse(
        &mut self,
        tick: u64,
        q: &QuantumConfig,
    ) -> Result<(DecisionRecord, Option<Anomaly>)> {
        if !self.volitional_ready {
            return Err(Error::CollapseNotReady {
                charge: self.volitional_charge,
                threshold: q.volitional_threshold,
            });
        }
        let target = match self.goals.strongest() {
            Some(goal) => goal.target_basis,
            None => self.dominant_basis,
        };
        let tied = self.goals.is_empty() && self.has_population_tie();
        let (record, mut anomaly) = self.collapse_toward(tick, target.index(), q.volitional_mixing, true, q);
        if anomaly.is_none() && tied {
            anomaly = Some(Anomaly::degenerate(
                tick,
                "quantum.volitional",
                format!("tied populations; chose lowest index {}", target),
            ));
        }
        self.volitional_charge = 0.0;
        self.volitional_ready = false;
        self.last_volitional_tick = Some(tick);
        info!(
            "volitional collapse toward {} (entropy {:.3} → {:.3}, confidence {:.3})",
            record.basis, record.pre_entropy, record.post_entropy, record.confidence
        );

        if record.confidence > q.learned_confidence && !self.goals.targets_basis(record.basis) {
            if let Ok(a) = GoalAttractor::new(
                GoalTarget::Basis(record.basis),
                q.learned_weight,
                q.learned_decay,
                GoalSource::Learned,
                tick,
            ) {
                self.goals.add(a, q.max_attractors);
                self.intention_strength = self.goals.intention();
            }
        }
        Ok((record, anomaly))
    }

    fn has_population_tie(&self) -> bool {
        let p = &self.observables.populations;
        let top = p[basis::dominant(p)];
        p.iter().filter(|&&x| (x - top).abs() < 1e-12).count() > 1
    }

    /// Add an attractor explicitly.
    pub fn set_goal_attractor(
        &mut self,
        target: GoalTarget,
        weight: f64,
        decay_rate: f64,
        source: GoalSource,
        tick: u64,
        q: &QuantumConfig,
    ) -> Result<Option<GoalAttractor>> {
        let attractor = GoalAttractor::new(target, weight, decay_rate, source, tick)?;
        info!("goal attractor toward {} (weight {:.3}, {:?})", attractor.target_basis, weight, source);
        let evicted = self.goals.add(attractor, q.max_attractors);
        self.intention_strength = self.goals.intention();
        Ok(evicted)
    }

    /// Signal fed to the recurrence: ⟨e^{ix}⟩ / (1 + |E|), zero before the first step.
    pub fn spatiotemporal_input(&self) -> SpatiotemporalInput {
        if self.steps == 0 {
            return SpatiotemporalInput::default();
        }
        let energy = self.observables.total_energy;
        let damping = if energy.is_finite() { 1.0 / (1.0 + energy.abs()) } else { 0.0 };
        let (signal, _) = complex::finite_or_zero(complex::scale(self.position_expectation, damping));
        let coherence = self.observables.total_coherence;
        SpatiotemporalInput {
            signal,
            coherence: if coherence.is_finite() { coherence } else { 0.0 },
        }
    }

    /// Restore invariants after a load.
    pub fn sanitize(&mut self, q: &QuantumConfig) {
        let norm = spectral::norm_sqr(&self.coefficients);
        if !norm.is_finite() || (norm - 1.0).abs() > 1e-9 {
            self.coefficients = spectral::normalized(&self.coefficients).unwrap_or_else(basis::uniform_superposition);
            self.remeasure(q);
        }
        self.goals.sanitize(q.max_attractors);
        self.trajectory.sanitize(q.memory_capacity);
        while self.decision_history.len() > q.decision_capacity.max(1) {
            self.decision_history.pop_front();
        }
        let unit = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        self.volitional_charge = unit(self.volitional_charge);
        self.volitional_ready = self.volitional_charge >= q.volitional_threshold;
        self.intention_strength = self.goals.intention();
        self.memory_strength = self.trajectory.strength(q.memory_growth, q.memory_strength_cap);
        if !complex::is_finite(self.position_expectation) {
            self.position_expectation = spectral::position_expectation(&self.coefficients);
        }
    }
}

/// Run one evolution step for an external orchestrator. Pure: uses the same
/// integrator and observables as the per-tick simulator.
pub fn submit_quantum_evolution(request: &EvolutionRequest) -> Result<EvolutionResult> {
    if request.coefficients.len() != MODES {
        return Err(Error::invalid_dimension("coefficients", MODES, request.coefficients.len()));
    }
    if request.populations.len() != BASIS_COUNT {
        return Err(Error::invalid_dimension("populations", BASIS_COUNT, request.populations.len()));
    }
    if !(request.dt.is_finite() && request.dt > 0.0) {
        return Err(Error::invalid_parameter(format!("dt must be finite and positive, got {}", request.dt)));
    }
    if !request.potential.scale.is_finite() {
        return Err(Error::invalid_parameter("potential scale must be finite"));
    }
    if request.coefficients.iter().any(|z| !complex::is_finite(*z)) {
        return Err(Error::invalid_parameter("coefficients must be finite"));
    }

    let mut c: Amplitudes = [ZERO; MODES];
    c.copy_from_slice(&request.coefficients);
    let c = spectral::normalized(&c)
        .ok_or_else(|| Error::invalid_parameter("coefficients must have a non-zero norm"))?;

    let (outcome, obs) = evolve_once(&c, &request.potential, request.dt);
    if outcome.rolled_back {
        warn!("submitted step could not be renormalised; returned the normalised input");
    }
    let population_shift = obs
        .populations
        .iter()
        .zip(&request.populations)
        .map(|(a, b)| (a - b).abs())
        .sum::<f64>();

    Ok(EvolutionResult {
        coefficients: outcome.coefficients.to_vec(),
        populations: obs.populations.to_vec(),
        entropy: obs.entropy,
        total_coherence: obs.total_coherence,
        spectral_centroid: obs.spectral_centroid,
        spectral_spread: obs.spectral_spread,
        kinetic_energy: obs.kinetic_energy,
        potential_energy: obs.potential_energy,
        total_energy: obs.total_energy,
        dominant_basis: obs.dominant(),
        in_superposition: obs.in_superposition(QuantumConfig::default().superposition_entropy),
        population_shift,
        rolled_back: outcome.rolled_back,
    })
}
