//! Snapshot export — read-only projection of `CoreState` for rendering

use crate::state::CoreState;
use cognis_core::complex;
use cognis_core::{AttractorView, EmotionView, MetaView, PsiView, QuantumView, Snapshot};

fn pct(v: f64) -> f64 {
    (v * 100.0).clamp(0.0, 100.0)
}

pub fn export_snapshot(state: &CoreState) -> Snapshot {
    let s = &state.scalar;
    let m = &state.meta;
    let e = &state.emotion;
    let q = &state.quantum;

    Snapshot {
        iteration: s.iteration,
        psi: PsiView {
            real: s.psi.re,
            imag: s.psi.im,
            magnitude: complex::magnitude(s.psi),
            phase: complex::phase(s.psi),
        },
        omega: s.omega,
        capacity: s.capacity,
        meta: MetaView {
            awareness_pct: pct(m.awareness_of_awareness),
            self_model_accuracy_pct: pct(m.self_model_accuracy),
            recursion_depth: m.recursion_depth,
            loop_phase: m.loop_phase,
            loop_detected: m.loop_detected,
            strange_loop_phase: m.strange_loop_phase,
            observation_collapse_pct: pct(m.observation_collapse),
            fixed_point: m.fixed_point_class,
            fixed_point_convergence_pct: pct(m.fixed_point_convergence),
        },
        emotion: EmotionView {
            mood: e.mood,
            momentum: e.momentum,
            volatility: e.volatility,
            noise_amplitude: e.noise_amplitude,
        },
        quantum: QuantumView {
            populations: q.observables.populations,
            entropy: q.observables.entropy,
            total_coherence: q.observables.total_coherence,
            dominant_basis: q.dominant_basis,
            in_superposition: q.in_superposition,
            measurement_count: q.measurement_count,
            last_measurement: q.last_measurement,
            kinetic_energy: q.observables.kinetic_energy,
            potential_energy: q.observables.potential_energy,
            total_energy: q.observables.total_energy,
            intention_strength: q.intention_strength,
            volitional_charge: q.volitional_charge,
            volitional_ready: q.volitional_ready,
            attractors: q
                .goals
                .iter()
                .map(|a| AttractorView {
                    target_position: a.target_position,
                    aligned_basis: a.target_basis,
                    weight: a.weight,
                    source: a.source,
                })
                .collect(),
            memory_potential_strength: q.memory_strength,
        },
    }
}
