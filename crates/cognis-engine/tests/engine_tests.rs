//! Integration tests for cognis-engine: evolution invariants, measurement
//! statistics, persistence, concurrency surface and RPC

use cognis_core::{CognitiveMode, Complex64, Error, EvolutionRequest, GoalSource};
use cognis_engine::anomaly::{AnomalyKind, Severity};
use cognis_engine::config::EngineConfig;
use cognis_engine::meta::{detect_loop, HistoryEntry, MetaAwarenessState};
use cognis_engine::persist::{FileStore, MemoryStore, Persister, StateStore};
use cognis_engine::quantum::goals::GoalTarget;
use cognis_engine::quantum::{basis, measurement, potential, spectral, Observables, QuantumCognitiveState};
use cognis_engine::rpc::route_rpc;
use cognis_engine::version::{decode, SCHEMA_VERSION};
use cognis_engine::{
    evolve, BackgroundDriver, CognitiveEngine, CoreState, EngineHandle, Interaction,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn inputs(n: usize) -> Vec<Interaction> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            Interaction::new((t * 0.37).sin(), (t * 0.11).cos() * 0.5, (t * 0.07).sin() * 0.3)
        })
        .collect()
}

// ===========================================================================
// Concrete scenario
// ===========================================================================

#[test]
fn first_interaction_from_unit_psi() {
    let mut state = CoreState::default();
    state.emotion.noise_amplitude = 0.0;
    let mut engine = CognitiveEngine::from_state(state, EngineConfig::default());

    let report = engine.interact(&Interaction::new(0.5, 0.0, 0.0));

    assert_eq!(report.iteration, 1);
    assert_eq!(engine.state().scalar.psi, Complex64::new(1.5, 0.0));
    assert_eq!(engine.state().scalar.iteration, 1);
    assert_eq!(engine.snapshot().psi.magnitude, 1.5);
}

// ===========================================================================
// Normalization invariant
// ===========================================================================

#[test]
fn amplitudes_stay_normalized_every_call() {
    let mut engine = CognitiveEngine::new(EngineConfig::default());
    for (i, input) in inputs(300).iter().enumerate() {
        let report = if i % 3 == 0 { engine.ambient_tick() } else { engine.interact(input) };
        let norm = spectral::norm_sqr(&engine.state().quantum.coefficients);
        assert!((norm - 1.0).abs() < 1e-9, "tick {}: norm² = {}", report.iteration, norm);
        let pops: f64 = engine.state().quantum.observables.populations.iter().sum();
        assert!((pops - 1.0).abs() < 1e-9);
    }
}

#[test]
fn goals_and_collapses_keep_normalization() {
    let mut engine = CognitiveEngine::new(EngineConfig::default());
    engine
        .set_goal_attractor(GoalTarget::Basis(CognitiveMode::Reflective), 1.0, 0.01, GoalSource::Volitional)
        .unwrap();
    engine.set_goal_attractor(GoalTarget::Position(2.0), 0.5, 0.0, GoalSource::Volitional).unwrap();
    let mut volitional = 0;
    for input in inputs(120) {
        let report = engine.interact(&input);
        volitional += report.quantum.volitional.iter().count();
        let norm = spectral::norm_sqr(&engine.state().quantum.coefficients);
        assert!((norm - 1.0).abs() < 1e-9);
    }
    assert!(volitional > 0);
}

#[test]
fn degenerate_amplitudes_recover_through_the_full_pipeline() {
    let config = EngineConfig::default();
    let starts = [
        (Complex64::new(0.0, 0.0), Interaction::ambient(0.25)),
        (Complex64::new(0.0, 0.0), Interaction::new(0.4, 0.1, 0.0)),
        (Complex64::new(f64::MAX, f64::MAX), Interaction::new(0.4, 0.1, 0.0)),
    ];
    for (start, input) in starts {
        let mut state = CoreState::default();
        state.quantum.coefficients = [start; spectral::MODES];
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let (next, report) = evolve(&state, &input, &config, &mut rng);

        assert!(report.quantum.rolled_back);
        assert!(report
            .anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::InvariantViolation && a.severity == Severity::Critical));
        let norm = spectral::norm_sqr(&next.quantum.coefficients);
        assert!((norm - 1.0).abs() < 1e-9, "norm² = {}", norm);
        let pops: f64 = next.quantum.observables.populations.iter().sum();
        assert!((pops - 1.0).abs() < 1e-9);

        // The recovered state evolves normally afterwards.
        let (after, report) = evolve(&next, &input, &config, &mut rng);
        assert!(!report.quantum.rolled_back);
        assert!((spectral::norm_sqr(&after.quantum.coefficients) - 1.0).abs() < 1e-9);
    }
}

#[test]
fn submitted_steps_rescale_or_refuse_degenerate_input() {
    let quantum = EngineConfig::default().quantum;
    let mut request = EvolutionRequest {
        coefficients: vec![Complex64::new(1e200, -1e200); spectral::MODES],
        populations: vec![1.0 / 6.0; 6],
        dt: 0.05,
        potential: potential::params(vec![], vec![], vec![], 0.0, 0.0, &quantum),
    };
    let out = cognis_engine::submit_quantum_evolution(&request).unwrap();
    let norm: f64 = out.coefficients.iter().map(|z| z.norm_sqr()).sum();
    assert!((norm - 1.0).abs() < 1e-9);

    request.coefficients = vec![Complex64::new(0.0, 0.0); spectral::MODES];
    assert!(matches!(
        cognis_engine::submit_quantum_evolution(&request),
        Err(Error::InvalidParameter(_))
    ));
}

// ===========================================================================
// Magnitude bound
// ===========================================================================

#[test]
fn psi_never_exceeds_ceiling_under_adversarial_inputs() {
    let config = EngineConfig::default();
    let ceiling = config.recurrence.psi_ceiling;
    let mut engine = CognitiveEngine::new(config);
    let hostile = [
        Interaction::new(1e308, 1e308, 1e308),
        Interaction::new(f64::NAN, f64::INFINITY, f64::NEG_INFINITY),
        Interaction::new(-1e308, -1e308, 0.0),
        Interaction::new(1.0, f64::MAX, f64::MAX),
        Interaction { noise_scale: 1e300, ..Interaction::new(0.5, 0.0, 0.0) },
    ];
    for round in 0..40 {
        let report = engine.interact(&hostile[round % hostile.len()]);
        let psi = engine.state().scalar.psi;
        assert!(psi.re.is_finite() && psi.im.is_finite());
        assert!(psi.norm() <= ceiling * (1.0 + 1e-12), "|Ψ| = {}", psi.norm());
        assert!(report.psi.norm() <= ceiling * (1.0 + 1e-12));
    }
    assert!(engine.anomalies().total() > 0);
    assert!(engine.state().scalar.omega.is_finite());
}

// ===========================================================================
// Determinism
// ===========================================================================

#[test]
fn identical_runs_are_bit_identical() {
    let run = || {
        let mut engine = CognitiveEngine::new(EngineConfig::default());
        for input in inputs(150) {
            engine.interact(&input);
            engine.ambient_tick();
        }
        engine.state().clone()
    };
    let a = run();
    let b = run();
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn different_seeds_diverge() {
    let run = |seed| {
        let mut config = EngineConfig::default();
        config.seed = seed;
        let mut engine = CognitiveEngine::new(config);
        for input in inputs(20) {
            engine.interact(&input);
        }
        engine.state().scalar.psi
    };
    assert_ne!(run(1), run(2));
}

#[test]
fn pure_evolve_matches_engine() {
    let config = EngineConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut state = CoreState::default();
    let mut engine = CognitiveEngine::new(config.clone());
    for input in inputs(30) {
        let (next, _) = evolve(&state, &input, &config, &mut rng);
        state = next;
        engine.interact(&input);
    }
    assert_eq!(&state, engine.state());
}

// ===========================================================================
// Loop detection is a pure function of (state, history)
// ===========================================================================

#[test]
fn loop_detection_is_reproducible() {
    let history: VecDeque<HistoryEntry> = [(1.0, 0.1), (2.0, 1.0), (1.05, 0.15), (3.0, -2.0)]
        .into_iter()
        .map(|(magnitude, phase)| HistoryEntry { magnitude, phase })
        .collect();
    let current = HistoryEntry { magnitude: 1.02, phase: 0.12 };
    let first = detect_loop(current, &history, 0.1, 0.2);
    for _ in 0..10 {
        assert_eq!(detect_loop(current, &history, 0.1, 0.2), first);
    }
    assert_eq!(first, Some(2));

    let cfg = EngineConfig::default().meta;
    let mut seed_state = MetaAwarenessState::default();
    for psi in [Complex64::new(1.0, 0.1), Complex64::new(2.0, 0.0), Complex64::new(1.0, 0.1)] {
        seed_state.observe(psi, false, &cfg);
    }
    let mut a = seed_state.clone();
    let mut b = seed_state.clone();
    let oa = a.observe(Complex64::new(1.0, 0.1), false, &cfg);
    let ob = b.observe(Complex64::new(1.0, 0.1), false, &cfg);
    assert_eq!(oa, ob);
    assert_eq!(a.loop_detected, b.loop_detected);
    assert_eq!(a.recursion_depth, b.recursion_depth);
    assert!(a.loop_detected);
}

// ===========================================================================
// Born-rule conformance
// ===========================================================================

#[test]
fn passive_measurement_follows_born_rule() {
    let config = EngineConfig::default();
    let q = &config.quantum;

    let mut c = basis::uniform_superposition();
    c = measurement::partial_collapse(&c, 1, 0.35).unwrap();
    c = measurement::partial_collapse(&c, 4, 0.2).unwrap();
    let mut state = QuantumCognitiveState::default();
    state.coefficients = c;
    state.observables = Observables::measure(&c, &[]);
    let p = state.observables.populations;
    assert!(p.iter().all(|&x| x > 0.02));

    const TRIALS: usize = 10_000;
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut counts = [0usize; 6];
    for _ in 0..TRIALS {
        let mut trial = state.clone();
        let u: f64 = rng.gen();
        let (record, _) = trial.passive_measurement(1, u, q);
        counts[record.basis.index()] += 1;
    }

    let chi2: f64 = counts
        .iter()
        .zip(p.iter())
        .map(|(&observed, &prob)| {
            let expected = prob * TRIALS as f64;
            (observed as f64 - expected).powi(2) / expected
        })
        .sum();
    // Five degrees of freedom, α = 0.001.
    assert!(chi2 < 20.515, "χ² = {:.3}, counts {:?}, populations {:?}", chi2, counts, p);
}

// ===========================================================================
// Attractor cap
// ===========================================================================

#[test]
fn seventh_goal_evicts_lowest_weight() {
    let mut engine = CognitiveEngine::new(EngineConfig::default());
    let weights = [0.9, 0.4, 0.15, 0.6, 0.8, 0.5];
    for (mode, w) in CognitiveMode::ALL.into_iter().zip(weights) {
        assert!(engine
            .set_goal_attractor(GoalTarget::Basis(mode), w, 0.0, GoalSource::Volitional)
            .unwrap()
            .is_none());
    }
    let evicted = engine
        .set_goal_attractor(GoalTarget::Basis(CognitiveMode::Focused), 0.3, 0.0, GoalSource::Volitional)
        .unwrap()
        .expect("an attractor must be evicted");
    assert_eq!(evicted.weight, 0.15);
    assert_eq!(evicted.target_basis, CognitiveMode::Creative);
    assert_eq!(engine.state().quantum.goals.len(), 6);

    for input in inputs(60) {
        engine.interact(&input);
        assert!(engine.state().quantum.goals.len() <= 6);
    }
}

// ===========================================================================
// Round-trip and migration
// ===========================================================================

#[test]
fn state_round_trips_through_json() {
    let mut engine = CognitiveEngine::new(EngineConfig::default());
    engine
        .set_goal_attractor(GoalTarget::Basis(CognitiveMode::Analytical), 0.7, 0.01, GoalSource::Volitional)
        .unwrap();
    for input in inputs(40) {
        engine.interact(&input);
    }
    let state = engine.state().clone();

    let back: CoreState = serde_json::from_str(&serde_json::to_string(&state).unwrap()).unwrap();
    assert_eq!(back.scalar, state.scalar);
    assert_eq!(back.meta, state.meta);
    assert_eq!(back.emotion, state.emotion);
    assert_eq!(back.quantum, state.quantum);
}

#[tokio::test]
async fn old_blob_on_disk_is_migrated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{ "schema_version": 1, "scalar": { "psi": [0.5, 0.5], "iteration": 12 }, "emotion": { "mood": -0.3 } }"#,
    )
    .unwrap();

    let store = FileStore::new(&path);
    let persisted = store.load().await.unwrap().unwrap();
    assert_eq!(persisted.schema_version, SCHEMA_VERSION);
    assert_eq!(persisted.upgraded_from, Some(1));
    assert_eq!(persisted.state.iteration(), 12);

    let mut engine = CognitiveEngine::from_state(persisted.state, EngineConfig::default());
    engine.interact(&Interaction::new(0.1, 0.0, 0.0));
    assert_eq!(engine.state().iteration(), 13);
}

#[test]
fn newer_blob_is_refused() {
    let err = decode(r#"{ "schema_version": 4, "state": {} }"#).unwrap_err();
    assert!(matches!(err, Error::SchemaTooNew { found: 4, supported: 3 }));
}

#[test]
fn restored_engines_continue_identically() {
    let mut engine = CognitiveEngine::new(EngineConfig::default());
    for input in inputs(10) {
        engine.interact(&input);
    }
    let saved = engine.state().clone();
    let mut a = CognitiveEngine::from_state(saved.clone(), EngineConfig::default());
    let mut b = CognitiveEngine::from_state(saved, EngineConfig::default());
    for input in inputs(10) {
        a.interact(&input);
        b.interact(&input);
    }
    assert_eq!(a.state(), b.state());
}

// ===========================================================================
// Persistence boundary
// ===========================================================================

#[tokio::test]
async fn handle_persists_latest_state_to_file() {
    let dir = TempDir::new().unwrap();
    let mut config = EngineConfig::default();
    config.persistence.debounce_ms = 5;
    let store: Arc<dyn StateStore> = Arc::new(FileStore::new(dir.path().join("state.json")));
    let persister = Arc::new(Persister::spawn(store.clone(), config.persistence.clone()));
    let handle = EngineHandle::new(CognitiveEngine::new(config)).with_persister(persister.clone());

    for input in inputs(10) {
        handle.interact(input).await;
    }
    persister.shutdown().await;

    let persisted = store.load().await.unwrap().unwrap();
    assert_eq!(persisted.state.iteration(), 10);
    assert_eq!(persisted.state, handle.state().await);
}

#[tokio::test]
async fn failing_store_never_blocks_evolution() {
    let mut config = EngineConfig::default();
    config.persistence.debounce_ms = 1;
    config.persistence.initial_backoff_ms = 1;
    config.persistence.max_backoff_ms = 2;
    config.persistence.max_retries = 2;
    let store = Arc::new(MemoryStore::new());
    store.fail_next(1_000);
    let persister = Arc::new(Persister::spawn(store.clone(), config.persistence.clone()));
    let handle = EngineHandle::new(CognitiveEngine::new(config)).with_persister(persister.clone());

    for input in inputs(25) {
        handle.interact(input).await;
    }
    assert_eq!(handle.snapshot().await.iteration, 25);
    persister.shutdown().await;
    assert_eq!(store.saves(), 0);
}

// ===========================================================================
// Background driver
// ===========================================================================

#[tokio::test]
async fn driver_ticks_and_stops_cleanly() {
    let handle = EngineHandle::new(CognitiveEngine::new(EngineConfig::default()));
    let driver = BackgroundDriver::spawn(handle.clone(), Duration::from_millis(5), CancellationToken::new());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(driver.is_running());
    let ticks = driver.stop().await;
    assert!(ticks > 0);
    assert_eq!(handle.snapshot().await.iteration, ticks);

    // Interactions interleave safely with a restarted driver.
    let cancel = CancellationToken::new();
    let driver = BackgroundDriver::spawn(handle.clone(), Duration::from_millis(5), cancel.clone());
    for input in inputs(5) {
        handle.interact(input).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();
    let more = driver.stop().await;
    assert_eq!(handle.snapshot().await.iteration, ticks + more + 5);
}

// ===========================================================================
// RPC boundary
// ===========================================================================

#[tokio::test]
async fn quantum_submit_over_rpc_matches_library() {
    let handle = EngineHandle::new(CognitiveEngine::new(EngineConfig::default()));
    let state = QuantumCognitiveState::default();
    let request = EvolutionRequest {
        coefficients: state.coefficients.to_vec(),
        populations: state.observables.populations.to_vec(),
        dt: 0.05,
        potential: potential::params(
            vec![cognis_core::Well { position: 1.0, depth: 1.0 }],
            vec![],
            vec![],
            0.0,
            0.0,
            &EngineConfig::default().quantum,
        ),
    };
    let direct = cognis_engine::submit_quantum_evolution(&request).unwrap();
    let over_rpc = route_rpc("quantum.submit", serde_json::to_value(&request).unwrap(), &handle)
        .await
        .unwrap();
    assert_eq!(over_rpc, serde_json::to_value(&direct).unwrap());
    // The engine's own state is untouched by an orchestrator step.
    assert_eq!(handle.snapshot().await.iteration, 0);

    let bad = route_rpc("quantum.submit", json!({ "coefficients": [], "populations": [], "dt": 0.05 }), &handle)
        .await
        .unwrap_err();
    assert_eq!(bad.0, cognis_core::protocol::codes::INVALID_PARAMS);
}

#[tokio::test]
async fn anomalies_are_listed_over_rpc() {
    let handle = EngineHandle::new(CognitiveEngine::new(EngineConfig::default()));
    route_rpc("core.evolve", json!({ "sentiment": 0.2, "memory_influence": 1e308 }), &handle)
        .await
        .unwrap();
    handle.interact(Interaction::new(f64::NAN, 0.0, 0.0)).await;
    let out = route_rpc("anomalies.list", json!(null), &handle).await.unwrap();
    assert!(out["total"].as_u64().unwrap() >= 1);
    let recent = out["recent"].as_array().unwrap();
    assert!(recent.iter().any(|a| a["kind"] == "numerical_anomaly" && a["source"] == "sentiment"));
}
