//! Tests for cognis-core: complex kernel, shared enums, protocol, errors

use cognis_core::complex::{self, ONE, ZERO};
use cognis_core::*;

// ===========================================================================
// Complex kernel
// ===========================================================================

#[test]
fn kernel_is_total_on_extremes() {
    let values = [
        Complex64::new(f64::MAX, f64::MAX),
        Complex64::new(f64::MIN_POSITIVE, -f64::MIN_POSITIVE),
        Complex64::new(f64::NAN, 0.0),
        Complex64::new(f64::INFINITY, f64::NEG_INFINITY),
        ZERO,
    ];
    for a in values {
        for b in values {
            let _ = complex::add(a, b);
            let _ = complex::sub(a, b);
            let _ = complex::mul(a, b);
        }
        let _ = complex::magnitude(a);
        let _ = complex::phase(a);
        let _ = complex::scale(a, 1e300);
    }
}

#[test]
fn kernel_basic_identities() {
    let z = Complex64::new(2.0, -3.0);
    assert_eq!(complex::mul(z, ONE), z);
    assert_eq!(complex::add(z, ZERO), z);
    assert_eq!(complex::conj(complex::conj(z)), z);
    // z·conj(z) = |z|²
    let zz = complex::mul(z, complex::conj(z));
    assert!((zz.re - 13.0).abs() < 1e-12);
    assert_eq!(zz.im, 0.0);
    assert!((complex::magnitude(z) - 13f64.sqrt()).abs() < 1e-12);
}

#[test]
fn kernel_polar_roundtrip() {
    let z = complex::from_polar(2.5, 0.75);
    assert!((complex::magnitude(z) - 2.5).abs() < 1e-12);
    assert!((complex::phase(z) - 0.75).abs() < 1e-12);
    assert!((complex::magnitude(complex::cis(1.2)) - 1.0).abs() < 1e-12);
}

// ===========================================================================
// CognitiveMode
// ===========================================================================

#[test]
fn cognitive_mode_indices_are_stable() {
    for (i, mode) in CognitiveMode::ALL.iter().enumerate() {
        assert_eq!(mode.index(), i);
        assert_eq!(CognitiveMode::from_index(i), Some(*mode));
    }
    assert_eq!(CognitiveMode::from_index(BASIS_COUNT), None);
}

#[test]
fn cognitive_mode_serde_lowercase() {
    let json = serde_json::to_string(&CognitiveMode::Reflective).unwrap();
    assert_eq!(json, "\"reflective\"");
    let back: CognitiveMode = serde_json::from_str("\"creative\"").unwrap();
    assert_eq!(back, CognitiveMode::Creative);
    assert_eq!(format!("{}", CognitiveMode::Focused), "focused");
}

#[test]
fn goal_source_and_loop_phase_serde() {
    for source in [GoalSource::Volitional, GoalSource::Emergent, GoalSource::Learned] {
        let json = serde_json::to_string(&source).unwrap();
        let back: GoalSource = serde_json::from_str(&json).unwrap();
        assert_eq!(source, back);
    }
    let json = serde_json::to_string(&LoopPhase::RecursiveAmplification).unwrap();
    assert_eq!(json, "\"recursive_amplification\"");
    assert_eq!(LoopPhase::default(), LoopPhase::Normal);
}

// ===========================================================================
// RPC envelope
// ===========================================================================

#[test]
fn rpc_request_params_default_to_null() {
    let req: RpcRequest = serde_json::from_str(r#"{"id":"1","method":"health"}"#).unwrap();
    assert_eq!(req.id, "1");
    assert_eq!(req.method, "health");
    assert!(req.params.is_null());
}

#[test]
fn rpc_response_ok_omits_error() {
    let resp = RpcResponse::ok("7", serde_json::json!({ "ok": true }));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["id"], "7");
    assert_eq!(json["result"]["ok"], true);
    assert!(json.get("error").is_none());
}

#[test]
fn rpc_response_error_codes() {
    let resp = RpcResponse::err("2", codes::METHOD_NOT_FOUND, "Method not found: nope");
    let json = serde_json::to_value(&resp).unwrap();
    assert!(json.get("result").is_none());
    assert_eq!(json["error"]["code"], codes::METHOD_NOT_FOUND);
    assert_eq!(json["error"]["message"], "Method not found: nope");
}

#[test]
fn event_message_collapse_shape() {
    let ev = EventMessage::collapse(CognitiveMode::Analytical, true, 0.8);
    assert_eq!(ev.event, "collapse");
    assert_eq!(ev.data["basis"], "analytical");
    assert_eq!(ev.data["volitional"], true);
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn error_messages_are_descriptive() {
    let e = Error::invalid_dimension("coefficients", 31, 4);
    assert_eq!(
        e.to_string(),
        "invalid dimension for coefficients: expected 31, got 4"
    );
    let e = Error::CollapseNotReady {
        charge: 0.25,
        threshold: 0.7,
    };
    assert!(e.to_string().contains("0.250"));
    let e = Error::SchemaTooNew {
        found: 9,
        supported: 3,
    };
    assert!(e.to_string().contains("9"));
}

#[test]
fn error_from_serde_json() {
    let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let e: Error = err.into();
    assert!(matches!(e, Error::Json(_)));
}
