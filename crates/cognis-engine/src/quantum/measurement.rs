//! Measurement — Born-rule sampling and partial collapse toward a basis

use super::basis;
use super::spectral::{normalized, Amplitudes};
use cognis_core::complex::{self, ZERO};
use cognis_core::CognitiveMode;
use serde::{Deserialize, Serialize};

/// One collapse, passive or volitional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub tick: u64,
    pub basis: CognitiveMode,
    pub pre_entropy: f64,
    pub post_entropy: f64,
    /// Population of the chosen basis after the collapse.
    pub confidence: f64,
    pub was_volitional: bool,
}

/// Pick a basis index with probability equal to its population, given a
/// uniform draw `u` in [0, 1). `None` when the distribution is degenerate.
pub fn born_sample(populations: &[f64], u: f64) -> Option<usize> {
    let total: f64 = populations.iter().filter(|p| p.is_finite() && **p > 0.0).sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    let target = u.clamp(0.0, 1.0) * total;
    let mut acc = 0.0;
    let mut last = None;
    for (k, &p) in populations.iter().enumerate() {
        if !(p.is_finite() && p > 0.0) {
            continue;
        }
        acc += p;
        last = Some(k);
        if target < acc {
            return Some(k);
        }
    }
    last
}

/// Blend `c` toward basis `k`: (1−m)·c + m·e^{iθ}·b_k with θ = arg⟨b_k|c⟩,
/// then renormalise. The phase alignment keeps the blend from cancelling.
pub fn partial_collapse(c: &Amplitudes, k: usize, mixing: f64) -> Option<Amplitudes> {
    let b = basis::vectors().get(k)?;
    let m = if mixing.is_finite() { mixing.clamp(0.0, 1.0) } else { 0.0 };
    let align = complex::cis(complex::phase(basis::inner(b, c)));
    let mut out = [ZERO; super::spectral::MODES];
    for ((z, x), y) in out.iter_mut().zip(c.iter()).zip(b.iter()) {
        *z = complex::add(complex::scale(*x, 1.0 - m), complex::scale(complex::mul(align, *y), m));
    }
    normalized(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantum::spectral::norm_sqr;

    #[test]
    fn born_sample_walks_the_cumulative_distribution() {
        let p = [0.1, 0.2, 0.3, 0.4, 0.0, 0.0];
        assert_eq!(born_sample(&p, 0.0), Some(0));
        assert_eq!(born_sample(&p, 0.05), Some(0));
        assert_eq!(born_sample(&p, 0.15), Some(1));
        assert_eq!(born_sample(&p, 0.55), Some(2));
        assert_eq!(born_sample(&p, 0.999), Some(3));
        assert_eq!(born_sample(&p, 1.0), Some(3));
    }

    #[test]
    fn degenerate_distribution_has_no_sample() {
        assert_eq!(born_sample(&[0.0; 6], 0.5), None);
        assert_eq!(born_sample(&[f64::NAN; 6], 0.5), None);
    }

    #[test]
    fn collapse_raises_target_population() {
        let c = basis::uniform_superposition();
        let before = basis::populations(&c);
        let after = basis::populations(&partial_collapse(&c, 2, 0.5).unwrap());
        assert!(after[2] > before[2]);
        assert_eq!(basis::dominant(&after), 2);
        assert!(basis::entropy(&after) < basis::entropy(&before));
    }

    #[test]
    fn full_mixing_lands_on_the_basis() {
        let c = basis::uniform_superposition();
        let out = partial_collapse(&c, 4, 1.0).unwrap();
        assert!((norm_sqr(&out) - 1.0).abs() < 1e-12);
        let overlap = basis::inner(&basis::vectors()[4], &out).norm();
        assert!((overlap - 1.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_basis_is_rejected() {
        assert!(partial_collapse(&basis::uniform_superposition(), 9, 0.5).is_none());
    }
}
