//! Spectral integrator — split-step evolution of 31 Fourier modes
//!
//! The wavefunction lives on the periodic domain [0, 2π) as
//! ψ(x) = Σ_{n=-15}^{15} c_n e^{inx}. The kinetic operator is diagonal in the
//! mode basis; the potential is applied pointwise on a 64-point grid reached
//! through an FFT round trip. Leakage beyond |n| = 15 is projected out, and
//! the renormalisation that follows absorbs it.

use cognis_core::complex::{self, Complex64, ZERO};
use rustfft::{Fft, FftPlanner};
use std::f64::consts::TAU;
use std::sync::{Arc, OnceLock};

/// Highest mode number.
pub const MAX_MODE: i32 = 15;
/// Number of Fourier coefficients (modes -15..=15).
pub const MODES: usize = (2 * MAX_MODE + 1) as usize;
/// Position grid resolution.
pub const GRID: usize = 64;

/// Fixed-size amplitude vector.
pub type Amplitudes = [Complex64; MODES];

/// Mode number for coefficient index `i`.
pub fn mode_number(i: usize) -> i32 {
    i as i32 - MAX_MODE
}

/// Grid position of point `j`.
pub fn grid_position(j: usize) -> f64 {
    TAU * j as f64 / GRID as f64
}

struct Plans {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

fn plans() -> &'static Plans {
    static PLANS: OnceLock<Plans> = OnceLock::new();
    PLANS.get_or_init(|| {
        let mut planner = FftPlanner::new();
        Plans {
            forward: planner.plan_fft_forward(GRID),
            inverse: planner.plan_fft_inverse(GRID),
        }
    })
}

/// Mode amplitudes → grid samples ψ(x_j) = Σ c_n e^{i n x_j}.
pub fn to_grid(c: &Amplitudes) -> Vec<Complex64> {
    let mut buf = vec![ZERO; GRID];
    for (i, &amp) in c.iter().enumerate() {
        let n = mode_number(i);
        buf[n.rem_euclid(GRID as i32) as usize] = amp;
    }
    plans().inverse.process(&mut buf);
    buf
}

/// Grid samples → mode amplitudes, truncated to |n| ≤ 15.
pub fn from_grid(mut buf: Vec<Complex64>) -> Amplitudes {
    plans().forward.process(&mut buf);
    let inv = 1.0 / GRID as f64;
    let mut c = [ZERO; MODES];
    for (i, slot) in c.iter_mut().enumerate() {
        let n = mode_number(i);
        *slot = complex::scale(buf[n.rem_euclid(GRID as i32) as usize], inv);
    }
    c
}

/// Σ |c_n|²
pub fn norm_sqr(c: &Amplitudes) -> f64 {
    c.iter().map(|z| z.norm_sqr()).sum()
}

/// The constant wavefunction: all weight in mode 0.
pub fn ground_state() -> Amplitudes {
    let mut c = [ZERO; MODES];
    c[MAX_MODE as usize] = Complex64::new(1.0, 0.0);
    c
}

/// Rescale to unit norm. `None` when the vector is zero or non-finite.
///
/// Squares are summed after dividing by the largest component, so vectors
/// whose plain Σ|c|² would overflow still normalise.
pub fn normalized(c: &Amplitudes) -> Option<Amplitudes> {
    let peak = c.iter().map(|z| z.re.abs().max(z.im.abs())).fold(0.0, f64::max);
    if !peak.is_finite() || peak < 1e-300 {
        return None;
    }
    let mut out = *c;
    for z in out.iter_mut() {
        *z = complex::scale(*z, 1.0 / peak);
    }
    let n2 = norm_sqr(&out);
    if !n2.is_finite() || n2 < 1e-300 {
        return None;
    }
    let inv = 1.0 / n2.sqrt();
    for z in out.iter_mut() {
        *z = complex::scale(*z, inv);
    }
    out.iter().all(|z| complex::is_finite(*z)).then_some(out)
}

/// Exact kinetic propagation: c_n ← c_n e^{-i n² τ}.
pub fn kinetic(c: &mut Amplitudes, tau: f64) {
    for (i, z) in c.iter_mut().enumerate() {
        let n = mode_number(i) as f64;
        *z = complex::mul(*z, complex::cis(-n * n * tau));
    }
}

/// Pointwise potential propagation: ψ(x) ← ψ(x) e^{-i V(x) dt}.
pub fn potential(c: &Amplitudes, v: &[f64], dt: f64) -> Amplitudes {
    let mut grid = to_grid(c);
    for (psi, &vx) in grid.iter_mut().zip(v) {
        *psi = complex::mul(*psi, complex::cis(-vx * dt));
    }
    from_grid(grid)
}

/// Lindblad-style damping: c_n ← c_n e^{-rate · n² · dt}.
pub fn decohere(c: &mut Amplitudes, rate: f64, dt: f64) {
    if rate <= 0.0 {
        return;
    }
    for (i, z) in c.iter_mut().enumerate() {
        let n = mode_number(i) as f64;
        *z = complex::scale(*z, (-rate * n * n * dt).exp());
    }
}

/// Outcome of one full step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub coefficients: Amplitudes,
    /// Norm² before renormalisation.
    pub norm_before: f64,
    /// True when renormalisation failed and the input vector was restored.
    pub rolled_back: bool,
    /// True when the input vector could not be restored either and the
    /// ground state took its place.
    pub reset: bool,
}

/// Half kinetic, potential, half kinetic, decoherence, renormalise.
///
/// The returned coefficients are always unit-norm: a failed step falls back
/// to the normalised input, then to `ground_state()`.
pub fn split_step(c: &Amplitudes, v: &[f64], dt: f64, decoherence_rate: f64) -> StepOutcome {
    let mut next = *c;
    kinetic(&mut next, dt / 2.0);
    let mut next = potential(&next, v, dt);
    kinetic(&mut next, dt / 2.0);
    decohere(&mut next, decoherence_rate, dt);
    let norm_before = norm_sqr(&next);
    if let Some(coefficients) = normalized(&next) {
        return StepOutcome { coefficients, norm_before, rolled_back: false, reset: false };
    }
    match normalized(c) {
        Some(coefficients) => StepOutcome { coefficients, norm_before, rolled_back: true, reset: false },
        None => StepOutcome { coefficients: ground_state(), norm_before, rolled_back: true, reset: true },
    }
}

/// Expectation of a potential sampled on the grid.
pub fn potential_expectation(c: &Amplitudes, v: &[f64]) -> f64 {
    let grid = to_grid(c);
    let total: f64 = grid.iter().zip(v).map(|(psi, &vx)| psi.norm_sqr() * vx).sum();
    total / GRID as f64
}

/// Σ n² |c_n|²
pub fn kinetic_energy(c: &Amplitudes) -> f64 {
    c.iter()
        .enumerate()
        .map(|(i, z)| {
            let n = mode_number(i) as f64;
            n * n * z.norm_sqr()
        })
        .sum()
}

/// ⟨e^{ix}⟩ = Σ_n conj(c_{n+1}) c_n
pub fn position_expectation(c: &Amplitudes) -> Complex64 {
    c.windows(2)
        .map(|w| complex::mul(complex::conj(w[1]), w[0]))
        .fold(ZERO, complex::add)
}

/// Spectral centroid and spread of the mode distribution.
pub fn spectral_moments(c: &Amplitudes) -> (f64, f64) {
    let total = norm_sqr(c).max(1e-300);
    let centroid: f64 = c
        .iter()
        .enumerate()
        .map(|(i, z)| mode_number(i) as f64 * z.norm_sqr())
        .sum::<f64>()
        / total;
    let variance: f64 = c
        .iter()
        .enumerate()
        .map(|(i, z)| {
            let d = mode_number(i) as f64 - centroid;
            d * d * z.norm_sqr()
        })
        .sum::<f64>()
        / total;
    (centroid, variance.max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_mode(n: i32) -> Amplitudes {
        let mut c = [ZERO; MODES];
        c[(n + MAX_MODE) as usize] = Complex64::new(1.0, 0.0);
        c
    }

    #[test]
    fn grid_roundtrip_is_exact_for_band_limited_vectors() {
        let mut c = [ZERO; MODES];
        for (i, z) in c.iter_mut().enumerate() {
            *z = Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos());
        }
        let back = from_grid(to_grid(&c));
        for (a, b) in c.iter().zip(back.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn kinetic_is_a_pure_phase() {
        let mut c = single_mode(3);
        kinetic(&mut c, 0.1);
        let z = c[(3 + MAX_MODE) as usize];
        assert!((z.norm() - 1.0).abs() < 1e-12);
        assert!((complex::phase(z) + 0.9).abs() < 1e-12);
        assert!((kinetic_energy(&c) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn zero_potential_step_preserves_norm() {
        let mut c = single_mode(0);
        c[(2 + MAX_MODE) as usize] = Complex64::new(0.0, 1.0);
        let c = normalized(&c).unwrap();
        let out = split_step(&c, &[0.0; GRID], 0.05, 0.0);
        assert!(!out.rolled_back);
        assert!((norm_sqr(&out.coefficients) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn decoherence_damps_high_modes_more() {
        let mut c = [Complex64::new(1.0, 0.0); MODES];
        decohere(&mut c, 0.1, 1.0);
        let low = c[(1 + MAX_MODE) as usize].norm();
        let high = c[(10 + MAX_MODE) as usize].norm();
        assert_eq!(c[MAX_MODE as usize].norm(), 1.0);
        assert!(high < low);
    }

    #[test]
    fn zero_vector_rolls_back() {
        let c = [ZERO; MODES];
        assert!(normalized(&c).is_none());
        let out = split_step(&c, &[0.0; GRID], 0.05, 0.0);
        assert!(out.rolled_back);
        assert!(out.reset);
        assert_eq!(out.coefficients, ground_state());
    }

    #[test]
    fn huge_vectors_normalise_without_overflow() {
        let c = [Complex64::new(1e200, 0.0); MODES];
        assert!(norm_sqr(&c).is_infinite());
        let unit = normalized(&c).unwrap();
        assert!((norm_sqr(&unit) - 1.0).abs() < 1e-12);
        assert!((unit[0].re - 1.0 / (MODES as f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn overflowing_step_restores_the_normalised_input() {
        let c = [Complex64::new(f64::MAX, 0.0); MODES];
        let out = split_step(&c, &[0.0; GRID], 0.05, 0.0);
        assert!(out.rolled_back);
        assert!(!out.reset);
        assert!((norm_sqr(&out.coefficients) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_potential_expectation() {
        let c = single_mode(4);
        let v = [2.5; GRID];
        assert!((potential_expectation(&c, &v) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn plane_wave_has_no_position_coherence() {
        assert!(position_expectation(&single_mode(5)).norm() < 1e-15);
        let (centroid, spread) = spectral_moments(&single_mode(-2));
        assert!((centroid + 2.0).abs() < 1e-12);
        assert!(spread.abs() < 1e-12);
    }
}
