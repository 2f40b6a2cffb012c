//! Basis wavepackets — six fixed reference states, one per cognitive mode
//!
//! Each is a periodic Gaussian of width 0.3 centred at x_k = 2πk/6 + π/6,
//! whose Fourier coefficients are c_n ∝ e^{-n²w²/2} e^{-inx_k}.

use super::spectral::{mode_number, normalized, Amplitudes, MODES};
use cognis_core::complex::{self, Complex64, ZERO};
use cognis_core::BASIS_COUNT;
use std::f64::consts::{PI, TAU};
use std::sync::OnceLock;

/// Gaussian width of every basis wavepacket.
pub const BASIS_WIDTH: f64 = 0.3;

/// Centre of basis `k` on [0, 2π).
pub fn center(k: usize) -> f64 {
    TAU * k as f64 / BASIS_COUNT as f64 + PI / BASIS_COUNT as f64
}

/// Normalised periodic Gaussian centred at `x0`.
pub fn wavepacket(x0: f64, width: f64) -> Amplitudes {
    let mut c = [ZERO; MODES];
    for (i, z) in c.iter_mut().enumerate() {
        let n = mode_number(i) as f64;
        *z = complex::from_polar((-0.5 * n * n * width * width).exp(), -n * x0);
    }
    normalized(&c).unwrap_or(c)
}

/// The six basis vectors, built once.
pub fn vectors() -> &'static [Amplitudes; BASIS_COUNT] {
    static BASIS: OnceLock<[Amplitudes; BASIS_COUNT]> = OnceLock::new();
    BASIS.get_or_init(|| std::array::from_fn(|k| wavepacket(center(k), BASIS_WIDTH)))
}

/// ⟨a|b⟩
pub fn inner(a: &Amplitudes, b: &Amplitudes) -> Complex64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| complex::mul(complex::conj(*x), *y))
        .fold(ZERO, complex::add)
}

/// Projections ⟨basis_k|c⟩ for every basis vector.
pub fn projections(c: &Amplitudes) -> [Complex64; BASIS_COUNT] {
    let basis = vectors();
    std::array::from_fn(|k| inner(&basis[k], c))
}

/// Born populations |⟨basis_k|c⟩|², normalised to sum 1.
/// Uniform when the vector has no overlap with any basis state.
pub fn populations(c: &Amplitudes) -> [f64; BASIS_COUNT] {
    let raw: [f64; BASIS_COUNT] = projections(c).map(|p| p.norm_sqr());
    let total: f64 = raw.iter().sum();
    if !total.is_finite() || total < 1e-300 {
        return [1.0 / BASIS_COUNT as f64; BASIS_COUNT];
    }
    raw.map(|p| p / total)
}

/// Shannon entropy in bits.
pub fn entropy(p: &[f64]) -> f64 {
    -p.iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| x * x.log2())
        .sum::<f64>()
}

/// Index of the largest population; the lowest index wins ties.
pub fn dominant(p: &[f64; BASIS_COUNT]) -> usize {
    let mut best = 0;
    for k in 1..BASIS_COUNT {
        if p[k] > p[best] {
            best = k;
        }
    }
    best
}

/// Shortest distance between two points on the circle.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    complex::wrap_phase(a - b).abs()
}

/// Basis whose centre is closest to `position`; lowest index wins ties.
pub fn nearest(position: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for k in 0..BASIS_COUNT {
        let d = circular_distance(position, center(k));
        if d < best_d - 1e-12 {
            best = k;
            best_d = d;
        }
    }
    best
}

/// Equal superposition of all basis vectors.
pub fn uniform_superposition() -> Amplitudes {
    let basis = vectors();
    let mut c = [ZERO; MODES];
    for v in basis.iter() {
        for (z, b) in c.iter_mut().zip(v.iter()) {
            *z = complex::add(*z, *b);
        }
    }
    normalized(&c).unwrap_or(basis[0])
}
