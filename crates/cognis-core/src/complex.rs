//! Complex arithmetic kernel
//!
//! Thin, total wrappers over `num_complex::Complex64`. Every function is pure
//! and never panics; the zero value has magnitude 0 and phase 0.

pub use num_complex::Complex64;

/// The additive identity.
pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// The multiplicative identity.
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);

pub fn add(a: Complex64, b: Complex64) -> Complex64 {
    Complex64::new(a.re + b.re, a.im + b.im)
}

pub fn sub(a: Complex64, b: Complex64) -> Complex64 {
    Complex64::new(a.re - b.re, a.im - b.im)
}

pub fn scale(a: Complex64, k: f64) -> Complex64 {
    Complex64::new(a.re * k, a.im * k)
}

pub fn mul(a: Complex64, b: Complex64) -> Complex64 {
    Complex64::new(a.re * b.re - a.im * b.im, a.re * b.im + a.im * b.re)
}

pub fn conj(a: Complex64) -> Complex64 {
    Complex64::new(a.re, -a.im)
}

/// √(re² + im²), computed without intermediate overflow.
pub fn magnitude(a: Complex64) -> f64 {
    a.re.hypot(a.im)
}

/// atan2(im, re); 0 for the zero value.
pub fn phase(a: Complex64) -> f64 {
    if a.re == 0.0 && a.im == 0.0 {
        return 0.0;
    }
    a.im.atan2(a.re)
}

pub fn from_polar(r: f64, theta: f64) -> Complex64 {
    Complex64::new(r * theta.cos(), r * theta.sin())
}

/// e^(iθ)
pub fn cis(theta: f64) -> Complex64 {
    from_polar(1.0, theta)
}

pub fn is_finite(a: Complex64) -> bool {
    a.re.is_finite() && a.im.is_finite()
}

/// Replace a non-finite value with zero. Returns the value and whether it was replaced.
pub fn finite_or_zero(a: Complex64) -> (Complex64, bool) {
    if is_finite(a) {
        (a, false)
    } else {
        (ZERO, true)
    }
}

/// Scale `a` down to `ceiling` if its magnitude exceeds it, preserving phase.
pub fn clamp_magnitude(a: Complex64, ceiling: f64) -> Complex64 {
    let m = magnitude(a);
    if m > ceiling && m.is_finite() && m > 0.0 {
        scale(a, ceiling / m)
    } else {
        a
    }
}

/// Wrap an angle into (-π, π].
pub fn wrap_phase(theta: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if !theta.is_finite() {
        return 0.0;
    }
    let mut t = theta % TAU;
    if t <= -PI {
        t += TAU;
    } else if t > PI {
        t -= TAU;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn zero_has_zero_magnitude_and_phase() {
        assert_eq!(magnitude(ZERO), 0.0);
        assert_eq!(phase(ZERO), 0.0);
        assert_eq!(phase(Complex64::new(-0.0, 0.0)), 0.0);
    }

    #[test]
    fn multiply_matches_num_complex() {
        let a = Complex64::new(1.5, -2.0);
        let b = Complex64::new(-0.25, 3.0);
        assert_eq!(mul(a, b), a * b);
        assert_eq!(add(a, b), a + b);
        assert_eq!(sub(a, b), a - b);
        assert_eq!(conj(a), a.conj());
    }

    #[test]
    fn magnitude_does_not_overflow() {
        let big = Complex64::new(1e300, 1e300);
        assert!(magnitude(big).is_finite());
    }

    #[test]
    fn clamp_preserves_phase() {
        let z = Complex64::new(3.0, 4.0);
        let c = clamp_magnitude(z, 1.0);
        assert!((magnitude(c) - 1.0).abs() < 1e-12);
        assert!((phase(c) - phase(z)).abs() < 1e-12);
        assert_eq!(clamp_magnitude(z, 10.0), z);
    }

    #[test]
    fn finite_or_zero_flags_nan() {
        let (v, replaced) = finite_or_zero(Complex64::new(f64::NAN, 1.0));
        assert!(replaced);
        assert_eq!(v, ZERO);
        let (v, replaced) = finite_or_zero(ONE);
        assert!(!replaced);
        assert_eq!(v, ONE);
    }

    #[test]
    fn wrap_phase_range() {
        assert!((wrap_phase(3.0 * PI).abs() - PI).abs() < 1e-9);
        assert!((wrap_phase(-3.0 * PI).abs() - PI).abs() < 1e-9);
        assert!((wrap_phase(2.0 * PI + 0.25) - 0.25).abs() < 1e-9);
        assert!((wrap_phase(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(wrap_phase(f64::INFINITY), 0.0);
    }
}
