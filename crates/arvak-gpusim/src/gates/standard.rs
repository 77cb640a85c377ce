//! Analytic matrices for the standard gate set.
//!
//! Controlled gates resolve to the matrix of their target part (`CNOT` →
//! Pauli-X, `CSWAP` → SWAP, …); the kernel supplies the control logic.

use std::f64::consts::FRAC_1_SQRT_2;
use std::f64::consts::FRAC_PI_4;

use arvak_device::Precision;
use num_complex::Complex;

use super::matrix::GateMatrix;
use crate::error::{SimError, SimResult};

/// Supplies the dense target matrix of a named gate.
///
/// Implementations must be pure: the same name and parameters always yield
/// the same matrix.
pub trait GateMatrixSource<P: Precision>: Send + Sync {
    /// Matrix of `name` at `params`.
    fn matrix(&self, name: &str, params: &[P]) -> SimResult<GateMatrix<P>>;
}

/// Matrix source for the standard gate set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGates;

impl<P: Precision> GateMatrixSource<P> for StandardGates {
    fn matrix(&self, name: &str, params: &[P]) -> SimResult<GateMatrix<P>> {
        let p = |i: usize| -> SimResult<f64> {
            params.get(i).map(|v| v.into_f64()).ok_or_else(|| {
                SimError::Configuration(format!(
                    "{name} expects parameter #{i}, got {} parameter(s)",
                    params.len()
                ))
            })
        };
        let m = match name {
            "Identity" => identity(),
            "PauliX" | "CNOT" | "Toffoli" => pauli_x(),
            "PauliY" => pauli_y(),
            "PauliZ" | "CZ" => pauli_z(),
            "Hadamard" => hadamard(),
            "S" => s(),
            "T" => t(),
            "RX" | "CRX" => rx(p(0)?),
            "RY" | "CRY" => ry(p(0)?),
            "RZ" | "CRZ" => rz(p(0)?),
            "PhaseShift" | "ControlledPhaseShift" => phase_shift(p(0)?),
            "Rot" | "CRot" => rot(p(0)?, p(1)?, p(2)?),
            "SWAP" | "CSWAP" => swap(),
            _ => return Err(SimError::UnknownGate(name.to_string())),
        };
        Ok(m)
    }
}

#[inline]
fn c<P: Precision>(re: f64, im: f64) -> Complex<P> {
    Complex::new(P::from_f64(re), P::from_f64(im))
}

#[inline]
fn polar<P: Precision>(r: f64, theta: f64) -> Complex<P> {
    c(r * theta.cos(), r * theta.sin())
}

fn single<P: Precision>(a: Complex<P>, b: Complex<P>, c: Complex<P>, d: Complex<P>) -> GateMatrix<P> {
    GateMatrix::from_parts_unchecked(2, vec![a, b, c, d])
}

/// Identity.
pub fn identity<P: Precision>() -> GateMatrix<P> {
    GateMatrix::identity(1)
}

/// Pauli-X.
pub fn pauli_x<P: Precision>() -> GateMatrix<P> {
    single(c(0.0, 0.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, 0.0))
}

/// Pauli-Y.
pub fn pauli_y<P: Precision>() -> GateMatrix<P> {
    single(c(0.0, 0.0), c(0.0, -1.0), c(0.0, 1.0), c(0.0, 0.0))
}

/// Pauli-Z.
pub fn pauli_z<P: Precision>() -> GateMatrix<P> {
    single(c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(-1.0, 0.0))
}

/// Hadamard.
pub fn hadamard<P: Precision>() -> GateMatrix<P> {
    let h = FRAC_1_SQRT_2;
    single(c(h, 0.0), c(h, 0.0), c(h, 0.0), c(-h, 0.0))
}

/// S = diag(1, i).
pub fn s<P: Precision>() -> GateMatrix<P> {
    single(c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 1.0))
}

/// T = diag(1, e^{iπ/4}).
pub fn t<P: Precision>() -> GateMatrix<P> {
    single(c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), polar(1.0, FRAC_PI_4))
}

/// Rotation about X.
pub fn rx<P: Precision>(theta: f64) -> GateMatrix<P> {
    let (s, co) = (theta / 2.0).sin_cos();
    single(c(co, 0.0), c(0.0, -s), c(0.0, -s), c(co, 0.0))
}

/// Rotation about Y.
pub fn ry<P: Precision>(theta: f64) -> GateMatrix<P> {
    let (s, co) = (theta / 2.0).sin_cos();
    single(c(co, 0.0), c(-s, 0.0), c(s, 0.0), c(co, 0.0))
}

/// Rotation about Z.
pub fn rz<P: Precision>(theta: f64) -> GateMatrix<P> {
    single(
        polar(1.0, -theta / 2.0),
        c(0.0, 0.0),
        c(0.0, 0.0),
        polar(1.0, theta / 2.0),
    )
}

/// Phase shift diag(1, e^{iφ}).
pub fn phase_shift<P: Precision>(phi: f64) -> GateMatrix<P> {
    single(c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), polar(1.0, phi))
}

/// General rotation `RZ(ω) RY(θ) RZ(φ)`.
pub fn rot<P: Precision>(phi: f64, theta: f64, omega: f64) -> GateMatrix<P> {
    let (s, co) = (theta / 2.0).sin_cos();
    single(
        polar(co, -(phi + omega) / 2.0),
        polar(-s, (phi - omega) / 2.0),
        polar(s, -(phi - omega) / 2.0),
        polar(co, (phi + omega) / 2.0),
    )
}

/// SWAP on two wires.
pub fn swap<P: Precision>() -> GateMatrix<P> {
    GateMatrix::from_fn(2, |r, col| {
        let swapped = match col {
            1 => 2,
            2 => 1,
            other => other,
        };
        if r == swapped {
            c(1.0, 0.0)
        } else {
            c(0.0, 0.0)
        }
    })
}

/// Controlled-Z as a full two-wire matrix.
pub fn cz<P: Precision>() -> GateMatrix<P> {
    GateMatrix::from_fn(2, |r, col| match (r == col, r) {
        (true, 3) => c(-1.0, 0.0),
        (true, _) => c(1.0, 0.0),
        _ => c(0.0, 0.0),
    })
}
