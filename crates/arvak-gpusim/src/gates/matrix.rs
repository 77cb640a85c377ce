//! Dense gate matrices.

use arvak_device::Precision;
use num_complex::Complex;

use crate::error::{SimError, SimResult};

/// A dense `dim × dim` complex matrix in row-major order.
///
/// `dim` is always `2^k` for a gate acting on `k ≥ 1` target wires.
#[derive(Debug, Clone, PartialEq)]
pub struct GateMatrix<P: Precision> {
    dim: usize,
    data: Vec<Complex<P>>,
}

impl<P: Precision> GateMatrix<P> {
    /// Build from row-major elements.
    ///
    /// Fails unless the element count is `dim²` for a power-of-two `dim ≥ 2`.
    pub fn from_row_major(data: Vec<Complex<P>>) -> SimResult<Self> {
        let dim = (data.len() as f64).sqrt().round() as usize;
        if dim * dim != data.len() {
            return Err(SimError::InvalidMatrix(format!(
                "{} elements do not form a square matrix",
                data.len()
            )));
        }
        if dim < 2 || !dim.is_power_of_two() {
            return Err(SimError::InvalidMatrix(format!(
                "dimension {dim} is not a power of two ≥ 2"
            )));
        }
        Ok(Self { dim, data })
    }

    /// Build from a function of `(row, column)`.
    pub fn from_fn(num_wires: usize, f: impl Fn(usize, usize) -> Complex<P>) -> Self {
        let dim = 1 << num_wires;
        let data = (0..dim * dim).map(|i| f(i / dim, i % dim)).collect();
        Self { dim, data }
    }

    pub(crate) fn from_parts_unchecked(dim: usize, data: Vec<Complex<P>>) -> Self {
        debug_assert_eq!(dim * dim, data.len());
        Self { dim, data }
    }

    /// Identity on `num_wires` wires.
    pub fn identity(num_wires: usize) -> Self {
        Self::from_fn(num_wires, |r, c| {
            if r == c {
                Complex::new(P::one(), P::zero())
            } else {
                Complex::new(P::zero(), P::zero())
            }
        })
    }

    /// Row/column count.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of wires the matrix acts on.
    pub fn num_wires(&self) -> usize {
        self.dim.trailing_zeros() as usize
    }

    /// Element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Complex<P> {
        self.data[row * self.dim + col]
    }

    /// Row-major elements.
    pub fn as_slice(&self) -> &[Complex<P>] {
        &self.data
    }

    /// Conjugate transpose.
    #[must_use]
    pub fn adjoint(&self) -> Self {
        Self::from_fn(self.num_wires(), |r, c| self.get(c, r).conj())
    }

    /// Matrix product `self · other`.
    ///
    /// Fails with [`SimError::SizeMismatch`] when the dimensions differ.
    pub fn mul(&self, other: &Self) -> SimResult<Self> {
        if self.dim != other.dim {
            return Err(SimError::SizeMismatch {
                what: "matrix product dimension",
                expected: self.dim,
                actual: other.dim,
            });
        }
        Ok(Self::from_fn(self.num_wires(), |r, c| {
            (0..self.dim).fold(Complex::new(P::zero(), P::zero()), |acc, k| {
                acc + self.get(r, k) * other.get(k, c)
            })
        }))
    }

    /// Whether `M† M ≈ I` within `tolerance` per element.
    pub fn is_unitary(&self, tolerance: f64) -> bool {
        let Ok(product) = self.adjoint().mul(self) else {
            return false;
        };
        let identity = Self::identity(self.num_wires());
        product
            .data
            .iter()
            .zip(&identity.data)
            .all(|(a, b)| (a - b).norm().into_f64() <= tolerance)
    }
}
