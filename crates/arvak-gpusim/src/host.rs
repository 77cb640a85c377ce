//! Host-side amplitude storage.

use arvak_device::Precision;
use num_complex::Complex;

use crate::error::{SimError, SimResult};

/// Host memory that can be copied to or from a device statevector.
pub trait HostVector<P: Precision> {
    /// Number of qubits the host data represents.
    fn num_qubits(&self) -> usize;

    /// The amplitudes, `2^num_qubits` of them.
    fn as_slice(&self) -> &[Complex<P>];

    /// Mutable access to the amplitudes.
    fn as_mut_slice(&mut self) -> &mut [Complex<P>];
}

/// Owned host-side amplitude vector.
#[derive(Debug, Clone, PartialEq)]
pub struct HostState<P: Precision> {
    num_qubits: usize,
    data: Vec<Complex<P>>,
}

impl<P: Precision> HostState<P> {
    /// `|0…0⟩` on `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> SimResult<Self> {
        let length = u32::try_from(num_qubits)
            .ok()
            .and_then(|shift| 1usize.checked_shl(shift))
            .ok_or_else(|| {
                SimError::Configuration(format!("{num_qubits} qubits cannot be addressed"))
            })?;
        let mut data = vec![Complex::new(P::zero(), P::zero()); length];
        data[0] = Complex::new(P::one(), P::zero());
        Ok(Self { num_qubits, data })
    }

    /// Wrap existing amplitudes. The length must be a power of two.
    pub fn from_vec(data: Vec<Complex<P>>) -> SimResult<Self> {
        if data.is_empty() || !data.len().is_power_of_two() {
            return Err(SimError::SizeMismatch {
                what: "host length (power of two)",
                expected: data.len().next_power_of_two().max(1),
                actual: data.len(),
            });
        }
        Ok(Self {
            num_qubits: data.len().trailing_zeros() as usize,
            data,
        })
    }

    /// Number of amplitudes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; a register has at least one amplitude.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `Σ|a_i|²`.
    pub fn norm_squared(&self) -> f64 {
        self.data.iter().map(|a| a.norm_sqr().into_f64()).sum()
    }

    /// Consume into the raw amplitudes.
    pub fn into_vec(self) -> Vec<Complex<P>> {
        self.data
    }
}

impl<P: Precision> HostVector<P> for HostState<P> {
    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn as_slice(&self) -> &[Complex<P>] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [Complex<P>] {
        &mut self.data
    }
}
