//! Measurement sampling from the device-resident amplitudes.

use arvak_device::Precision;
use rand::Rng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use crate::bits::{bitstring, decode_basis_state, encode_basis_state};
use crate::error::{SimError, SimResult};
use crate::statevector::StateVector;

/// Measurement outcomes of one sampling call.
///
/// Stored flat: bit `w` of shot `s` is at `s * num_qubits + w`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Samples {
    num_qubits: usize,
    bits: Vec<u8>,
}

impl Samples {
    fn from_indices(num_qubits: usize, indices: &[usize]) -> Self {
        let mut bits = vec![0u8; indices.len() * num_qubits];
        for (shot, &index) in bits.chunks_exact_mut(num_qubits).zip(indices) {
            decode_basis_state(index, shot);
        }
        Self { num_qubits, bits }
    }

    /// Number of shots.
    pub fn len(&self) -> usize {
        self.bits.len() / self.num_qubits
    }

    /// Whether no shots were taken.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bits per shot.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Bits of shot `shot`, wire 0 first.
    pub fn shot(&self, shot: usize) -> &[u8] {
        &self.bits[shot * self.num_qubits..(shot + 1) * self.num_qubits]
    }

    /// Iterate over shots.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.bits.chunks_exact(self.num_qubits)
    }

    /// All bits, shot-major.
    pub fn as_flat(&self) -> &[u8] {
        &self.bits
    }

    /// Basis-state index measured in shot `shot`.
    pub fn basis_index(&self, shot: usize) -> usize {
        encode_basis_state(self.shot(shot))
    }

    /// Bitstring of shot `shot`, wire 0 first.
    pub fn bitstring(&self, shot: usize) -> String {
        bitstring(self.basis_index(shot), self.num_qubits)
    }

    /// Occurrences of each bitstring.
    pub fn counts(&self) -> FxHashMap<String, usize> {
        let mut counts = FxHashMap::default();
        for index in self.iter().map(encode_basis_state) {
            *counts.entry(bitstring(index, self.num_qubits)).or_insert(0) += 1;
        }
        counts
    }

    /// Occurrences of each basis-state index.
    pub fn index_counts(&self) -> FxHashMap<usize, usize> {
        let mut counts = FxHashMap::default();
        for index in self.iter().map(encode_basis_state) {
            *counts.entry(index).or_insert(0) += 1;
        }
        counts
    }
}

/// Draw one basis index per shot by inverse-CDF search.
fn draw<R: Rng>(cdf: &[f64], rng: &mut R, num_samples: usize) -> Vec<usize> {
    let total = cdf.last().copied().unwrap_or(0.0);
    let last = cdf.len().saturating_sub(1);
    (0..num_samples)
        .map(|_| {
            let u = rng.r#gen::<f64>() * total;
            cdf.partition_point(|&c| c <= u).min(last)
        })
        .collect()
}

impl<P: Precision> StateVector<P> {
    /// `|a_i|²` for every basis state, behind all queued work.
    pub fn probabilities(&self) -> SimResult<Vec<f64>> {
        Ok(self.buffer.read(|data| {
            data.par_iter()
                .map(|a| a.norm_sqr().into_f64())
                .collect::<Vec<f64>>()
        })?)
    }

    /// Cumulative distribution, checked against the norm tolerance.
    fn cumulative(&self) -> SimResult<Vec<f64>> {
        let cdf = self.buffer.read(|data| {
            data.iter()
                .scan(0.0f64, |acc, a| {
                    *acc += a.norm_sqr().into_f64();
                    Some(*acc)
                })
                .collect::<Vec<f64>>()
        })?;
        let total = cdf.last().copied().unwrap_or(0.0);
        if !total.is_finite() || (total - 1.0).abs() > self.norm_tolerance {
            return Err(SimError::UnnormalizedState {
                total,
                tolerance: self.norm_tolerance,
            });
        }
        Ok(cdf)
    }

    /// Draw `num_samples` measurement shots using the vector's own RNG.
    #[instrument(skip(self), fields(num_qubits = self.num_qubits))]
    pub fn generate_samples(&mut self, num_samples: usize) -> SimResult<Samples> {
        let cdf = self.cumulative()?;
        let indices = draw(&cdf, &mut self.rng, num_samples);
        debug!("Sampled state vector");
        Ok(Samples::from_indices(self.num_qubits, &indices))
    }

    /// Draw `num_samples` measurement shots using `rng`.
    pub fn generate_samples_with<R: Rng>(
        &self,
        rng: &mut R,
        num_samples: usize,
    ) -> SimResult<Samples> {
        let cdf = self.cumulative()?;
        let indices = draw(&cdf, rng, num_samples);
        Ok(Samples::from_indices(self.num_qubits, &indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arvak_device::{CopyMode, Device};
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_draw_skips_zero_probability_states() {
        let cdf = [0.0, 0.5, 0.5, 1.0];
        let mut rng = StdRng::seed_from_u64(7);
        for index in draw(&cdf, &mut rng, 1000) {
            assert!(index == 1 || index == 3);
        }
    }

    #[test]
    fn test_samples_layout() {
        let s = Samples::from_indices(3, &[0b101, 0b011, 0b101]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.shot(1), &[0, 1, 1]);
        assert_eq!(s.as_flat().len(), 9);
        assert_eq!(s.bitstring(0), "101");
        assert_eq!(s.counts()["101"], 2);
        assert_eq!(s.index_counts()[&0b011], 1);
    }

    #[test]
    fn test_probabilities() {
        let mut sv = StateVector::<f64>::new(1, &Device::new(0)).unwrap();
        let h = std::f64::consts::FRAC_1_SQRT_2;
        sv.copy_from_host_slice(
            &[Complex64::new(h, 0.0), Complex64::new(0.0, -h)],
            CopyMode::Async,
        )
        .unwrap();
        let p = sv.probabilities().unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_shots() {
        let mut sv = StateVector::<f32>::new(2, &Device::new(0)).unwrap();
        sv.initialize(CopyMode::Sync).unwrap();
        let s = sv.generate_samples(0).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.num_qubits(), 2);
    }
}
