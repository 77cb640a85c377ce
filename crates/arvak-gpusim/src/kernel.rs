//! Bitmask-indexed gate kernel.
//!
//! For target wires `T` and control wires `C`, every basis index whose
//! control bits are all set belongs to exactly one group of `2^|T|` indices
//! that differ only in their target bits. The kernel multiplies each group by
//! the gate matrix; indices with an unset control bit are left alone.
//!
//! The same plan serves any number of controls, including none.
//!
//! Every involved bit lies below the highest involved position `h`, so the
//! register splits into independent contiguous blocks of `2^(h+1)`
//! amplitudes. The parallel path hands whole blocks to rayon and updates
//! them in place; no copy of the register is taken.

use arvak_device::Precision;
use num_complex::Complex;
use rayon::prelude::*;

use crate::bits::{wire_mask, wire_position};
use crate::gates::GateMatrix;

/// Register width from which kernels run across the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 14;

/// Precomputed indexing for one gate application.
///
/// Built on the host from validated wires, then moved into the stream
/// command that mutates the device memory.
#[derive(Debug, Clone)]
pub struct KernelPlan<P: Precision> {
    num_qubits: usize,
    /// Mask of each target wire, in target order.
    target_masks: Vec<usize>,
    /// Bit positions of the targets, ascending.
    target_positions: Vec<usize>,
    control_mask: usize,
    /// Length of the smallest aligned block holding every involved bit.
    block_len: usize,
    /// `offsets[r]` sets the target bits selected by matrix index `r`.
    offsets: Vec<usize>,
    matrix: GateMatrix<P>,
    parallel_threshold: usize,
}

impl<P: Precision> KernelPlan<P> {
    /// Plan `matrix` (or its adjoint) on `targets` gated by `controls`.
    ///
    /// Wires must already be validated: distinct, in range, and
    /// `matrix.num_wires() == targets.len()`.
    pub fn new(
        num_qubits: usize,
        controls: &[usize],
        targets: &[usize],
        matrix: &GateMatrix<P>,
        adjoint: bool,
    ) -> Self {
        debug_assert_eq!(matrix.num_wires(), targets.len());
        let k = targets.len();
        let target_masks: Vec<usize> = targets
            .iter()
            .map(|&w| wire_mask(num_qubits, w))
            .collect();
        let mut target_positions: Vec<usize> = targets
            .iter()
            .map(|&w| wire_position(num_qubits, w))
            .collect();
        target_positions.sort_unstable();

        let offsets = (0..1usize << k)
            .map(|r| {
                target_masks
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| r & (1 << (k - 1 - j)) != 0)
                    .fold(0, |acc, (_, &m)| acc | m)
            })
            .collect();

        let target_mask = target_masks.iter().fold(0, |acc, &m| acc | m);
        let control_mask = controls
            .iter()
            .fold(0, |acc, &w| acc | wire_mask(num_qubits, w));
        let involved = target_mask | control_mask;

        Self {
            num_qubits,
            control_mask,
            block_len: 1 << (usize::BITS - involved.leading_zeros()),
            target_masks,
            target_positions,
            offsets,
            matrix: if adjoint {
                matrix.adjoint()
            } else {
                matrix.clone()
            },
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Override the register width from which the parallel path is used.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Number of target wires.
    pub fn num_targets(&self) -> usize {
        self.target_masks.len()
    }

    /// Mask with every control bit set.
    pub fn control_mask(&self) -> usize {
        self.control_mask
    }

    /// Apply the planned gate to `data` (`2^num_qubits` amplitudes).
    pub fn apply(&self, data: &mut [Complex<P>]) {
        debug_assert_eq!(data.len(), 1 << self.num_qubits);
        if self.num_qubits >= self.parallel_threshold {
            self.apply_parallel(data);
        } else {
            self.apply_sequential(data);
        }
    }

    /// Index with zero bits inserted at every target position.
    #[inline]
    fn spread(&self, mut base: usize) -> usize {
        for &pos in &self.target_positions {
            let low = base & ((1 << pos) - 1);
            base = ((base >> pos) << (pos + 1)) | low;
        }
        base
    }

    fn apply_sequential(&self, data: &mut [Complex<P>]) {
        self.apply_block(data);
    }

    /// Blocks are disjoint, so each rayon task owns its slice outright. A
    /// gate touching the top bit leaves a single block and runs sequentially.
    fn apply_parallel(&self, data: &mut [Complex<P>]) {
        if data.len() / self.block_len < 2 {
            self.apply_sequential(data);
            return;
        }
        data.par_chunks_mut(self.block_len)
            .for_each(|block| self.apply_block(block));
    }

    /// Apply the gate to an aligned block of `2^m` amplitudes whose length
    /// covers every involved bit. Indices are block-local.
    fn apply_block(&self, data: &mut [Complex<P>]) {
        let dim = self.matrix.dim();
        let zero = Complex::new(P::zero(), P::zero());
        let mut gathered = vec![zero; dim];
        let groups = data.len() >> self.num_targets();

        for group in 0..groups {
            let base = self.spread(group);
            if base & self.control_mask != self.control_mask {
                continue;
            }
            for (slot, &offset) in gathered.iter_mut().zip(&self.offsets) {
                *slot = data[base | offset];
            }
            for (row, &offset) in self.offsets.iter().enumerate() {
                data[base | offset] = gathered
                    .iter()
                    .enumerate()
                    .fold(zero, |acc, (col, &amp)| acc + self.matrix.get(row, col) * amp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::standard;
    use num_complex::Complex64;

    fn basis(n: usize, index: usize) -> Vec<Complex64> {
        let mut v = vec![Complex64::new(0.0, 0.0); 1 << n];
        v[index] = Complex64::new(1.0, 0.0);
        v
    }

    fn pseudo_random_state(n: usize) -> Vec<Complex64> {
        let raw: Vec<Complex64> = (0..1usize << n)
            .map(|i| {
                let x = i as f64;
                Complex64::new((x * 0.37).sin() + 0.1, (x * 1.13).cos())
            })
            .collect();
        let norm = raw.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
        raw.into_iter().map(|a| a / norm).collect()
    }

    #[test]
    fn test_pauli_x_on_wire_zero_flips_msb() {
        let mut v = basis(3, 0);
        KernelPlan::new(3, &[], &[0], &standard::pauli_x(), false).apply(&mut v);
        assert_eq!(v[0b100], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_cnot_respects_control() {
        let x = standard::pauli_x();
        let plan = KernelPlan::new(2, &[0], &[1], &x, false);

        let mut off = basis(2, 0b01);
        plan.apply(&mut off);
        assert_eq!(off[0b01], Complex64::new(1.0, 0.0));

        let mut on = basis(2, 0b10);
        plan.apply(&mut on);
        assert_eq!(on[0b11], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_target_order_follows_matrix_bits() {
        // |01> with SWAP on (1, 0) must still swap.
        let mut v = basis(2, 0b01);
        KernelPlan::new(2, &[], &[1, 0], &standard::swap(), false).apply(&mut v);
        assert_eq!(v[0b10], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_toffoli_needs_both_controls() {
        let x = standard::pauli_x();
        let plan = KernelPlan::new(3, &[0, 1], &[2], &x, false);
        let mut v = basis(3, 0b100);
        plan.apply(&mut v);
        assert_eq!(v[0b100], Complex64::new(1.0, 0.0));
        let mut v = basis(3, 0b110);
        plan.apply(&mut v);
        assert_eq!(v[0b111], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        let n = 6;
        let m = standard::rot(0.3, 1.2, -0.4);
        let cases: [(&[usize], &[usize]); 3] = [(&[], &[2]), (&[0], &[5]), (&[4, 1], &[3])];
        for (controls, targets) in cases {
            let seq = KernelPlan::new(n, controls, targets, &m, true).with_parallel_threshold(64);
            let par = KernelPlan::new(n, controls, targets, &m, true).with_parallel_threshold(0);
            let mut a = pseudo_random_state(n);
            let mut b = a.clone();
            seq.apply(&mut a);
            par.apply(&mut b);
            for (x, y) in a.iter().zip(&b) {
                assert!((x - y).norm() < 1e-12);
            }
        }
        let swap = standard::swap();
        let mut a = pseudo_random_state(n);
        let mut b = a.clone();
        KernelPlan::new(n, &[3], &[5, 0], &swap, false)
            .with_parallel_threshold(64)
            .apply(&mut a);
        KernelPlan::new(n, &[3], &[5, 0], &swap, false)
            .with_parallel_threshold(0)
            .apply(&mut b);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).norm() < 1e-12);
        }
    }

    #[test]
    fn test_parallel_blocks_match_sequential() {
        // Gates confined to low bits split the register into many blocks;
        // a gate on wire 0 leaves one block.
        let n = 8;
        let m = standard::rot(-1.1, 0.7, 0.25);
        let cases: [(&[usize], &[usize]); 4] =
            [(&[], &[7]), (&[6], &[7]), (&[5], &[7, 6]), (&[], &[0])];
        for (controls, targets) in cases {
            let matrix = if targets.len() == 2 {
                standard::swap()
            } else {
                m.clone()
            };
            let plan = KernelPlan::new(n, controls, targets, &matrix, false);
            let mut a = pseudo_random_state(n);
            let mut b = a.clone();
            plan.clone().with_parallel_threshold(64).apply(&mut a);
            plan.with_parallel_threshold(0).apply(&mut b);
            for (x, y) in a.iter().zip(&b) {
                assert!((x - y).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn test_block_len_covers_highest_involved_bit() {
        let x = standard::pauli_x::<f64>();
        assert_eq!(KernelPlan::new(5, &[], &[4], &x, false).block_len, 2);
        assert_eq!(KernelPlan::new(5, &[2], &[4], &x, false).block_len, 8);
        assert_eq!(KernelPlan::new(5, &[4], &[0], &x, false).block_len, 32);
    }

    #[test]
    fn test_adjoint_undoes_gate() {
        let m = standard::rot(0.9, -0.2, 2.1);
        let original = pseudo_random_state(4);
        let mut v = original.clone();
        KernelPlan::new(4, &[1], &[2], &m, false).apply(&mut v);
        KernelPlan::new(4, &[1], &[2], &m, true).apply(&mut v);
        for (x, y) in v.iter().zip(&original) {
            assert!((x - y).norm() < 1e-12);
        }
    }
}
