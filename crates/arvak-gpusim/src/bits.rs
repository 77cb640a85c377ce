//! Qubit-to-bit convention shared by every kernel and by sampling.
//!
//! Wire `w` of an `n`-qubit register is bit `n - 1 - w` of the basis-state
//! index, so wire 0 is the most significant bit and the basis state
//! `|q0 q1 … q(n-1)⟩` reads left to right as a binary number.
//!
//! Gate matrices use the same rule over their own target list: the first
//! target wire is the most significant bit of the row/column index.

/// Bit mask of `wire` within a register of `num_qubits` qubits.
#[inline]
pub fn wire_mask(num_qubits: usize, wire: usize) -> usize {
    debug_assert!(wire < num_qubits);
    1 << (num_qubits - 1 - wire)
}

/// Bit position of `wire` within a register of `num_qubits` qubits.
#[inline]
pub fn wire_position(num_qubits: usize, wire: usize) -> usize {
    debug_assert!(wire < num_qubits);
    num_qubits - 1 - wire
}

/// Write the per-wire bits of `index` into `out` (one byte per wire).
pub fn decode_basis_state(index: usize, out: &mut [u8]) {
    let num_qubits = out.len();
    for (wire, bit) in out.iter_mut().enumerate() {
        *bit = u8::from(index & wire_mask(num_qubits, wire) != 0);
    }
}

/// Basis-state index of a per-wire bit sequence.
pub fn encode_basis_state(bits: &[u8]) -> usize {
    bits.iter()
        .fold(0, |acc, &bit| (acc << 1) | usize::from(bit != 0))
}

/// Bitstring of `index`, wire 0 first.
pub fn bitstring(index: usize, num_qubits: usize) -> String {
    (0..num_qubits)
        .map(|wire| {
            if index & wire_mask(num_qubits, wire) == 0 {
                '0'
            } else {
                '1'
            }
        })
        .collect()
}
