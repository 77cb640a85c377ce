//! Explicit-matrix dispatch and multi-wire gates against named equivalents.

use arvak_gpusim::gates::standard;
use arvak_gpusim::{CopyMode, Device, GateMatrix, Precision, SimError, StateVector};
use num_complex::{Complex, Complex64};

fn zero<P: Precision>(num_qubits: usize) -> StateVector<P> {
    let mut sv = StateVector::<P>::new(num_qubits, &Device::new(0)).unwrap();
    sv.initialize(CopyMode::Sync).unwrap();
    sv
}

fn plus<P: Precision>(num_qubits: usize) -> StateVector<P> {
    let mut sv = zero::<P>(num_qubits);
    for w in 0..num_qubits {
        sv.apply_operation("Hadamard", &[w], false, &[]).unwrap();
    }
    sv
}

fn to_f64<P: Precision>(sv: &StateVector<P>) -> Vec<Complex64> {
    sv.to_vec()
        .unwrap()
        .into_iter()
        .map(|a| Complex64::new(a.re.into_f64(), a.im.into_f64()))
        .collect()
}

fn assert_same<P: Precision, Q: Precision>(a: &StateVector<P>, b: &StateVector<Q>, tol: f64) {
    for (i, (x, y)) in to_f64(a).iter().zip(&to_f64(b)).enumerate() {
        assert!((x - y).norm() <= tol, "amplitude {i}: {x} != {y}");
    }
}

fn matrix<P: Precision>(entries: [(f64, f64); 4]) -> GateMatrix<P> {
    GateMatrix::from_row_major(
        entries
            .iter()
            .map(|&(re, im)| Complex::new(P::from_f64(re), P::from_f64(im)))
            .collect(),
    )
    .unwrap()
}

/// Product matrices on every wire of a 5-qubit register. The named gates
/// are applied right to left: "XZ" means PauliX first, then PauliZ.
fn check_product_matrices<P: Precision>() {
    let cases: [(&str, [&str; 2], [(f64, f64); 4]); 6] = [
        ("XZ", ["PauliX", "PauliZ"], [(0.0, 0.0), (1.0, 0.0), (-1.0, 0.0), (0.0, 0.0)]),
        ("ZX", ["PauliZ", "PauliX"], [(0.0, 0.0), (-1.0, 0.0), (1.0, 0.0), (0.0, 0.0)]),
        ("XY", ["PauliX", "PauliY"], [(0.0, -1.0), (0.0, 0.0), (0.0, 0.0), (0.0, 1.0)]),
        ("YX", ["PauliY", "PauliX"], [(0.0, 1.0), (0.0, 0.0), (0.0, 0.0), (0.0, -1.0)]),
        ("YZ", ["PauliY", "PauliZ"], [(0.0, 0.0), (0.0, -1.0), (0.0, -1.0), (0.0, 0.0)]),
        ("ZY", ["PauliZ", "PauliY"], [(0.0, 0.0), (0.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
    ];
    let n = 5;
    for (label, [first, second], entries) in cases {
        let m = matrix::<P>(entries);
        let mut by_matrix = plus::<P>(n);
        let mut by_name = plus::<P>(n);
        for w in 0..n {
            by_name
                .apply_operations(
                    &[first, second],
                    &[[w], [w]],
                    &[false, false],
                    &[Vec::<P>::new(), Vec::new()],
                )
                .unwrap();
            by_matrix.apply_matrix(label, &[w], false, &m).unwrap();
        }
        assert_same(&by_matrix, &by_name, 1e-5);
    }
}

#[test]
fn test_product_matrices() {
    check_product_matrices::<f64>();
    check_product_matrices::<f32>();
}

fn check_cz_matrix<P: Precision>() {
    let mut by_matrix = plus::<P>(3);
    by_matrix
        .apply_matrix("CZmat", &[0, 1], false, &standard::cz())
        .unwrap();

    let mut by_name = plus::<P>(3);
    by_name
        .apply_operations(
            &["Hadamard", "CNOT", "Hadamard"],
            &[vec![1usize], vec![0, 1], vec![1]],
            &[false; 3],
            &[Vec::<P>::new(), Vec::new(), Vec::new()],
        )
        .unwrap();
    assert_same(&by_matrix, &by_name, 1e-5);

    let mut named_cz = plus::<P>(3);
    named_cz.apply_operation("CZ", &[0, 1], false, &[]).unwrap();
    assert_same(&by_matrix, &named_cz, 1e-6);
}

#[test]
fn test_cz_matrix_matches_hadamard_cnot_hadamard() {
    check_cz_matrix::<f64>();
    check_cz_matrix::<f32>();
}

/// CP(λ) = P(λ/2)_c · P(λ/2)_t · CNOT · P(-λ/2)_t · CNOT
#[test]
fn test_controlled_phase_decomposition() {
    for lambda in [0.3, 1.7, -2.4] {
        let half = [lambda / 2.0];
        let mut direct = plus::<f64>(3);
        direct
            .apply_operation("ControlledPhaseShift", &[0, 2], false, &[lambda])
            .unwrap();

        let mut decomposed = plus::<f64>(3);
        decomposed
            .apply_operations(
                &["PhaseShift", "PhaseShift", "CNOT", "PhaseShift", "CNOT"],
                &[vec![0usize], vec![2], vec![0, 2], vec![2], vec![0, 2]],
                &[false; 5],
                &[half.to_vec(), half.to_vec(), vec![], vec![-lambda / 2.0], vec![]],
            )
            .unwrap();
        assert_same(&direct, &decomposed, 1e-12);
    }
}

#[test]
fn test_toffoli_truth_table() {
    for input in 0..8usize {
        let mut sv = zero::<f64>(3);
        for w in 0..3 {
            if input & (1 << (2 - w)) != 0 {
                sv.apply_operation("PauliX", &[w], false, &[]).unwrap();
            }
        }
        sv.apply_operation("Toffoli", &[0, 1, 2], false, &[]).unwrap();
        let expected = if input & 0b110 == 0b110 { input ^ 1 } else { input };
        let probs = sv.probabilities().unwrap();
        assert!((probs[expected] - 1.0).abs() < 1e-12, "input {input:03b}");
    }
}

#[test]
fn test_cswap_has_one_control() {
    // |1 0 1⟩ → |1 1 0⟩ with control on wire 0.
    let mut sv = zero::<f64>(3);
    sv.apply_operation("PauliX", &[0], false, &[]).unwrap();
    sv.apply_operation("PauliX", &[2], false, &[]).unwrap();
    sv.apply_operation("CSWAP", &[0, 1, 2], false, &[]).unwrap();
    assert!((sv.probabilities().unwrap()[0b110] - 1.0).abs() < 1e-12);

    // Control clear: unchanged.
    let mut sv = zero::<f64>(3);
    sv.apply_operation("PauliX", &[2], false, &[]).unwrap();
    sv.apply_operation("CSWAP", &[0, 1, 2], false, &[]).unwrap();
    assert!((sv.probabilities().unwrap()[0b001] - 1.0).abs() < 1e-12);
}

#[test]
fn test_swap_and_adjoint_of_s() {
    let mut sv = zero::<f64>(2);
    sv.apply_operation("PauliX", &[1], false, &[]).unwrap();
    sv.apply_operation("SWAP", &[0, 1], false, &[]).unwrap();
    assert!((sv.probabilities().unwrap()[0b10] - 1.0).abs() < 1e-12);

    let mut a = plus::<f64>(2);
    a.apply_operation("S", &[0], false, &[]).unwrap();
    a.apply_operation("S", &[0], true, &[]).unwrap();
    assert_same(&a, &plus::<f64>(2), 1e-12);
}

#[test]
fn test_three_wire_matrix() {
    // Toffoli as a dense 8x8 matrix equals the named gate.
    let toffoli = GateMatrix::<f64>::from_fn(3, |r, col| {
        let target = match col {
            6 => 7,
            7 => 6,
            other => other,
        };
        if r == target {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    });
    let mut by_matrix = plus::<f64>(4);
    by_matrix.apply_operation("RY", &[3], false, &[0.4]).unwrap();
    let mut by_name = plus::<f64>(4);
    by_name.apply_operation("RY", &[3], false, &[0.4]).unwrap();

    by_matrix.apply_matrix("ccx", &[3, 1, 0], false, &toffoli).unwrap();
    by_name.apply_operation("Toffoli", &[3, 1, 0], false, &[]).unwrap();
    assert_same(&by_matrix, &by_name, 1e-12);
}

#[test]
fn test_adjoint_inverse_law() {
    let named: [(&str, &[usize], &[f64]); 8] = [
        ("Hadamard", &[1], &[]),
        ("T", &[0], &[]),
        ("RX", &[2], &[0.7]),
        ("Rot", &[1], &[0.3, -1.2, 2.2]),
        ("CRY", &[2, 0], &[1.9]),
        ("CRot", &[0, 2], &[0.1, 0.2, 0.3]),
        ("CSWAP", &[1, 0, 2], &[]),
        ("ControlledPhaseShift", &[2, 1], &[0.8]),
    ];
    let mut start = plus::<f64>(3);
    start.apply_operation("RY", &[0], false, &[0.33]).unwrap();
    start.apply_operation("CRZ", &[0, 1], false, &[1.1]).unwrap();
    let reference = to_f64(&start);

    for (name, wires, params) in named {
        let mut sv = zero::<f64>(3);
        sv.copy_from_host_slice(&reference, CopyMode::Sync).unwrap();
        sv.apply_operation(name, wires, false, params).unwrap();
        sv.apply_operation(name, wires, true, params).unwrap();
        for (x, y) in to_f64(&sv).iter().zip(&reference) {
            assert!((x - y).norm() < 1e-12, "{name} is not undone by its adjoint");
        }
    }
}

#[test]
fn test_rejections_leave_state_unchanged() {
    let mut sv = plus::<f64>(2);
    let before = to_f64(&sv);

    assert!(matches!(
        sv.apply_matrix("bad", &[0], false, &standard::swap()),
        Err(SimError::SizeMismatch { .. })
    ));
    assert!(matches!(
        sv.apply_matrix("bad", &[0, 5], false, &standard::swap()),
        Err(SimError::WireOutOfRange { wire: 5, .. })
    ));
    assert!(matches!(
        sv.apply_controlled_matrix("bad", &[1], &[1], false, &standard::pauli_x()),
        Err(SimError::Configuration(_))
    ));
    assert_eq!(to_f64(&sv), before);
}
