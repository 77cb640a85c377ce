//! Circuit files: a register width and a list of operations.
//!
//! ```yaml
//! num_qubits: 2
//! operations:
//!   - { name: Hadamard, wires: [0] }
//!   - { name: CNOT, wires: [0, 1] }
//!   - { name: RX, wires: [1], params: [0.25], adjoint: true }
//!   - { name: mygate, wires: [0], matrix: [[0, 0], [1, 0], [1, 0], [0, 0]] }
//! ```
//!
//! `matrix` entries are `[re, im]` pairs in row-major order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use arvak_gpusim::{GateMatrix, Operation, Precision};

/// A parsed circuit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitFile {
    pub num_qubits: usize,
    #[serde(default)]
    pub operations: Vec<OperationEntry>,
}

/// One operation as written in a circuit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEntry {
    pub name: String,
    pub wires: Vec<usize>,
    #[serde(default)]
    pub adjoint: bool,
    #[serde(default)]
    pub params: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<[f64; 2]>>,
}

impl OperationEntry {
    /// Convert to an engine operation at precision `P`.
    pub fn to_operation<P: Precision>(&self) -> Result<Operation<P>> {
        let op = match &self.matrix {
            Some(entries) => {
                let data = entries
                    .iter()
                    .map(|&[re, im]| Complex::new(P::from_f64(re), P::from_f64(im)))
                    .collect();
                let matrix = GateMatrix::from_row_major(data)
                    .with_context(|| format!("Invalid matrix for '{}'", self.name))?;
                Operation::from_matrix(self.name.as_str(), self.wires.as_slice(), matrix)
            }
            None => Operation::new(self.name.as_str(), self.wires.as_slice()),
        };
        Ok(op
            .with_adjoint(self.adjoint)
            .with_params(self.params.iter().map(|&p| P::from_f64(p)).collect::<Vec<_>>()))
    }
}

impl CircuitFile {
    /// Engine operations at precision `P`, in file order.
    pub fn operations<P: Precision>(&self) -> Result<Vec<Operation<P>>> {
        self.operations
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                entry
                    .to_operation()
                    .with_context(|| format!("Operation {i}"))
            })
            .collect()
    }
}

/// Load a circuit from a JSON or YAML file, chosen by extension.
pub fn load_circuit(path: &Path) -> Result<CircuitFile> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&source).map_err(|e| anyhow::anyhow!("Parse error: {e}")),
        _ => serde_yaml_ng::from_str(&source).map_err(|e| anyhow::anyhow!("Parse error: {e}")),
    }
}
