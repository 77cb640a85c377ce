//! Gate dispatch table: gate name → wire and parameter arity.
//!
//! The table is plain data. Adding a gate means registering its arity here
//! and supplying its target matrix from a [`GateMatrixSource`]; the kernel
//! indexing never changes.
//!
//! [`GateMatrixSource`]: crate::gates::GateMatrixSource

use rustc_hash::FxHashMap;

/// Arity of a named gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSpec {
    /// Leading wires interpreted as controls.
    pub controls: usize,
    /// Trailing wires the matrix acts on.
    pub targets: usize,
    /// Number of real parameters.
    pub params: usize,
}

impl GateSpec {
    /// Uncontrolled gate on `targets` wires.
    pub const fn new(targets: usize, params: usize) -> Self {
        Self {
            controls: 0,
            targets,
            params,
        }
    }

    /// Same gate with `controls` leading control wires.
    #[must_use]
    pub const fn controlled(mut self, controls: usize) -> Self {
        self.controls = controls;
        self
    }

    /// Total wire count.
    pub const fn num_wires(&self) -> usize {
        self.controls + self.targets
    }

    /// Whether the matrix depends on parameters.
    pub const fn is_parametric(&self) -> bool {
        self.params > 0
    }
}

/// Immutable-after-construction mapping from gate names to [`GateSpec`]s.
#[derive(Debug, Clone, Default)]
pub struct GateRegistry {
    specs: FxHashMap<String, GateSpec>,
}

impl GateRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard gate set.
    pub fn standard() -> Self {
        let table: [(&str, GateSpec); 22] = [
            ("Identity", GateSpec::new(1, 0)),
            ("PauliX", GateSpec::new(1, 0)),
            ("PauliY", GateSpec::new(1, 0)),
            ("PauliZ", GateSpec::new(1, 0)),
            ("Hadamard", GateSpec::new(1, 0)),
            ("T", GateSpec::new(1, 0)),
            ("S", GateSpec::new(1, 0)),
            ("RX", GateSpec::new(1, 1)),
            ("RY", GateSpec::new(1, 1)),
            ("RZ", GateSpec::new(1, 1)),
            ("Rot", GateSpec::new(1, 3)),
            ("PhaseShift", GateSpec::new(1, 1)),
            ("SWAP", GateSpec::new(2, 0)),
            ("CNOT", GateSpec::new(1, 0).controlled(1)),
            ("CZ", GateSpec::new(1, 0).controlled(1)),
            ("CRX", GateSpec::new(1, 1).controlled(1)),
            ("CRY", GateSpec::new(1, 1).controlled(1)),
            ("CRZ", GateSpec::new(1, 1).controlled(1)),
            ("CRot", GateSpec::new(1, 3).controlled(1)),
            ("ControlledPhaseShift", GateSpec::new(1, 1).controlled(1)),
            ("CSWAP", GateSpec::new(2, 0).controlled(1)),
            ("Toffoli", GateSpec::new(1, 0).controlled(2)),
        ];
        table
            .into_iter()
            .fold(Self::empty(), |reg, (name, spec)| reg.with_gate(name, spec))
    }

    /// Add or replace a gate.
    #[must_use]
    pub fn with_gate(mut self, name: impl Into<String>, spec: GateSpec) -> Self {
        self.specs.insert(name.into(), spec);
        self
    }

    /// Arity of `name`.
    pub fn get(&self, name: &str) -> Option<&GateSpec> {
        self.specs.get(name)
    }

    /// Number of leading control wires `name` expects.
    pub fn control_wires(&self, name: &str) -> Option<usize> {
        self.get(name).map(|s| s.controls)
    }

    /// Whether `name` takes parameters.
    pub fn is_parametric(&self, name: &str) -> Option<bool> {
        self.get(name).map(GateSpec::is_parametric)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.specs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered gates.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
