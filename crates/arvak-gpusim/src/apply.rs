//! Gate dispatch: named gates, explicit matrices and batches.
//!
//! Every request is validated and turned into a [`KernelPlan`] on the host
//! before anything is queued, so a rejected call never touches the
//! amplitudes. Batches are planned in full before the first launch.

use arvak_device::Precision;
use tracing::{debug, trace};

use crate::error::{SimError, SimResult};
use crate::gates::GateMatrix;
use crate::kernel::KernelPlan;
use crate::statevector::StateVector;

/// One owned gate application, for [`StateVector::apply_batch`].
#[derive(Debug, Clone)]
pub struct Operation<P: Precision> {
    /// Gate name, or a label when `matrix` is set.
    pub name: String,
    /// Wires in dispatch order: controls first, then targets.
    pub wires: Vec<usize>,
    /// Apply the conjugate transpose.
    pub adjoint: bool,
    /// Gate parameters.
    pub params: Vec<P>,
    /// Explicit matrix acting on every wire; bypasses the registry.
    pub matrix: Option<GateMatrix<P>>,
}

impl<P: Precision> Operation<P> {
    /// Named gate on `wires`.
    pub fn new(name: impl Into<String>, wires: impl Into<Vec<usize>>) -> Self {
        Self {
            name: name.into(),
            wires: wires.into(),
            adjoint: false,
            params: Vec::new(),
            matrix: None,
        }
    }

    /// Explicit matrix on `wires`; `label` is only used in logs.
    ///
    /// The matrix is already fully bound, so the operation must carry no
    /// parameters; planning rejects it otherwise.
    pub fn from_matrix(
        label: impl Into<String>,
        wires: impl Into<Vec<usize>>,
        matrix: GateMatrix<P>,
    ) -> Self {
        Self {
            matrix: Some(matrix),
            ..Self::new(label, wires)
        }
    }

    /// Set the adjoint flag.
    #[must_use]
    pub fn with_adjoint(mut self, adjoint: bool) -> Self {
        self.adjoint = adjoint;
        self
    }

    /// Set the parameters.
    #[must_use]
    pub fn with_params(mut self, params: impl Into<Vec<P>>) -> Self {
        self.params = params.into();
        self
    }
}

impl<P: Precision> StateVector<P> {
    /// Every wire is in range and none repeats.
    fn check_wires(&self, wires: &[usize]) -> SimResult<()> {
        let mut seen = 0usize;
        for &wire in wires {
            if wire >= self.num_qubits {
                return Err(SimError::WireOutOfRange {
                    wire,
                    num_qubits: self.num_qubits,
                });
            }
            let bit = 1 << wire;
            if seen & bit != 0 {
                return Err(SimError::Configuration(format!(
                    "wire {wire} appears more than once in {wires:?}"
                )));
            }
            seen |= bit;
        }
        Ok(())
    }

    fn plan_named(
        &self,
        name: &str,
        wires: &[usize],
        adjoint: bool,
        params: &[P],
    ) -> SimResult<KernelPlan<P>> {
        let spec = *self
            .registry
            .get(name)
            .ok_or_else(|| SimError::UnknownGate(name.to_string()))?;
        if wires.len() != spec.num_wires() {
            return Err(SimError::Configuration(format!(
                "{name} acts on {} wire(s) ({} control), got {}",
                spec.num_wires(),
                spec.controls,
                wires.len()
            )));
        }
        if params.len() != spec.params {
            return Err(SimError::Configuration(format!(
                "{name} takes {} parameter(s), got {}",
                spec.params,
                params.len()
            )));
        }
        self.check_wires(wires)?;

        let matrix = self.matrices.matrix(name, params)?;
        if matrix.num_wires() != spec.targets {
            return Err(SimError::InvalidMatrix(format!(
                "{name} matrix acts on {} wire(s), expected {}",
                matrix.num_wires(),
                spec.targets
            )));
        }
        let (controls, targets) = wires.split_at(spec.controls);
        trace!(gate = name, ?controls, ?targets, adjoint, "Planned gate");
        Ok(self.plan(controls, targets, &matrix, adjoint))
    }

    fn plan_matrix(
        &self,
        label: &str,
        controls: &[usize],
        targets: &[usize],
        adjoint: bool,
        matrix: &GateMatrix<P>,
    ) -> SimResult<KernelPlan<P>> {
        if targets.is_empty() {
            return Err(SimError::Configuration(format!(
                "{label} needs at least one target wire"
            )));
        }
        let wires: Vec<usize> = controls.iter().chain(targets).copied().collect();
        self.check_wires(&wires)?;
        let expected = 1 << targets.len();
        if matrix.dim() != expected {
            return Err(SimError::SizeMismatch {
                what: "gate matrix dimension",
                expected,
                actual: matrix.dim(),
            });
        }
        trace!(gate = label, ?controls, ?targets, adjoint, "Planned matrix");
        Ok(self.plan(controls, targets, matrix, adjoint))
    }

    fn plan(
        &self,
        controls: &[usize],
        targets: &[usize],
        matrix: &GateMatrix<P>,
        adjoint: bool,
    ) -> KernelPlan<P> {
        KernelPlan::new(self.num_qubits, controls, targets, matrix, adjoint)
            .with_parallel_threshold(self.parallel_threshold)
    }

    fn plan_operation(&self, op: &Operation<P>) -> SimResult<KernelPlan<P>> {
        match &op.matrix {
            Some(_) if !op.params.is_empty() => Err(SimError::Configuration(format!(
                "operation '{}' has an explicit matrix and takes no parameters, got {}",
                op.name,
                op.params.len()
            ))),
            Some(matrix) => self.plan_matrix(&op.name, &[], &op.wires, op.adjoint, matrix),
            None => self.plan_named(&op.name, &op.wires, op.adjoint, &op.params),
        }
    }

    fn launch(&mut self, plan: KernelPlan<P>) -> SimResult<()> {
        self.buffer.launch(move |data| plan.apply(data))?;
        Ok(())
    }

    /// Apply a registered gate.
    ///
    /// The first `controls` wires of the gate's arity are controls, the rest
    /// targets. With `adjoint` the conjugate transpose is applied.
    pub fn apply_operation(
        &mut self,
        name: &str,
        wires: &[usize],
        adjoint: bool,
        params: &[P],
    ) -> SimResult<()> {
        let plan = self.plan_named(name, wires, adjoint, params)?;
        self.launch(plan)
    }

    /// Apply an explicit `2^k × 2^k` matrix to `k` target wires.
    pub fn apply_matrix(
        &mut self,
        label: &str,
        wires: &[usize],
        adjoint: bool,
        matrix: &GateMatrix<P>,
    ) -> SimResult<()> {
        let plan = self.plan_matrix(label, &[], wires, adjoint, matrix)?;
        self.launch(plan)
    }

    /// Apply an explicit matrix to `targets`, only where every control wire
    /// is set.
    pub fn apply_controlled_matrix(
        &mut self,
        label: &str,
        controls: &[usize],
        targets: &[usize],
        adjoint: bool,
        matrix: &GateMatrix<P>,
    ) -> SimResult<()> {
        let plan = self.plan_matrix(label, controls, targets, adjoint, matrix)?;
        self.launch(plan)
    }

    /// Apply a sequence of registered gates given as parallel slices.
    ///
    /// All four slices must have the same length. Every operation is
    /// validated before the first is launched.
    pub fn apply_operations<S, W, Q>(
        &mut self,
        names: &[S],
        wires: &[W],
        adjoints: &[bool],
        params: &[Q],
    ) -> SimResult<()>
    where
        S: AsRef<str>,
        W: AsRef<[usize]>,
        Q: AsRef<[P]>,
    {
        let n = names.len();
        if wires.len() != n || adjoints.len() != n || params.len() != n {
            return Err(SimError::Configuration(format!(
                "batch lengths differ: {n} names, {} wire lists, {} adjoint flags, {} parameter lists",
                wires.len(),
                adjoints.len(),
                params.len()
            )));
        }
        let plans = names
            .iter()
            .zip(wires)
            .zip(adjoints)
            .zip(params)
            .map(|(((name, w), &adj), p)| {
                self.plan_named(name.as_ref(), w.as_ref(), adj, p.as_ref())
            })
            .collect::<SimResult<Vec<_>>>()?;
        debug!(count = plans.len(), "Launching gate batch");
        plans.into_iter().try_for_each(|plan| self.launch(plan))
    }

    /// Apply owned operation records, validating all before launching any.
    pub fn apply_batch(&mut self, operations: &[Operation<P>]) -> SimResult<()> {
        let plans = operations
            .iter()
            .map(|op| self.plan_operation(op))
            .collect::<SimResult<Vec<_>>>()?;
        debug!(count = plans.len(), "Launching operation batch");
        plans.into_iter().try_for_each(|plan| self.launch(plan))
    }
}
