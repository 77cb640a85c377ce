//! Error types for the statevector engine.

use arvak_device::{DeviceError, DeviceId, ElementKind};
use thiserror::Error;

/// Errors produced by statevector transfers, gate application and sampling.
///
/// Every variant is raised before any work is queued on the device, so a
/// failed call leaves the amplitudes untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Length or qubit count disagrees between two sides of an operation.
    #[error("Size mismatch in {what}: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Which quantity disagreed.
        what: &'static str,
        /// Value required by the statevector.
        expected: usize,
        /// Value supplied by the caller.
        actual: usize,
    },

    /// Numeric representations differ across a device-to-device copy.
    #[error("Incompatible element types: {expected} vs {actual}")]
    IncompatibleType {
        /// Element type of the destination.
        expected: ElementKind,
        /// Element type of the source.
        actual: ElementKind,
    },

    /// Named dispatch on a gate that is not registered.
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// Wire arity, parameter count or batch shape does not fit the request.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A wire index is outside the register.
    #[error("Wire {wire} out of range for a {num_qubits}-qubit register")]
    WireOutOfRange {
        /// The offending wire.
        wire: usize,
        /// Register width.
        num_qubits: usize,
    },

    /// A supplied matrix is not square with power-of-two dimension.
    #[error("Invalid gate matrix: {0}")]
    InvalidMatrix(String),

    /// The accelerator could not satisfy an allocation.
    #[error("Allocation of {requested} bytes failed on device {device} ({available} bytes available)")]
    Allocation {
        /// Device the request was made on.
        device: DeviceId,
        /// Requested bytes.
        requested: usize,
        /// Bytes still free on the device.
        available: usize,
    },

    /// Total probability mass drifted outside tolerance.
    #[error("State is not normalised: total probability {total} (tolerance {tolerance})")]
    UnnormalizedState {
        /// Observed `Σ|a_i|²`.
        total: f64,
        /// Allowed deviation from 1.
        tolerance: f64,
    },

    /// Any other device-level fault.
    #[error("Device error: {0}")]
    Device(DeviceError),
}

impl From<DeviceError> for SimError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Allocation {
                device,
                requested,
                available,
            } => SimError::Allocation {
                device,
                requested,
                available,
            },
            DeviceError::SizeMismatch { expected, actual } => SimError::SizeMismatch {
                what: "element count",
                expected,
                actual,
            },
            DeviceError::IncompatibleType { expected, actual } => {
                SimError::IncompatibleType { expected, actual }
            }
            other => SimError::Device(other),
        }
    }
}

/// Result type for statevector operations.
pub type SimResult<T> = Result<T, SimError>;
