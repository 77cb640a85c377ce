//! Arvak Accelerator State-Vector Engine
//!
//! Holds the full amplitude vector of an n-qubit register in device memory,
//! applies gates to it in place and samples measurement outcomes from it.
//!
//! # Conventions
//!
//! Wire `w` of an `n`-qubit register is bit `n - 1 - w` of the basis-state
//! index, so wire 0 is the most significant bit. Gate matrices follow the
//! same rule over their target wires. See [`bits`].
//!
//! # Example
//!
//! ```rust
//! use arvak_device::{CopyMode, Device};
//! use arvak_gpusim::StateVector;
//!
//! let device = Device::new(0);
//! let mut sv = StateVector::<f64>::new(2, &device).unwrap().with_seed(7);
//! sv.initialize(CopyMode::Sync).unwrap();
//!
//! // Bell state
//! sv.apply_operation("Hadamard", &[0], false, &[]).unwrap();
//! sv.apply_operation("CNOT", &[0, 1], false, &[]).unwrap();
//!
//! let samples = sv.generate_samples(1000).unwrap();
//! let counts = samples.counts();
//! assert_eq!(counts.len(), 2);
//! assert!(counts.contains_key("00") && counts.contains_key("11"));
//! ```

pub mod apply;
pub mod bits;
pub mod config;
pub mod error;
pub mod gates;
pub mod host;
pub mod kernel;
pub mod logging;
pub mod sampling;
pub mod statevector;

pub use apply::Operation;
pub use arvak_device::{CopyMode, Device, DeviceId, PendingCopy, Precision, Stream};
pub use config::{ConfigError, LoggingConfig, SimulatorConfig};
pub use error::{SimError, SimResult};
pub use gates::{GateCache, GateMatrix, GateMatrixSource, GateRegistry, GateSpec, StandardGates};
pub use host::{HostState, HostVector};
pub use sampling::Samples;
pub use statevector::StateVector;
