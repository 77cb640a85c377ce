//! Gate arities, matrices and the matrix cache.

pub mod cache;
pub mod matrix;
pub mod registry;
pub mod standard;

pub use cache::GateCache;
pub use matrix::GateMatrix;
pub use registry::{GateRegistry, GateSpec};
pub use standard::{GateMatrixSource, StandardGates};
