//! CLI command implementations.

pub mod gates;
pub mod run;
pub mod version;
