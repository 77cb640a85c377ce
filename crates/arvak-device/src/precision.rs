//! Floating-point precisions supported on the device.

use std::fmt;

use num_traits::{Float, FloatConst};

/// Tag identifying the in-memory representation of a complex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Two `f32` components.
    Complex32,
    /// Two `f64` components.
    Complex64,
}

impl ElementKind {
    /// Size of one element in bytes.
    pub const fn size_bytes(self) -> usize {
        match self {
            ElementKind::Complex32 => 8,
            ElementKind::Complex64 => 16,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Complex32 => write!(f, "complex<f32>"),
            ElementKind::Complex64 => write!(f, "complex<f64>"),
        }
    }
}

/// Scalar precision of a state vector.
///
/// Implemented for `f32` and `f64`. Everything above the device layer is
/// generic over this trait, so one code path serves both precisions.
pub trait Precision:
    Float + FloatConst + Default + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Representation tag of `Complex<Self>`.
    const KIND: ElementKind;

    /// Default tolerance on `|Σ|a_i|² - 1|` before a state counts as
    /// unnormalised.
    const DEFAULT_NORM_TOLERANCE: f64;

    /// Narrow an `f64` into this precision.
    fn from_f64(value: f64) -> Self;

    /// Widen this value to `f64`.
    fn into_f64(self) -> f64;
}

impl Precision for f32 {
    const KIND: ElementKind = ElementKind::Complex32;
    const DEFAULT_NORM_TOLERANCE: f64 = 1e-4;

    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn into_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Precision for f64 {
    const KIND: ElementKind = ElementKind::Complex64;
    const DEFAULT_NORM_TOLERANCE: f64 = 1e-8;

    fn from_f64(value: f64) -> Self {
        value
    }

    fn into_f64(self) -> f64 {
        self
    }
}
