//! Device-resident state vector.

use std::fmt;
use std::sync::Arc;

use arvak_device::{CopyMode, Device, DeviceBuffer, DeviceId, PendingCopy, Precision, Stream};
use num_complex::Complex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, instrument};

use crate::config::SimulatorConfig;
use crate::error::{SimError, SimResult};
use crate::gates::{GateCache, GateMatrixSource, GateRegistry, StandardGates};
use crate::host::{HostState, HostVector};
use crate::kernel::DEFAULT_PARALLEL_THRESHOLD;

/// The `2^n` amplitudes of an `n`-qubit register, held in device memory.
///
/// The vector exclusively owns its device buffer. Every mutation takes
/// `&mut self` and is queued on the buffer's stream, so operations issued
/// through one `StateVector` always run in program order.
pub struct StateVector<P: Precision> {
    pub(crate) num_qubits: usize,
    pub(crate) buffer: DeviceBuffer<P>,
    pub(crate) registry: Arc<GateRegistry>,
    pub(crate) matrices: Arc<dyn GateMatrixSource<P>>,
    pub(crate) rng: StdRng,
    pub(crate) norm_tolerance: f64,
    pub(crate) parallel_threshold: usize,
}

impl<P: Precision> StateVector<P> {
    /// Allocate an `n`-qubit state vector on a fresh stream of `device`.
    ///
    /// The amplitudes are unspecified until [`initialize`](Self::initialize)
    /// or a copy writes them.
    pub fn new(num_qubits: usize, device: &Device) -> SimResult<Self> {
        let stream = device.create_stream()?;
        Self::with_stream(num_qubits, device, stream)
    }

    /// Allocate an `n`-qubit state vector bound to `stream`.
    #[instrument(skip(device, stream), fields(device = %device.id()))]
    pub fn with_stream(num_qubits: usize, device: &Device, stream: Stream) -> SimResult<Self> {
        if num_qubits == 0 {
            return Err(SimError::Configuration(
                "a register needs at least one qubit".to_string(),
            ));
        }
        let length = u32::try_from(num_qubits)
            .ok()
            .and_then(|shift| 1usize.checked_shl(shift))
            .filter(|&len| len.checked_mul(P::KIND.size_bytes()).is_some())
            .ok_or_else(|| {
                SimError::Configuration(format!("{num_qubits} qubits cannot be addressed"))
            })?;
        let buffer = DeviceBuffer::allocate(length, device, stream)?;
        debug!(num_qubits, length, kind = %P::KIND, "Created state vector");

        Ok(Self {
            num_qubits,
            buffer,
            registry: Arc::new(GateRegistry::standard()),
            matrices: Arc::new(GateCache::<P>::standard()),
            rng: StdRng::from_entropy(),
            norm_tolerance: P::DEFAULT_NORM_TOLERANCE,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        })
    }

    /// Allocate a state vector as described by `config`.
    pub fn from_config(config: &SimulatorConfig, num_qubits: usize) -> SimResult<Self> {
        config
            .validate()
            .map_err(|e| SimError::Configuration(e.to_string()))?;
        if num_qubits > config.max_qubits {
            return Err(SimError::Configuration(format!(
                "{num_qubits} qubits exceeds the configured maximum of {}",
                config.max_qubits
            )));
        }
        let device = config.device();
        let mut sv = Self::new(num_qubits, &device)?
            .with_norm_tolerance(config.norm_tolerance.unwrap_or(P::DEFAULT_NORM_TOLERANCE))
            .with_parallel_threshold(config.parallel_threshold)
            .with_matrix_source(GateCache::<P>::new(StandardGates, config.gate_cache_entries));
        if let Some(seed) = config.seed {
            sv.reseed(seed);
        }
        Ok(sv)
    }

    /// Replace the gate registry.
    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<Arc<GateRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Replace the gate-matrix source.
    #[must_use]
    pub fn with_matrix_source(mut self, source: impl GateMatrixSource<P> + 'static) -> Self {
        self.matrices = Arc::new(source);
        self
    }

    /// Seed the sampling RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    /// Tolerance on `|Σ|a_i|² - 1|` accepted by sampling.
    #[must_use]
    pub fn with_norm_tolerance(mut self, tolerance: f64) -> Self {
        self.norm_tolerance = tolerance;
        self
    }

    /// Register width from which kernels run in parallel.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Reset the sampling RNG to a deterministic seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Set the register to `|0…0⟩`.
    pub fn initialize(&mut self, mode: CopyMode) -> SimResult<()> {
        let host = HostState::<P>::new(self.num_qubits)?;
        self.copy_from_host_slice(host.as_slice(), mode)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of amplitudes, always `2^num_qubits`.
    pub fn length(&self) -> usize {
        self.buffer.len()
    }

    /// Device holding the amplitudes.
    pub fn device_id(&self) -> DeviceId {
        self.buffer.device().id()
    }

    /// Stream the amplitudes are bound to.
    pub fn stream(&self) -> &Stream {
        self.buffer.stream()
    }

    /// Re-bind to another stream on the same device.
    pub fn set_stream(&mut self, stream: Stream) -> SimResult<()> {
        Ok(self.buffer.set_stream(stream)?)
    }

    /// The underlying device buffer.
    pub fn buffer(&self) -> &DeviceBuffer<P> {
        &self.buffer
    }

    /// Gate registry consulted by named dispatch.
    pub fn registry(&self) -> &GateRegistry {
        &self.registry
    }

    /// Block until all queued work has completed.
    pub fn synchronize(&self) -> SimResult<()> {
        Ok(self.buffer.synchronize()?)
    }

    fn check_host_len(&self, actual: usize) -> SimResult<()> {
        if actual == self.length() {
            Ok(())
        } else {
            Err(SimError::SizeMismatch {
                what: "host length",
                expected: self.length(),
                actual,
            })
        }
    }

    fn check_qubits(&self, actual: usize) -> SimResult<()> {
        if actual == self.num_qubits {
            Ok(())
        } else {
            Err(SimError::SizeMismatch {
                what: "qubit count",
                expected: self.num_qubits,
                actual,
            })
        }
    }

    /// Overwrite the amplitudes from a host slice of exactly `length()`
    /// elements.
    pub fn copy_from_host_slice(&mut self, src: &[Complex<P>], mode: CopyMode) -> SimResult<()> {
        self.check_host_len(src.len())?;
        Ok(self.buffer.copy_from_host(src, mode)?)
    }

    /// Overwrite the amplitudes from a host vector of the same width.
    pub fn copy_from_host(&mut self, host: &impl HostVector<P>, mode: CopyMode) -> SimResult<()> {
        self.check_qubits(host.num_qubits())?;
        self.copy_from_host_slice(host.as_slice(), mode)
    }

    /// Copy the amplitudes into a host slice of exactly `length()` elements.
    ///
    /// See [`PendingCopy`] for when the destination is written.
    pub fn copy_to_host_slice<'a>(
        &self,
        dst: &'a mut [Complex<P>],
        mode: CopyMode,
    ) -> SimResult<PendingCopy<'a, P>> {
        self.check_host_len(dst.len())?;
        Ok(self.buffer.copy_to_host(dst, mode)?)
    }

    /// Copy the amplitudes into a host vector of the same width.
    pub fn copy_to_host<'a, H: HostVector<P>>(
        &self,
        host: &'a mut H,
        mode: CopyMode,
    ) -> SimResult<PendingCopy<'a, P>> {
        self.check_qubits(host.num_qubits())?;
        self.copy_to_host_slice(host.as_mut_slice(), mode)
    }

    /// Read the amplitudes back behind all queued work.
    pub fn to_vec(&self) -> SimResult<Vec<Complex<P>>> {
        Ok(self.buffer.read(|data| data.to_vec())?)
    }

    /// Overwrite the amplitudes with those of another device state vector.
    ///
    /// The qubit counts are compared first, then the element types.
    pub fn copy_from_device<Q: Precision>(
        &mut self,
        src: &StateVector<Q>,
        mode: CopyMode,
    ) -> SimResult<()> {
        self.check_qubits(src.num_qubits)?;
        Ok(self.buffer.copy_from_device(&src.buffer, mode)?)
    }

    /// Overwrite another device state vector with these amplitudes.
    pub fn copy_to_device<Q: Precision>(
        &self,
        dst: &mut StateVector<Q>,
        mode: CopyMode,
    ) -> SimResult<()> {
        dst.copy_from_device(self, mode)
    }

    /// Replace the amplitudes with those of a same-precision state vector.
    pub fn update_data(&mut self, other: &StateVector<P>, mode: CopyMode) -> SimResult<()> {
        self.copy_from_device(other, mode)
    }
}

impl<P: Precision> fmt::Debug for StateVector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateVector")
            .field("num_qubits", &self.num_qubits)
            .field("buffer", &self.buffer)
            .field("norm_tolerance", &self.norm_tolerance)
            .finish_non_exhaustive()
    }
}
