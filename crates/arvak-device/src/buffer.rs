//! Device-resident complex arrays and the transfers that fill and drain them.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use num_complex::Complex;
use tokio::sync::oneshot;
use tracing::{debug, instrument, trace, warn};

use crate::device::{Allocation, Device};
use crate::error::{DeviceError, DeviceResult};
use crate::precision::Precision;
use crate::stream::Stream;

/// Whether a transfer blocks the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Return once the transfer has completed.
    #[default]
    Sync,
    /// Return once the transfer is queued. Completion is only guaranteed
    /// after a later synchronising operation on the same stream.
    Async,
}

impl CopyMode {
    /// Map the boolean `async` flag used by callers that speak in flags.
    pub fn from_async(is_async: bool) -> Self {
        if is_async {
            CopyMode::Async
        } else {
            CopyMode::Sync
        }
    }
}

struct DeviceMemory<P: Precision> {
    data: Mutex<Vec<Complex<P>>>,
    _allocation: Allocation,
}

impl<P: Precision> DeviceMemory<P> {
    fn lock(&self) -> MutexGuard<'_, Vec<Complex<P>>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fixed-length array of complex elements in device memory.
///
/// The buffer is bound to one stream at a time. Every access to its memory,
/// including host transfers, is a command on that stream.
pub struct DeviceBuffer<P: Precision> {
    memory: Arc<DeviceMemory<P>>,
    length: usize,
    device: Device,
    stream: Stream,
}

impl<P: Precision> DeviceBuffer<P> {
    /// Reserve device memory for `length` elements.
    ///
    /// The contents are unspecified until the first copy or kernel writes
    /// them.
    #[instrument(skip(device, stream), fields(device = %device.id(), stream = %stream.id()))]
    pub fn allocate(length: usize, device: &Device, stream: Stream) -> DeviceResult<Self> {
        if stream.device_id() != device.id() {
            return Err(DeviceError::DeviceMismatch {
                stream_device: stream.device_id(),
                buffer_device: device.id(),
            });
        }
        let allocation_error = || DeviceError::Allocation {
            device: device.id(),
            requested: length.saturating_mul(P::KIND.size_bytes()),
            available: device.available_memory(),
        };
        if length == 0 {
            return Err(allocation_error());
        }
        let bytes = length
            .checked_mul(P::KIND.size_bytes())
            .ok_or_else(allocation_error)?;
        let allocation = device.reserve(bytes)?;

        let mut data = Vec::new();
        data.try_reserve_exact(length)
            .map_err(|_| allocation_error())?;
        data.resize(length, Complex::new(P::zero(), P::zero()));

        debug!(length, bytes, kind = %P::KIND, "Allocated device buffer");
        Ok(Self {
            memory: Arc::new(DeviceMemory {
                data: Mutex::new(data),
                _allocation: allocation,
            }),
            length,
            device: device.clone(),
            stream,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Buffers are never empty; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Device owning the memory.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Stream the buffer is bound to.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// Re-bind the buffer to another stream on the same device.
    ///
    /// Work already queued on the old stream is drained first, so program
    /// order holds across the switch. No memory is reallocated.
    pub fn set_stream(&mut self, stream: Stream) -> DeviceResult<()> {
        if stream.device_id() != self.device.id() {
            return Err(DeviceError::DeviceMismatch {
                stream_device: stream.device_id(),
                buffer_device: self.device.id(),
            });
        }
        if !self.stream.same_as(&stream) {
            self.stream.synchronize()?;
            debug!(from = %self.stream.id(), to = %stream.id(), "Rebinding device buffer");
            self.stream = stream;
        }
        Ok(())
    }

    /// Block until every command on the bound stream has completed.
    pub fn synchronize(&self) -> DeviceResult<()> {
        self.stream.synchronize()
    }

    fn check_len(&self, actual: usize) -> DeviceResult<()> {
        if actual == self.length {
            Ok(())
        } else {
            Err(DeviceError::SizeMismatch {
                expected: self.length,
                actual,
            })
        }
    }

    /// Copy host data into the buffer.
    ///
    /// The host slice is staged before the call returns, so the caller may
    /// reuse it immediately even in [`CopyMode::Async`].
    pub fn copy_from_host(&self, src: &[Complex<P>], mode: CopyMode) -> DeviceResult<()> {
        self.check_len(src.len())?;
        let staged = src.to_vec();
        let memory = Arc::clone(&self.memory);
        self.stream
            .enqueue(move || memory.lock().copy_from_slice(&staged))?;
        trace!(length = self.length, ?mode, "Queued host-to-device copy");
        if mode == CopyMode::Sync {
            self.stream.synchronize()?;
        }
        Ok(())
    }

    /// Copy the buffer into host memory.
    ///
    /// In [`CopyMode::Sync`] the stream is drained and the device memory is
    /// copied straight into `dst`; the returned guard is already complete.
    /// In [`CopyMode::Async`] the worker stages a snapshot at the copy's
    /// position in the stream, and the destination is written when the
    /// guard is waited on or dropped.
    pub fn copy_to_host<'a>(
        &self,
        dst: &'a mut [Complex<P>],
        mode: CopyMode,
    ) -> DeviceResult<PendingCopy<'a, P>> {
        self.check_len(dst.len())?;
        if mode == CopyMode::Sync {
            self.stream.synchronize()?;
            dst.copy_from_slice(&self.memory.lock());
            trace!(length = self.length, ?mode, "Completed device-to-host copy");
            return Ok(PendingCopy {
                dst,
                receiver: None,
                stream: self.stream.clone(),
            });
        }

        let (tx, rx) = oneshot::channel();
        let memory = Arc::clone(&self.memory);
        self.stream.enqueue(move || {
            let _ = tx.send(memory.lock().clone());
        })?;
        trace!(length = self.length, ?mode, "Queued device-to-host copy");

        Ok(PendingCopy {
            dst,
            receiver: Some(rx),
            stream: self.stream.clone(),
        })
    }

    /// Copy another device buffer into this one.
    ///
    /// Both buffers must hold the same element type and length. When the
    /// source lives on a different stream, that stream is drained first so
    /// the copy observes all of its prior work.
    pub fn copy_from_device<Q: Precision>(
        &self,
        src: &DeviceBuffer<Q>,
        mode: CopyMode,
    ) -> DeviceResult<()> {
        if Q::KIND != P::KIND {
            return Err(DeviceError::IncompatibleType {
                expected: P::KIND,
                actual: Q::KIND,
            });
        }
        let src = (src as &dyn Any)
            .downcast_ref::<DeviceBuffer<P>>()
            .ok_or(DeviceError::IncompatibleType {
                expected: P::KIND,
                actual: Q::KIND,
            })?;
        self.check_len(src.len())?;

        if Arc::ptr_eq(&self.memory, &src.memory) {
            return Ok(());
        }
        if !self.stream.same_as(&src.stream) {
            src.stream.synchronize()?;
        }

        let from = Arc::clone(&src.memory);
        let to = Arc::clone(&self.memory);
        self.stream.enqueue(move || {
            // Never hold both locks: a reverse copy may be running elsewhere.
            let staged = from.lock().clone();
            to.lock().copy_from_slice(&staged);
        })?;
        trace!(length = self.length, ?mode, "Queued device-to-device copy");
        if mode == CopyMode::Sync {
            self.stream.synchronize()?;
        }
        Ok(())
    }

    /// Launch a kernel that mutates the buffer in place.
    ///
    /// Returns once the kernel is queued.
    pub fn launch<F>(&self, kernel: F) -> DeviceResult<()>
    where
        F: FnOnce(&mut [Complex<P>]) + Send + 'static,
    {
        let memory = Arc::clone(&self.memory);
        self.stream
            .enqueue(move || kernel(memory.lock().as_mut_slice()))
    }

    /// Run a read-only kernel behind all queued work and return its result.
    pub fn read<F, R>(&self, kernel: F) -> DeviceResult<R>
    where
        F: FnOnce(&[Complex<P>]) -> R + Send + 'static,
        R: Send + 'static,
    {
        let memory = Arc::clone(&self.memory);
        self.stream.run(move || kernel(memory.lock().as_slice()))
    }
}

impl<P: Precision> fmt::Debug for DeviceBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("length", &self.length)
            .field("kind", &P::KIND)
            .field("device", &self.device.id())
            .field("stream", &self.stream.id())
            .finish()
    }
}

/// An in-flight device-to-host copy.
///
/// Dropping the guard waits for the transfer, so the destination is always
/// written before its borrow ends.
pub struct PendingCopy<'a, P: Precision> {
    dst: &'a mut [Complex<P>],
    receiver: Option<oneshot::Receiver<Vec<Complex<P>>>>,
    stream: Stream,
}

impl<P: Precision> PendingCopy<'_, P> {
    /// Whether the destination already holds the transferred data.
    pub fn is_complete(&self) -> bool {
        self.receiver.is_none()
    }

    /// Block until the destination has been written.
    pub fn wait(mut self) -> DeviceResult<()> {
        self.complete()
    }

    fn complete(&mut self) -> DeviceResult<()> {
        if let Some(receiver) = self.receiver.take() {
            let data = receiver
                .blocking_recv()
                .map_err(|_| self.stream.lost_command_error())?;
            self.dst.copy_from_slice(&data);
        }
        Ok(())
    }
}

impl<P: Precision> Drop for PendingCopy<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            warn!("Device-to-host copy lost: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn ramp(n: usize) -> Vec<Complex64> {
        (0..n)
            .map(|i| Complex64::new(i as f64, -(i as f64) * 0.5))
            .collect()
    }

    #[test]
    fn test_allocate_accounts_memory() {
        let device = Device::with_capacity(0, 1024);
        let buf = DeviceBuffer::<f64>::allocate(8, &device, device.create_stream().unwrap())
            .unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(device.allocated_memory(), 8 * 16);
        drop(buf);
        assert_eq!(device.allocated_memory(), 0);
    }

    #[test]
    fn test_allocate_fails_past_capacity() {
        let device = Device::with_capacity(0, 64);
        let result = DeviceBuffer::<f64>::allocate(8, &device, device.create_stream().unwrap());
        assert!(matches!(result, Err(DeviceError::Allocation { .. })));
    }

    #[test]
    fn test_allocate_rejects_foreign_stream() {
        let a = Device::new(0);
        let b = Device::new(1);
        let result = DeviceBuffer::<f64>::allocate(4, &a, b.create_stream().unwrap());
        assert!(matches!(result, Err(DeviceError::DeviceMismatch { .. })));
    }

    #[test]
    fn test_sync_round_trip() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(16, &device, device.create_stream().unwrap())
            .unwrap();
        let host = ramp(16);
        buf.copy_from_host(&host, CopyMode::Sync).unwrap();
        let mut out = vec![Complex64::default(); 16];
        buf.copy_to_host(&mut out, CopyMode::Sync).unwrap();
        assert_eq!(host, out);
    }

    #[test]
    fn test_async_round_trip() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(16, &device, device.create_stream().unwrap())
            .unwrap();
        let host = ramp(16);
        buf.copy_from_host(&host, CopyMode::Async).unwrap();
        let mut out = vec![Complex64::default(); 16];
        let pending = buf.copy_to_host(&mut out, CopyMode::Async).unwrap();
        pending.wait().unwrap();
        assert_eq!(host, out);
    }

    #[test]
    fn test_host_length_mismatch() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(4, &device, device.create_stream().unwrap())
            .unwrap();
        let err = buf.copy_from_host(&ramp(3), CopyMode::Sync).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
        let mut out = vec![Complex64::default(); 5];
        assert!(buf.copy_to_host(&mut out, CopyMode::Sync).is_err());
    }

    #[test]
    fn test_device_to_device_across_streams() {
        let device = Device::new(0);
        let a = DeviceBuffer::<f64>::allocate(8, &device, device.create_stream().unwrap())
            .unwrap();
        let b = DeviceBuffer::<f64>::allocate(8, &device, device.create_stream().unwrap())
            .unwrap();
        let host = ramp(8);
        a.copy_from_host(&host, CopyMode::Async).unwrap();
        b.copy_from_device(&a, CopyMode::Sync).unwrap();
        let mut out = vec![Complex64::default(); 8];
        b.copy_to_host(&mut out, CopyMode::Sync).unwrap();
        assert_eq!(host, out);
    }

    #[test]
    fn test_device_to_device_type_mismatch() {
        let device = Device::new(0);
        let a = DeviceBuffer::<f64>::allocate(8, &device, device.create_stream().unwrap())
            .unwrap();
        let b = DeviceBuffer::<f32>::allocate(8, &device, device.create_stream().unwrap())
            .unwrap();
        let err = b.copy_from_device(&a, CopyMode::Sync).unwrap_err();
        assert!(matches!(err, DeviceError::IncompatibleType { .. }));
    }

    #[test]
    fn test_launch_and_read() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(4, &device, device.create_stream().unwrap())
            .unwrap();
        buf.launch(|data| {
            for (i, a) in data.iter_mut().enumerate() {
                *a = Complex64::new(i as f64, 0.0);
            }
        })
        .unwrap();
        let sum = buf.read(|data| data.iter().map(|a| a.re).sum::<f64>()).unwrap();
        assert!((sum - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_sync_copy_to_host_follows_queued_kernels() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(8, &device, device.create_stream().unwrap())
            .unwrap();
        buf.copy_from_host(&ramp(8), CopyMode::Async).unwrap();
        buf.launch(|data| {
            for a in data.iter_mut() {
                *a *= 2.0;
            }
        })
        .unwrap();
        let mut out = vec![Complex64::default(); 8];
        let pending = buf.copy_to_host(&mut out, CopyMode::Sync).unwrap();
        assert!(pending.is_complete());
        drop(pending);
        let expected: Vec<_> = ramp(8).into_iter().map(|a| a * 2.0).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_panicking_kernel_faults_buffer_stream() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(4, &device, device.create_stream().unwrap())
            .unwrap();
        buf.launch(|_| panic!("kernel fault")).unwrap();
        assert!(matches!(
            buf.synchronize(),
            Err(DeviceError::KernelFault(_))
        ));
        let mut out = vec![Complex64::default(); 4];
        assert!(matches!(
            buf.copy_to_host(&mut out, CopyMode::Sync),
            Err(DeviceError::KernelFault(_))
        ));
        assert!(matches!(
            buf.launch(|_| ()),
            Err(DeviceError::KernelFault(_))
        ));
    }

    #[test]
    fn test_panicking_read_reports_fault() {
        let device = Device::new(0);
        let buf = DeviceBuffer::<f64>::allocate(4, &device, device.create_stream().unwrap())
            .unwrap();
        let err = buf.read(|_| -> f64 { panic!("kernel fault") }).unwrap_err();
        assert!(matches!(err, DeviceError::KernelFault(_)));
    }

    #[test]
    fn test_set_stream_preserves_order() {
        let device = Device::new(0);
        let mut buf = DeviceBuffer::<f64>::allocate(4, &device, device.create_stream().unwrap())
            .unwrap();
        buf.copy_from_host(&ramp(4), CopyMode::Async).unwrap();
        buf.set_stream(device.create_stream().unwrap()).unwrap();
        let mut out = vec![Complex64::default(); 4];
        buf.copy_to_host(&mut out, CopyMode::Sync).unwrap();
        assert_eq!(out, ramp(4));
    }
}
