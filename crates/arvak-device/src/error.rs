//! Error types for the device crate.

use thiserror::Error;

use crate::device::DeviceId;
use crate::precision::ElementKind;
use crate::stream::StreamId;

/// Errors raised by device memory and stream operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceError {
    /// The device could not satisfy an allocation request.
    #[error(
        "Device {device} cannot allocate {requested} bytes ({available} bytes available)"
    )]
    Allocation {
        /// Device the allocation was requested on.
        device: DeviceId,
        /// Requested size in bytes.
        requested: usize,
        /// Bytes still available on the device.
        available: usize,
    },

    /// Element counts disagree between source and destination.
    #[error("Size mismatch: buffer holds {expected} elements, got {actual}")]
    SizeMismatch {
        /// Length of the device buffer.
        expected: usize,
        /// Length of the other side of the transfer.
        actual: usize,
    },

    /// Element representations disagree across a device-to-device copy.
    #[error("Incompatible element types for device transfer: {expected} vs {actual}")]
    IncompatibleType {
        /// Element type of the destination buffer.
        expected: ElementKind,
        /// Element type of the source buffer.
        actual: ElementKind,
    },

    /// A stream was bound to a buffer living on a different device.
    #[error("Stream belongs to device {stream_device}, buffer lives on device {buffer_device}")]
    DeviceMismatch {
        /// Device owning the stream.
        stream_device: DeviceId,
        /// Device owning the buffer.
        buffer_device: DeviceId,
    },

    /// The stream worker is gone; no further commands can run.
    #[error("Stream {0} is closed")]
    StreamClosed(StreamId),

    /// A command panicked on the stream; the stream accepts no further work.
    #[error("Kernel fault on stream {0}")]
    KernelFault(StreamId),

    /// The stream worker thread could not be started.
    #[error("Failed to start stream worker: {0}")]
    StreamSpawn(String),
}

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
