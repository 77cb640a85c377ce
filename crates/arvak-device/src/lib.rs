//! Arvak Accelerator Device Layer
//!
//! This crate owns everything that lives on the accelerator side of an Arvak
//! simulator: device memory, execution streams, and the transfers between
//! host memory and device memory.
//!
//! # Model
//!
//! - A [`Device`] has an identifier and a fixed memory capacity. Every
//!   allocation is accounted against that capacity and returned when the
//!   owning buffer is dropped.
//! - A [`Stream`] is an ordered command queue. Commands issued to the same
//!   stream run in program order on the stream's worker; commands on
//!   different streams are unordered unless explicitly synchronised.
//! - A [`DeviceBuffer`] exclusively owns one fixed-length array of complex
//!   elements. The host never touches that memory directly: copies and
//!   kernels are enqueued on the buffer's stream.
//!
//! Kernels run on the stream worker and may parallelise internally across
//! element indices; from the host's perspective a launch returns as soon as
//! the command is queued.
//!
//! # Example
//!
//! ```rust
//! use arvak_device::{CopyMode, Device, DeviceBuffer};
//! use num_complex::Complex64;
//!
//! let device = Device::new(0);
//! let buffer = DeviceBuffer::<f64>::allocate(4, &device, device.create_stream().unwrap()).unwrap();
//!
//! let host = vec![Complex64::new(1.0, 0.0); 4];
//! buffer.copy_from_host(&host, CopyMode::Async).unwrap();
//!
//! let mut back = vec![Complex64::new(0.0, 0.0); 4];
//! buffer.copy_to_host(&mut back, CopyMode::Sync).unwrap();
//! assert_eq!(host, back);
//! ```

pub mod buffer;
pub mod device;
pub mod error;
pub mod precision;
pub mod stream;

pub use buffer::{CopyMode, DeviceBuffer, PendingCopy};
pub use device::{Device, DeviceId};
pub use error::{DeviceError, DeviceResult};
pub use precision::{ElementKind, Precision};
pub use stream::{Stream, StreamId};
