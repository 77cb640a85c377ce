//! Device handles and memory accounting.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::{debug, trace};

use crate::error::{DeviceError, DeviceResult};
use crate::stream::{Stream, StreamId};

/// Default memory capacity of a device: 16 GiB.
pub const DEFAULT_CAPACITY_BYTES: usize = 16 * 1024 * 1024 * 1024;

/// Identifier of an accelerator device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct DeviceInner {
    id: DeviceId,
    capacity: usize,
    allocated: AtomicUsize,
    next_stream: AtomicU64,
}

/// Handle onto one accelerator device.
///
/// Cloning the handle is cheap; all clones share the same memory accounting.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Open the device with the given identifier and the default capacity.
    pub fn new(id: u32) -> Self {
        Self::with_capacity(id, DEFAULT_CAPACITY_BYTES)
    }

    /// Open a device with an explicit memory capacity in bytes.
    pub fn with_capacity(id: u32, capacity: usize) -> Self {
        debug!(device = id, capacity, "Opening device");
        Self {
            inner: Arc::new(DeviceInner {
                id: DeviceId(id),
                capacity,
                allocated: AtomicUsize::new(0),
                next_stream: AtomicU64::new(1),
            }),
        }
    }

    /// Device identifier.
    pub fn id(&self) -> DeviceId {
        self.inner.id
    }

    /// Total memory capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Bytes currently held by live allocations.
    pub fn allocated_memory(&self) -> usize {
        self.inner.allocated.load(Ordering::Acquire)
    }

    /// Bytes still available for new allocations.
    pub fn available_memory(&self) -> usize {
        self.inner.capacity.saturating_sub(self.allocated_memory())
    }

    /// Create a new execution stream on this device.
    pub fn create_stream(&self) -> DeviceResult<Stream> {
        let id = StreamId(self.inner.next_stream.fetch_add(1, Ordering::Relaxed));
        Stream::spawn(id, self.id())
    }

    /// Reserve `bytes` of device memory.
    pub(crate) fn reserve(&self, bytes: usize) -> DeviceResult<Allocation> {
        let mut current = self.inner.allocated.load(Ordering::Acquire);
        loop {
            let next = current
                .checked_add(bytes)
                .filter(|&total| total <= self.inner.capacity)
                .ok_or_else(|| DeviceError::Allocation {
                    device: self.id(),
                    requested: bytes,
                    available: self.inner.capacity.saturating_sub(current),
                })?;
            match self.inner.allocated.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        trace!(device = %self.id(), bytes, "Reserved device memory");
        Ok(Allocation {
            device: self.clone(),
            bytes,
        })
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.inner.id)
            .field("capacity", &self.inner.capacity)
            .field("allocated", &self.allocated_memory())
            .finish()
    }
}

/// A reservation of device memory, released on drop.
pub(crate) struct Allocation {
    device: Device,
    bytes: usize,
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.device
            .inner
            .allocated
            .fetch_sub(self.bytes, Ordering::AcqRel);
        trace!(device = %self.device.id(), bytes = self.bytes, "Released device memory");
    }
}
