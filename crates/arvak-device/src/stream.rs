//! Ordered execution streams.
//!
//! A stream is a FIFO of commands drained by one dedicated worker thread.
//! Commands issued to the same stream therefore run in program order, and a
//! fence enqueued behind them completes only once everything before it has
//! finished.
//!
//! A command that panics faults the stream. The fault is sticky: commands
//! still queued behind it are discarded, and every later enqueue, run or
//! synchronize reports [`DeviceError::KernelFault`].

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::device::DeviceId;
use crate::error::{DeviceError, DeviceResult};

/// Identifier of a stream, unique per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Command = Box<dyn FnOnce() + Send + 'static>;

struct StreamInner {
    id: StreamId,
    device: DeviceId,
    sender: Option<mpsc::UnboundedSender<Command>>,
    fault: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_thread: ThreadId,
}

impl Drop for StreamInner {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.sender.take();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if thread::current().id() != self.worker_thread && handle.join().is_err() {
                error!(stream = %self.id, "Stream worker terminated abnormally");
            }
        }
        debug!(stream = %self.id, device = %self.device, "Stream destroyed");
    }
}

/// Handle onto an ordered command queue on one device.
///
/// Clones refer to the same queue. The worker exits once the last handle is
/// dropped and every queued command has run.
///
/// The blocking operations ([`Stream::synchronize`], [`Stream::run`]) must
/// not be called from inside an async runtime worker or from a command
/// running on the same stream.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<StreamInner>,
}

impl Stream {
    pub(crate) fn spawn(id: StreamId, device: DeviceId) -> DeviceResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Command>();
        let fault = Arc::new(AtomicBool::new(false));
        let worker_fault = Arc::clone(&fault);
        let handle = thread::Builder::new()
            .name(format!("arvak-stream-{device}-{id}"))
            .spawn(move || {
                while let Some(command) = receiver.blocking_recv() {
                    if worker_fault.load(Ordering::SeqCst) {
                        // Dropping the command releases any fence waiting on it.
                        drop(command);
                        continue;
                    }
                    if catch_unwind(AssertUnwindSafe(command)).is_err() {
                        worker_fault.store(true, Ordering::SeqCst);
                        error!(stream = %id, "Command panicked on stream worker, stream faulted");
                    }
                }
                trace!(stream = %id, "Stream worker exiting");
            })
            .map_err(|e| DeviceError::StreamSpawn(e.to_string()))?;
        let worker_thread = handle.thread().id();

        debug!(stream = %id, device = %device, "Stream created");
        Ok(Self {
            inner: Arc::new(StreamInner {
                id,
                device,
                sender: Some(sender),
                fault,
                worker: Mutex::new(Some(handle)),
                worker_thread,
            }),
        })
    }

    /// Stream identifier.
    pub fn id(&self) -> StreamId {
        self.inner.id
    }

    /// Device the stream executes on.
    pub fn device_id(&self) -> DeviceId {
        self.inner.device
    }

    /// Whether two handles refer to the same queue.
    pub fn same_as(&self, other: &Stream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether a command on this stream has panicked.
    pub fn is_faulted(&self) -> bool {
        self.inner.fault.load(Ordering::SeqCst)
    }

    /// Error for a command whose completion signal never arrived.
    pub(crate) fn lost_command_error(&self) -> DeviceError {
        if self.is_faulted() {
            DeviceError::KernelFault(self.inner.id)
        } else {
            DeviceError::StreamClosed(self.inner.id)
        }
    }

    /// Queue a command behind everything already issued to this stream.
    ///
    /// Fails with [`DeviceError::KernelFault`] once the stream has faulted.
    pub fn enqueue<F>(&self, command: F) -> DeviceResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_faulted() {
            return Err(DeviceError::KernelFault(self.inner.id));
        }
        self.inner
            .sender
            .as_ref()
            .ok_or(DeviceError::StreamClosed(self.inner.id))?
            .send(Box::new(command))
            .map_err(|_| DeviceError::StreamClosed(self.inner.id))
    }

    /// Queue a command and block until it has produced its result.
    pub fn run<F, R>(&self, command: F) -> DeviceResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let fault = Arc::clone(&self.inner.fault);
        self.enqueue(move || match catch_unwind(AssertUnwindSafe(command)) {
            Ok(value) => {
                // The receiver only disappears if the caller gave up waiting.
                let _ = tx.send(value);
            }
            Err(payload) => {
                // Raise the fault before the waiter can observe the closed channel.
                fault.store(true, Ordering::SeqCst);
                drop(tx);
                resume_unwind(payload);
            }
        })?;
        rx.blocking_recv().map_err(|_| self.lost_command_error())
    }

    /// Block until every command issued so far has completed.
    pub fn synchronize(&self) -> DeviceResult<()> {
        trace!(stream = %self.inner.id, "Synchronizing stream");
        self.run(|| ())
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.inner.id)
            .field("device", &self.inner.device)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_program_order() {
        let stream = Device::new(0).create_stream().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..100 {
            let log = Arc::clone(&log);
            stream
                .enqueue(move || log.lock().unwrap().push(i))
                .unwrap();
        }
        stream.synchronize().unwrap();
        let log = log.lock().unwrap();
        assert_eq!(*log, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_returns_value() {
        let stream = Device::new(0).create_stream().unwrap();
        assert_eq!(stream.run(|| 6 * 7).unwrap(), 42);
    }

    #[test]
    fn test_panicking_command_faults_stream() {
        let stream = Device::new(0).create_stream().unwrap();
        stream.enqueue(|| panic!("kernel fault")).unwrap();
        let err = stream.synchronize().unwrap_err();
        assert!(matches!(err, DeviceError::KernelFault(id) if id == stream.id()));
        assert!(stream.is_faulted());

        // Sticky: later submissions are refused.
        assert!(matches!(
            stream.enqueue(|| ()),
            Err(DeviceError::KernelFault(_))
        ));
        assert!(matches!(
            stream.synchronize(),
            Err(DeviceError::KernelFault(_))
        ));
    }

    #[test]
    fn test_commands_behind_fault_are_discarded() {
        let stream = Device::new(0).create_stream().unwrap();
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock().unwrap();
        let g = Arc::clone(&gate);
        stream
            .enqueue(move || {
                let _wait = g.lock();
                panic!("kernel fault");
            })
            .unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        stream
            .enqueue(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        drop(held);
        assert!(matches!(
            stream.synchronize(),
            Err(DeviceError::KernelFault(_))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_run_reports_fault() {
        let stream = Device::new(0).create_stream().unwrap();
        let err = stream.run(|| -> u32 { panic!("kernel fault") }).unwrap_err();
        assert!(matches!(err, DeviceError::KernelFault(_)));
    }

    #[test]
    fn test_drop_drains_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let stream = Device::new(0).create_stream().unwrap();
            for _ in 0..10 {
                let c = Arc::clone(&counter);
                stream
                    .enqueue(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
