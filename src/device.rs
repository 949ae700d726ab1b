//! The device: a dedicated work-stealing pool standing in for the SIMT
//! scheduler, plus caller-owned device memory.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use once_cell::sync::OnceCell;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::DeviceConfig;
use crate::error::{Result, SortError};

static GLOBAL_DEVICE: OnceCell<Device> = OnceCell::new();

pub struct Device {
    pool: ThreadPool,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Result<Device> {
        if !config.enabled {
            return Err(SortError::DeviceUnavailable("disabled by configuration".to_string()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("devicesort-{i}"))
            .build()
            .map_err(|e| SortError::DeviceUnavailable(e.to_string()))?;
        info!("Device initialized with {} threads", config.num_threads);
        Ok(Device { pool })
    }

    /// The process-wide device, configured from the environment on first use.
    pub fn global() -> Result<&'static Device> {
        GLOBAL_DEVICE.get_or_try_init(|| {
            let device = Device::new(DeviceConfig::from_env());
            if let Err(e) = &device {
                warn!("Device detection failed: {e}");
            }
            device
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` with the device pool as the ambient rayon pool.
    pub(crate) fn launch<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

/// Whether a usable device exists. Tests use this to skip device work.
pub fn is_available() -> bool {
    Device::global().is_ok()
}

/// Fixed-length device memory. Cloning the handle aliases the allocation;
/// the allocation is released when the last handle is dropped.
pub struct DeviceBuffer<T> {
    len: usize,
    data: Arc<Mutex<Box<[T]>>>,
}

impl<T> Clone for DeviceBuffer<T> {
    fn clone(&self) -> Self {
        DeviceBuffer {
            len: self.len,
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Copy + Send + 'static> DeviceBuffer<T> {
    pub fn from_host(src: &[T]) -> DeviceBuffer<T> {
        DeviceBuffer {
            len: src.len(),
            data: Arc::new(Mutex::new(src.to_vec().into_boxed_slice())),
        }
    }

    pub fn filled(len: usize, value: T) -> DeviceBuffer<T> {
        DeviceBuffer {
            len,
            data: Arc::new(Mutex::new(vec![value; len].into_boxed_slice())),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn copy_to_host(&self, dst: &mut [T]) -> Result<()> {
        if dst.len() != self.len {
            return Err(SortError::LengthMismatch {
                buffer: "host destination",
                expected: self.len,
                actual: dst.len(),
            });
        }
        dst.copy_from_slice(&self.lock());
        Ok(())
    }

    pub fn copy_from_host(&self, src: &[T]) -> Result<()> {
        if src.len() != self.len {
            return Err(SortError::LengthMismatch {
                buffer: "host source",
                expected: self.len,
                actual: src.len(),
            });
        }
        self.lock().copy_from_slice(src);
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.lock().to_vec()
    }

    /// Exclusive access for the duration of one kernel launch.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Box<[T]>> {
        // a panicking kernel leaves the data in an unspecified order, never invalid
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Identity of the allocation, comparable across element types.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.data) as *const () as usize
    }
}

/// Locks two distinct buffers in ascending allocation order, the order every
/// job takes its locks in.
pub(crate) fn lock_pair<'a, A, B>(
    a: &'a DeviceBuffer<A>,
    b: &'a DeviceBuffer<B>,
) -> (MutexGuard<'a, Box<[A]>>, MutexGuard<'a, Box<[B]>>)
where
    A: Copy + Send + 'static,
    B: Copy + Send + 'static,
{
    if a.id() < b.id() {
        let first = a.lock();
        (first, b.lock())
    } else {
        let first = b.lock();
        (a.lock(), first)
    }
}

impl<T> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.len)
            .finish()
    }
}
