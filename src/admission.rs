//! Per-operation concurrency admission.
//!
//! Each operation class has a fixed number of slots. A request either takes
//! a slot immediately or is rejected; nothing waits in a queue. The slot is
//! held by an [`AdmissionPermit`] and returns to the pool when it is dropped,
//! whichever way the request ends.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::config::LimitsConfig;
use crate::{Result, StowageError};

/// Kind of request subject to admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Upload,
    Download,
    List,
}

impl OperationClass {
    /// Lowercase name used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Upload => "upload",
            OperationClass::Download => "download",
            OperationClass::List => "list",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Slots {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Slots {
    fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }
}

/// Non-blocking concurrency limiter with one pool per [`OperationClass`].
///
/// Cloning shares the pools.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    upload: Arc<Slots>,
    download: Arc<Slots>,
    list: Arc<Slots>,
}

impl AdmissionController {
    /// Create a controller with capacities from configuration.
    pub fn new(limits: &LimitsConfig) -> Self {
        Self::with_capacities(limits.upload, limits.download, limits.list)
    }

    /// Create a controller with explicit capacities.
    pub fn with_capacities(upload: usize, download: usize, list: usize) -> Self {
        Self {
            upload: Arc::new(Slots::new(upload)),
            download: Arc::new(Slots::new(download)),
            list: Arc::new(Slots::new(list)),
        }
    }

    fn slots(&self, class: OperationClass) -> &Slots {
        match class {
            OperationClass::Upload => &self.upload,
            OperationClass::Download => &self.download,
            OperationClass::List => &self.list,
        }
    }

    /// Take a slot for `class` or fail immediately with `ResourceExhausted`.
    pub fn try_admit(&self, class: OperationClass) -> Result<AdmissionPermit> {
        let slots = self.slots(class);
        match Arc::clone(&slots.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(AdmissionPermit {
                class,
                _permit: permit,
            }),
            Err(_) => {
                warn!(
                    class = %class,
                    capacity = slots.capacity,
                    "Admission denied"
                );
                Err(StowageError::ResourceExhausted(format!(
                    "too many concurrent {} requests (max {})",
                    class, slots.capacity
                )))
            }
        }
    }

    /// Free slots for `class` right now.
    pub fn available(&self, class: OperationClass) -> usize {
        self.slots(class).semaphore.available_permits()
    }

    /// Configured slots for `class`.
    pub fn capacity(&self, class: OperationClass) -> usize {
        self.slots(class).capacity
    }
}

/// A held admission slot.
#[derive(Debug)]
pub struct AdmissionPermit {
    class: OperationClass,
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    pub fn class(&self) -> OperationClass {
        self.class
    }
}
