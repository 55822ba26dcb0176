//! Shared access to a manager across threads
//!
//! A [`Manager`] has no internal locking. `SharedManager` supplies the
//! external synchronization needed to hand one heap to several threads: every
//! call happens under a single lock, so collections still run to completion
//! without interleaving.

use crate::manager::Manager;
use crate::options::GcOptions;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, lock-protected handle to one [`Manager`]
///
/// # Example
///
/// ```
/// use kehricht::SharedManager;
/// use std::thread;
///
/// let shared = SharedManager::new();
/// let worker = shared.clone();
/// thread::spawn(move || {
///     worker.lock().allocate_integer(1).unwrap();
/// })
/// .join()
/// .unwrap();
/// assert_eq!(shared.lock().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedManager {
    inner: Arc<Mutex<Manager>>,
}

impl SharedManager {
    pub fn new() -> Self {
        Self::from(Manager::new())
    }

    pub fn with_options(options: GcOptions) -> Self {
        Self::from(Manager::with_options(options))
    }

    /// Block until the manager is available
    pub fn lock(&self) -> MutexGuard<'_, Manager> {
        self.inner.lock()
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, Manager>> {
        self.inner.try_lock()
    }
}

impl From<Manager> for SharedManager {
    fn from(manager: Manager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }
}
