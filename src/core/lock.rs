// Exclusion locks guarding load/store sequences.
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Which mutex a storage handle serializes its calls on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LockMode {
    /// A fresh lock owned by the handle.
    #[default]
    Private,
    /// The single process-wide lock shared with the convenience functions.
    Process,
}

/// Cloneable handle to one exclusion mutex; clones serialize against each other.
#[derive(Clone)]
pub struct Lock {
    inner: Arc<Mutex<()>>,
}

impl Lock {
    pub fn new(mode: LockMode) -> Self {
        match mode {
            LockMode::Private => Self::private(),
            LockMode::Process => Self::process(),
        }
    }

    pub fn private() -> Self {
        Self {
            inner: Arc::new(Mutex::new(())),
        }
    }

    pub fn process() -> Self {
        static PROCESS: OnceLock<Lock> = OnceLock::new();
        PROCESS.get_or_init(Lock::private).clone()
    }

    pub fn is_shared_with(&self, other: &Lock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // The mutex guards no data, so a panic while it was held leaves nothing to repair.
    pub(crate) fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::private()
    }
}

impl fmt::Debug for Lock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("process", &self.is_shared_with(&Lock::process()))
            .finish()
    }
}
