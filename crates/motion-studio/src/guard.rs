//! Single-operation-in-flight guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use motion_models::OperationKind;

use crate::error::{StudioError, StudioResult};

/// Admits at most one studio operation at a time.
#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    inner: Arc<GuardState>,
}

#[derive(Debug, Default)]
struct GuardState {
    busy: AtomicBool,
    current: Mutex<Option<OperationKind>>,
}

impl OperationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start an operation. Fails fast if one is already running.
    pub fn try_acquire(&self, kind: OperationKind) -> StudioResult<OperationPermit> {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let running = self.current().unwrap_or(kind);
            return Err(StudioError::Busy(running));
        }

        *self.lock_current() = Some(kind);
        Ok(OperationPermit {
            inner: Arc::clone(&self.inner),
            kind,
        })
    }

    /// Operation currently holding the guard.
    pub fn current(&self) -> Option<OperationKind> {
        if self.inner.busy.load(Ordering::Acquire) {
            *self.lock_current()
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<OperationKind>> {
        self.inner.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Held for the duration of an operation; releases the guard on drop.
#[derive(Debug)]
pub struct OperationPermit {
    inner: Arc<GuardState>,
    kind: OperationKind,
}

impl OperationPermit {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for OperationPermit {
    fn drop(&mut self) {
        *self.inner.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.inner.busy.store(false, Ordering::Release);
    }
}
