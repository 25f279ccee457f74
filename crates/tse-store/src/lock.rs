//! Per-report mutual exclusion.
//!
//! Import, validation refresh and remote actions on the same report must not
//! interleave. Different reports proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Registry of one lock per report code.
#[derive(Debug, Clone, Default)]
pub struct ReportLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ReportLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a report code, created on first use.
    ///
    /// Entries no handle refers to any more are dropped on the way.
    pub fn lock_for(&self, report_code: &str) -> ReportLock {
        let mut locks = self.registry();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let inner = locks
            .entry(report_code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ReportLock {
            report_code: report_code.to_string(),
            inner,
        }
    }

    /// Number of report codes with a live lock handle.
    pub fn len(&self) -> usize {
        self.registry()
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Lock of a single report.
#[derive(Debug, Clone)]
pub struct ReportLock {
    report_code: String,
    inner: Arc<Mutex<()>>,
}

impl ReportLock {
    pub fn report_code(&self) -> &str {
        &self.report_code
    }

    /// Block until the report is free. Poisoning is ignored.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        tracing::trace!(report = %self.report_code, "acquiring report lock");
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Take the lock only if no other operation holds it.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, ()>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
