//! Busy indicator raised while a remote call is in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that shows the user an operation is running.
pub trait BusyIndicator: Send + Sync {
    fn set_busy(&self, busy: bool);
}

/// Shared busy flag that a UI can poll.
#[derive(Debug, Clone, Default)]
pub struct BusyState {
    busy: Arc<AtomicBool>,
}

impl BusyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl BusyIndicator for BusyState {
    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }
}

/// Raises the indicator on creation and resets it on drop.
#[must_use = "the indicator is reset as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    indicator: &'a dyn BusyIndicator,
}

impl<'a> BusyGuard<'a> {
    pub fn raise(indicator: &'a dyn BusyIndicator) -> Self {
        indicator.set_busy(true);
        Self { indicator }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.indicator.set_busy(false);
    }
}
