//! View event notification
//!
//! Subscribers are best-effort observers: a panicking handler is caught,
//! logged, and dropped, and never disturbs the view's own control flow or
//! the remaining subscribers.

use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;
use tracing::warn;

use vitalsync_core::{Error, ItemKey};

type KeyHandler = Box<dyn Fn(&[ItemKey]) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&Error) + Send + Sync>;

/// Subscriber lists for one view's lifecycle events
#[derive(Default)]
pub struct ViewEvents {
    items_available: Mutex<Vec<KeyHandler>>,
    items_not_found: Mutex<Vec<KeyHandler>>,
    error: Mutex<Vec<ErrorHandler>>,
}

impl ViewEvents {
    /// Subscribe to keys whose items became available locally
    pub fn on_items_available(&self, handler: impl Fn(&[ItemKey]) + Send + Sync + 'static) {
        self.items_available.lock().push(Box::new(handler));
    }

    /// Subscribe to keys the remote confirmed absent
    pub fn on_items_not_found(&self, handler: impl Fn(&[ItemKey]) + Send + Sync + 'static) {
        self.items_not_found.lock().push(Box::new(handler));
    }

    /// Subscribe to batch failures
    pub fn on_error(&self, handler: impl Fn(&Error) + Send + Sync + 'static) {
        self.error.lock().push(Box::new(handler));
    }

    pub(crate) fn notify_items_available(&self, keys: &[ItemKey]) {
        for handler in self.items_available.lock().iter() {
            if catch_unwind(AssertUnwindSafe(|| handler(keys))).is_err() {
                warn!("items-available subscriber panicked; dropped");
            }
        }
    }

    pub(crate) fn notify_items_not_found(&self, keys: &[ItemKey]) {
        for handler in self.items_not_found.lock().iter() {
            if catch_unwind(AssertUnwindSafe(|| handler(keys))).is_err() {
                warn!("items-not-found subscriber panicked; dropped");
            }
        }
    }

    pub(crate) fn notify_error(&self, error: &Error) {
        for handler in self.error.lock().iter() {
            if catch_unwind(AssertUnwindSafe(|| handler(error))).is_err() {
                warn!("error subscriber panicked; dropped");
            }
        }
    }
}
