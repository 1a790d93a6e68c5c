//! Pending-get results and completion dispatch
//!
//! A batch download never throws at the point of failure: the outcome,
//! success or not, is recorded in a [`PendingGetResult`]. A waiting caller
//! re-raises via [`PendingGetResult::ensure_success`]; a background caller
//! only ever hears about it through its completion callback.
//!
//! Callbacks are a notification boundary: a panicking callback is caught,
//! logged, and dropped. It must never abort the batch that invoked it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use vitalsync_core::{Error, ItemKey, Result};

/// Completion callback invoked exactly once per background batch
pub type PendingGetCallback = Arc<dyn Fn(&PendingGetResult) + Send + Sync>;

/// Outcome of one attempted remote fetch for a batch of keys
#[derive(Debug, Clone, Default)]
pub struct PendingGetResult {
    /// Keys the batch asked the remote for
    pub keys_requested: Vec<ItemKey>,
    /// Keys the remote returned items for
    pub keys_found: Vec<ItemKey>,
    failure: Option<Arc<Error>>,
}

impl PendingGetResult {
    /// Start a result for the given request
    pub fn new(keys_requested: Vec<ItemKey>) -> Self {
        Self {
            keys_requested,
            keys_found: Vec::new(),
            failure: None,
        }
    }

    /// True if at least one requested key was found
    pub fn has_keys_found(&self) -> bool {
        !self.keys_found.is_empty()
    }

    /// Requested keys the remote did not return, matched by item ID
    pub fn keys_not_found(&self) -> Vec<ItemKey> {
        let found: std::collections::HashSet<&str> =
            self.keys_found.iter().map(|k| k.id.as_str()).collect();
        self.keys_requested
            .iter()
            .filter(|k| !found.contains(k.id.as_str()))
            .cloned()
            .collect()
    }

    /// Record the batch failure
    pub fn set_failure(&mut self, error: Error) {
        self.failure = Some(Arc::new(error));
    }

    /// The recorded failure, if any
    pub fn failure(&self) -> Option<&Arc<Error>> {
        self.failure.as_ref()
    }

    /// Re-raise the recorded failure, if any
    pub fn ensure_success(&self) -> Result<()> {
        match &self.failure {
            Some(error) => Err(Error::Download(Arc::clone(error))),
            None => Ok(()),
        }
    }
}

/// Invoke `callback` with `result`, swallowing any panic it raises
pub(crate) fn dispatch_completion(callback: Option<&PendingGetCallback>, result: &PendingGetResult) {
    let Some(callback) = callback else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
        warn!("pending-get completion callback panicked; dropped");
    }
}
