//! Shared call recording.

use parking_lot::Mutex;
use std::sync::Arc;

/// A clonable, thread-safe list of recorded calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in recording order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns how many entries equal `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    /// Returns true if any entry equals `entry`.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    /// Clears recorded entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
