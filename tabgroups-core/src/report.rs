//! Rolling error log
//!
//! Unexpected errors caught by an outermost handler end up here: they are
//! logged, kept in a bounded in-memory log for diagnostics and surfaced to
//! the user through a generic notification.

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::host::{Notification, NotificationPort};

const GENERIC_MESSAGE: &str = "Something went wrong. Details were written to the error log.";

/// One recorded error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// When it was recorded
    pub time: DateTime<Utc>,
    /// Operation that failed
    pub context: String,
    /// Error message
    pub message: String,
}

/// Bounded log of unexpected errors, newest first
pub struct ErrorReporter {
    notifications: Arc<dyn NotificationPort>,
    entries: Mutex<VecDeque<ErrorEntry>>,
    capacity: usize,
}

impl ErrorReporter {
    /// Creates a reporter keeping at most `capacity` entries
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationPort>, capacity: usize) -> Self {
        Self {
            notifications,
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ErrorEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an error and notifies the user
    pub async fn report(&self, context: &str, error: &(dyn Display + Sync)) {
        self.record(context, error);
        let notification = Notification::new(GENERIC_MESSAGE);
        if let Err(e) = self.notifications.notify(notification).await {
            tracing::warn!(error = %e, "Failed to show error notification");
        }
    }

    /// Records an error without notifying
    pub fn record(&self, context: &str, error: &dyn Display) {
        let message = error.to_string();
        tracing::error!(context, error = %message, "Unexpected error");

        let mut entries = self.lock();
        entries.push_front(ErrorEntry {
            time: Utc::now(),
            context: context.to_string(),
            message,
        });
        entries.truncate(self.capacity);
    }

    /// Recorded errors, newest first
    #[must_use]
    pub fn entries(&self) -> Vec<ErrorEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Forgets every entry
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("entries", &self.lock().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
