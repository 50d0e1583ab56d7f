//! Per-window in-flight marker

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::WindowId;

/// Windows with a group application in progress
#[derive(Debug, Default)]
pub struct InFlight {
    windows: Arc<Mutex<HashSet<WindowId>>>,
}

impl InFlight {
    /// Creates an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `window_id` busy, or returns `None` if it already is
    pub fn try_enter(&self, window_id: WindowId) -> Option<InFlightGuard> {
        if !lock(&self.windows).insert(window_id) {
            return None;
        }
        Some(InFlightGuard {
            windows: Arc::clone(&self.windows),
            window_id,
        })
    }

    /// Returns true while an application runs in `window_id`
    #[must_use]
    pub fn contains(&self, window_id: WindowId) -> bool {
        lock(&self.windows).contains(&window_id)
    }
}

/// Clears the window's marker on drop
#[must_use = "the window is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct InFlightGuard {
    windows: Arc<Mutex<HashSet<WindowId>>>,
    window_id: WindowId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.windows).remove(&self.window_id);
    }
}

fn lock(windows: &Mutex<HashSet<WindowId>>) -> MutexGuard<'_, HashSet<WindowId>> {
    windows.lock().unwrap_or_else(PoisonError::into_inner)
}
