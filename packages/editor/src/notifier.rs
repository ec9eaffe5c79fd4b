//! User-facing notices for persistence operations.
//!
//! Notices are fire and forget: the optimistic layer never waits on or
//! inspects the result of a notification.

use bio_common::{ErrorKind, ServiceError};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SaveNotice {
    Loading { operation: &'static str },
    Success { operation: &'static str },
    Error {
        operation: &'static str,
        error: ServiceError,
    },
}

impl SaveNotice {
    pub fn operation(&self) -> &'static str {
        match self {
            SaveNotice::Loading { operation }
            | SaveNotice::Success { operation }
            | SaveNotice::Error { operation, .. } => operation,
        }
    }

    /// Text shown to the user. Transient failures get a generic message.
    pub fn message(&self) -> String {
        match self {
            SaveNotice::Loading { operation } => format!("Saving {operation}..."),
            SaveNotice::Success { operation } => format!("Saved {operation}"),
            SaveNotice::Error { operation, error } => match error.kind() {
                ErrorKind::Transient => format!("Could not save {operation}. Please try again."),
                _ => error.to_string(),
            },
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: SaveNotice);
}

/// Writes notices to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: SaveNotice) {
        match &notice {
            SaveNotice::Error { operation, error } => {
                warn!(operation, %error, "{}", notice.message())
            }
            _ => info!(operation = notice.operation(), "{}", notice.message()),
        }
    }
}

/// Keeps every notice, for assertions in tests
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<SaveNotice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<SaveNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<ServiceError> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                SaveNotice::Error { error, .. } => Some(error),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: SaveNotice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
