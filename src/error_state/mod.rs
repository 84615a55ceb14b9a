//! At-most-once error notifications.
//!
//! For each [`ErrorKind`] the tracker remembers the last message that was
//! successfully reported. Per kind:
//!
//! ```text
//!   clear ──notify_error──▶ flagged(msg) ──notify_resolution──▶ clear
//!                             │    ▲
//!                             └────┘ notify_error with a different message
//! ```
//!
//! A repeated error with the same message is suppressed; a resolution is only
//! sent when at least one of its kinds is flagged. State changes happen only
//! after the notifier accepted the event, so a failed send is retried on the
//! next occurrence.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::event::{ErrorEvent, ErrorKind, ResolutionEvent};
use crate::notifier::Notifier;

pub struct ErrorStateTracker {
    notifier: Arc<dyn Notifier>,
    /// Held across the notification so concurrent callers cannot both pass
    /// the duplicate check.
    errors: Mutex<HashMap<ErrorKind, String>>,
}

impl ErrorStateTracker {
    /// Creates a tracker seeded with errors the manager still considers
    /// unresolved (as returned at registration).
    pub fn new(notifier: Arc<dyn Notifier>, unresolved: HashMap<ErrorKind, String>) -> Self {
        Self {
            notifier,
            errors: Mutex::new(unresolved),
        }
    }

    /// Reports `error` under `kind` unless the exact same message is already flagged.
    pub async fn notify_error(&self, kind: ErrorKind, error: &(dyn Display + Sync)) -> Result<()> {
        let message = error.to_string();
        let mut errors = self.errors.lock().await;

        if errors.get(&kind) == Some(&message) {
            debug!(kind = %kind, "error already notified");
            return Ok(());
        }

        self.notifier
            .notify(ErrorEvent::new(kind.clone(), message.clone()).into())
            .await?;
        errors.insert(kind, message);
        Ok(())
    }

    /// Reports that `kinds` are resolved, if any of them is currently flagged.
    ///
    /// On success every requested kind is cleared, flagged or not.
    pub async fn notify_resolution(&self, message: &str, kinds: &[ErrorKind]) -> Result<()> {
        let mut errors = self.errors.lock().await;

        if !kinds.iter().any(|kind| errors.contains_key(kind)) {
            return Ok(());
        }

        self.notifier
            .notify(ResolutionEvent::new(kinds.to_vec(), message).into())
            .await?;
        for kind in kinds {
            errors.remove(kind);
        }
        Ok(())
    }

    /// Snapshot of the currently flagged kinds and their last message.
    pub async fn unresolved(&self) -> HashMap<ErrorKind, String> {
        self.errors.lock().await.clone()
    }
}
