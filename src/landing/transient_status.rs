use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Success, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: StatusKind::Error, text: text.into() }
    }
}

#[derive(Default)]
struct Slot {
    message: Option<StatusMessage>,
    // bumped on every publish/reset so a stale timer cannot clear a newer message
    generation: u64,
}

#[derive(Default)]
struct Inner {
    slot: Mutex<Slot>,
    pending_clear: Mutex<Option<JoinHandle<()>>>,
}

/// A status line that disappears on its own after a fixed delay.
#[derive(Clone, Default)]
pub struct TransientStatus {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TransientStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<StatusMessage> {
        lock(&self.inner.slot).message.clone()
    }

    /// Shows `message` and schedules it to be cleared after `clear_after`.
    /// Must be called from within a tokio runtime.
    pub fn publish(&self, message: StatusMessage, clear_after: Duration) {
        self.cancel_pending_clear();
        let generation = {
            let mut slot = lock(&self.inner.slot);
            slot.generation += 1;
            slot.message = Some(message);
            slot.generation
        };

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(clear_after).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut slot = lock(&inner.slot);
            if slot.generation == generation {
                slot.message = None;
                tracing::trace!("Transient status cleared");
            }
        });
        *lock(&self.inner.pending_clear) = Some(handle);
    }

    /// Drops the current message and any scheduled clear.
    pub fn reset(&self) {
        self.cancel_pending_clear();
        let mut slot = lock(&self.inner.slot);
        slot.generation += 1;
        slot.message = None;
    }

    fn cancel_pending_clear(&self) {
        if let Some(handle) = lock(&self.inner.pending_clear).take() {
            handle.abort();
        }
    }
}
