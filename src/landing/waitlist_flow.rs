use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{PersistenceError, ValidationError, WaitlistError},
    landing::{
        collaborators::{DocumentStore, LocalStore},
        transient_status::{StatusKind, StatusMessage, TransientStatus},
    },
    models::waitlist_models::WaitlistEntry,
};

/// Key the fallback list is stored under in the local store.
pub const LOCAL_WAITLIST_KEY: &str = "lernis_waitlist";
pub const THANK_YOU_MESSAGE: &str = "Thanks! You're on the waitlist.";

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Success,
    Error,
}

/// Clears the in-flight flag on every exit path of a submission.
struct SubmittingGuard<'a>(&'a AtomicBool);

impl<'a> SubmittingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SubmittingGuard(flag))
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Waitlist form behavior for a single visitor: validate, write remotely,
/// fall back to the local list, and show a short-lived status.
pub struct WaitlistFlow {
    document_store: Arc<dyn DocumentStore>,
    local_store: Arc<dyn LocalStore>,
    clear_after: Duration,
    submitting: AtomicBool,
    draft: Mutex<String>,
    status: TransientStatus,
}

impl WaitlistFlow {
    pub fn new(
        document_store: Arc<dyn DocumentStore>,
        local_store: Arc<dyn LocalStore>,
        clear_after: Duration,
    ) -> Self {
        Self {
            document_store,
            local_store,
            clear_after,
            submitting: AtomicBool::new(false),
            draft: Mutex::new(String::new()),
            status: TransientStatus::new(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.status.current()
    }

    pub fn phase(&self) -> SubmissionPhase {
        if self.is_submitting() {
            return SubmissionPhase::Submitting;
        }
        match self.status.current().map(|m| m.kind) {
            Some(StatusKind::Success) => SubmissionPhase::Success,
            Some(StatusKind::Error) => SubmissionPhase::Error,
            None => SubmissionPhase::Idle,
        }
    }

    /// Text currently held in the email field.
    pub fn draft(&self) -> String {
        self.draft.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn set_draft(&self, value: &str) {
        if let Ok(mut draft) = self.draft.lock() {
            *draft = value.to_string();
        }
    }

    /// Registers `email_input` on the waitlist.
    ///
    /// A failed remote write is recovered by prepending the entry to the
    /// local list; the visitor sees the same thank-you either way. Only a
    /// failure of that local write comes back as an error besides
    /// validation and overlap rejection.
    pub async fn submit(&self, email_input: &str) -> Result<StatusMessage, WaitlistError> {
        let _guard = SubmittingGuard::acquire(&self.submitting).ok_or_else(|| {
            debug!("Rejected overlapping waitlist submission");
            WaitlistError::InProgress
        })?;
        self.status.reset();
        self.set_draft(email_input);

        if !is_valid_email(email_input) {
            let err = ValidationError::InvalidEmail;
            self.status.publish(StatusMessage::error(err.to_string()), self.clear_after);
            return Err(err.into());
        }

        let entry = WaitlistEntry::new(email_input, Utc::now());
        match self.write_remote(&entry).await {
            Ok(id) => info!("Waitlist entry stored remotely with id {}", id),
            Err(e) => {
                warn!("Remote waitlist write failed, keeping entry locally: {}", e);
                self.local_store
                    .prepend_waitlist_record(LOCAL_WAITLIST_KEY, &entry.to_local_record())
                    .map_err(WaitlistError::LocalPersistence)?;
                info!("Waitlist entry for [redacted] saved to local fallback list");
            }
        }

        self.set_draft("");
        let message = StatusMessage::success(THANK_YOU_MESSAGE);
        self.status.publish(message.clone(), self.clear_after);
        Ok(message)
    }

    async fn write_remote(&self, entry: &WaitlistEntry) -> Result<String, PersistenceError> {
        let id = self.document_store.add_waitlist_entry(entry).await?;
        if id.trim().is_empty() {
            return Err(PersistenceError::EmptyIdentifier);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landing::collaborators::{MockDocumentStore, MockLocalStore};
    use crate::models::waitlist_models::LocalWaitlistRecord;

    const CLEAR_AFTER: Duration = Duration::from_secs(4);

    fn flow(remote: MockDocumentStore, local: MockLocalStore) -> WaitlistFlow {
        WaitlistFlow::new(Arc::new(remote), Arc::new(local), CLEAR_AFTER)
    }

    #[test]
    fn email_pattern_matches_basic_shape() {
        for ok in ["user@example.com", "a.b+c@sub.domain.io", "x@y.z"] {
            assert!(is_valid_email(ok), "{ok} should be valid");
        }
        for bad in [
            "",
            "not-an-email",
            "user@example",
            "@example.com",
            "user@.com",
            "user@@example.com",
            "user @example.com",
            " user@example.com",
            "user@example.com\n",
        ] {
            assert!(!is_valid_email(bad), "{bad:?} should be invalid");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_email_fails_without_writes() {
        let mut remote = MockDocumentStore::new();
        remote.expect_add_waitlist_entry().never();
        let mut local = MockLocalStore::new();
        local.expect_prepend_waitlist_record().never();
        let flow = flow(remote, local);

        let err = flow.submit("not-an-email").await.unwrap_err();

        assert!(matches!(err, WaitlistError::Validation(ValidationError::InvalidEmail)));
        assert_eq!(
            flow.status(),
            Some(StatusMessage::error("Please enter a valid email address."))
        );
        assert_eq!(flow.phase(), SubmissionPhase::Error);
        assert_eq!(flow.draft(), "not-an-email");
        assert!(!flow.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_success_skips_local_write_and_clears_field() {
        let mut remote = MockDocumentStore::new();
        remote
            .expect_add_waitlist_entry()
            .withf(|entry| entry.email == "user@example.com" && entry.source == "landing_waitlist")
            .times(1)
            .returning(|_| Ok("doc-123".to_string()));
        let mut local = MockLocalStore::new();
        local.expect_prepend_waitlist_record().never();
        let flow = flow(remote, local);

        let message = flow.submit("user@example.com").await.unwrap();

        assert_eq!(message, StatusMessage::success(THANK_YOU_MESSAGE));
        assert_eq!(flow.draft(), "");
        assert_eq!(flow.phase(), SubmissionPhase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_failure_falls_back_to_one_local_write() {
        let mut remote = MockDocumentStore::new();
        remote
            .expect_add_waitlist_entry()
            .times(1)
            .returning(|_| Err(PersistenceError::Remote("connection refused".to_string())));
        let mut local = MockLocalStore::new();
        local
            .expect_prepend_waitlist_record()
            .withf(|key, record: &LocalWaitlistRecord| {
                key == LOCAL_WAITLIST_KEY && record.email == "user@example.com" && !record.ts.is_empty()
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let flow = flow(remote, local);

        let message = flow.submit("user@example.com").await.unwrap();

        assert_eq!(message, StatusMessage::success(THANK_YOU_MESSAGE));
        assert_eq!(flow.draft(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_identifier_counts_as_remote_failure() {
        let mut remote = MockDocumentStore::new();
        remote
            .expect_add_waitlist_entry()
            .times(1)
            .returning(|_| Ok("  ".to_string()));
        let mut local = MockLocalStore::new();
        local
            .expect_prepend_waitlist_record()
            .times(1)
            .returning(|_, _| Ok(()));
        let flow = flow(remote, local);

        assert!(flow.submit("user@example.com").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn local_failure_propagates_and_releases_guard() {
        let mut remote = MockDocumentStore::new();
        remote
            .expect_add_waitlist_entry()
            .returning(|_| Err(PersistenceError::NotConfigured));
        let mut local = MockLocalStore::new();
        local
            .expect_prepend_waitlist_record()
            .times(1)
            .returning(|_, _| Err(PersistenceError::Pool("disk full".to_string())));
        let flow = flow(remote, local);

        let err = flow.submit("user@example.com").await.unwrap_err();

        assert!(matches!(err, WaitlistError::LocalPersistence(PersistenceError::Pool(_))));
        assert!(!flow.is_submitting());
        assert_eq!(flow.phase(), SubmissionPhase::Idle);
        assert_eq!(flow.draft(), "user@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn status_returns_to_idle_after_timeout() {
        let mut remote = MockDocumentStore::new();
        remote
            .expect_add_waitlist_entry()
            .returning(|_| Ok("doc-1".to_string()));
        let flow = flow(remote, MockLocalStore::new());

        flow.submit("user@example.com").await.unwrap();
        assert_eq!(flow.phase(), SubmissionPhase::Success);

        tokio::time::sleep(Duration::from_secs(4) + Duration::from_millis(1)).await;
        assert_eq!(flow.phase(), SubmissionPhase::Idle);
        assert!(flow.status().is_none());
    }

    #[tokio::test]
    async fn overlapping_submission_is_rejected() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let mut remote = MockDocumentStore::new();
        remote
            .expect_add_waitlist_entry()
            .times(1)
            .returning(move |_| {
                // hold the first submission in flight until the test releases it
                let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
                Ok("doc-1".to_string())
            });
        let flow = Arc::new(flow(remote, MockLocalStore::new()));

        let first = {
            let flow = flow.clone();
            tokio::task::spawn_blocking(move || {
                tokio::runtime::Handle::current().block_on(flow.submit("first@example.com"))
            })
        };
        while !flow.is_submitting() {
            tokio::task::yield_now().await;
        }

        let second = flow.submit("second@example.com").await;
        assert!(matches!(second, Err(WaitlistError::InProgress)));

        release_tx.send(()).unwrap();
        assert!(first.await.unwrap().is_ok());
        assert!(!flow.is_submitting());
    }
}
