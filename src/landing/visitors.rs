use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use dashmap::DashMap;
use tokio::time::Instant;

use crate::landing::{
    access_gate::AccessGate,
    collaborators::{DocumentStore, LocalStore},
    waitlist_flow::WaitlistFlow,
};

/// Everything the landing page keeps for one browser: gate state and the
/// waitlist form. Lives only in this process.
pub struct VisitorSession {
    pub gate: AccessGate,
    pub waitlist: WaitlistFlow,
    last_seen: Mutex<Instant>,
}

impl VisitorSession {
    fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    fn last_seen(&self) -> Instant {
        self.last_seen
            .lock()
            .map(|last_seen| *last_seen)
            .unwrap_or_else(|_| Instant::now())
    }

    fn idle_for(&self) -> Duration {
        self.last_seen().elapsed()
    }
}

/// Upper bound on live sessions; the least recently seen one is evicted to
/// make room.
pub const DEFAULT_VISITOR_CAPACITY: usize = 10_000;

pub struct Visitors {
    sessions: DashMap<String, Arc<VisitorSession>>,
    gate_secret: Arc<str>,
    document_store: Arc<dyn DocumentStore>,
    local_store: Arc<dyn LocalStore>,
    status_clear_after: Duration,
    capacity: usize,
}

impl Visitors {
    pub fn new(
        gate_secret: Arc<str>,
        document_store: Arc<dyn DocumentStore>,
        local_store: Arc<dyn LocalStore>,
        status_clear_after: Duration,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            gate_secret,
            document_store,
            local_store,
            status_clear_after,
            capacity: DEFAULT_VISITOR_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Looks up the caller's session without creating one.
    pub fn existing(&self, caller: &str) -> Option<Arc<VisitorSession>> {
        let session = self.sessions.get(caller).map(|entry| entry.value().clone())?;
        session.touch();
        Some(session)
    }

    /// Returns the caller's session, creating a fresh locked one on first sight.
    pub fn session(&self, caller: &str) -> Arc<VisitorSession> {
        if let Some(session) = self.existing(caller) {
            return session;
        }
        while self.sessions.len() >= self.capacity {
            if !self.evict_least_recent() {
                break;
            }
        }

        let session = self
            .sessions
            .entry(caller.to_string())
            .or_insert_with(|| {
                tracing::debug!("New visitor session");
                Arc::new(VisitorSession {
                    gate: AccessGate::new(self.gate_secret.clone()),
                    waitlist: WaitlistFlow::new(
                        self.document_store.clone(),
                        self.local_store.clone(),
                        self.status_clear_after,
                    ),
                    last_seen: Mutex::new(Instant::now()),
                })
            })
            .clone();
        session.touch();
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops the least recently seen session that has no submission in
    /// flight. Returns false when nothing could be evicted.
    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().waitlist.is_submitting())
            .min_by_key(|entry| entry.value().last_seen())
            .map(|entry| entry.key().clone());
        match oldest {
            Some(key) => {
                tracing::debug!("Visitor capacity reached, evicting least recent session");
                self.sessions.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Forgets sessions idle for longer than `max_idle`, except ones with a
    /// submission in flight. Returns how many were dropped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            session.waitlist.is_submitting() || session.idle_for() <= max_idle
        });
        before - self.sessions.len()
    }
}
