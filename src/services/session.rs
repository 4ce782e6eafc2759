use crate::services::streaming::RunHandle;
use crate::types::StreamEvent;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Events buffered per session before senders start waiting
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

pub struct SessionManager {
    sessions: HashMap<String, Session>,
}

/// Per-browser state. Created when the page is opened, reset by Clear.
pub struct Session {
    pub id: String,
    pub input_text: String,
    /// Display text of the last completed run
    pub generated_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Id of the run allowed to push. Bumped on every submission and Clear.
    current_run: Arc<AtomicU64>,
    /// Sender of the live channel; runs read it on every send
    event_slot: watch::Sender<mpsc::Sender<StreamEvent>>,
    event_receiver: Option<mpsc::Receiver<StreamEvent>>,
}

impl Session {
    fn new(id: &str) -> Self {
        let (event_sender, event_receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (event_slot, _) = watch::channel(event_sender);
        let now = Utc::now();
        Self {
            id: id.to_string(),
            input_text: String::new(),
            generated_summary: None,
            created_at: now,
            updated_at: now,
            current_run: Arc::new(AtomicU64::new(0)),
            event_slot,
            event_receiver: Some(event_receiver),
        }
    }

    pub fn current_run(&self) -> u64 {
        self.current_run.load(Ordering::Acquire)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn bump_run(&mut self) -> u64 {
        self.updated_at = Utc::now();
        self.current_run.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Create a session, or return the existing one with that id
    pub fn create_session(&mut self, id: &str) -> &Session {
        let session = self.sessions.entry(id.to_string()).or_insert_with(|| {
            tracing::info!("[SESSION] Created session {}", id);
            Session::new(id)
        });
        session.touch();
        session
    }

    /// Drop sessions untouched for longer than `max_idle`. Returns how many went.
    pub fn evict_idle(&mut self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.updated_at >= cutoff);

        let evicted = before - self.sessions.len();
        if evicted > 0 {
            tracing::info!("[SESSION] Evicted {} idle sessions", evicted);
        }
        evicted
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Receiver for the session's SSE stream. A reconnecting client gets a
    /// fresh channel and runs in flight switch over to it.
    pub fn take_receiver(&mut self, id: &str) -> Option<mpsc::Receiver<StreamEvent>> {
        let session = self.sessions.get_mut(id)?;
        session.touch();
        Some(session.event_receiver.take().unwrap_or_else(|| {
            tracing::debug!("[SESSION] Reconnect for {}, replacing event channel", id);
            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            session.event_slot.send_replace(tx);
            rx
        }))
    }

    /// Start a new run for the session. Any run still in flight is superseded.
    pub fn begin_run(&mut self, id: &str, input_text: &str) -> Option<RunHandle> {
        let session = self.sessions.get_mut(id)?;
        session.input_text = input_text.to_string();
        let run_id = session.bump_run();
        tracing::debug!("[SESSION] Session {} starting run {}", id, run_id);
        Some(RunHandle::new(
            run_id,
            session.current_run.clone(),
            session.event_slot.subscribe(),
        ))
    }

    /// Store the result of a run if it is still the session's current one
    pub fn finish_run(&mut self, id: &str, run_id: u64, display_text: String) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if session.current_run() == run_id => {
                session.generated_summary = Some(display_text);
                session.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Reset input and summary and stop any run in flight
    pub fn clear(&mut self, id: &str) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        session.bump_run();
        session.input_text.clear();
        session.generated_summary = None;
        if let Err(e) = session.event_slot.borrow().try_send(StreamEvent::Cleared) {
            tracing::debug!("[SESSION] Clear notice for {} not delivered: {}", id, e);
        }
        tracing::info!("[SESSION] Cleared session {}", id);
        true
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::streaming::DisplaySink;

    #[test]
    fn create_is_idempotent() {
        let mut sessions = SessionManager::new();
        sessions.create_session("a");
        sessions.begin_run("a", "hello").unwrap();
        sessions.create_session("a");

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.get("a").unwrap().input_text, "hello");
    }

    #[test]
    fn new_run_supersedes_previous() {
        let mut sessions = SessionManager::new();
        sessions.create_session("s");
        let first = sessions.begin_run("s", "one").unwrap();
        let second = sessions.begin_run("s", "two").unwrap();

        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(!sessions.finish_run("s", first.run_id(), "stale".into()));
        assert!(sessions.finish_run("s", second.run_id(), "###### fresh".into()));
        assert_eq!(
            sessions.get("s").unwrap().generated_summary.as_deref(),
            Some("###### fresh")
        );
    }

    #[test]
    fn clear_resets_state_and_notifies() {
        let mut sessions = SessionManager::new();
        sessions.create_session("s");
        let mut rx = sessions.take_receiver("s").unwrap();
        let run = sessions.begin_run("s", "text").unwrap();
        sessions.finish_run("s", run.run_id(), "###### sum".into());

        assert!(sessions.clear("s"));
        let session = sessions.get("s").unwrap();
        assert!(session.input_text.is_empty());
        assert!(session.generated_summary.is_none());
        assert!(!run.is_current());
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Cleared);

        assert!(!sessions.clear("missing"));
    }

    #[test]
    fn reconnect_gets_new_channel() {
        let mut sessions = SessionManager::new();
        sessions.create_session("s");
        let first = sessions.take_receiver("s").unwrap();
        drop(first);
        let mut second = sessions.take_receiver("s").unwrap();

        let run = sessions.begin_run("s", "x").unwrap();
        run.blocking_send(StreamEvent::complete(run.run_id())).unwrap();
        assert_eq!(second.try_recv().unwrap(), StreamEvent::complete(run.run_id()));
        assert!(sessions.take_receiver("missing").is_none());
    }

    #[test]
    fn reconnect_mid_run_keeps_the_run_streaming() {
        let mut sessions = SessionManager::new();
        sessions.create_session("s");
        let first = sessions.take_receiver("s").unwrap();
        let run = sessions.begin_run("s", "x").unwrap();
        let mut sink = run.sink();
        sink.push("###### Amanda").unwrap();

        drop(first);
        let mut second = sessions.take_receiver("s").unwrap();

        sink.push("###### Amanda baked").unwrap();
        assert!(run.is_current());
        assert_eq!(
            second.try_recv().unwrap(),
            StreamEvent::summary(run.run_id(), "###### Amanda baked".into())
        );
    }

    #[test]
    fn evicts_only_idle_sessions() {
        let mut sessions = SessionManager::new();
        sessions.create_session("old");
        sessions.create_session("fresh");
        sessions.sessions.get_mut("old").unwrap().updated_at =
            Utc::now() - chrono::Duration::hours(2);

        assert_eq!(sessions.evict_idle(Duration::from_secs(3600)), 1);
        assert!(sessions.get("old").is_none());
        assert!(sessions.get("fresh").is_some());
        assert_eq!(sessions.evict_idle(Duration::from_secs(3600)), 0);
    }
}
