//! Request orchestration: one in-flight completion request at a time.
//!
//! Typed input and voice transcripts both land in [`RequestCoordinator::submit`],
//! the single send path. The Idle/Pending state machine is the presence of the
//! spawned task: while a request is in flight, further submissions are dropped
//! (never queued), which is what keeps replies appended in send order.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::protocol::{self, Directive};
use crate::session::{Message, SessionStore};
use crate::voice::VoiceState;

/// Fixed assistant turn stored when the completion service cannot be reached.
pub const APOLOGY: &str = "Sorry, I'm having trouble connecting right now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Pending,
}

/// The remote completion service, stateless: the full history travels with
/// every call and the reply is a single raw string.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

pub struct RequestCoordinator {
    backend: Arc<dyn CompletionBackend>,
    task: Option<JoinHandle<Result<String>>>,
}

impl RequestCoordinator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            task: None,
        }
    }

    pub fn state(&self) -> RequestState {
        if self.task.is_some() {
            RequestState::Pending
        } else {
            RequestState::Idle
        }
    }

    /// Attempt a send. Empty input, an in-flight request, or an active voice
    /// capture all drop the attempt silently. On acceptance the user message
    /// is appended (and persisted) before the request leaves.
    pub fn submit(&mut self, text: &str, store: &mut SessionStore, voice: VoiceState) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.task.is_some() || voice == VoiceState::Listening {
            tracing::debug!("dropping submit while busy");
            return;
        }

        store.append(Message::user(text));
        let history = store.messages().to_vec();
        let backend = Arc::clone(&self.backend);
        self.task = Some(tokio::spawn(
            async move { backend.complete(&history).await },
        ));
    }

    /// Non-blocking check of the in-flight request. Returns the outcome once
    /// it has resolved; the state goes back to Idle at that moment. A panicked
    /// task counts as a transport failure.
    pub async fn poll(&mut self) -> Option<Result<String>> {
        if !self.task.as_ref()?.is_finished() {
            return None;
        }
        let task = self.task.take()?;
        Some(
            task.await
                .unwrap_or_else(|err| Err(anyhow!("completion task failed: {err}"))),
        )
    }

    /// Route a resolved request into the session. A parsed directive stores
    /// the templated confirmation instead of the raw reply and hands the
    /// section id back for dispatch; a failure stores the fixed apology.
    pub fn finish(&self, result: Result<String>, store: &mut SessionStore) -> Option<String> {
        match result {
            Ok(reply) => match protocol::parse_directive(&reply) {
                Some(Directive::Navigate { section }) => {
                    store.append(Message::assistant(protocol::confirmation_text(&section)));
                    Some(section)
                }
                None => {
                    store.append(Message::assistant(reply));
                    None
                }
            },
            Err(err) => {
                tracing::warn!(%err, "completion request failed");
                store.append(Message::assistant(APOLOGY));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    struct FixedBackend {
        reply: String,
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    /// Holds the request open until the gate is released, so tests can
    /// observe the Pending state.
    struct GatedBackend {
        gate: Arc<Notify>,
        reply: String,
    }

    #[async_trait]
    impl CompletionBackend for GatedBackend {
        async fn complete(&self, _messages: &[Message]) -> Result<String> {
            self.gate.notified().await;
            Ok(self.reply.clone())
        }
    }

    fn test_store(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::open(dir.path().join("session.json"), false)
    }

    async fn resolve(coordinator: &mut RequestCoordinator) -> Result<String> {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Some(result) = coordinator.poll().await {
                    return result;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_directive_reply_stores_templated_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(&dir);
        let mut coordinator = RequestCoordinator::new(Arc::new(FixedBackend {
            reply: r#"{"action": "navigate", "section": "projects"}"#.to_string(),
        }));

        coordinator.submit("Show me the projects", &mut store, VoiceState::Idle);
        assert_eq!(coordinator.state(), RequestState::Pending);

        let result = resolve(&mut coordinator).await;
        let section = coordinator.finish(result, &mut store);
        assert_eq!(section.as_deref(), Some("projects"));

        let last = store.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Sure! Taking you to the projects section.");
        assert!(!last.content.contains("action"));
        assert_eq!(coordinator.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn test_plain_reply_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(&dir);
        let mut coordinator = RequestCoordinator::new(Arc::new(FixedBackend {
            reply: "I build things in Rust.".to_string(),
        }));

        coordinator.submit("What do you do?", &mut store, VoiceState::Idle);
        let result = resolve(&mut coordinator).await;
        let section = coordinator.finish(result, &mut store);
        assert!(section.is_none());
        assert_eq!(store.messages().last().unwrap().content, "I build things in Rust.");
    }

    #[tokio::test]
    async fn test_transport_failure_stores_apology_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(&dir);
        let mut coordinator = RequestCoordinator::new(Arc::new(FailingBackend));

        coordinator.submit("hello?", &mut store, VoiceState::Idle);
        let result = resolve(&mut coordinator).await;
        assert!(result.is_err());
        let section = coordinator.finish(result, &mut store);
        assert!(section.is_none());
        assert_eq!(store.messages().last().unwrap().content, APOLOGY);
        assert_eq!(coordinator.state(), RequestState::Idle);

        // A follow-up submit is accepted normally.
        coordinator.submit("try again", &mut store, VoiceState::Idle);
        assert_eq!(coordinator.state(), RequestState::Pending);
    }

    #[tokio::test]
    async fn test_overlapping_submit_is_dropped_while_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(&dir);
        let gate = Arc::new(Notify::new());
        let mut coordinator = RequestCoordinator::new(Arc::new(GatedBackend {
            gate: Arc::clone(&gate),
            reply: "done".to_string(),
        }));

        coordinator.submit("first", &mut store, VoiceState::Idle);
        let len_while_pending = store.len();
        assert_eq!(coordinator.state(), RequestState::Pending);

        coordinator.submit("second", &mut store, VoiceState::Idle);
        coordinator.submit("third", &mut store, VoiceState::Idle);
        assert_eq!(store.len(), len_while_pending);

        gate.notify_one();
        let result = resolve(&mut coordinator).await;
        coordinator.finish(result, &mut store);
        assert_eq!(store.len(), len_while_pending + 1);

        // Only after resolution is the next submit accepted.
        coordinator.submit("second", &mut store, VoiceState::Idle);
        assert_eq!(coordinator.state(), RequestState::Pending);
    }

    #[tokio::test]
    async fn test_empty_and_listening_submissions_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(&dir);
        let mut coordinator = RequestCoordinator::new(Arc::new(FixedBackend {
            reply: "unused".to_string(),
        }));
        let len = store.len();

        coordinator.submit("", &mut store, VoiceState::Idle);
        coordinator.submit("   \n\t ", &mut store, VoiceState::Idle);
        coordinator.submit("hello", &mut store, VoiceState::Listening);

        assert_eq!(store.len(), len);
        assert_eq!(coordinator.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn test_full_history_travels_with_the_request() {
        struct CapturingBackend {
            seen: tokio::sync::Mutex<usize>,
        }

        #[async_trait]
        impl CompletionBackend for CapturingBackend {
            async fn complete(&self, messages: &[Message]) -> Result<String> {
                *self.seen.lock().await = messages.len();
                Ok("ok".to_string())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(&dir);
        store.append(Message::user("earlier question"));
        store.append(Message::assistant("earlier answer"));

        let backend = Arc::new(CapturingBackend {
            seen: tokio::sync::Mutex::new(0),
        });
        let mut coordinator = RequestCoordinator::new(backend.clone());
        coordinator.submit("new question", &mut store, VoiceState::Idle);
        let result = resolve(&mut coordinator).await;
        coordinator.finish(result, &mut store);

        // welcome + two earlier turns + the new user message
        assert_eq!(*backend.seen.lock().await, 4);
    }
}
