//! City analysis sessions.
//!
//! A session is the lifetime of one city's dashboard, from selection to back
//! navigation. It owns the fetched [`CityPayload`] and the chat transcript.
//!
//! # States
//!
//! ```text
//! Idle -> Loading -> Ready
//!                 -> Failed
//! ```
//!
//! `Failed` is terminal for the session. The failure is surfaced only as a
//! transcript entry; the user gets a fresh session by going back and
//! selecting the city again.
//!
//! No session operation returns an error. Backend failures are logged and
//! folded into the transcript.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::client::BackendClient;
use crate::model::{ChatMessage, ChatRequest, CitizenStats, CityPayload, GovData};

/// Appended to the transcript when the city payload cannot be loaded.
pub const LOAD_ERROR_MESSAGE: &str = "Error connecting to the City Brain. Is the backend running?";

/// Appended to the transcript when a chat request fails.
pub const CHAT_FALLBACK_MESSAGE: &str = "Sorry, I lost connection to the neural network.";

/// The synthetic first transcript entry.
pub fn greeting(city: &str) -> String {
    format!("Hello! I am analyzing the ecosystem of {city}. Ask me anything about the map.")
}

/// Where a session is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Failed,
}

impl SessionState {
    /// Whether the dashboard should show its loading screen.
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Loading)
    }
}

/// A consistent copy of a session's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub city: String,
    pub state: SessionState,
    pub data: Option<CityPayload>,
    pub transcript: Vec<ChatMessage>,
    pub chat_loading: bool,
}

struct SessionInner {
    state: SessionState,
    data: Option<CityPayload>,
    transcript: Vec<ChatMessage>,
    /// Chat requests sent but not yet answered.
    pending_replies: usize,
}

/// View-model for one city's dashboard.
///
/// Cheap to clone; clones share state. In-flight requests hold a clone, so
/// dropping the dashboard's handle does not cancel them.
#[derive(Clone)]
pub struct CityAnalysisSession {
    city: Arc<str>,
    backend: Arc<dyn BackendClient>,
    inner: Arc<Mutex<SessionInner>>,
}

impl CityAnalysisSession {
    /// Start a session for `city`, seeding the transcript with a greeting.
    pub fn new(city: &str, backend: Arc<dyn BackendClient>) -> Self {
        Self {
            city: Arc::from(city),
            backend,
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                data: None,
                transcript: vec![ChatMessage::ai(greeting(city))],
                pending_replies: 0,
            })),
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn data(&self) -> Option<CityPayload> {
        self.inner.lock().await.data.clone()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.inner.lock().await.transcript.clone()
    }

    /// True while at least one chat request is awaiting its reply.
    pub async fn chat_loading(&self) -> bool {
        self.inner.lock().await.pending_replies > 0
    }

    pub async fn view(&self) -> SessionView {
        let inner = self.inner.lock().await;
        SessionView {
            city: self.city.to_string(),
            state: inner.state,
            data: inner.data.clone(),
            transcript: inner.transcript.clone(),
            chat_loading: inner.pending_replies > 0,
        }
    }

    /// Fetch the city payload. Single attempt.
    ///
    /// On failure the session moves to [`SessionState::Failed`], the
    /// transcript gains [`LOAD_ERROR_MESSAGE`], and `data` is left as it was.
    #[instrument(skip(self), fields(city = %self.city))]
    pub async fn load(&self) {
        self.inner.lock().await.state = SessionState::Loading;

        let result = self.backend.analyze_city(&self.city).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(payload) => {
                info!(
                    markers = payload.map_markers.len(),
                    recent_issues = payload.recent_issues.len(),
                    "City analysis loaded"
                );
                inner.data = Some(payload);
                inner.state = SessionState::Ready;
            }
            Err(e) => {
                warn!(error = %e, "City analysis failed");
                inner.state = SessionState::Failed;
                inner.transcript.push(ChatMessage::ai(LOAD_ERROR_MESSAGE));
            }
        }
    }

    /// Send a chat message and wait for the reply to land in the transcript.
    ///
    /// Blank input is ignored. Concurrent calls are not serialized; each
    /// reply is appended when its response arrives.
    pub async fn send_message(&self, text: &str) {
        if let Some(pending) = self.submit(text).await {
            pending.resolve().await;
        }
    }

    /// The synchronous half of [`send_message`](Self::send_message).
    ///
    /// Appends the user message and raises the loading flag, then returns the
    /// request still to be made. Returns `None` for blank input, in which
    /// case nothing changes.
    pub async fn submit(&self, text: &str) -> Option<PendingReply> {
        if text.trim().is_empty() {
            return None;
        }

        let mut inner = self.inner.lock().await;
        inner.transcript.push(ChatMessage::user(text));
        inner.pending_replies += 1;

        let data = inner.data.as_ref();
        let request = ChatRequest {
            city: self.city.to_string(),
            message: text.to_string(),
            gov_data: context_object(data.and_then(|d| d.gov_data.as_ref()).map(GovData::raw)),
            citizen_stats: context_object(
                data.and_then(|d| d.citizen_stats.as_ref()).map(CitizenStats::raw),
            ),
        };

        Some(PendingReply {
            session: self.clone(),
            request,
        })
    }
}

/// A chat request whose user message is already in the transcript.
pub struct PendingReply {
    session: CityAnalysisSession,
    request: ChatRequest,
}

impl PendingReply {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// Call the backend and append its reply, or [`CHAT_FALLBACK_MESSAGE`].
    #[instrument(skip(self), fields(city = %self.request.city, message_len = self.request.message.len()))]
    pub async fn resolve(self) {
        let content = match self.session.backend.chat(&self.request).await {
            Ok(reply) => reply.reply,
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                CHAT_FALLBACK_MESSAGE.to_string()
            }
        };

        let mut inner = self.session.inner.lock().await;
        inner.transcript.push(ChatMessage::ai(content));
        inner.pending_replies = inner.pending_replies.saturating_sub(1);
    }
}

/// A payload section as received, for the chat context. `{}` when absent.
fn context_object(section: Option<&Map<String, Value>>) -> Value {
    Value::Object(section.cloned().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BackendError;
    use crate::model::{ChatReply, ChatRole};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeBackend {
        payload: Option<CityPayload>,
        chat_fails: bool,
        analyze_calls: AtomicUsize,
        chat_requests: StdMutex<Vec<ChatRequest>>,
        /// Replies to a message named "slow" wait for this.
        gate: Notify,
    }

    #[async_trait]
    impl BackendClient for FakeBackend {
        async fn analyze_city(&self, _city: &str) -> Result<CityPayload, BackendError> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            self.payload
                .clone()
                .ok_or(BackendError::Status(StatusCode::BAD_GATEWAY))
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
            self.chat_requests.lock().unwrap().push(request.clone());
            if request.message == "slow" {
                self.gate.notified().await;
            }
            if self.chat_fails {
                return Err(BackendError::Decode("no reply field".to_string()));
            }
            Ok(ChatReply {
                reply: format!("re: {}", request.message),
            })
        }
    }

    fn payload() -> CityPayload {
        serde_json::from_value(json!({
            "city_center": [39.8, -89.6],
            "gov_data": {"aqi": {"value": 42, "pollutant": "O3", "station": "Downtown"}},
            "citizen_stats": {"total_reports": 2, "category_breakdown": {"water": 2}}
        }))
        .unwrap()
    }

    fn session_with(backend: FakeBackend) -> (CityAnalysisSession, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (
            CityAnalysisSession::new("Springfield", backend.clone()),
            backend,
        )
    }

    #[tokio::test]
    async fn test_new_session_is_seeded_with_greeting() {
        let (session, _) = session_with(FakeBackend::default());

        assert_eq!(session.state().await, SessionState::Idle);
        assert!(session.data().await.is_none());
        assert!(!session.chat_loading().await);
        assert_eq!(
            session.transcript().await,
            vec![ChatMessage::ai(
                "Hello! I am analyzing the ecosystem of Springfield. Ask me anything about the map."
            )]
        );
    }

    #[tokio::test]
    async fn test_load_success_stores_payload() {
        let (session, backend) = session_with(FakeBackend {
            payload: Some(payload()),
            ..FakeBackend::default()
        });

        session.load().await;

        assert_eq!(session.state().await, SessionState::Ready);
        assert_eq!(session.data().await, Some(payload()));
        assert_eq!(session.transcript().await.len(), 1);
        assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_terminal_and_reported_once() {
        let (session, backend) = session_with(FakeBackend::default());

        session.load().await;

        assert_eq!(session.state().await, SessionState::Failed);
        assert!(session.data().await.is_none());
        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1], ChatMessage::ai(LOAD_ERROR_MESSAGE));
        assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let (session, backend) = session_with(FakeBackend::default());

        session.send_message("").await;
        session.send_message("   ").await;

        assert_eq!(session.transcript().await.len(), 1);
        assert!(backend.chat_requests.lock().unwrap().is_empty());
        assert!(!session.chat_loading().await);
    }

    #[tokio::test]
    async fn test_loading_flag_spans_user_and_reply_appends() {
        let (session, _) = session_with(FakeBackend::default());

        let pending = session
            .submit("When will the water return?")
            .await
            .unwrap();

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1], ChatMessage::user("When will the water return?"));
        assert!(session.chat_loading().await);

        pending.resolve().await;

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 3);
        assert_eq!(
            transcript[2],
            ChatMessage::ai("re: When will the water return?")
        );
        assert!(!session.chat_loading().await);
    }

    #[tokio::test]
    async fn test_chat_failure_appends_fallback() {
        let (session, _) = session_with(FakeBackend {
            chat_fails: true,
            ..FakeBackend::default()
        });

        session.send_message("hello?").await;

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[2], ChatMessage::ai(CHAT_FALLBACK_MESSAGE));
        assert!(!session.chat_loading().await);
        assert_eq!(session.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_chat_request_carries_payload_context() {
        let (session, backend) = session_with(FakeBackend {
            payload: Some(payload()),
            ..FakeBackend::default()
        });

        session.send_message("before load").await;
        session.load().await;
        session.send_message("after load").await;

        let requests = backend.chat_requests.lock().unwrap();
        assert_eq!(requests[0].city, "Springfield");
        assert_eq!(requests[0].gov_data, json!({}));
        assert_eq!(requests[0].citizen_stats, json!({}));

        assert_eq!(requests[1].message, "after load");
        assert_eq!(
            requests[1].gov_data,
            json!({"aqi": {"value": 42, "pollutant": "O3", "station": "Downtown"}})
        );
        assert_eq!(requests[1].citizen_stats["total_reports"], 2);
    }

    #[tokio::test]
    async fn test_chat_context_is_forwarded_as_received() {
        let gov_data = json!({
            "aqi": {"value": null, "pollutant": "PM2.5", "station": null, "status": "Active"},
            "rainfall": null,
            "power": {"status": "No Data"},
            "soil": {"ph_level": 6.5}
        });
        let citizen_stats = json!({
            "category_breakdown": {"water": 2},
            "total": 2,
            "total_reports": 2
        });
        let (session, backend) = session_with(FakeBackend {
            payload: Some(
                serde_json::from_value(json!({
                    "gov_data": gov_data,
                    "citizen_stats": citizen_stats
                }))
                .unwrap(),
            ),
            ..FakeBackend::default()
        });

        session.load().await;
        session.send_message("Is the air safe?").await;

        let requests = backend.chat_requests.lock().unwrap();
        assert_eq!(requests[0].gov_data, gov_data);
        assert_eq!(requests[0].citizen_stats, citizen_stats);
    }

    // Concurrent sends are not serialized: replies land in arrival order.
    #[tokio::test]
    async fn test_concurrent_sends_append_in_arrival_order() {
        let (session, backend) = session_with(FakeBackend::default());

        let slow = session.send_message("slow");
        let fast = async {
            session.send_message("fast").await;
            assert!(session.chat_loading().await);
            backend.gate.notify_one();
        };
        tokio::join!(slow, fast);

        let roles_and_content: Vec<(ChatRole, String)> = session
            .transcript()
            .await
            .into_iter()
            .skip(1)
            .map(|m| (m.role, m.content))
            .collect();
        assert_eq!(
            roles_and_content,
            vec![
                (ChatRole::User, "slow".to_string()),
                (ChatRole::User, "fast".to_string()),
                (ChatRole::Ai, "re: fast".to_string()),
                (ChatRole::Ai, "re: slow".to_string()),
            ]
        );
        assert!(!session.chat_loading().await);
    }
}
