//! HTTP handlers for the CityTwin dashboard.
//!
//! # Routes
//!
//! - `GET /` - Landing page
//! - `POST /` - Submit the landing form (redirects to the dashboard)
//! - `GET /dashboard/:id` - Dashboard page for a session
//! - `POST /api/sessions` - Open a session for a city
//! - `GET /api/sessions/:id` - Dashboard snapshot
//! - `POST /api/sessions/:id/chat` - Send a chat message
//! - `DELETE /api/sessions/:id` - Back navigation, discards the session
//! - `GET /health` - Health check
//!
//! Chat message bodies are never logged, only their length.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::client::BackendClient;
use crate::dashboard::DashboardSnapshot;
use crate::map::{MapConfig, MapView};
use crate::selector::{CitySelection, View, select_city};
use crate::session::CityAnalysisSession;

const LANDING_HTML: &str = include_str!("assets/landing.html");
const DASHBOARD_HTML: &str = include_str!("assets/dashboard.html");

/// A live dashboard: its session and its map camera state.
#[derive(Clone)]
struct DashboardEntry {
    session: CityAnalysisSession,
    /// Shared by every page polling this id, so only the first poll after a
    /// new center sees the camera move.
    map: Arc<Mutex<MapView>>,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn BackendClient>,
    map_config: Arc<MapConfig>,
    dashboards: Arc<RwLock<HashMap<Uuid, DashboardEntry>>>,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendClient>, map_config: MapConfig) -> Self {
        Self {
            backend,
            map_config: Arc::new(map_config),
            dashboards: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a dashboard for `city` and start loading it in the background.
    pub async fn open_session(&self, city: &str) -> Uuid {
        let id = Uuid::new_v4();
        let session = CityAnalysisSession::new(city, self.backend.clone());
        let entry = DashboardEntry {
            session: session.clone(),
            map: Arc::new(Mutex::new(MapView::new(self.map_config.as_ref().clone()))),
        };
        self.dashboards.write().await.insert(id, entry);

        info!(session_id = %id, city = %city, "Session opened");
        tokio::spawn(async move { session.load().await });

        id
    }

    /// The session behind a dashboard id.
    pub async fn session(&self, id: Uuid) -> Option<CityAnalysisSession> {
        self.dashboards
            .read()
            .await
            .get(&id)
            .map(|entry| entry.session.clone())
    }

    async fn entry(&self, id: Uuid) -> Option<DashboardEntry> {
        self.dashboards.read().await.get(&id).cloned()
    }

    /// Drop a dashboard. In-flight requests are left to finish.
    pub async fn close_session(&self, id: Uuid) -> bool {
        self.dashboards.write().await.remove(&id).is_some()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing_page).post(submit_city))
        .route("/dashboard/:id", get(dashboard_page))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(close_session))
        .route("/api/sessions/:id/chat", post(post_chat))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET / - Landing page.
pub async fn landing_page() -> Html<&'static str> {
    Html(LANDING_HTML)
}

/// POST / - Landing form submission.
///
/// A non-blank city opens a session and redirects to its dashboard. Blank
/// input redirects back to the landing page without any error.
#[instrument(skip(state, form))]
pub async fn submit_city(
    State(state): State<AppState>,
    Form(form): Form<CitySelection>,
) -> Redirect {
    match View::Landing.submit(&form.city) {
        View::Dashboard { city_name } => {
            let id = state.open_session(&city_name).await;
            Redirect::to(&format!("/dashboard/{id}"))
        }
        View::Landing => Redirect::to("/"),
    }
}

/// GET /dashboard/:id - Dashboard page.
#[instrument(skip(state))]
pub async fn dashboard_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, StatusCode> {
    let session = state.session(id).await.ok_or(StatusCode::NOT_FOUND)?;

    let map_config = serde_json::to_string(state.map_config.as_ref())
        .map_err(|e| {
            warn!(error = %e, "Failed to encode map config");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .replace("</", "<\\/");

    let page = DASHBOARD_HTML
        .replace("__SESSION_ID__", &id.to_string())
        .replace("__CITY_NAME__", &crate::map::escape_html(session.city()))
        .replace("__MAP_CONFIG__", &map_config);

    Ok(Html(page))
}

/// Request body for POST /api/sessions.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub city: String,
}

/// Response for POST /api/sessions.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
    pub city: String,
}

/// POST /api/sessions - Open a session.
///
/// # Request Body
///
/// ```json
/// { "city": "Bangalore" }
/// ```
///
/// Returns `201 Created` with the session id, or `400` for a blank city.
#[instrument(skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), StatusCode> {
    let city = select_city(&request.city).ok_or(StatusCode::BAD_REQUEST)?;
    let id = state.open_session(&city).await;

    Ok((StatusCode::CREATED, Json(CreateSessionResponse { id, city })))
}

/// GET /api/sessions/:id - Current dashboard snapshot.
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DashboardSnapshot>, StatusCode> {
    let entry = state.entry(id).await.ok_or(StatusCode::NOT_FOUND)?;

    let view = entry.session.view().await;
    let mut map = entry.map.lock().await;
    Ok(Json(DashboardSnapshot::build(view, &mut map)))
}

/// Request body for POST /api/sessions/:id/chat.
#[derive(Debug, Deserialize)]
pub struct ChatInput {
    #[serde(default)]
    pub message: String,
}

/// POST /api/sessions/:id/chat - Send a chat message.
///
/// The user message is in the transcript by the time this returns
/// `202 Accepted`; the reply is appended when the backend answers. Blank
/// messages are ignored with `204 No Content`.
#[instrument(skip(state, input), fields(message_len = input.message.len()))]
pub async fn post_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ChatInput>,
) -> StatusCode {
    let Some(session) = state.session(id).await else {
        return StatusCode::NOT_FOUND;
    };

    match session.submit(&input.message).await {
        Some(pending) => {
            tokio::spawn(pending.resolve());
            StatusCode::ACCEPTED
        }
        None => StatusCode::NO_CONTENT,
    }
}

/// DELETE /api/sessions/:id - Back navigation.
#[instrument(skip(state))]
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if state.close_session(id).await {
        info!(session_id = %id, "Session closed");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
