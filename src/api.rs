// 🌐 HTTP API - Sessions and the close reducer over axum
//
// Every route except /api/health and /api/login needs
// `Authorization: Bearer <token>`. Each session sits behind its own async
// mutex, so all writes to one snapshot go through a single owner.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::automation::{AutomationRunner, InFlight};
use crate::config::AppConfig;
use crate::error::CloseError;
use crate::filter::DashboardView;
use crate::model::{Entity, Resolver};
use crate::reducer::{Action, AutomationKind, Outcome};
use crate::seed::{self, TaskList};
use crate::session::{Expiring, Session, SessionStore};
use crate::traceback::{LineageCatalog, Traceback};

// ============================================================================
// State
// ============================================================================

/// One live session plus its automation guard
pub struct SessionSlot {
    pub session: Mutex<Session>,
    pub in_flight: InFlight,
    expires_at: DateTime<Utc>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            expires_at: session.expires_at,
            session: Mutex::new(session),
            in_flight: InFlight::new(),
        }
    }
}

impl Expiring for SessionSlot {
    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<RwLock<SessionStore<Arc<SessionSlot>>>>,
    pub runner: AutomationRunner,
    pub catalog: Arc<LineageCatalog>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            runner: AutomationRunner::from_config(&config),
            sessions: Arc::new(RwLock::new(SessionStore::from_config(&config))),
            config: Arc::new(config),
            catalog: Arc::new(seed::lineage_catalog()),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, CloseError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.issue(username, password)?;
        sessions.insert(session.token.clone(), Arc::new(SessionSlot::new(session.clone())));
        Ok(session)
    }

    pub async fn logout(&self, token: &str) -> Result<(), CloseError> {
        self.sessions.write().await.logout(token)
    }

    /// Look up a live session; expired ones are dropped on sight
    pub async fn slot(&self, token: &str) -> Result<Arc<SessionSlot>, CloseError> {
        self.sessions.write().await.get(token).cloned()
    }

    pub async fn purge_expired(&self) -> usize {
        self.sessions.write().await.purge_expired()
    }
}

// ============================================================================
// Responses
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// `CloseError` as an HTTP response
pub struct ApiError(pub CloseError);

impl From<CloseError> for ApiError {
    fn from(err: CloseError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            CloseError::ExceptionNotFound(_)
            | CloseError::TaskNotFound(_)
            | CloseError::DocumentNotFound(_)
            | CloseError::UnknownTaskList(_)
            | CloseError::UnknownAutomation(_) => StatusCode::NOT_FOUND,
            CloseError::UnknownEntity(_) => StatusCode::BAD_REQUEST,
            CloseError::InvalidCredentials
            | CloseError::SessionNotFound
            | CloseError::SessionExpired => StatusCode::UNAUTHORIZED,
            CloseError::AutomationInFlight(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self.0, "request rejected");
        (status, Json(ApiResponse::err(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
    pub task_list: String,
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub entity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectTaskListRequest {
    pub task_list: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub outcome: Outcome,
    pub view: DashboardView,
}

// ============================================================================
// Handlers
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Result<String, CloseError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(CloseError::SessionNotFound)
}

async fn authorized(state: &AppState, headers: &HeaderMap) -> Result<Arc<SessionSlot>, CloseError> {
    let token = bearer_token(headers)?;
    state.slot(&token).await
}

/// Apply a single-record action, failing on unknown ids
async fn apply_action(state: &AppState, headers: &HeaderMap, action: Action) -> ApiResult<ActionResponse> {
    let slot = authorized(state, headers).await?;
    let mut session = slot.session.lock().await;
    let outcome = session.apply_strict(&action)?;

    ok(ActionResponse {
        outcome,
        view: session.view(),
    })
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/login
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let session = state.login(&req.username, &req.password).await?;

    ok(LoginResponse {
        task_list: session.task_list_id().to_string(),
        token: session.token,
        username: session.username,
        expires_at: session.expires_at,
    })
}

/// POST /api/logout
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<&'static str> {
    let token = bearer_token(&headers)?;
    state.logout(&token).await?;
    ok("logged out")
}

/// GET /api/task-lists
async fn list_task_lists(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<TaskList>> {
    authorized(&state, &headers).await?;
    ok(seed::task_lists())
}

/// GET /api/overview?entity=TMH
async fn overview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OverviewQuery>,
) -> ApiResult<DashboardView> {
    let slot = authorized(&state, &headers).await?;
    let mut session = slot.session.lock().await;

    if let Some(entity) = query.entity {
        session.select_entity(entity.parse::<Entity>()?);
    }

    ok(session.view())
}

/// POST /api/task-list
async fn select_task_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SelectTaskListRequest>,
) -> ApiResult<DashboardView> {
    let slot = authorized(&state, &headers).await?;
    let mut session = slot.session.lock().await;
    session.select_task_list(&req.task_list)?;
    ok(session.view())
}

/// POST /api/exceptions/:id/resolve
async fn resolve_exception(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ActionResponse> {
    apply_action(&state, &headers, Action::ResolveException { id, resolver: Resolver::Manual }).await
}

/// POST /api/exceptions/:id/start
async fn start_exception(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ActionResponse> {
    apply_action(&state, &headers, Action::StartException { id }).await
}

/// GET /api/exceptions/:id/trace
async fn trace_exception(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Option<Traceback>> {
    let slot = authorized(&state, &headers).await?;
    let session = slot.session.lock().await;
    ok(state.catalog.trace_exception(session.snapshot(), &id)?)
}

/// POST /api/tasks/:id/toggle
async fn toggle_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ActionResponse> {
    apply_action(&state, &headers, Action::ToggleTask { id }).await
}

/// POST /api/automations/:kind
async fn run_automation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(kind): Path<String>,
) -> ApiResult<ActionResponse> {
    let kind = kind.parse::<AutomationKind>()?;
    let slot = authorized(&state, &headers).await?;

    let outcome = state.runner.run(&slot.in_flight, kind, &slot.session).await?;
    let view = slot.session.lock().await.view();

    ok(ActionResponse { outcome, view })
}

// ============================================================================
// Router
// ============================================================================

/// Creates the API router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/task-lists", get(list_task_lists))
        .route("/api/task-list", post(select_task_list))
        .route("/api/overview", get(overview))
        .route("/api/exceptions/:id/resolve", post(resolve_exception))
        .route("/api/exceptions/:id/start", post(start_exception))
        .route("/api/exceptions/:id/trace", get(trace_exception))
        .route("/api/tasks/:id/toggle", post(toggle_task))
        .route("/api/automations/:kind", post(run_automation))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);
    axum::serve(listener, create_router(state)).await
}

// ============================================================================
// Tests
// ============================================================================
