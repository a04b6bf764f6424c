//! JSON HTTP surface over the same operations as the CLI.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use famcal_feeds::source::{dedup_feeds, validate_feed_url};
use famcal_feeds::FeedSource;
use famcal_sync::{directory, SyncReport};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::app::App;

#[derive(Clone)]
pub struct AppState {
    app: Arc<App>,
    /// Held for the duration of a sync; two syncs never interleave.
    sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(app: App) -> Self {
        Self {
            app: Arc::new(app),
            sync_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/calendars", get(list_calendars).post(create_calendar))
        .route("/calendars/{name}", delete(delete_calendar))
        .route("/sync", post(run_sync))
        .with_state(state)
}

pub async fn serve(app: App, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid listen address {}", bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("famcal listening on http://{}", addr);
    axum::serve(listener, router(AppState::new(app))).await?;

    Ok(())
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by handlers; 500 unless built with a narrower status.
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    fn bad_request(error: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }

    fn not_found(error: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: error.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        }
        let body = Json(ErrorResponse {
            error: format!("{:#}", self.error),
        });
        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    pub name: String,
    pub access_role: String,
    pub primary: bool,
}

/// GET /calendars
async fn list_calendars(State(state): State<AppState>) -> Result<Json<Vec<CalendarInfo>>, AppError> {
    let service = state.app.calendar().await?;

    let calendars = directory::list(&service)
        .await?
        .into_iter()
        .map(|cal| CalendarInfo {
            name: cal.display_name().to_string(),
            access_role: cal.access_role.to_string(),
            primary: cal.is_primary,
            id: cal.id,
        })
        .collect();

    Ok(Json(calendars))
}

#[derive(Deserialize)]
pub struct CreateCalendarRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalendarId {
    pub id: String,
}

/// POST /calendars - resolve or create by name
async fn create_calendar(
    State(state): State<AppState>,
    Json(req): Json<CreateCalendarRequest>,
) -> Result<Json<CalendarId>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request(anyhow::anyhow!("Calendar name is empty")));
    }

    let service = state.app.calendar().await?;
    let id = directory::resolve_or_create(&service, name).await?;

    Ok(Json(CalendarId { id }))
}

/// DELETE /calendars/{name}
async fn delete_calendar(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    let service = state.app.calendar().await?;

    match directory::delete(&service, &name).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(AppError::not_found(anyhow::anyhow!(
            "No calendar named {}",
            name
        ))),
    }
}

#[derive(Deserialize)]
pub struct SyncRequest {
    pub calendar_name: String,
    pub feeds: Vec<FeedSource>,
}

/// POST /sync
async fn run_sync(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<SyncReport>, AppError> {
    let calendar_name = req.calendar_name.trim();
    if calendar_name.is_empty() {
        return Err(AppError::bad_request(anyhow::anyhow!("Calendar name is empty")));
    }
    for feed in &req.feeds {
        validate_feed_url(&feed.url).map_err(|reason| {
            AppError::bad_request(anyhow::anyhow!(
                "Invalid url for feed {}: {}",
                feed.name,
                reason
            ))
        })?;
    }
    let feeds = dedup_feeds(req.feeds);

    let _guard = state.sync_lock.lock().await;

    let service = state.app.calendar().await?;
    let fetcher = state.app.fetcher();
    let calendar_id = directory::resolve_or_create(&service, calendar_name).await?;
    let report = famcal_sync::sync(
        &service,
        &fetcher,
        &calendar_id,
        &feeds,
        &state.app.window(),
    )
    .await?;

    Ok(Json(report))
}
