use axum::{
    Json,
    extract::{Query, State},
};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::models::dashboard::*;
use crate::models::shared::require;
use crate::monitor::SessionKey;
use crate::state::{AppState, Cycle};

fn session_key(params: &DashboardParams) -> Result<SessionKey, AppError> {
    Ok(SessionKey::new(
        require(params.project_id.as_deref(), "projectId")?,
        require(params.webhook_id.as_deref(), "webhookId")?,
    ))
}

/// Get the current dashboard.
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    operation_id = "getDashboard",
    summary = "Get the current dashboard",
    description = "Returns a filtered, sorted page of per-message aggregates for the webhook. Does not contact upstream. When nothing is loaded yet, a snapshot younger than the cache TTL is restored if available.",
    params(DashboardParams),
    responses(
        (status = 200, description = "Dashboard view", body = DashboardResponse),
        (status = 400, description = "Missing identifiers or invalid view options (MISSING_PARAMETER, VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let key = session_key(&params)?;
    let query = params.view_query()?;

    let session = match state.existing_session(&key) {
        Some(session) => session,
        None => match state.monitor().restore(&key).await {
            Some(restored) => state.insert_session(restored),
            None => return Ok(Json(DashboardResponse::empty(&query))),
        },
    };

    let session = session.lock().await;
    Ok(Json(DashboardResponse::from_session(&session, &query)))
}

/// Reload the dashboard from upstream.
#[utoipa::path(
    post,
    path = "/dashboard/refresh",
    tag = "Dashboard",
    operation_id = "refreshDashboard",
    summary = "Reload the dashboard from upstream",
    description = "Fetches the most recent time window and replaces every aggregate held for the webhook. Partial upstream failures are tolerated.",
    params(DashboardParams),
    responses(
        (status = 200, description = "Refreshed dashboard view", body = DashboardResponse),
        (status = 400, description = "Missing identifiers or invalid view options (MISSING_PARAMETER, VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Upstream token not configured (MISCONFIGURATION)", body = ErrorBody),
        (status = 502, description = "Every attempts page failed (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn refresh_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let key = session_key(&params)?;
    let query = params.view_query()?;

    let session = state.run_cycle(&key, Cycle::Refresh).await?;
    let session = session.lock().await;

    info!(aggregates = session.aggregates().len(), "Dashboard refresh served");
    Ok(Json(DashboardResponse::from_session(&session, &query)))
}

/// Load data older than what the dashboard holds.
#[utoipa::path(
    post,
    path = "/dashboard/load-older",
    tag = "Dashboard",
    operation_id = "loadOlderDashboard",
    summary = "Load older data into the dashboard",
    description = "Fetches the time window preceding the oldest loaded data and merges it into the existing aggregates. Attempts already held are ignored.",
    params(DashboardParams),
    responses(
        (status = 200, description = "Extended dashboard view", body = DashboardResponse),
        (status = 400, description = "Missing identifiers or invalid view options (MISSING_PARAMETER, VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Upstream token not configured (MISCONFIGURATION)", body = ErrorBody),
        (status = 502, description = "Every attempts page failed (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn load_older(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let key = session_key(&params)?;
    let query = params.view_query()?;

    let session = state.run_cycle(&key, Cycle::LoadOlder).await?;
    let session = session.lock().await;

    Ok(Json(DashboardResponse::from_session(&session, &query)))
}
