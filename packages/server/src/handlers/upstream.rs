use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;
use upstream::FetchRequest;

use crate::error::{AppError, ErrorBody};
use crate::models::upstream::*;
use crate::state::AppState;

fn fetch_request(state: &AppState, params: &UpstreamParams) -> FetchRequest {
    let mut request = FetchRequest::new(
        params.project_id.clone().unwrap_or_default(),
        params.webhook_id.clone().unwrap_or_default(),
        params.before,
        &state.config.fetch,
    )
    .starting_at(params.offset.unwrap_or(0));
    if let Some(limit) = params.limit {
        request = request.with_limit(limit);
    }
    request
}

/// List delivery attempts.
#[utoipa::path(
    get,
    path = "/attempts",
    tag = "Upstream",
    operation_id = "listAttempts",
    summary = "List delivery attempts",
    description = "Fetches up to the configured number of pages of delivery attempts in parallel, starting at `offset`, and returns those inside the time window. Failed pages are skipped.",
    params(UpstreamParams),
    responses(
        (status = 200, description = "Attempts in the time window", body = AttemptsResponse),
        (status = 400, description = "Missing projectId or webhookId (MISSING_PARAMETER)", body = ErrorBody),
        (status = 500, description = "Upstream token not configured (MISCONFIGURATION)", body = ErrorBody),
        (status = 502, description = "Every page request failed (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_attempts(
    State(state): State<AppState>,
    Query(params): Query<UpstreamParams>,
) -> Result<Json<AttemptsResponse>, AppError> {
    let request = fetch_request(&state, &params);
    let outcome = state.upstream.fetch_attempts(&request).await?;

    Ok(Json(AttemptsResponse {
        attempts: outcome.records,
        has_more: outcome.has_more,
        window: outcome.window,
    }))
}

/// List webhook messages.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "Upstream",
    operation_id = "listMessages",
    summary = "List webhook messages",
    description = "Fetches messages in the time window. `window.olderDataAvailable` tells whether requesting with `before` set to `window.start` may return more.",
    params(UpstreamParams),
    responses(
        (status = 200, description = "Messages in the time window", body = MessagesResponse),
        (status = 400, description = "Missing projectId or webhookId (MISSING_PARAMETER)", body = ErrorBody),
        (status = 500, description = "Upstream token not configured (MISCONFIGURATION)", body = ErrorBody),
        (status = 502, description = "Every page request failed (UPSTREAM_UNAVAILABLE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<UpstreamParams>,
) -> Result<Json<MessagesResponse>, AppError> {
    let request = fetch_request(&state, &params);
    let outcome = state.upstream.fetch_messages(&request).await?;
    let older_data_available = outcome.older_data_available();

    Ok(Json(MessagesResponse {
        messages: outcome.records,
        window: MessageWindow {
            start: outcome.window.start,
            end: outcome.window.end,
            older_data_available,
        },
    }))
}
