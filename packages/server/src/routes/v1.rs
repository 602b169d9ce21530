use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(upstream_routes())
        .merge(dashboard_routes())
}

fn upstream_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::upstream::list_attempts))
        .routes(routes!(handlers::upstream::list_messages))
}

fn dashboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::dashboard::get_dashboard))
        .routes(routes!(handlers::dashboard::refresh_dashboard))
        .routes(routes!(handlers::dashboard::load_older))
}
