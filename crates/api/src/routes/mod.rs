pub mod health;
pub mod jobs;

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// POST   /convert                 submit a conversion (timeout applies)
/// GET    /preview/{job_id}        preview JSON (timeout applies)
/// GET    /download/{job_id}       ZIP archive (timeout applies)
/// GET    /stream/{job_id}         server-sent events (no timeout)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    let bounded = jobs::router().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.request_timeout_secs),
    ));

    Router::new().merge(bounded).merge(jobs::stream_router())
}
