//! HTTP handlers and router
//!
//! - `/health` - Fixed JSON liveness payload, always 200
//! - anything else - Configured text with the configured status, access-logged
//!
//! Both routes accept every method and ignore request headers and body.

use crate::config::Config;
use crate::version::VERSION;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    http::{
        header::{CONTENT_TYPE, HOST},
        HeaderName, HeaderValue, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{error, info};

/// Header carrying the build version on every response
pub const APP_VERSION_HEADER: HeaderName = HeaderName::from_static("x-app-version");

/// Content type set on every response, JSON health payload included
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Echo handler: the configured text plus a trailing newline
pub async fn echo(State(body): State<Bytes>) -> Bytes {
    body
}

/// Liveness handler: `{"status":"ok"}` plus a trailing newline
pub async fn health() -> String {
    format!("{}\n", json!({ "status": "ok" }))
}

/// Status applied by [`with_app_headers`]
///
/// Holds the configured integer as given; it is only checked when a
/// response is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppStatus(pub i64);

impl AppStatus {
    /// The status as an HTTP status code, if HTTP can carry it (100..=999)
    pub fn status_code(self) -> Option<StatusCode> {
        u16::try_from(self.0)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
    }
}

impl From<StatusCode> for AppStatus {
    fn from(status: StatusCode) -> Self {
        AppStatus(i64::from(status.as_u16()))
    }
}

/// Set the response status and the application headers
///
/// The status replaces whatever the wrapped handler produced. A status HTTP
/// cannot carry fails the request with 500 and the wrapped handler never runs.
pub async fn with_app_headers(
    State(status): State<AppStatus>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = match status.status_code() {
        Some(code) => {
            let mut response = next.run(request).await;
            *response.status_mut() = code;
            response
        }
        None => {
            error!(
                status = status.0,
                path = %request.uri().path(),
                "invalid response status code"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
    headers.insert(APP_VERSION_HEADER, HeaderValue::from_static(VERSION));

    response
}

/// Emit one access-log event per request; the response is passed through untouched
pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let host = request
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "-".to_string(), |ConnectInfo(addr)| addr.to_string());

    let response = next.run(request).await;

    info!(
        target: "http_echo::access",
        client = %client,
        host = %host,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency = ?start.elapsed(),
        "request"
    );

    response
}

/// Build the router for a resolved configuration
///
/// `/health` is matched exactly; every other path (including `/health/`)
/// falls through to the echo route.
pub fn build_router(config: &Config) -> Router {
    let body = Bytes::from(format!("{}\n", config.text));

    let echo_route = any(echo)
        .with_state::<()>(body)
        .layer(middleware::from_fn_with_state(
            AppStatus(config.status_code),
            with_app_headers,
        ))
        .layer(middleware::from_fn(access_log));

    let health_route = any(health).layer(middleware::from_fn_with_state(
        AppStatus::from(StatusCode::OK),
        with_app_headers,
    ));

    Router::new()
        .route("/health", health_route)
        .fallback_service(echo_route)
}
