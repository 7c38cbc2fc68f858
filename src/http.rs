//! Internal HTTP API and Prometheus endpoint.
//!
//! Collaborators (the REST backend that persists messages) push
//! [`DomainEvent`]s here instead of holding a socket. Runs on its own tokio
//! task, separate from the WebSocket gateway.

use crate::router::EventRouter;
use crate::state::DeliveryReport;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatter_proto::{DomainEvent, UserId};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "x-internal-token";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    router: EventRouter,
    token: Option<Arc<str>>,
}

impl ApiState {
    pub fn new(router: EventRouter, token: Option<String>) -> Self {
        Self {
            router,
            token: token.map(Arc::from),
        }
    }
}

/// Presence of one identity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserPresence {
    user_id: UserId,
    online: bool,
    connections: usize,
}

/// Build the API router. `/health` is left open; everything else sits
/// behind the token check when a token is configured.
pub fn api_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/presence", get(presence_handler))
        .route("/presence/:user_id", get(user_presence_handler))
        .route("/events", post(publish_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(protected)
        .with_state(state)
}

async fn require_token(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    if let Some(expected) = &state.token {
        let supplied = req.headers().get(TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if supplied != Some(expected.as_ref()) {
            warn!(path = %req.uri().path(), "Internal API request without valid token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    next.run(req).await
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

async fn presence_handler(State(state): State<ApiState>) -> Json<Vec<UserId>> {
    Json(state.router.hub().online_identities())
}

async fn user_presence_handler(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<UserPresence> {
    let user_id = UserId::from(user_id);
    let connections = state.router.hub().connections_for(&user_id).len();
    Json(UserPresence {
        user_id,
        online: connections > 0,
        connections,
    })
}

async fn publish_handler(
    State(state): State<ApiState>,
    body: Result<Json<DomainEvent>, JsonRejection>,
) -> Result<Json<DeliveryReport>, (StatusCode, String)> {
    let Json(event) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected malformed domain event");
        crate::metrics::record_event_error("domain", "invalid");
        (rejection.status(), rejection.body_text())
    })?;

    let report = state.router.publish(&event).map_err(|e| {
        warn!(kind = event.kind.as_str(), error = %e, "Failed to encode domain event");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    debug!(
        kind = event.kind.as_str(),
        target = event.target.label(),
        delivered = report.delivered,
        "Domain event published"
    );
    Ok(Json(report))
}

/// Serve the API on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Internal HTTP API listening");
    }
    axum::serve(listener, api_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Run the HTTP server for Prometheus metrics.
///
/// Binds to `0.0.0.0:port` and serves the `/metrics` endpoint.
/// This is a long-running task that should be spawned in the background.
pub async fn run_metrics_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}
