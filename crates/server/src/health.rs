use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use recap_slack::socket::SocketTransport;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    transport: Arc<dyn SocketTransport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub socket: HealthCheck,
    pub checked_at: String,
}

pub fn router(transport: Arc<dyn SocketTransport>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { transport })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    transport: Arc<dyn SocketTransport>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(transport)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let socket = socket_check(state.transport.as_ref());
    let ready = socket.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "recap-server runtime initialized".to_string(),
        },
        socket,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn socket_check(transport: &dyn SocketTransport) -> HealthCheck {
    if transport.is_connected() {
        HealthCheck { status: "ready", detail: "socket mode connection is live".to_string() }
    } else {
        HealthCheck { status: "degraded", detail: "socket mode connection is down".to_string() }
    }
}
