use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use dealbot_core::session::SessionStore;

#[derive(Clone)]
pub struct HealthState {
    sessions: Arc<SessionStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub detail: String,
    pub pending_confirmations: usize,
    pub checked_at: String,
}

pub fn router(sessions: Arc<SessionStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { sessions })
}

pub async fn spawn(bind_address: &str, port: u16, sessions: Arc<SessionStore>) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(event_name = "system.health.start", bind_address = %address, "health endpoint started");

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(sessions)).await {
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
    let payload = HealthResponse {
        status: "ready",
        detail: "dealbot-server runtime initialized".to_string(),
        pending_confirmations: state.sessions.pending_count(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};

    use dealbot_core::domain::{PendingDeal, SenderId};
    use dealbot_core::session::SessionStore;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_ready_with_the_pending_confirmation_count() {
        let sessions = Arc::new(SessionStore::new());
        sessions.begin_confirmation(
            &SenderId("whatsapp:+15550001111".to_owned()),
            PendingDeal {
                deal_name: "Acme Renewal".to_owned(),
                account_name: "Acme".to_owned(),
                stage: "Qualification".to_owned(),
                pipeline: "Moneste".to_owned(),
            },
        );

        let (status, Json(payload)) = health(State(HealthState { sessions })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.pending_confirmations, 1);
    }
}
