/// Health check endpoints
///
/// `/health` is a plain liveness answer; `/health/ready` also checks the
/// database so a load balancer can pull an instance that lost it.

use crate::{context::AppContext, error::DistimResult};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    /// "healthy" or "unhealthy"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
}

pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: 200 with component checks, 503 if the database is down
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> (StatusCode, Json<serde_json::Value>) {
    let database = check_database_detailed(&ctx).await;
    let ready = database.status == "healthy";

    if !ready {
        tracing::warn!(error = ?database.error, "readiness_probe_failed: database check failed");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "unavailable" },
            "version": env!("CARGO_PKG_VERSION"),
            "checks": [database],
        })),
    )
}

async fn check_database(ctx: &AppContext) -> DistimResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

async fn check_database_detailed(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = check_database(ctx).await;
    let elapsed = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(()) => ComponentHealth {
            name: "database".to_string(),
            status: "healthy".to_string(),
            response_time_ms: elapsed,
            error: None,
        },
        Err(e) => ComponentHealth {
            name: "database".to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: elapsed,
            error: Some(e.to_string()),
        },
    }
}
