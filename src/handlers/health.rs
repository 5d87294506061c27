// handlers/health.rs - GET /health handler (mounted outside the gatekeeper)

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::database;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /health - liveness plus a database ping when a pool is configured
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let db_status = match &state.pool {
        Some(pool) => {
            // Sqlx failures surface as 503 through the ApiError conversion
            database::health_check(pool).await?;
            "ok"
        }
        None => "not configured",
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": db_status,
        }
    })))
}
