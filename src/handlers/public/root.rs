use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseManager;
use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "ReSchool API",
            "version": version,
            "description": "Coordination between schools and families about a child's wellbeing",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "invitation_preview": "/invitations/:token (public)",
                "users": "/api/users/me (protected)",
                "children": "/api/children[/:child_id] (protected)",
                "caregivers": "/api/children/:child_id/users[/:user_id] (protected)",
                "tools": "/api/children/:child_id/tools/:kind, /api/tools/:kind/:tool_id[/entries] (protected)",
                "indsatstrappe": "/api/children/:child_id/indsatstrappe, /api/indsatstrappe/:plan_id/* (protected)",
                "invitations": "/api/children/:child_id/invitations, /api/invitations/* (protected)",
                "notifications": "/api/notifications/* (protected)",
            }
        }
    }))
}

/// GET /health - liveness plus a database round trip
pub async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
