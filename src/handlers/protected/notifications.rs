use axum::extract::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::Notification;
use crate::handlers::{ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::notifications::NotificationList;
use crate::services::NotificationService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

fn service(state: &AppState) -> NotificationService {
    NotificationService::new(state.pool.clone(), state.notifier.clone())
}

/// GET /api/notifications?unread_only=&limit=
pub async fn list(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<NotificationList> {
    let list = service(&state).list(user.id, query.unread_only, query.limit).await?;
    Ok(ApiResponse::success(list))
}

/// POST /api/notifications/:id/read
pub async fn read(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(notification_id): ApiPath<Uuid>,
) -> ApiResult<Notification> {
    Ok(ApiResponse::success(service(&state).mark_read(user.id, notification_id).await?))
}

/// POST /api/notifications/read-all
pub async fn read_all(Extension(state): Extension<AppState>, user: CurrentUser) -> ApiResult<Value> {
    let updated = service(&state).mark_all_read(user.id).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })))
}

/// DELETE /api/notifications/:id
pub async fn delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(notification_id): ApiPath<Uuid>,
) -> ApiResult<()> {
    service(&state).delete(user.id, notification_id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/notifications/activate - claim notifications queued for the caller's email
pub async fn activate(Extension(state): Extension<AppState>, user: CurrentUser) -> ApiResult<Value> {
    let activated = service(&state).activate_pending(&user).await?;
    Ok(ApiResponse::success(json!({ "activated": activated })))
}
