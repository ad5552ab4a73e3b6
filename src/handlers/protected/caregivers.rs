use axum::extract::Extension;
use uuid::Uuid;

use crate::database::models::{Caregiver, UserChildRelation};
use crate::handlers::{ApiJson, ApiPath};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::children::UpdateRelation;
use crate::services::ChildService;
use crate::state::AppState;

/// GET /api/children/:child_id/users
pub async fn list(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Caregiver>> {
    let caregivers = ChildService::new(state.pool.clone())
        .caregivers(user.id, child_id)
        .await?;
    Ok(ApiResponse::success(caregivers))
}

/// PUT /api/children/:child_id/users/:user_id - administrators only
pub async fn update(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((child_id, target_user_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<UpdateRelation>,
) -> ApiResult<UserChildRelation> {
    let relation = ChildService::new(state.pool.clone())
        .update_relation(user.id, child_id, target_user_id, &input)
        .await?;
    Ok(ApiResponse::success(relation))
}

/// DELETE /api/children/:child_id/users/:user_id - administrators, or the user leaving
pub async fn delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath((child_id, target_user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    ChildService::new(state.pool.clone())
        .remove_relation(user.id, child_id, target_user_id)
        .await?;
    Ok(ApiResponse::no_content())
}
