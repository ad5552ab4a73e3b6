use axum::extract::Extension;
use uuid::Uuid;

use crate::database::models::ChildWithRelation;
use crate::handlers::{ApiJson, ApiPath};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::children::{CreateChild, UpdateChild};
use crate::services::ChildService;
use crate::state::AppState;

/// GET /api/children - every child the caller is related to
pub async fn list(Extension(state): Extension<AppState>, user: CurrentUser) -> ApiResult<Vec<ChildWithRelation>> {
    let children = ChildService::new(state.pool.clone()).list_for_user(user.id).await?;
    Ok(ApiResponse::success(children))
}

/// POST /api/children
pub async fn create(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateChild>,
) -> ApiResult<ChildWithRelation> {
    let child = ChildService::new(state.pool.clone()).create(user.id, &input).await?;
    Ok(ApiResponse::created(child))
}

/// GET /api/children/:child_id
pub async fn get(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
) -> ApiResult<ChildWithRelation> {
    let child = ChildService::new(state.pool.clone()).get(user.id, child_id).await?;
    Ok(ApiResponse::success(child))
}

/// PUT /api/children/:child_id
pub async fn update(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateChild>,
) -> ApiResult<ChildWithRelation> {
    let child = ChildService::new(state.pool.clone())
        .rename(user.id, child_id, &input)
        .await?;
    Ok(ApiResponse::success(child))
}

/// DELETE /api/children/:child_id
pub async fn delete(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
) -> ApiResult<()> {
    ChildService::new(state.pool.clone()).delete(user.id, child_id).await?;
    Ok(ApiResponse::no_content())
}
