use axum::extract::Extension;

use crate::database::models::User;
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::users::UpdateProfile;
use crate::services::UserService;
use crate::state::AppState;

/// GET /api/users/me
pub async fn me_get(user: CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::success(user.0))
}

/// PUT /api/users/me - blank names leave the stored value unchanged
pub async fn me_put(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<UpdateProfile>,
) -> ApiResult<User> {
    let updated = UserService::new(state.pool.clone())
        .update_profile(user.id, &input)
        .await?;
    Ok(ApiResponse::success(updated))
}
