use axum::extract::Extension;

use crate::handlers::ApiPath;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::invitations::InvitationPreview;
use crate::services::InvitationService;
use crate::state::AppState;

/// GET /invitations/:token - what the invitee is about to accept.
/// Pending invitations past their expiry report `expired`.
pub async fn preview(
    Extension(state): Extension<AppState>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<InvitationPreview> {
    let service = InvitationService::new(
        state.pool.clone(),
        state.notifier.clone(),
        state.config.invitations.clone(),
    );

    Ok(ApiResponse::success(service.preview(&token).await?))
}
