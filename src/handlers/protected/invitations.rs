use axum::extract::Extension;
use uuid::Uuid;

use crate::database::models::{Invitation, UserChildRelation};
use crate::handlers::{ApiJson, ApiPath};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::invitations::{CreateInvitation, IssuedInvitation, ReceivedInvitation, TokenRequest};
use crate::services::InvitationService;
use crate::state::AppState;

fn service(state: &AppState) -> InvitationService {
    InvitationService::new(
        state.pool.clone(),
        state.notifier.clone(),
        state.config.invitations.clone(),
    )
}

/// POST /api/children/:child_id/invitations - the token is only ever returned here and on resend
pub async fn create(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CreateInvitation>,
) -> ApiResult<IssuedInvitation> {
    let issued = service(&state).create(&user, child_id, &input).await?;
    Ok(ApiResponse::created(issued))
}

/// GET /api/children/:child_id/invitations
pub async fn list_for_child(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(child_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Invitation>> {
    Ok(ApiResponse::success(service(&state).list_for_child(user.id, child_id).await?))
}

/// GET /api/invitations - open invitations addressed to the caller
pub async fn list_mine(Extension(state): Extension<AppState>, user: CurrentUser) -> ApiResult<Vec<ReceivedInvitation>> {
    Ok(ApiResponse::success(service(&state).list_mine(&user).await?))
}

/// POST /api/invitations/accept
pub async fn accept(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<TokenRequest>,
) -> ApiResult<UserChildRelation> {
    let relation = service(&state).accept(&user, &input.token).await?;
    Ok(ApiResponse::success(relation))
}

/// POST /api/invitations/decline
pub async fn decline(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<TokenRequest>,
) -> ApiResult<Invitation> {
    Ok(ApiResponse::success(service(&state).decline(&user, &input.token).await?))
}

/// DELETE /api/invitations/:id
pub async fn cancel(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(invitation_id): ApiPath<Uuid>,
) -> ApiResult<Invitation> {
    Ok(ApiResponse::success(service(&state).cancel(user.id, invitation_id).await?))
}

/// POST /api/invitations/:id/resend
pub async fn resend(
    Extension(state): Extension<AppState>,
    user: CurrentUser,
    ApiPath(invitation_id): ApiPath<Uuid>,
) -> ApiResult<IssuedInvitation> {
    Ok(ApiResponse::success(service(&state).resend(&user, invitation_id).await?))
}
