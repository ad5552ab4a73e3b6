use axum::{
    async_trait,
    extract::{Extension, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::database::models::User;
use crate::error::ApiError;
use crate::services::{NotificationService, UserService};
use crate::state::AppState;

/// The caller's database identity, resolved from the verified token
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Upserts the caller's `users` row from token claims and injects `CurrentUser`.
/// First sight of a user re-addresses notifications queued for their email.
pub async fn resolve_identity_middleware(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before identity resolution"))?;

    let (user, created) = UserService::new(state.pool.clone())
        .upsert_from_auth(&auth_user)
        .await?;

    if created {
        tracing::info!("Registered new user {} ({})", user.id, user.email);
        let activated = NotificationService::new(state.pool.clone(), state.notifier.clone())
            .activate_pending(&user)
            .await?;
        if activated > 0 {
            tracing::info!("Activated {} pending notifications for {}", activated, user.email);
        }
    }

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
