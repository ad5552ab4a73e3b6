use axum::{
    extract::Extension,
    http::{HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, resolve_identity_middleware};
use crate::state::AppState;

/// Build the full application router around `state`
pub fn app(state: AppState) -> Router {
    let protected_api = Router::new()
        .merge(user_routes())
        .merge(child_routes())
        .merge(tool_routes())
        .merge(indsatstrappe_routes())
        .merge(invitation_routes())
        .merge(notification_routes())
        // route_layer: unmatched paths stay 404 instead of 401.
        // Layers run bottom-up, so the token is verified before identity resolution.
        .route_layer(from_fn(resolve_identity_middleware))
        .route_layer(from_fn(jwt_auth_middleware));

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/invitations/:token", get(public::invitation_preview))
        // Protected API
        .merge(protected_api)
        .layer(RequestBodyLimitLayer::new(state.config.api.max_request_size_bytes));

    if let Some(cors) = cors_layer(&state.config.security) {
        router = router.layer(cors);
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    // Outermost, so the middleware above can extract the state
    router.layer(Extension(state))
}

fn user_routes() -> Router {
    use protected::users;

    Router::new().route("/api/users/me", get(users::me_get).put(users::me_put))
}

fn child_routes() -> Router {
    use protected::{caregivers, children};

    Router::new()
        .route("/api/children", get(children::list).post(children::create))
        .route(
            "/api/children/:child_id",
            get(children::get).put(children::update).delete(children::delete),
        )
        // Caregivers (user-child relations)
        .route("/api/children/:child_id/users", get(caregivers::list))
        .route(
            "/api/children/:child_id/users/:user_id",
            put(caregivers::update).delete(caregivers::delete),
        )
}

fn tool_routes() -> Router {
    use protected::tools;

    Router::new()
        .route(
            "/api/children/:child_id/tools/:kind",
            get(tools::list).post(tools::create),
        )
        .route(
            "/api/tools/:kind/:tool_id",
            get(tools::get).put(tools::update).delete(tools::delete),
        )
        .route("/api/tools/:kind/:tool_id/access", put(tools::access_put))
        .route(
            "/api/tools/:kind/:tool_id/entries",
            get(tools::entries_get).post(tools::entries_post),
        )
        .route(
            "/api/tools/:kind/:tool_id/entries/:entry_id",
            axum::routing::delete(tools::entry_delete),
        )
}

fn indsatstrappe_routes() -> Router {
    use protected::indsatstrappe as plan;

    Router::new()
        .route(
            "/api/children/:child_id/indsatstrappe",
            get(plan::list).post(plan::create),
        )
        .route(
            "/api/indsatstrappe/:plan_id",
            get(plan::get).put(plan::update).delete(plan::delete),
        )
        .route("/api/indsatstrappe/:plan_id/complete", post(plan::complete))
        .route("/api/indsatstrappe/:plan_id/periods", get(plan::periods))
        .route("/api/indsatstrappe/:plan_id/step-order", put(plan::step_order))
        .route("/api/indsatstrappe/:plan_id/steps", post(plan::step_create))
        .route(
            "/api/indsatstrappe/:plan_id/steps/:step_id",
            put(plan::step_update).delete(plan::step_delete),
        )
        .route(
            "/api/indsatstrappe/:plan_id/steps/:step_id/activate",
            post(plan::step_activate),
        )
        .route(
            "/api/indsatstrappe/:plan_id/steps/:step_id/deactivate",
            post(plan::step_deactivate),
        )
        .route(
            "/api/indsatstrappe/:plan_id/steps/:step_id/complete",
            post(plan::step_complete),
        )
        .route(
            "/api/indsatstrappe/:plan_id/steps/:step_id/reopen",
            post(plan::step_reopen),
        )
}

fn invitation_routes() -> Router {
    use protected::invitations;

    Router::new()
        .route(
            "/api/children/:child_id/invitations",
            get(invitations::list_for_child).post(invitations::create),
        )
        .route("/api/invitations", get(invitations::list_mine))
        .route("/api/invitations/accept", post(invitations::accept))
        .route("/api/invitations/decline", post(invitations::decline))
        .route("/api/invitations/:id", axum::routing::delete(invitations::cancel))
        .route("/api/invitations/:id/resend", post(invitations::resend))
}

fn notification_routes() -> Router {
    use protected::notifications;

    Router::new()
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/read-all", post(notifications::read_all))
        .route("/api/notifications/activate", post(notifications::activate))
        .route("/api/notifications/:id", axum::routing::delete(notifications::delete))
        .route("/api/notifications/:id/read", post(notifications::read))
}

/// `None` when CORS is disabled; `*` in the origin list allows any origin
fn cors_layer(config: &SecurityConfig) -> Option<CorsLayer> {
    if !config.enable_cors {
        return None;
    }

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return Some(base.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring unparsable CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(base.allow_origin(AllowOrigin::list(origins)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn cors_can_be_disabled() {
        let mut config = AppConfig::development().security;
        config.enable_cors = false;
        assert!(cors_layer(&config).is_none());
    }

    #[test]
    fn cors_accepts_wildcard_and_lists() {
        let mut config = AppConfig::development().security;
        config.enable_cors = true;
        config.cors_origins = vec!["*".to_string()];
        assert!(cors_layer(&config).is_some());

        config.cors_origins = vec!["https://app.reschool.dk".to_string(), "bad\norigin".to_string()];
        assert!(cors_layer(&config).is_some());
    }
}
