use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::notify::NotificationProvider;

/// Shared handles injected into every request as an `Extension`
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub verifier: Arc<TokenVerifier>,
    pub notifier: Arc<dyn NotificationProvider>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        verifier: TokenVerifier,
        notifier: Arc<dyn NotificationProvider>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            notifier,
        }
    }
}
