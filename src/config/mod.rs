use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub invitations: InvitationConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full postgres connection URL (DATABASE_URL)
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// HS256 shared secret issued by the identity provider (or used for dev tokens)
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    /// RS256 public key in PEM format; takes precedence over the shared secret
    #[serde(skip_serializing)]
    pub jwt_public_key: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_leeway_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    pub expiry_days: i64,
    /// Prefix used to build acceptance links, e.g. https://app.reschool.dk/invitation
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Endpoint of the push/in-app provider; when unset deliveries are only logged
    pub provider_url: Option<String>,
    #[serde(skip_serializing)]
    pub provider_api_key: Option<String>,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(port) = env::var("RESCHOOL_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            self.security.jwt_secret = non_empty(v);
        }
        if let Ok(v) = env::var("AUTH_JWT_PUBLIC_KEY") {
            // PEM blocks in .env files usually carry escaped newlines
            self.security.jwt_public_key = non_empty(v.replace("\\n", "\n"));
        }
        if let Ok(v) = env::var("AUTH_JWT_ISSUER") {
            self.security.jwt_issuer = non_empty(v);
        }
        if let Ok(v) = env::var("AUTH_JWT_AUDIENCE") {
            self.security.jwt_audience = non_empty(v);
        }
        if let Ok(v) = env::var("AUTH_JWT_LEEWAY_SECS") {
            self.security.jwt_leeway_secs = v.parse().unwrap_or(self.security.jwt_leeway_secs);
        }

        // Invitation overrides
        if let Ok(v) = env::var("INVITATION_EXPIRY_DAYS") {
            self.invitations.expiry_days = v
                .parse::<i64>()
                .ok()
                .filter(|d| *d > 0)
                .unwrap_or(self.invitations.expiry_days);
        }
        if let Ok(v) = env::var("INVITATION_BASE_URL") {
            if !v.trim().is_empty() {
                self.invitations.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }

        // Notification overrides
        if let Ok(v) = env::var("NOTIFICATION_PROVIDER_URL") {
            self.notifications.provider_url = non_empty(v);
        }
        if let Ok(v) = env::var("NOTIFICATION_PROVIDER_API_KEY") {
            self.notifications.provider_api_key = non_empty(v);
        }
        if let Ok(v) = env::var("NOTIFICATION_TIMEOUT_SECS") {
            self.notifications.timeout_secs = v.parse().unwrap_or(self.notifications.timeout_secs);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: None,
                jwt_public_key: None,
                jwt_issuer: None,
                jwt_audience: None,
                jwt_leeway_secs: 60,
            },
            invitations: InvitationConfig {
                expiry_days: 7,
                base_url: "http://localhost:3000/invitation".to_string(),
            },
            notifications: NotificationConfig {
                provider_url: None,
                provider_api_key: None,
                timeout_secs: 10,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.reschool.dk".to_string()],
                jwt_secret: None,
                jwt_public_key: None,
                jwt_issuer: None,
                jwt_audience: None,
                jwt_leeway_secs: 30,
            },
            invitations: InvitationConfig {
                expiry_days: 7,
                base_url: "https://staging.reschool.dk/invitation".to_string(),
            },
            notifications: NotificationConfig {
                provider_url: None,
                provider_api_key: None,
                timeout_secs: 5,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.reschool.dk".to_string()],
                jwt_secret: None,
                jwt_public_key: None,
                jwt_issuer: None,
                jwt_audience: None,
                jwt_leeway_secs: 10,
            },
            invitations: InvitationConfig {
                expiry_days: 7,
                base_url: "https://app.reschool.dk/invitation".to_string(),
            },
            notifications: NotificationConfig {
                provider_url: None,
                provider_api_key: None,
                timeout_secs: 5,
            },
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.database.run_migrations);
        assert_eq!(config.invitations.expiry_days, 7);
        assert!(config.notifications.provider_url.is_none());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.run_migrations);
        assert_eq!(config.database.max_connections, 50);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.security.jwt_secret = Some("super-secret".to_string());
        config.notifications.provider_api_key = Some("provider-key".to_string());

        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("provider-key"));
    }

    #[test]
    fn blank_values_collapse_to_none() {
        assert_eq!(non_empty("   ".to_string()), None);
        assert_eq!(non_empty(" abc ".to_string()), Some("abc".to_string()));
    }
}
