use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rpc: RpcConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path prefix the procedure endpoint is mounted under
    pub trpc_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DataBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub max_batch_size: usize,
    /// Include error causes in client payloads. Never enable outside development.
    pub expose_error_detail: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub session_cookie: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in {0:?}")]
    MissingJwtSecret(Environment),
}

impl AppConfig {
    /// Startup checks. An empty JWT secret leaves every caller anonymous, so
    /// it is only tolerated in development.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            if !self.environment.is_development() {
                return Err(ConfigError::MissingJwtSecret(self.environment));
            }
            tracing::warn!("JWT_SECRET is not set; no session will resolve and protected procedures reject every call");
        }
        Ok(())
    }

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
        // Server overrides
        if let Ok(v) = env::var("STUDIO_API_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("STUDIO_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("STUDIO_TRPC_PREFIX") {
            self.server.trpc_prefix = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATA_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.database.backend = DataBackend::Memory,
                "postgres" | "pg" => self.database.backend = DataBackend::Postgres,
                other => tracing::warn!("Ignoring unknown DATA_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
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

        // RPC overrides
        if let Ok(v) = env::var("RPC_MAX_BATCH_SIZE") {
            self.rpc.max_batch_size = v.parse().unwrap_or(self.rpc.max_batch_size);
        }
        if let Ok(v) = env::var("RPC_EXPOSE_ERROR_DETAIL") {
            self.rpc.expose_error_detail = v.parse().unwrap_or(self.rpc.expose_error_detail);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_SESSION_COOKIE") {
            self.security.session_cookie = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                trpc_prefix: "/api/trpc".to_string(),
            },
            database: DatabaseConfig {
                backend: DataBackend::Postgres,
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                run_migrations: true,
            },
            rpc: RpcConfig {
                max_batch_size: 50,
                expose_error_detail: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                session_cookie: "studio_session".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                trpc_prefix: "/api/trpc".to_string(),
            },
            database: DatabaseConfig {
                backend: DataBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                run_migrations: true,
            },
            rpc: RpcConfig {
                max_batch_size: 25,
                expose_error_detail: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                session_cookie: "studio_session".to_string(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                trpc_prefix: "/api/trpc".to_string(),
            },
            database: DatabaseConfig {
                backend: DataBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                run_migrations: false,
            },
            rpc: RpcConfig {
                max_batch_size: 25,
                expose_error_detail: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://www.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                session_cookie: "__Secure-studio_session".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_exposes_error_detail() {
        let config = AppConfig::development();
        assert!(config.environment.is_development());
        assert!(config.rpc.expose_error_detail);
        assert_eq!(config.server.trpc_prefix, "/api/trpc");
    }

    #[test]
    fn production_hides_error_detail() {
        let config = AppConfig::production();
        assert!(!config.rpc.expose_error_detail);
        assert!(!config.database.run_migrations);
        assert!(config.security.session_cookie.starts_with("__Secure-"));
    }

    #[test]
    fn empty_jwt_secret_only_tolerated_in_development() {
        let development = AppConfig::development();
        assert!(development.security.jwt_secret.is_empty());
        assert!(development.validate().is_ok());

        for mut config in [AppConfig::staging(), AppConfig::production()] {
            config.security.jwt_secret = "  ".to_string();
            assert!(matches!(config.validate(), Err(ConfigError::MissingJwtSecret(_))));

            config.security.jwt_secret = "s3cret".to_string();
            assert!(config.validate().is_ok());
        }
    }
}
