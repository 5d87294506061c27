use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL of the application server requests are forwarded to
    pub upstream_url: String,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid upstream URL '{0}'")]
    InvalidUpstream(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self::preset(environment).with_env_overrides()
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Checks the settings the server cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("SESSION_JWT_SECRET"));
        }
        if self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        url::Url::parse(&self.server.upstream_url)
            .map_err(|_| ConfigError::InvalidUpstream(self.server.upstream_url.clone()))?;
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("GATEKEEPER_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("UPSTREAM_URL") {
            self.server.upstream_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_JWT_SECRET") {
            self.session.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_ACCESS_TTL_SECS") {
            self.session.access_ttl_secs = v.parse().unwrap_or(self.session.access_ttl_secs);
        }
        if let Ok(v) = env::var("SESSION_REFRESH_TTL_SECS") {
            self.session.refresh_ttl_secs = v.parse().unwrap_or(self.session.refresh_ttl_secs);
        }
        if let Ok(v) = env::var("SESSION_SECURE_COOKIES") {
            self.session.secure_cookies = v.parse().unwrap_or(self.session.secure_cookies);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                upstream_url: "http://127.0.0.1:3001".to_string(),
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            session: SessionConfig::with_ttls(60 * 60, 60 * 60 * 24 * 30, false),
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3001".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                upstream_url: "http://127.0.0.1:3001".to_string(),
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            session: SessionConfig::with_ttls(60 * 60, 60 * 60 * 24 * 7, true),
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                upstream_url: "http://127.0.0.1:3001".to_string(),
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            session: SessionConfig::with_ttls(15 * 60, 60 * 60 * 24 * 7, true),
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }
}

impl SessionConfig {
    fn with_ttls(access_ttl_secs: u64, refresh_ttl_secs: u64, secure_cookies: bool) -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_secs,
            refresh_ttl_secs,
            access_cookie: "qm-access-token".to_string(),
            refresh_cookie: "qm-refresh-token".to_string(),
            secure_cookies,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        AppConfig::development().session
    }
}
