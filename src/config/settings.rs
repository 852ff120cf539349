//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port, public url)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration, only used by the rate limiter
    #[serde(default)]
    pub redis: RedisSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Outgoing email configuration
    #[serde(default)]
    pub email: EmailSettings,

    /// Realtime WebSocket configuration
    pub realtime: RealtimeSettings,

    /// Log output format: "pretty" or "json"
    pub log_format: String,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// Externally reachable base URL used in verification and reset links
    pub public_url: String,

    /// Maximum request body size in bytes
    pub body_limit: usize,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL. Without it the in-process limiter is used.
    pub url: Option<String>,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Token lifetime in days
    pub expiry_days: i64,

    /// Lifetime of the `token` cookie in days
    pub cookie_expiry_days: i64,

    /// Set the `Secure` attribute on the cookie
    pub secure_cookie: bool,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeSettings {
    /// Machine id (0-31)
    pub machine_id: u16,

    /// Node id (0-31)
    pub node_id: u16,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Requests allowed per client in one window
    pub requests_per_window: u32,

    /// Window length in seconds
    pub window_seconds: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// SMTP configuration. Mail is only logged when `host` or `username` is unset.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from_name: "RiverForo".into(),
        }
    }
}

/// Realtime WebSocket configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval_ms: u64,

    /// Extra time allowed past the interval before a silent client is dropped
    pub heartbeat_grace_ms: u64,

    /// Capacity of the broadcast buffer
    pub channel_capacity: usize,

    /// Maximum inbound message size in bytes
    pub max_message_size: usize,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml
    /// 3. config/{RUN_ENV}.toml
    /// 4. `APP__SECTION__KEY` environment variables
    /// 5. well-known flat variables (`PORT`, `DATABASE_URL`, `JWT_SECRET`, ...)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if JWT secret is too short.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());
        let log_format = if environment == "production" {
            "json"
        } else {
            "pretty"
        };

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("log_format", log_format)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.public_url", "http://localhost:5000")?
            .set_default("server.body_limit", 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.expiry_days", 30)?
            .set_default("jwt.cookie_expiry_days", 30)?
            .set_default("jwt.secure_cookie", environment == "production")?
            .set_default("snowflake.machine_id", 1)?
            .set_default("snowflake.node_id", 0)?
            .set_default("rate_limit.requests_per_window", 100)?
            .set_default("rate_limit.window_seconds", 600)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("email.port", 587)?
            .set_default("email.from_name", "RiverForo")?
            .set_default("realtime.heartbeat_interval_ms", 30000_i64)?
            .set_default("realtime.heartbeat_grace_ms", 10000_i64)?
            .set_default("realtime.channel_capacity", 1024_i64)?
            .set_default("realtime.max_message_size", 16384_i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=5000 -> server.port = 5000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option("server.public_url", std::env::var("PUBLIC_URL").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("jwt.expiry_days", std::env::var("JWT_EXPIRE_DAYS").ok())?
            .set_override_option(
                "cors.allowed_origins",
                std::env::var("CLIENT_URL").ok().map(|url| vec![url]),
            )?
            .set_override_option("email.host", std::env::var("SMTP_HOST").ok())?
            .set_override_option("email.username", std::env::var("EMAIL_USER").ok())?
            .set_override_option("email.password", std::env::var("EMAIL_PASS").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject configurations that would run insecurely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        if self.rate_limit.requests_per_window == 0 || self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::Message(
                "rate_limit.requests_per_window and rate_limit.window_seconds must be positive"
                    .into(),
            ));
        }
        Ok(())
    }

    /// True when running with production defaults.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Join a path onto the public base URL.
    pub fn public_link(&self, path: &str) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), path)
    }
}

/// Settings suitable for unit tests: no SMTP, no Redis, a valid secret.
#[cfg(test)]
pub fn sample_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 5000,
            public_url: "http://localhost:5000/".into(),
            body_limit: 1024,
        },
        database: DatabaseSettings {
            url: "postgres://localhost/riverforo".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
            run_migrations: false,
        },
        redis: RedisSettings::default(),
        jwt: JwtSettings {
            secret: "x".repeat(MIN_JWT_SECRET_LENGTH),
            expiry_days: 30,
            cookie_expiry_days: 30,
            secure_cookie: false,
        },
        snowflake: SnowflakeSettings {
            machine_id: 1,
            node_id: 0,
        },
        rate_limit: RateLimitSettings {
            requests_per_window: 100,
            window_seconds: 600,
        },
        cors: CorsSettings {
            allowed_origins: vec!["http://localhost:3000".into()],
        },
        email: EmailSettings::default(),
        realtime: RealtimeSettings {
            heartbeat_interval_ms: 30000,
            heartbeat_grace_ms: 10000,
            channel_capacity: 16,
            max_message_size: 4096,
        },
        log_format: "pretty".into(),
        environment: "test".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let mut settings = sample_settings();
        settings.jwt.secret = "short".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut settings = sample_settings();
        settings.rate_limit.window_seconds = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_public_link_joins_without_double_slash() {
        let settings = sample_settings();
        assert_eq!(
            settings.server.public_link("/api/auth/verify-email/abc"),
            "http://localhost:5000/api/auth/verify-email/abc"
        );
    }
}
