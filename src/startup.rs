//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::TokenIssuer;
use crate::config::{RedisSettings, Settings};
use crate::domain::services::{EventPublisher, Mailer};
use crate::infrastructure::{database, email};
use crate::presentation::http::create_router;
use crate::presentation::http::handlers::health::init_server_start;
use crate::presentation::middleware::RateLimiter;
use crate::presentation::realtime::Gateway;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Present only when `redis.url` is configured
    pub redis: Option<ConnectionManager>,
    pub rate_limiter: Arc<RateLimiter>,
    pub gateway: Arc<Gateway>,
    pub mailer: Arc<dyn Mailer>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub tokens: TokenIssuer,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Assemble state around an existing pool. Redis is connected when configured.
    pub async fn new(settings: Settings, db: PgPool) -> Result<Self> {
        let redis = connect_redis(&settings.redis).await?;

        let rate_limiter = Arc::new(match &redis {
            Some(conn) => RateLimiter::redis(conn.clone(), &settings.rate_limit),
            None => {
                tracing::warn!("REDIS_URL not set, rate limiting is per process");
                RateLimiter::in_memory(&settings.rate_limit)
            }
        });

        let mailer =
            email::build_mailer(&settings.email, settings.is_production()).context("Failed to configure mailer")?;

        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            settings.snowflake.node_id as u64,
        ));

        Ok(Self {
            db,
            redis,
            rate_limiter,
            gateway: Arc::new(Gateway::new(&settings.realtime)),
            mailer,
            snowflake,
            tokens: TokenIssuer::new(&settings.jwt),
            settings: Arc::new(settings),
        })
    }

    /// Realtime fan-out used by the services
    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.gateway.clone()
    }
}

async fn connect_redis(settings: &RedisSettings) -> Result<Option<ConnectionManager>> {
    let Some(url) = settings.url.as_deref() else {
        return Ok(None);
    };

    let client = redis::Client::open(url).context("Invalid REDIS_URL")?;
    let manager = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Redis connection established");
    Ok(Some(manager))
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        init_server_start();

        let db = database::create_pool(&settings.database)
            .await
            .context("Failed to connect to PostgreSQL")?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Database migrations applied");
        }

        let addr = settings.server.socket_addr()?;
        let state = AppState::new(settings, db).await?;
        let router = create_router(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until Ctrl-C or SIGTERM
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
