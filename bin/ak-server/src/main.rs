//! AdminKit Server
//!
//! Serves the system admin APIs:
//! - Authentication: login, logout
//! - User sessions: listing, forced logout
//! - Login logs and operation audit logs
//! - Health: /health, /health/live, /health/ready
//!
//! Configuration is read from `config.toml` (or `ADMINKIT_CONFIG`) and
//! `ADMINKIT_*` environment variables; see `ak_config::AppConfig`.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ADMINKIT_HTTP_PORT` | `48080` | HTTP API port |
//! | `ADMINKIT_DATABASE_URL` | `sqlite://./data/adminkit.db?mode=rwc` | Relational store |
//! | `ADMINKIT_REDIS_ENABLED` | `false` | Keep sessions in Redis instead of memory |
//! | `ADMINKIT_REDIS_URL` | `redis://localhost:6379` | Redis URL |
//! | `ADMINKIT_SESSION_TIMEOUT_SECS` | `1800` | Session lifetime |
//! | `ADMINKIT_DEV_MODE` | `false` | Seed admin / admin123 on an empty database |
//! | `LOG_FORMAT` | `text` | `json` for structured output |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::Router;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa_swagger_ui::SwaggerUi;

use ak_config::{AppConfig, ConfigLoader};
use ak_platform::auth::{Argon2Config, PasswordService};
use ak_platform::shared::db;
use ak_platform::shared::{health_router, TokenAuthLayer};
use ak_platform::{init_schema, InMemoryLoginUserCache, LoginUserCache, Platform, RedisLoginUserCache};

#[tokio::main]
async fn main() -> Result<()> {
    ak_common::logging::init_logging("ak-server");

    info!("Starting AdminKit Server");

    let config = ConfigLoader::new().load().context("Failed to load configuration")?;

    // Relational store
    ensure_sqlite_dir(&config.database.url)?;
    info!(url = %config.database.url, "Connecting to database");
    let pool = db::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    init_schema(&pool).await?;

    // Session cache
    let cache: Arc<dyn LoginUserCache> = if config.redis.enabled {
        info!(url = %config.redis.url, "Using Redis session cache");
        Arc::new(RedisLoginUserCache::connect(&config.redis.url).await?)
    } else {
        warn!("Redis disabled; sessions are kept in process memory");
        Arc::new(InMemoryLoginUserCache::new())
    };

    let argon2 = if config.dev_mode {
        Argon2Config::testing()
    } else {
        Argon2Config::default()
    };
    let passwords = Arc::new(PasswordService::new(argon2)?);

    let platform = Platform::new(pool.clone(), cache, &config, passwords);

    if config.dev_mode {
        info!("Development mode enabled, seeding data...");
        if let Err(e) = platform.dev_seeder().seed().await {
            warn!(error = %e, "Failed to seed development data");
        }
    }

    let sweeper = platform.sweeper(config.session.sweep_interval());
    sweeper.start().await;

    let (api, openapi) = platform.api_router();

    let app = Router::new()
        .merge(api)
        .merge(health_router(pool))
        .merge(SwaggerUi::new("/swagger-ui").url("/v3/api-docs", openapi))
        .layer(TokenAuthLayer::new(platform.session_service.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(&config));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown signal received...");
    sweeper.stop().await;

    info!("AdminKit Server shutdown complete");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .http
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the parent directory of a file-backed SQLite URL
fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
}
