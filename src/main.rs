//! The binary entry point for the application.

use std::sync::Arc;
use std::time::Duration;

use app_core::boundary::with_error_boundary;
use app_core::config::Config;
use app_core::identity::{FirebaseConfig, FirebaseTokenVerifier, GOOGLE_SECURETOKEN_JWKS_URL, TokenVerifier};
use app_core::logging::{self, LogFormat, LogSettings};
use app_core::middleware::{RequiredRole, request_response_logger};
use axum::http::{HeaderValue, Method, header};
use axum::middleware;
use sea_orm::{ConnectOptions, Database};
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real deployments use the environment.
    dotenvy::dotenv().ok();

    if let Err(err) = run().await {
        panic!("❌ Application failed to start: {err}");
    }
}

/// Initializes all dependencies and starts the web server.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Values from the file are overridden by APP__* environment variables.
    // The .watch() method enables automatic reloading when the config file changes.
    let config = Arc::new(
        Config::builder()
            .optional_file("config/config.yaml")
            .env_prefix("APP")
            .watch_interval(Duration::from_secs(5))
            .watch()
            .build()?,
    );

    // Keep the guard alive until shutdown so buffered file logs are flushed.
    let _log_guard = logging::init(&LogSettings {
        level: config.get_or("log.level", "info".to_string())?,
        format: config.get_or("log.format", "json".to_string())?.parse::<LogFormat>()?,
        file: config.get_opt("log.file")?,
    })?;

    // Initialize the SeaORM database connection pool.
    let mut db_opt = ConnectOptions::new(config.get::<String>("database.url")?);
    db_opt
        .min_connections(config.get_or("database.min_connections", 1)?)
        .max_connections(config.get_or("database.max_connections", 10)?)
        .connect_timeout(Duration::from_secs(config.get_or("database.connect_timeout_secs", 8)?))
        .sqlx_logging(config.get_or("database.sqlx_logging", false)?)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db_pool = Arc::new(Database::connect(db_opt).await?);

    if config.get_or("database.auto_migrate", false)? {
        app_orm::create_tables(db_pool.as_ref()).await?;
        tracing::info!("Database schema is up to date");
    }

    // Initialize the identity provider verifier.
    let verifier: Arc<dyn TokenVerifier> = Arc::new(FirebaseTokenVerifier::new(FirebaseConfig {
        project_id: config.get("identity.project_id")?,
        jwks_url: config.get_or("identity.jwks_url", GOOGLE_SECURETOKEN_JWKS_URL.to_string())?,
        tokens_valid_after: config.get_opt("identity.tokens_valid_after")?,
    }));
    let required_role = config.get_opt::<String>("identity.required_role")?.map(RequiredRole::new);

    // Initialize profile module
    let profile_state = profile::new(profile::Dependency {
        db: db_pool.clone(),
        verifier: verifier.clone(),
        version: config.get_or("app.version", env!("CARGO_PKG_VERSION").to_string())?,
    });

    // Create the Router and Middlewares
    let timeout_secs = Duration::from_secs(config.get_or::<u64>("server.timeout_secs", 30)?);
    let cors_origin = config.get_or("server.cors_origin", "http://localhost:3000".to_string())?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let routes = profile::create_router(profile_state, verifier, required_role, cors)
        .layer(TimeoutLayer::new(timeout_secs)); // Adds a request timeout
    let app = with_error_boundary(routes).layer(middleware::from_fn(request_response_logger));

    let server_address = config.get_or("server.address", "0.0.0.0:5000".to_string())?;
    let listener = tokio::net::TcpListener::bind(&server_address).await?;

    tracing::info!("🚀 listening on {}", listener.local_addr()?);

    // Create a broadcast channel to signal shutdown to all application components.
    // Spawn a task to listen for shutdown signals (Ctrl+C and SIGTERM).
    let (shutdown_tx, _) = broadcast::channel(1);
    spawn_shutdown_listener(shutdown_tx.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_tx.subscribe().recv().await.ok();
            tracing::info!("🛑 Server is shutting down gracefully...");
        })
        .await?;

    // The router held the other references; close the pool once it is gone.
    match Arc::try_unwrap(db_pool) {
        Ok(db) => db.close().await?,
        Err(_) => tracing::warn!("Database pool still referenced at shutdown"),
    }

    Ok(())
}

/// Spawns a background task to listen for system shutdown signals.
fn spawn_shutdown_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                },
                Err(err) => {
                    tracing::error!("Failed to install SIGTERM handler: {err}");
                    std::future::pending::<()>().await;
                },
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("🔻 Received SIGINT (Ctrl+C)")},
            _ = terminate => { tracing::info!("🔻 Received SIGTERM")},
        }

        // Send the shutdown signal to all parts of the application.
        if shutdown_tx.send(()).is_err() {
            tracing::error!("Failed to send shutdown signal");
        }
    });
}
