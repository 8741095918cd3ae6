// Main entry point for the keeper identity service

use keeper_identity::api::metrics::AuthMetrics;
use keeper_identity::api::{create_router, AccountStore, AppState};
use keeper_identity::auth::audit_logger::AuditLogger;
use keeper_identity::auth::flows::IdentityService;
use keeper_identity::auth::memory_store::MemoryAccountStore;
use keeper_identity::auth::pg_store::PgAccountStore;
use keeper_identity::config::Config;
use keeper_identity::core::crypto::TokenIssuer;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!("Starting keeper identity service");

    let store_kind = if config.database_url.is_some() { "postgres" } else { "memory" };
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        store = store_kind,
        "Configuration loaded"
    );

    // 3. Initialize account store (PostgreSQL or in-memory)
    let hasher = config.credential_hasher()?;
    let mut db_pool: Option<Arc<sqlx::PgPool>> = None;

    let account_store: Arc<dyn AccountStore + Send + Sync> = if let Some(ref database_url) = config.database_url {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(config.store_timeout())
            .connect(database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                e
            })
            .context("connecting to database")?;

        let store = PgAccountStore::new(pool.clone(), hasher);
        store.migrate().await.context("creating account schema")?;
        db_pool = Some(Arc::new(pool));

        info!("PostgreSQL account store initialized");
        Arc::new(store)
    } else {
        warn!("DATABASE_URL not set; accounts are kept in memory and lost on restart");
        Arc::new(MemoryAccountStore::new(hasher))
    };

    // 4. Load token signing key (loaded once, held for the process lifetime)
    let token_issuer = match config.token_signing_key_path {
        Some(ref path) => TokenIssuer::from_pem_file(path).map_err(|e| {
            error!(error = %e, path = ?path, "Failed to load token signing key");
            e
        })?,
        None => {
            warn!("TOKEN_SIGNING_KEY_PATH not set; using an ephemeral signing key");
            TokenIssuer::generate()
        }
    };
    let token_issuer = Arc::new(
        token_issuer
            .with_issuer(config.token_issuer.clone())
            .with_ttl_secs(config.token_ttl()?),
    );

    info!(ttl_secs = token_issuer.ttl_secs(), "Token issuer initialized");

    // 5. Build flows and shared state
    let identity = Arc::new(IdentityService::new(
        account_store.clone(),
        token_issuer.clone(),
        config.credential_policy(),
        config.store_timeout(),
    ));

    let app_state = AppState {
        identity,
        account_store,
        token_issuer,
        audit_logger: Arc::new(AuditLogger::new(db_pool)),
        metrics: Arc::new(AuthMetrics::new()?),
        config: Arc::new(config.clone()),
    };

    // 6. Create router
    let router = create_router(&app_state).with_state(app_state);

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %addr, "Failed to bind to address");
            e
        })?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    let initialized = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    initialized.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
