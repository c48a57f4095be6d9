//! fiscal-server: REST server for fiscal stress scoring, validation review
//! and reserve projections.
//!
//! Reads config from env vars (a `.env` file is honoured):
//!   FISCAL_BIND_ADDR - listen address (default: 127.0.0.1:3000)
//!   FISCAL_CONFIG    - scoring/projection YAML (default: config/fiscal.yaml)
//!   FISCAL_RULES     - validation rules YAML (default: config/rules.yaml)
//!   DATABASE_URL     - Postgres connection string; when unset, or when built
//!                      without the `postgres` feature, records live in memory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fiscal_core::store::FiscalStore;
use fiscal_core::validation::load_rules;
use fiscal_core::{FiscalConfig, MemoryStore};
use fiscal_server::{create_fiscal_router, AppState};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fiscal_server=debug,fiscal_core=debug".into()),
        )
        .init();

    let bind_addr =
        std::env::var("FISCAL_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let config_path = env_path("FISCAL_CONFIG", "config/fiscal.yaml");
    let rules_path = env_path("FISCAL_RULES", "config/rules.yaml");

    let config = if config_path.exists() {
        FiscalConfig::load(&config_path)?
    } else {
        tracing::warn!(
            "{:?} not found, using built-in scenarios and defaults",
            config_path
        );
        FiscalConfig::default()
    };

    let store = open_store().await?;
    seed_rules(store.as_ref(), &rules_path).await?;

    let app = create_fiscal_router(AppState::new(store, &config)?)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {bind_addr}"))?;
    tracing::info!("fiscal-server listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

#[cfg(feature = "postgres")]
async fn open_store() -> Result<Arc<dyn FiscalStore>> {
    use fiscal_core::store::{PgSettings, PostgresStore};

    if std::env::var("DATABASE_URL").is_err() {
        tracing::warn!("DATABASE_URL not set, using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PostgresStore::connect(&PgSettings::from_env()?).await?;
    tracing::info!("Connected to database");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_store() -> Result<Arc<dyn FiscalStore>> {
    tracing::info!("Built without the postgres feature, using in-memory store");
    Ok(Arc::new(MemoryStore::new()))
}

/// Rules from YAML are upserted so the file stays the source of truth
async fn seed_rules(store: &dyn FiscalStore, path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!("{:?} not found, no validation rules loaded", path);
        return Ok(());
    }

    let rules = load_rules(path)?;
    for rule in &rules {
        store
            .save_rule(rule)
            .await
            .with_context(|| format!("failed to save rule '{}'", rule.name))?;
    }
    Ok(())
}
