use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use fingenius_backend::app;
use fingenius_backend::cache::{CacheStore, MemoryCacheStore, RedisCacheStore, UnavailableCacheStore};
use fingenius_backend::config::{AppConfig, CacheBackend};
use fingenius_backend::external::market_data::MarketDataProvider;
use fingenius_backend::external::yahoo::YahooFinanceProvider;
use fingenius_backend::logging::{init_logging, LoggingConfig};
use fingenius_backend::services::advice_service::provider_from_config;
use fingenius_backend::state::AppState;

async fn build_cache(config: &AppConfig) -> Arc<dyn CacheStore> {
    match config.cache_backend {
        CacheBackend::Memory => {
            info!("Using in-memory cache");
            let store = MemoryCacheStore::new(config.cache_ttl);
            let sweeper = store.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));
                loop {
                    interval.tick().await;
                    sweeper.purge_expired();
                }
            });
            Arc::new(store)
        }
        CacheBackend::Redis => match RedisCacheStore::connect(&config.redis_url, config.cache_ttl).await {
            Ok(store) => {
                info!("Connected to Redis cache");
                Arc::new(store)
            }
            Err(e) => {
                error!("Could not connect to Redis at startup: {}. Caching disabled.", e);
                Arc::new(UnavailableCacheStore::new(e.to_string(), config.cache_ttl))
            }
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    if config.cache_ttl.is_disabled() {
        warn!("CACHE_EXPIRATION_MINUTES <= 0, cache writes are disabled");
    }

    let cache = build_cache(&config).await;
    let market_data: Arc<dyn MarketDataProvider> = Arc::new(
        YahooFinanceProvider::new(config.market_data_base_url.clone(), config.market_data_timeout)
            .context("Failed to build market data client")?,
    );
    let llm = provider_from_config(&config.llm);

    let state = AppState::new(&config, cache, market_data, llm);
    let app = app::create_app(state, &config);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("FinGenius backend running at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down"),
        _ = terminate => warn!("Received SIGTERM, shutting down"),
    }
}
