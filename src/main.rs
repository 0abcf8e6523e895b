mod analyzer;
mod api;
mod config;
mod format;
mod model;
mod narrative;
mod normalizer;
mod provider;
mod service;
mod storage;
mod utils;

use config::{config_path, load_config, AppConfig};
use narrative::{LlmClient, NarrativeAnalyzer};
use provider::{
    build_http_client, CandleProvider, CoinGeckoClient, FinnhubClient, NewsApiClient, NewsProvider,
    YahooChartClient,
};
use service::{MarketService, Providers};
use std::net::SocketAddr;
use std::sync::Arc;
use storage::SqliteStorage;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = config_path();
    let config: AppConfig = match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", path, e);
            return;
        }
    };

    let client = match build_http_client(config.http_timeout_seconds) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };

    let storage = match SqliteStorage::new(&config.database_path) {
        Ok(s) => Arc::new(Mutex::new(s)),
        Err(e) => {
            error!("Failed to initialize storage: {:?}", e);
            return;
        }
    };

    let service = MarketService::new(build_providers(&config, client), config.top_stocks.clone());
    let app = api::router(api::AppState::new(service, storage));

    let addr: SocketAddr = match format!("{}:{}", config.bind, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}:{}: {}", config.bind, config.port, e);
            return;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };

    info!("MarketDash listening on http://{}", addr);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }
}

/// Wires the concrete clients behind the provider traits.
fn build_providers(config: &AppConfig, client: reqwest::Client) -> Providers {
    let finnhub = Arc::new(FinnhubClient::new(
        client.clone(),
        &config.finnhub.base_url,
        &config.finnhub.api_key,
    ));

    let fallback_candles: Option<Arc<dyn CandleProvider>> = if config.yahoo.enabled {
        Some(Arc::new(YahooChartClient::new(client.clone(), &config.yahoo.base_url)))
    } else {
        None
    };

    let fallback_news: Option<Arc<dyn NewsProvider>> = config.news_api.as_ref().map(|n| {
        Arc::new(NewsApiClient::new(client.clone(), &n.base_url, &n.api_key)) as Arc<dyn NewsProvider>
    });

    let narrative: Option<Arc<dyn NarrativeAnalyzer>> = match &config.llm {
        Some(llm) => {
            info!("Narrative analysis enabled ({})", llm.model);
            Some(Arc::new(LlmClient::new(
                client.clone(),
                &llm.base_url,
                &llm.api_key,
                &llm.model,
                llm.temperature,
            )))
        }
        None => {
            warn!("No LLM configured; /api/ai endpoints will answer 503");
            None
        }
    };

    Providers {
        stocks: finnhub.clone(),
        candles: finnhub.clone(),
        fallback_candles,
        crypto: Arc::new(CoinGeckoClient::new(client, &config.coingecko.base_url)),
        news: finnhub,
        fallback_news,
        narrative,
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping...");
}
