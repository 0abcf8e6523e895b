mod dto;
pub(crate) mod error;
mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ai/analyze", post(handlers::analyze))
        .route("/api/ai/strategy", post(handlers::strategy))
        .route("/api/ai/explain", post(handlers::explain))
        .route("/api/crypto", get(handlers::top_cryptos))
        .route("/api/crypto/:id", get(handlers::crypto_asset))
        .route("/api/crypto/:id/ohlc", get(handlers::crypto_ohlc))
        .route("/api/search", get(handlers::search))
        .route("/api/stocks", get(handlers::top_stocks))
        .route("/api/stocks/:symbol", get(handlers::stock_summary))
        .route("/api/stocks/:symbol/candles", get(handlers::stock_candles))
        .route("/api/stocks/:symbol/indicators", get(handlers::stock_indicators))
        .route("/api/stocks/:symbol/news", get(handlers::stock_news))
        .route("/api/news", get(handlers::market_news))
        .route(
            "/api/watchlist",
            get(handlers::get_watchlist).post(handlers::add_to_watchlist),
        )
        .route(
            "/api/watchlist/:symbol",
            get(handlers::watchlist_status).delete(handlers::remove_from_watchlist),
        )
        .route(
            "/api/holdings",
            get(handlers::get_holdings).post(handlers::add_holding),
        )
        .route(
            "/api/holdings/:id",
            patch(handlers::update_holding).delete(handlers::delete_holding),
        )
        .route("/api/portfolio", get(handlers::portfolio))
        .route(
            "/api/alerts",
            get(handlers::get_alerts).post(handlers::create_alert),
        )
        .route("/api/alerts/triggered", get(handlers::triggered_alerts))
        .route("/api/alerts/:id", delete(handlers::delete_alert))
        .route("/api/annotations", post(handlers::save_annotation))
        .route("/api/annotations/:symbol", get(handlers::get_annotations))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
