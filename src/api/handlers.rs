use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;
use tracing::info;

use super::dto::*;
use super::error::ApiError;
use super::state::AppState;
use crate::model::{
    AlertType, CandleRequest, ChartAnnotation, CryptoAsset, Holding, HoldingUpdate, NewHolding,
    NewsItem, PriceAlert, PriceBar, QuoteSnapshot, SearchResults, Sourced, WatchlistEntry,
};
use crate::format::CryptoDisplay;
use crate::narrative::StockAnalysis;
use crate::service::{
    IndicatorReport, MarketService, PortfolioSummary, SymbolSummary, TriggeredAlert,
    DEFAULT_RESOLUTION,
};
use crate::utils::normalize_symbol;

const DEFAULT_OHLC_DAYS: u32 = 30;
const DEFAULT_NEWS_CATEGORY: &str = "general";

fn required(value: Option<String>, what: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{what} is required")))
}

// --- narrative ---

/// POST /api/ai/analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<StockAnalysis>, ApiError> {
    let (Some(symbol), Some(current_price)) = (
        req.symbol.filter(|s| !s.trim().is_empty()),
        req.current_price.filter(|p| *p > 0.0),
    ) else {
        return Err(ApiError::BadRequest(
            "Symbol and current price are required".into(),
        ));
    };

    info!("Analyzing {} at {}", symbol, current_price);
    Ok(Json(state.service.analyze(&symbol, current_price).await?))
}

/// POST /api/ai/strategy
pub async fn strategy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StrategyRequest>,
) -> Result<Json<NarrativeResponse>, ApiError> {
    let symbol = required(req.symbol, "symbol")?;
    let goal = required(req.goal, "goal")?;
    let risk_tolerance = required(req.risk_tolerance, "riskTolerance")?;

    let text = state
        .service
        .strategy(&symbol, &goal, &risk_tolerance)
        .await?;
    Ok(Json(NarrativeResponse { text }))
}

/// POST /api/ai/explain
pub async fn explain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<NarrativeResponse>, ApiError> {
    let indicator = required(req.indicator, "indicator")?;
    let value = req
        .value
        .ok_or_else(|| ApiError::BadRequest("value is required".into()))?;
    let context = req.context.unwrap_or_default();

    let text = state.service.explain(&indicator, value, &context).await?;
    Ok(Json(NarrativeResponse { text }))
}

// --- market data ---

/// GET /api/crypto
pub async fn top_cryptos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CryptoAsset>>, ApiError> {
    Ok(Json(state.service.top_cryptos().await?))
}

/// GET /api/crypto/:id
pub async fn crypto_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CryptoDetail>, ApiError> {
    let asset = state.service.crypto_asset(&id).await?;
    Ok(Json(CryptoDetail {
        display: CryptoDisplay::new(&asset),
        asset,
    }))
}

/// GET /api/crypto/:id/ohlc
pub async fn crypto_ohlc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<OhlcQuery>,
) -> Result<Json<Vec<PriceBar>>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_OHLC_DAYS);
    if days == 0 {
        return Err(ApiError::BadRequest("days must be positive".into()));
    }
    Ok(Json(state.service.crypto_ohlc(&id, days).await?))
}

/// GET /api/search?q=
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    let q = required(query.q, "Query parameter 'q'")?;
    Ok(Json(state.service.search(&q).await))
}

/// GET /api/stocks
pub async fn top_stocks(State(state): State<Arc<AppState>>) -> Json<Vec<QuoteSnapshot>> {
    Json(state.service.top_stocks().await)
}

/// GET /api/stocks/:symbol
pub async fn stock_summary(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<SymbolSummary>, ApiError> {
    Ok(Json(state.service.symbol_summary(&symbol).await?))
}

/// GET /api/stocks/:symbol/candles
pub async fn stock_candles(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Sourced<Vec<PriceBar>>>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let defaults = MarketService::daily_request(&symbol);
    let request = CandleRequest {
        resolution: query
            .resolution
            .unwrap_or_else(|| DEFAULT_RESOLUTION.to_string()),
        from: query.from.unwrap_or(defaults.from),
        to: query.to.unwrap_or(defaults.to),
        symbol,
    };
    if request.from > request.to {
        return Err(ApiError::BadRequest("'from' must not be after 'to'".into()));
    }

    Ok(Json(state.service.candles(&request).await?))
}

/// GET /api/stocks/:symbol/indicators
pub async fn stock_indicators(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<IndicatorQuery>,
) -> Result<Json<Sourced<IndicatorReport>>, ApiError> {
    let report = state
        .service
        .indicators(&symbol, query.resolution.as_deref())
        .await?;
    Ok(Json(report))
}

/// GET /api/stocks/:symbol/news
pub async fn stock_news(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Json<Sourced<Vec<NewsItem>>> {
    Json(state.service.company_news(&symbol).await)
}

/// GET /api/news?category=
pub async fn market_news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Json<Sourced<Vec<NewsItem>>> {
    let category = query
        .category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_NEWS_CATEGORY.to_string());
    Json(state.service.market_news(&category).await)
}

// --- watchlist ---

/// GET /api/watchlist
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WatchlistEntry>>, ApiError> {
    let entries = state.storage.lock().await.get_watchlist()?;
    Ok(Json(entries))
}

/// POST /api/watchlist
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WatchlistRequest>,
) -> Result<Json<WatchlistEntry>, ApiError> {
    let symbol = required(req.symbol, "symbol")?;
    let entry = state.storage.lock().await.add_to_watchlist(&symbol)?;
    Ok(Json(entry))
}

/// GET /api/watchlist/:symbol
pub async fn watchlist_status(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<WatchlistStatus>, ApiError> {
    let watched = state.storage.lock().await.is_in_watchlist(&symbol)?;
    Ok(Json(WatchlistStatus {
        symbol: normalize_symbol(&symbol),
        watched,
    }))
}

/// DELETE /api/watchlist/:symbol
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.storage.lock().await.remove_from_watchlist(&symbol)?;
    Ok(Json(DeletedResponse { deleted: true }))
}

// --- holdings ---

/// GET /api/holdings
pub async fn get_holdings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Holding>>, ApiError> {
    let holdings = state.storage.lock().await.get_holdings()?;
    Ok(Json(holdings))
}

/// POST /api/holdings
pub async fn add_holding(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewHolding>,
) -> Result<Json<Holding>, ApiError> {
    if req.symbol.trim().is_empty() {
        return Err(ApiError::BadRequest("symbol is required".into()));
    }
    if req.quantity <= 0.0 || req.purchase_price < 0.0 {
        return Err(ApiError::BadRequest(
            "quantity must be positive and purchase price non-negative".into(),
        ));
    }
    let holding = state.storage.lock().await.add_holding(&req)?;
    Ok(Json(holding))
}

/// PATCH /api/holdings/:id
pub async fn update_holding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<HoldingUpdate>,
) -> Result<Json<Holding>, ApiError> {
    if update.quantity.is_some_and(|q| q <= 0.0) {
        return Err(ApiError::BadRequest("quantity must be positive".into()));
    }
    let holding = state.storage.lock().await.update_holding(id, &update)?;
    Ok(Json(holding))
}

/// DELETE /api/holdings/:id
pub async fn delete_holding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.storage.lock().await.delete_holding(id)?;
    Ok(Json(DeletedResponse { deleted: true }))
}

/// GET /api/portfolio
pub async fn portfolio(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PortfolioSummary>, ApiError> {
    // Released before the quotes are fetched.
    let holdings = state.storage.lock().await.get_holdings()?;
    Ok(Json(state.service.value_portfolio(holdings).await))
}

// --- alerts ---

/// GET /api/alerts
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PriceAlert>>, ApiError> {
    let alerts = state.storage.lock().await.get_active_alerts()?;
    Ok(Json(alerts))
}

/// POST /api/alerts
pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AlertRequest>,
) -> Result<Json<PriceAlert>, ApiError> {
    let symbol = required(req.symbol, "symbol")?;
    let alert_type = req
        .alert_type
        .as_deref()
        .and_then(AlertType::parse)
        .ok_or_else(|| ApiError::BadRequest("alert_type must be 'above' or 'below'".into()))?;
    let target_price = req
        .target_price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| ApiError::BadRequest("target_price must be positive".into()))?;

    let alert = state
        .storage
        .lock()
        .await
        .create_alert(&symbol, alert_type, target_price)?;
    Ok(Json(alert))
}

/// GET /api/alerts/triggered
pub async fn triggered_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TriggeredAlert>>, ApiError> {
    let alerts = state.storage.lock().await.get_active_alerts()?;
    Ok(Json(state.service.evaluate_alerts(alerts).await))
}

/// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.storage.lock().await.deactivate_alert(id)?;
    Ok(Json(DeletedResponse { deleted: true }))
}

// --- chart annotations ---

/// GET /api/annotations/:symbol
pub async fn get_annotations(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Vec<ChartAnnotation>>, ApiError> {
    let annotations = state.storage.lock().await.get_chart_annotations(&symbol)?;
    Ok(Json(annotations))
}

/// POST /api/annotations
pub async fn save_annotation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnnotationRequest>,
) -> Result<Json<ChartAnnotation>, ApiError> {
    let symbol = required(req.symbol, "symbol")?;
    let annotation_type = required(req.annotation_type, "annotation_type")?;
    let annotation = state
        .storage
        .lock()
        .await
        .save_chart_annotation(&symbol, &annotation_type, &req.data)?;
    Ok(Json(annotation))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        narrative: state.service.has_narrative(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{providers, FakeStocks};
    use crate::storage::SqliteStorage;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    fn state() -> Arc<AppState> {
        let stocks = FakeStocks {
            prices: HashMap::from([("AAPL", 193.42)]),
            profile_fails: false,
        };
        let storage = SqliteStorage::open_in_memory().unwrap();
        AppState::new(
            MarketService::new(providers(stocks), vec!["AAPL".into()]),
            Arc::new(Mutex::new(storage)),
        )
    }

    #[tokio::test]
    async fn analyze_without_price_is_bad_request() {
        let req = AnalyzeRequest {
            symbol: Some("AAPL".into()),
            current_price: None,
        };
        let result = analyze(State(state()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn analyze_without_model_is_unavailable() {
        let req = AnalyzeRequest {
            symbol: Some("AAPL".into()),
            current_price: Some(193.42),
        };
        let result = analyze(State(state()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::Unavailable(_))));
    }

    #[tokio::test]
    async fn search_without_query_is_bad_request() {
        let result = search(State(state()), Query(SearchQuery { q: Some("  ".into()) })).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn unknown_stock_is_not_found() {
        let result = stock_summary(State(state()), Path("ZZZZ".into())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn inverted_candle_window_is_bad_request() {
        let query = CandleQuery {
            resolution: None,
            from: Some(2_000),
            to: Some(1_000),
        };
        let result = stock_candles(State(state()), Path("AAPL".into()), Query(query)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn alert_type_is_validated() {
        let req = AlertRequest {
            symbol: Some("AAPL".into()),
            alert_type: Some("sideways".into()),
            target_price: Some(200.0),
        };
        let result = create_alert(State(state()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn watchlist_round_trip_through_handlers() {
        let state = state();
        add_to_watchlist(
            State(state.clone()),
            Json(WatchlistRequest {
                symbol: Some("aapl".into()),
            }),
        )
        .await
        .unwrap();

        let Json(list) = get_watchlist(State(state.clone())).await.unwrap();
        assert_eq!(list[0].symbol, "AAPL");
        let Json(status) = watchlist_status(State(state.clone()), Path("aapl".into()))
            .await
            .unwrap();
        assert!(status.watched);
        assert_eq!(status.symbol, "AAPL");

        remove_from_watchlist(State(state.clone()), Path("AAPL".into()))
            .await
            .unwrap();
        let missing = remove_from_watchlist(State(state.clone()), Path("AAPL".into())).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
        let Json(status) = watchlist_status(State(state), Path("AAPL".into()))
            .await
            .unwrap();
        assert!(!status.watched);
    }

    #[tokio::test]
    async fn triggered_alerts_use_live_quotes() {
        let state = state();
        for (kind, target) in [("above", 150.0), ("below", 150.0)] {
            create_alert(
                State(state.clone()),
                Json(AlertRequest {
                    symbol: Some("AAPL".into()),
                    alert_type: Some(kind.into()),
                    target_price: Some(target),
                }),
            )
            .await
            .unwrap();
        }

        let Json(triggered) = triggered_alerts(State(state)).await.unwrap();
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].alert.alert_type, AlertType::Above);
    }
}
