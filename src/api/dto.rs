use crate::format::CryptoDisplay;
use crate::model::CryptoAsset;
use serde::{Deserialize, Serialize};

// Request fields are optional so handlers can answer a missing one with a
// 400 of their own instead of the extractor's rejection.

/// POST /api/ai/analyze request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub symbol: Option<String>,
    pub current_price: Option<f64>,
}

/// POST /api/ai/strategy request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRequest {
    pub symbol: Option<String>,
    pub goal: Option<String>,
    pub risk_tolerance: Option<String>,
}

/// POST /api/ai/explain request
#[derive(Debug, Default, Deserialize)]
pub struct ExplainRequest {
    pub indicator: Option<String>,
    pub value: Option<f64>,
    pub context: Option<String>,
}

/// Free-text model output
#[derive(Debug, Serialize)]
pub struct NarrativeResponse {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandleQuery {
    pub resolution: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndicatorQuery {
    pub resolution: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OhlcQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WatchlistRequest {
    pub symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertRequest {
    pub symbol: Option<String>,
    pub alert_type: Option<String>,
    pub target_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnnotationRequest {
    pub symbol: Option<String>,
    pub annotation_type: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// GET /api/crypto/:id response: the asset plus display strings
#[derive(Debug, Serialize)]
pub struct CryptoDetail {
    #[serde(flatten)]
    pub asset: CryptoAsset,
    pub display: CryptoDisplay,
}

/// GET /api/watchlist/:symbol response
#[derive(Debug, Serialize)]
pub struct WatchlistStatus {
    pub symbol: String,
    pub watched: bool,
}

/// Acknowledges a delete
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub narrative: bool,
}
