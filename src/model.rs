// Core structs: bars, quotes, assets, news, persistence records and error enums
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLCV sample. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Point-in-time price fact for a symbol, replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub symbol: String,
    pub name: String,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub ipo: Option<String>,
    pub market_capitalization: f64,
    pub share_outstanding: f64,
    pub logo: Option<String>,
    pub weburl: Option<String>,
    pub industry: Option<String>,
}

/// Fundamentals as reported by the provider. Absent figures stay `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMetrics {
    pub symbol: String,
    pub pe: Option<f64>,
    pub eps: Option<f64>,
    pub beta: Option<f64>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub dividend_yield: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoAsset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_24h: f64,
    pub change_percent_24h: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub circulating_supply: f64,
    pub total_supply: Option<f64>,
    // Only filled from provider fields; never synthesized.
    pub market_cap_rank: Option<u32>,
    pub change_percent_1h: Option<f64>,
    pub change_percent_7d: Option<f64>,
    pub change_percent_30d: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "displaySymbol")]
    pub display_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoMatch {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(alias = "market_cap_rank")]
    pub market_cap_rank: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub stocks: Vec<SymbolMatch>,
    pub cryptos: Vec<CryptoMatch>,
}

/// News article as handed over by a provider, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNews {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub related: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub headline: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub sentiment: f64,
    pub sentiment_label: SentimentLabel,
    pub image: Option<String>,
    pub related: Option<String>,
}

/// Data tagged with where it came from: the primary source, or a fallback
/// used because the primary failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Sourced<T> {
    Live { data: T },
    Degraded { data: T, reason: String },
}

impl<T> Sourced<T> {
    pub fn live(data: T) -> Self {
        Sourced::Live { data }
    }

    pub fn degraded(data: T, reason: impl Into<String>) -> Self {
        Sourced::Degraded {
            data,
            reason: reason.into(),
        }
    }

    pub fn data(&self) -> &T {
        match self {
            Sourced::Live { data } | Sourced::Degraded { data, .. } => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            Sourced::Live { data } | Sourced::Degraded { data, .. } => data,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Sourced::Live { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        match self {
            Sourced::Live { data } => Sourced::Live { data: f(data) },
            Sourced::Degraded { data, reason } => Sourced::Degraded {
                data: f(data),
                reason,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandleRequest {
    pub symbol: String,
    pub resolution: String,
    /// Epoch seconds, inclusive.
    pub from: i64,
    pub to: i64,
}

// --- persistence records ---

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntry {
    pub id: i64,
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Holding {
    pub id: i64,
    pub symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub purchase_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHolding {
    pub symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub purchase_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoldingUpdate {
    pub quantity: Option<f64>,
    pub purchase_price: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Above,
    Below,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Above => "above",
            AlertType::Below => "below",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "above" => Some(AlertType::Above),
            "below" => Some(AlertType::Below),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceAlert {
    pub id: i64,
    pub symbol: String,
    pub alert_type: AlertType,
    pub target_price: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartAnnotation {
    pub id: i64,
    pub symbol: String,
    pub annotation_type: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// --- errors ---

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no data: {0}")]
    NoData(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NoData(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Http(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid stored value: {0}")]
    Corrupt(String),
    #[error("record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative analysis is not configured")]
    Unconfigured,
    #[error("http error: {0}")]
    Http(String),
    #[error("model endpoint responded with status {0}")]
    Status(u16),
    #[error("malformed model response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for NarrativeError {
    fn from(e: reqwest::Error) -> Self {
        NarrativeError::Http(e.without_url().to_string())
    }
}

/// Failure of an operation that spans providers and the narrative model.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Narrative(#[from] NarrativeError),
}
