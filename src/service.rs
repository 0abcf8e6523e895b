// Request-scoped aggregation over the injected providers.
use crate::analyzer::{IndicatorEngine, IndicatorSeries, SentimentScorer, TechnicalSnapshot};
use crate::format::QuoteDisplay;
use crate::model::{
    AlertType, CandleRequest, CompanyProfile, CryptoAsset, Holding, NarrativeError, NewsItem,
    PriceAlert, PriceBar, ProviderError, QuoteSnapshot, RawNews, SearchResults, ServiceError,
    Sourced, StockMetrics,
};
use crate::narrative::{AnalysisInput, NarrativeAnalyzer, StockAnalysis};
use crate::provider::{CandleProvider, CryptoDataProvider, NewsProvider, StockDataProvider};
use crate::utils::{normalize_symbol, today};
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

const CANDLE_LOOKBACK_DAYS: i64 = 365;
const COMPANY_NEWS_DAYS: i64 = 7;
pub const DEFAULT_RESOLUTION: &str = "D";
pub const TOP_CRYPTO_LIMIT: usize = 20;

/// Provider handles built once at bootstrap.
pub struct Providers {
    pub stocks: Arc<dyn StockDataProvider>,
    pub candles: Arc<dyn CandleProvider>,
    pub fallback_candles: Option<Arc<dyn CandleProvider>>,
    pub crypto: Arc<dyn CryptoDataProvider>,
    pub news: Arc<dyn NewsProvider>,
    pub fallback_news: Option<Arc<dyn NewsProvider>>,
    pub narrative: Option<Arc<dyn NarrativeAnalyzer>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSummary {
    pub quote: QuoteSnapshot,
    pub display: QuoteDisplay,
    pub profile: Option<CompanyProfile>,
    pub metrics: Option<StockMetrics>,
    pub technicals: Option<TechnicalSnapshot>,
}

/// Aligned indicator series for charting.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorReport {
    pub symbol: String,
    pub timestamps: Vec<i64>,
    pub closes: Vec<f64>,
    pub sma20: IndicatorSeries,
    pub sma50: IndicatorSeries,
    pub rsi14: IndicatorSeries,
    pub snapshot: Option<TechnicalSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub holding: Holding,
    pub current_price: Option<f64>,
    pub cost_basis: f64,
    pub market_value: Option<f64>,
    pub gain: Option<f64>,
    pub gain_percent: Option<f64>,
}

/// Totals cover priced positions only; `unpriced` counts the rest.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub positions: Vec<Position>,
    pub total_cost: f64,
    pub total_value: f64,
    pub total_gain: f64,
    pub total_gain_percent: f64,
    pub unpriced: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredAlert {
    pub alert: PriceAlert,
    pub current_price: f64,
}

pub fn alert_triggered(alert: &PriceAlert, price: f64) -> bool {
    match alert.alert_type {
        AlertType::Above => price >= alert.target_price,
        AlertType::Below => price <= alert.target_price,
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

/// Logs and drops the failure of a non-critical fetch.
fn secondary<T>(what: &str, symbol: &str, result: Result<T, ProviderError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} for {} unavailable: {}", what, symbol, e);
            None
        }
    }
}

fn score_all(items: Vec<RawNews>) -> Vec<NewsItem> {
    items.into_iter().map(SentimentScorer::score_news).collect()
}

pub struct MarketService {
    providers: Providers,
    top_stocks: Vec<String>,
}

impl MarketService {
    pub fn new(providers: Providers, top_stocks: Vec<String>) -> Self {
        Self {
            providers,
            top_stocks,
        }
    }

    pub fn has_narrative(&self) -> bool {
        self.providers.narrative.is_some()
    }

    /// One year of daily bars ending now.
    pub fn daily_request(symbol: &str) -> CandleRequest {
        let to = Utc::now();
        CandleRequest {
            symbol: symbol.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            from: (to - Duration::days(CANDLE_LOOKBACK_DAYS)).timestamp(),
            to: to.timestamp(),
        }
    }

    /// Quote is critical; profile, metrics and technicals degrade to `None`.
    pub async fn symbol_summary(&self, symbol: &str) -> Result<SymbolSummary, ProviderError> {
        let symbol = normalize_symbol(symbol);
        let request = Self::daily_request(&symbol);

        let (quote, profile, metrics, candles) = tokio::join!(
            self.providers.stocks.quote(&symbol),
            self.providers.stocks.profile(&symbol),
            self.providers.stocks.metrics(&symbol),
            self.candles(&request),
        );

        let quote = quote?;
        let profile = secondary("profile", &symbol, profile);
        let metrics = secondary("metrics", &symbol, metrics);
        let technicals = secondary("candles", &symbol, candles)
            .and_then(|bars| TechnicalSnapshot::from_bars(bars.data()));

        // Provider market caps are in millions.
        let market_cap = metrics
            .as_ref()
            .and_then(|m| m.market_cap)
            .or_else(|| profile.as_ref().map(|p| p.market_capitalization))
            .map(|m| m * 1e6);

        Ok(SymbolSummary {
            display: QuoteDisplay::new(&quote, market_cap),
            quote,
            profile,
            metrics,
            technicals,
        })
    }

    /// Primary candle source, then the fallback. Bars from the fallback are
    /// marked degraded; if both fail the primary's error is returned.
    pub async fn candles(
        &self,
        request: &CandleRequest,
    ) -> Result<Sourced<Vec<PriceBar>>, ProviderError> {
        let primary = &self.providers.candles;
        let primary_err = match primary.candles(request).await {
            Ok(bars) if !bars.is_empty() => return Ok(Sourced::live(bars)),
            Ok(_) => ProviderError::NoData(format!("{}: no candles", request.symbol)),
            Err(e) => e,
        };

        let Some(fallback) = &self.providers.fallback_candles else {
            return Err(primary_err);
        };
        warn!(
            "{} candles for {} failed ({}), trying {}",
            primary.name(),
            request.symbol,
            primary_err,
            fallback.name()
        );

        match fallback.candles(request).await {
            Ok(bars) if !bars.is_empty() => Ok(Sourced::degraded(
                bars,
                format!("{} unavailable: {}", primary.name(), primary_err),
            )),
            Ok(_) => Err(primary_err),
            Err(e) => {
                warn!("{} candles for {} failed: {}", fallback.name(), request.symbol, e);
                Err(primary_err)
            }
        }
    }

    pub async fn indicators(
        &self,
        symbol: &str,
        resolution: Option<&str>,
    ) -> Result<Sourced<IndicatorReport>, ProviderError> {
        let symbol = normalize_symbol(symbol);
        let mut request = Self::daily_request(&symbol);
        if let Some(r) = resolution {
            request.resolution = r.to_string();
        }

        let bars = self.candles(&request).await?;
        Ok(bars.map(|bars| IndicatorReport {
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            closes: bars.iter().map(|b| b.close).collect(),
            sma20: IndicatorEngine::sma_series(&bars, 20),
            sma50: IndicatorEngine::sma_series(&bars, 50),
            rsi14: IndicatorEngine::rsi_series(&bars, 14),
            snapshot: TechnicalSnapshot::from_bars(&bars),
            symbol,
        }))
    }

    /// Scored market news. Never fails: an empty degraded list is the last
    /// resort.
    pub async fn market_news(&self, category: &str) -> Sourced<Vec<NewsItem>> {
        let primary = &self.providers.news;
        let mut reason = match primary.market_news(category).await {
            Ok(items) if !items.is_empty() => return Sourced::live(score_all(items)),
            Ok(_) => format!("{} returned no articles", primary.name()),
            Err(e) => format!("{} unavailable: {}", primary.name(), e),
        };
        warn!("Market news ({}): {}", category, reason);

        if let Some(fallback) = &self.providers.fallback_news {
            match fallback.market_news(category).await {
                Ok(items) if !items.is_empty() => {
                    info!("Serving {} articles from {}", items.len(), fallback.name());
                    return Sourced::degraded(score_all(items), reason);
                }
                Ok(_) => reason = format!("{reason}; {} returned no articles", fallback.name()),
                Err(e) => reason = format!("{reason}; {} unavailable: {}", fallback.name(), e),
            }
        }

        Sourced::degraded(Vec::new(), reason)
    }

    /// Company news from the past week. An empty week is live data.
    pub async fn company_news(&self, symbol: &str) -> Sourced<Vec<NewsItem>> {
        let symbol = normalize_symbol(symbol);
        let to = today();
        let from = to - Duration::days(COMPANY_NEWS_DAYS);

        match self.providers.news.company_news(&symbol, from, to).await {
            Ok(items) => Sourced::live(score_all(items)),
            Err(e) => {
                warn!("Company news for {} unavailable: {}", symbol, e);
                Sourced::degraded(Vec::new(), e.to_string())
            }
        }
    }

    pub async fn search(&self, query: &str) -> SearchResults {
        let (stocks, cryptos) = tokio::join!(
            self.providers.stocks.search(query),
            self.providers.crypto.search(query),
        );

        SearchResults {
            stocks: secondary("stock search", query, stocks).unwrap_or_default(),
            cryptos: secondary("crypto search", query, cryptos).unwrap_or_default(),
        }
    }

    /// Quotes for the configured symbol list; failed symbols are skipped.
    pub async fn top_stocks(&self) -> Vec<QuoteSnapshot> {
        let quotes = join_all(
            self.top_stocks
                .iter()
                .map(|symbol| self.providers.stocks.quote(symbol)),
        )
        .await;

        self.top_stocks
            .iter()
            .zip(quotes)
            .filter_map(|(symbol, quote)| secondary("quote", symbol, quote))
            .collect()
    }

    pub async fn top_cryptos(&self) -> Result<Vec<CryptoAsset>, ProviderError> {
        self.providers.crypto.top_assets(TOP_CRYPTO_LIMIT).await
    }

    pub async fn crypto_asset(&self, id: &str) -> Result<CryptoAsset, ProviderError> {
        self.providers.crypto.asset(&id.trim().to_lowercase()).await
    }

    pub async fn crypto_ohlc(&self, id: &str, days: u32) -> Result<Vec<PriceBar>, ProviderError> {
        self.providers
            .crypto
            .ohlc(&id.trim().to_lowercase(), days)
            .await
    }

    /// Candles and company news are fetched concurrently; either may come
    /// back empty without failing the analysis.
    pub async fn analyze(
        &self,
        symbol: &str,
        current_price: f64,
    ) -> Result<StockAnalysis, ServiceError> {
        let narrative = self
            .providers
            .narrative
            .as_ref()
            .ok_or(NarrativeError::Unconfigured)?;
        let symbol = normalize_symbol(symbol);
        let request = Self::daily_request(&symbol);

        let (candles, news) = tokio::join!(self.candles(&request), self.company_news(&symbol));
        let bars = secondary("candles", &symbol, candles)
            .map(Sourced::into_data)
            .unwrap_or_default();
        let news = news.into_data();
        let technicals = TechnicalSnapshot::from_bars(&bars);

        let input = AnalysisInput {
            symbol: &symbol,
            current_price,
            bars: &bars,
            news: &news,
            technicals: technicals.as_ref(),
        };
        Ok(narrative.analyze(&input).await?)
    }

    pub async fn strategy(
        &self,
        symbol: &str,
        goal: &str,
        risk_tolerance: &str,
    ) -> Result<String, ServiceError> {
        let narrative = self
            .providers
            .narrative
            .as_ref()
            .ok_or(NarrativeError::Unconfigured)?;
        Ok(narrative
            .strategy(&normalize_symbol(symbol), goal, risk_tolerance)
            .await?)
    }

    pub async fn explain(
        &self,
        indicator: &str,
        value: f64,
        context: &str,
    ) -> Result<String, ServiceError> {
        let narrative = self
            .providers
            .narrative
            .as_ref()
            .ok_or(NarrativeError::Unconfigured)?;
        Ok(narrative.explain(indicator, value, context).await?)
    }

    /// Current prices for a set of symbols, fetched concurrently. Symbols
    /// without a quote are absent from the map.
    async fn current_prices<'a>(
        &self,
        symbols: impl Iterator<Item = &'a str>,
    ) -> HashMap<String, f64> {
        let unique: BTreeSet<&str> = symbols.collect();
        let quotes = join_all(unique.iter().map(|s| self.providers.stocks.quote(s))).await;

        unique
            .into_iter()
            .zip(quotes)
            .filter_map(|(symbol, quote)| {
                secondary("quote", symbol, quote).map(|q| (symbol.to_string(), q.price))
            })
            .collect()
    }

    pub async fn value_portfolio(&self, holdings: Vec<Holding>) -> PortfolioSummary {
        let prices = self
            .current_prices(holdings.iter().map(|h| h.symbol.as_str()))
            .await;

        let positions: Vec<Position> = holdings
            .into_iter()
            .map(|holding| {
                let current_price = prices.get(&holding.symbol).copied();
                let cost_basis = holding.quantity * holding.purchase_price;
                let market_value = current_price.map(|p| p * holding.quantity);
                let gain = market_value.map(|v| v - cost_basis);
                Position {
                    current_price,
                    cost_basis,
                    market_value,
                    gain,
                    gain_percent: gain.map(|g| percent_of(g, cost_basis)),
                    holding,
                }
            })
            .collect();

        let priced = positions.iter().filter(|p| p.market_value.is_some());
        let total_cost: f64 = priced.clone().map(|p| p.cost_basis).sum();
        let total_value: f64 = priced.filter_map(|p| p.market_value).sum();
        let total_gain = total_value - total_cost;

        PortfolioSummary {
            unpriced: positions.iter().filter(|p| p.market_value.is_none()).count(),
            positions,
            total_cost,
            total_value,
            total_gain,
            total_gain_percent: percent_of(total_gain, total_cost),
        }
    }

    /// Active alerts whose condition holds at the current price.
    pub async fn evaluate_alerts(&self, alerts: Vec<PriceAlert>) -> Vec<TriggeredAlert> {
        let prices = self
            .current_prices(alerts.iter().map(|a| a.symbol.as_str()))
            .await;

        alerts
            .into_iter()
            .filter(|a| a.is_active)
            .filter_map(|alert| {
                let current_price = *prices.get(&alert.symbol)?;
                alert_triggered(&alert, current_price).then_some(TriggeredAlert {
                    alert,
                    current_price,
                })
            })
            .collect()
    }
}
