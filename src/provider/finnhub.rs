use super::{send_json, CandleProvider, NewsProvider, StockDataProvider};
use crate::model::{
    CandleRequest, CompanyProfile, PriceBar, ProviderError, QuoteSnapshot, RawNews, StockMetrics,
    SymbolMatch,
};
use crate::normalizer::{normalize_candles, normalize_quote, CandlesPayload, QuotePayload};
use crate::utils::from_unix_seconds;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

const SEARCH_LIMIT: usize = 10;
const MARKET_NEWS_LIMIT: usize = 20;
const COMPANY_NEWS_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePayload {
    name: Option<String>,
    country: Option<String>,
    currency: Option<String>,
    exchange: Option<String>,
    ipo: Option<String>,
    #[serde(default)]
    market_capitalization: f64,
    #[serde(default)]
    share_outstanding: f64,
    logo: Option<String>,
    weburl: Option<String>,
    finnhub_industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetricEnvelope {
    #[serde(default)]
    metric: MetricPayload,
}

#[derive(Debug, Default, Deserialize)]
struct MetricPayload {
    #[serde(rename = "peBasicExclExtraTTM")]
    pe: Option<f64>,
    #[serde(rename = "epsBasicExclExtraAnnual")]
    eps: Option<f64>,
    beta: Option<f64>,
    #[serde(rename = "52WeekHigh")]
    week52_high: Option<f64>,
    #[serde(rename = "52WeekLow")]
    week52_low: Option<f64>,
    #[serde(rename = "marketCapitalization")]
    market_cap: Option<f64>,
    #[serde(rename = "dividendYieldIndicatedAnnual")]
    dividend_yield: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NewsPayload {
    id: Option<i64>,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    datetime: i64,
    category: Option<String>,
    image: Option<String>,
    related: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    result: Vec<SymbolMatch>,
}

pub struct FinnhubClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let request = self
            .client
            .get(&url)
            .query(params)
            .header("X-Finnhub-Token", &self.api_key);
        send_json(request, &url).await
    }

    fn to_raw_news(prefix: &str, index: usize, item: NewsPayload) -> RawNews {
        RawNews {
            id: item
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("{prefix}-{index}")),
            headline: item.headline,
            summary: item.summary,
            url: item.url,
            source: item.source,
            published_at: from_unix_seconds(item.datetime),
            category: item.category,
            image: item.image.filter(|s| !s.is_empty()),
            related: item.related.filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait::async_trait]
impl StockDataProvider for FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot, ProviderError> {
        let payload: QuotePayload = self.request("/quote", &[("symbol", symbol.to_string())]).await?;
        normalize_quote(symbol, payload)
    }

    async fn profile(&self, symbol: &str) -> Result<CompanyProfile, ProviderError> {
        let p: ProfilePayload = self
            .request("/stock/profile2", &[("symbol", symbol.to_string())])
            .await?;

        // Unknown symbols come back as an empty object.
        let name = p
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ProviderError::NoData(format!("{symbol}: no profile")))?;

        Ok(CompanyProfile {
            symbol: symbol.to_string(),
            name,
            country: p.country,
            currency: p.currency,
            exchange: p.exchange,
            ipo: p.ipo,
            market_capitalization: p.market_capitalization,
            share_outstanding: p.share_outstanding,
            logo: p.logo,
            weburl: p.weburl,
            industry: p.finnhub_industry,
        })
    }

    async fn metrics(&self, symbol: &str) -> Result<StockMetrics, ProviderError> {
        let envelope: MetricEnvelope = self
            .request(
                "/stock/metric",
                &[("symbol", symbol.to_string()), ("metric", "all".to_string())],
            )
            .await?;
        let m = envelope.metric;

        Ok(StockMetrics {
            symbol: symbol.to_string(),
            pe: m.pe,
            eps: m.eps,
            beta: m.beta,
            week52_high: m.week52_high,
            week52_low: m.week52_low,
            market_cap: m.market_cap,
            dividend_yield: m.dividend_yield,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SymbolMatch>, ProviderError> {
        let payload: SearchPayload = self.request("/search", &[("q", query.to_string())]).await?;
        Ok(payload.result.into_iter().take(SEARCH_LIMIT).collect())
    }
}

#[async_trait::async_trait]
impl CandleProvider for FinnhubClient {
    fn name(&self) -> &'static str {
        "finnhub"
    }

    async fn candles(&self, req: &CandleRequest) -> Result<Vec<PriceBar>, ProviderError> {
        let payload: CandlesPayload = self
            .request(
                "/stock/candle",
                &[
                    ("symbol", req.symbol.clone()),
                    ("resolution", req.resolution.clone()),
                    ("from", req.from.to_string()),
                    ("to", req.to.to_string()),
                ],
            )
            .await?;
        normalize_candles(payload)
    }
}

#[async_trait::async_trait]
impl NewsProvider for FinnhubClient {
    fn name(&self) -> &'static str {
        "finnhub"
    }

    async fn market_news(&self, category: &str) -> Result<Vec<RawNews>, ProviderError> {
        let items: Vec<NewsPayload> = self.request("/news", &[("category", category.to_string())]).await?;
        Ok(items
            .into_iter()
            .take(MARKET_NEWS_LIMIT)
            .enumerate()
            .map(|(i, item)| Self::to_raw_news(category, i, item))
            .collect())
    }

    async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawNews>, ProviderError> {
        let items: Vec<NewsPayload> = self
            .request(
                "/company-news",
                &[
                    ("symbol", symbol.to_string()),
                    ("from", from.format("%Y-%m-%d").to_string()),
                    ("to", to.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(items
            .into_iter()
            .take(COMPANY_NEWS_LIMIT)
            .enumerate()
            .map(|(i, item)| Self::to_raw_news(symbol, i, item))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn unreachable_host_does_not_leak_token() {
        let client = FinnhubClient::new(Client::new(), "http://127.0.0.1:1/api/v1", "SECRETKEY123");
        let err = client.quote("AAPL").await.unwrap_err();
        assert!(!err.to_string().contains("SECRETKEY123"));

        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("SECRETKEY123"), "{body}");
        assert!(!body.contains("token="), "{body}");
    }

    #[test]
    fn metric_keys_map_to_fields() {
        let envelope: MetricEnvelope = serde_json::from_str(
            r#"{"metric":{"peBasicExclExtraTTM":29.1,"52WeekHigh":199.6,"beta":1.29,"dividendYieldIndicatedAnnual":null}}"#,
        )
        .unwrap();
        assert_eq!(envelope.metric.pe, Some(29.1));
        assert_eq!(envelope.metric.week52_high, Some(199.6));
        assert_eq!(envelope.metric.dividend_yield, None);
    }

    #[test]
    fn news_without_id_gets_positional_id() {
        let item: NewsPayload = serde_json::from_str(
            r#"{"headline":"h","summary":"s","url":"u","source":"src","datetime":1700000000,"image":""}"#,
        )
        .unwrap();
        let raw = FinnhubClient::to_raw_news("AAPL", 3, item);
        assert_eq!(raw.id, "AAPL-3");
        assert_eq!(raw.image, None);
        assert_eq!(raw.published_at.timestamp(), 1_700_000_000);
    }
}
