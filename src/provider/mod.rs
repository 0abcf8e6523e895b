// Market-data provider clients: each one adapts a third-party HTTP API to
// the traits the service layer depends on.

pub mod coingecko;
pub mod finnhub;
pub mod newsapi;
pub mod traits;
pub mod yahoo;

pub use coingecko::CoinGeckoClient;
pub use finnhub::FinnhubClient;
pub use newsapi::NewsApiClient;
pub use traits::{CandleProvider, CryptoDataProvider, NewsProvider, StockDataProvider};
pub use yahoo::YahooChartClient;

use crate::model::ProviderError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) MarketDash/0.1";

pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// GETs `url` and decodes a JSON body. 404 maps to `NoData`, any other
/// non-success status to `Status`.
async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, ProviderError> {
    send_json(client.get(url).query(query), url).await
}

/// Sends a prepared request. Credentials belong in headers so they never
/// appear in `url` or in the messages built from it.
async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, ProviderError> {
    debug!("GET {}", url);
    let response = request.send().await?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NoData(format!("{url} returned 404")));
    }
    if !status.is_success() {
        warn!("Upstream {} responded [{}]", url, status);
        return Err(ProviderError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(format!("{url}: {e}")))
}
