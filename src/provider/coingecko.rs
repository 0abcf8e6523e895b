use super::{fetch_json, CryptoDataProvider};
use crate::model::{CryptoAsset, CryptoMatch, PriceBar, ProviderError};
use crate::normalizer::normalize_ohlc;
use reqwest::Client;
use serde::Deserialize;

const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
struct UsdValue {
    usd: Option<f64>,
}

impl UsdValue {
    fn usd(&self) -> f64 {
        self.usd.unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
struct CoinPayload {
    id: String,
    symbol: String,
    name: String,
    market_cap_rank: Option<u32>,
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    #[serde(default)]
    current_price: UsdValue,
    #[serde(default)]
    price_change_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_1h_in_currency: UsdValue,
    #[serde(default)]
    price_change_percentage_7d: Option<f64>,
    #[serde(default)]
    price_change_percentage_30d: Option<f64>,
    #[serde(default)]
    total_volume: UsdValue,
    #[serde(default)]
    market_cap: UsdValue,
    #[serde(default)]
    high_24h: UsdValue,
    #[serde(default)]
    low_24h: UsdValue,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
}

/// Row of `/coins/markets`. Flat, unlike the per-coin payload.
#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    symbol: String,
    name: String,
    current_price: Option<f64>,
    price_change_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_1h_in_currency: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
    total_volume: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    circulating_supply: Option<f64>,
    total_supply: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    coins: Vec<CryptoMatch>,
}

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}

fn asset_from_coin(coin: CoinPayload) -> Result<CryptoAsset, ProviderError> {
    let md = coin
        .market_data
        .ok_or_else(|| ProviderError::NoData(format!("{}: no market data", coin.id)))?;
    let price = md.current_price.usd();
    if price <= 0.0 {
        return Err(ProviderError::NoData(format!("{}: no usd price", coin.id)));
    }

    Ok(CryptoAsset {
        id: coin.id,
        symbol: coin.symbol.to_uppercase(),
        name: coin.name,
        price,
        change_24h: md.price_change_24h.unwrap_or(0.0),
        change_percent_24h: md.price_change_percentage_24h.unwrap_or(0.0),
        volume_24h: md.total_volume.usd(),
        market_cap: md.market_cap.usd(),
        high_24h: md.high_24h.usd(),
        low_24h: md.low_24h.usd(),
        circulating_supply: md.circulating_supply.unwrap_or(0.0),
        total_supply: md.total_supply,
        market_cap_rank: coin.market_cap_rank,
        change_percent_1h: md.price_change_percentage_1h_in_currency.usd,
        change_percent_7d: md.price_change_percentage_7d,
        change_percent_30d: md.price_change_percentage_30d,
    })
}

fn asset_from_row(row: MarketRow) -> CryptoAsset {
    CryptoAsset {
        id: row.id,
        symbol: row.symbol.to_uppercase(),
        name: row.name,
        price: row.current_price.unwrap_or(0.0),
        change_24h: row.price_change_24h.unwrap_or(0.0),
        change_percent_24h: row.price_change_percentage_24h.unwrap_or(0.0),
        volume_24h: row.total_volume.unwrap_or(0.0),
        market_cap: row.market_cap.unwrap_or(0.0),
        high_24h: row.high_24h.unwrap_or(0.0),
        low_24h: row.low_24h.unwrap_or(0.0),
        circulating_supply: row.circulating_supply.unwrap_or(0.0),
        total_supply: row.total_supply,
        market_cap_rank: row.market_cap_rank,
        change_percent_1h: row.price_change_percentage_1h_in_currency,
        change_percent_7d: row.price_change_percentage_7d_in_currency,
        change_percent_30d: row.price_change_percentage_30d_in_currency,
    }
}

#[async_trait::async_trait]
impl CryptoDataProvider for CoinGeckoClient {
    async fn asset(&self, id: &str) -> Result<CryptoAsset, ProviderError> {
        let coin: CoinPayload = fetch_json(
            &self.client,
            &self.url(&format!("/coins/{id}")),
            &[
                ("localization", "false".into()),
                ("tickers", "false".into()),
                ("market_data", "true".into()),
                ("community_data", "false".into()),
                ("developer_data", "false".into()),
            ],
        )
        .await?;
        asset_from_coin(coin)
    }

    async fn ohlc(&self, id: &str, days: u32) -> Result<Vec<PriceBar>, ProviderError> {
        let rows: Vec<Vec<f64>> = fetch_json(
            &self.client,
            &self.url(&format!("/coins/{id}/ohlc")),
            &[("vs_currency", "usd".into()), ("days", days.to_string())],
        )
        .await?;
        if rows.is_empty() {
            return Err(ProviderError::NoData(format!("{id}: no ohlc rows")));
        }
        normalize_ohlc(&rows)
    }

    async fn top_assets(&self, limit: usize) -> Result<Vec<CryptoAsset>, ProviderError> {
        let rows: Vec<MarketRow> = fetch_json(
            &self.client,
            &self.url("/coins/markets"),
            &[
                ("vs_currency", "usd".into()),
                ("order", "market_cap_desc".into()),
                ("per_page", limit.to_string()),
                ("page", "1".into()),
                ("sparkline", "false".into()),
                ("price_change_percentage", "1h,7d,30d".into()),
            ],
        )
        .await?;
        Ok(rows.into_iter().map(asset_from_row).collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<CryptoMatch>, ProviderError> {
        let payload: SearchPayload =
            fetch_json(&self.client, &self.url("/search"), &[("query", query.to_string())]).await?;
        Ok(payload.coins.into_iter().take(SEARCH_LIMIT).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_payload_maps_usd_fields() {
        let coin: CoinPayload = serde_json::from_str(
            r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin","market_cap_rank":1,
                "market_data":{"current_price":{"usd":64250.5,"eur":59000},
                "price_change_24h":-120.4,"price_change_percentage_24h":-0.19,
                "price_change_percentage_1h_in_currency":{"usd":0.12},
                "price_change_percentage_7d":3.4,
                "total_volume":{"usd":2.1e10},"market_cap":{"usd":1.26e12},
                "high_24h":{"usd":65000},"low_24h":{"usd":63800},
                "circulating_supply":19700000,"total_supply":21000000}}"#,
        )
        .unwrap();
        let asset = asset_from_coin(coin).unwrap();
        assert_eq!(asset.symbol, "BTC");
        assert_eq!(asset.price, 64250.5);
        assert_eq!(asset.market_cap_rank, Some(1));
        assert_eq!(asset.change_percent_1h, Some(0.12));
        assert_eq!(asset.change_percent_30d, None);
        assert_eq!(asset.total_supply, Some(21_000_000.0));
    }

    #[test]
    fn coin_without_market_data_is_no_data() {
        let coin: CoinPayload =
            serde_json::from_str(r#"{"id":"x","symbol":"x","name":"X"}"#).unwrap();
        assert!(asset_from_coin(coin).unwrap_err().is_not_found());
    }

    #[test]
    fn coin_without_usd_price_is_no_data() {
        let coin: CoinPayload = serde_json::from_str(
            r#"{"id":"ghost","symbol":"gst","name":"Ghost",
                "market_data":{"current_price":{"eur":1.0},"market_cap":{"usd":0}}}"#,
        )
        .unwrap();
        assert!(asset_from_coin(coin).unwrap_err().is_not_found());
    }

    #[test]
    fn market_rows_tolerate_nulls() {
        let rows: Vec<MarketRow> = serde_json::from_str(
            r#"[{"id":"ethereum","symbol":"eth","name":"Ethereum","current_price":3100.0,
                "market_cap":3.7e11,"market_cap_rank":2,"total_supply":null,"high_24h":null}]"#,
        )
        .unwrap();
        let asset = asset_from_row(rows.into_iter().next().unwrap());
        assert_eq!(asset.symbol, "ETH");
        assert_eq!(asset.high_24h, 0.0);
        assert_eq!(asset.total_supply, None);
    }
}
