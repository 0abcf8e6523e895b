use super::{fetch_json, CandleProvider};
use crate::model::{CandleRequest, PriceBar, ProviderError};
use crate::normalizer::{normalize_chart, ChartPayload};
use reqwest::Client;

/// Keyless chart endpoint used when the primary candle source fails.
pub struct YahooChartClient {
    client: Client,
    base_url: String,
}

impl YahooChartClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Maps a Finnhub-style resolution code onto a chart interval.
pub fn chart_interval(resolution: &str) -> Option<&'static str> {
    Some(match resolution {
        "1" => "1m",
        "5" => "5m",
        "15" => "15m",
        "30" => "30m",
        "60" => "60m",
        "D" => "1d",
        "W" => "1wk",
        "M" => "1mo",
        _ => return None,
    })
}

#[async_trait::async_trait]
impl CandleProvider for YahooChartClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn candles(&self, req: &CandleRequest) -> Result<Vec<PriceBar>, ProviderError> {
        let interval = chart_interval(&req.resolution).ok_or_else(|| {
            ProviderError::NoData(format!("unsupported resolution '{}'", req.resolution))
        })?;
        let url = format!("{}/v8/finance/chart/{}", self.base_url, req.symbol);

        let payload: ChartPayload = fetch_json(
            &self.client,
            &url,
            &[
                ("interval", interval.to_string()),
                ("period1", req.from.to_string()),
                ("period2", req.to.to_string()),
            ],
        )
        .await?;

        let bars = normalize_chart(payload)?;
        if bars.is_empty() {
            return Err(ProviderError::NoData(format!("{}: empty chart", req.symbol)));
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_codes_map_to_intervals() {
        assert_eq!(chart_interval("D"), Some("1d"));
        assert_eq!(chart_interval("W"), Some("1wk"));
        assert_eq!(chart_interval("60"), Some("60m"));
        assert_eq!(chart_interval("2"), None);
    }
}
