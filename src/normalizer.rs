// Adapts provider payloads into PriceBar sequences and quote snapshots.
use crate::model::{PriceBar, ProviderError, QuoteSnapshot};
use serde::Deserialize;

/// Finnhub `/quote` body. A zero current price means the symbol is unknown.
#[derive(Debug, Default, Deserialize)]
pub struct QuotePayload {
    #[serde(default)]
    pub c: f64,
    pub d: Option<f64>,
    pub dp: Option<f64>,
    #[serde(default)]
    pub h: f64,
    #[serde(default)]
    pub l: f64,
    #[serde(default)]
    pub o: f64,
    #[serde(default)]
    pub pc: f64,
    #[serde(default)]
    pub t: i64,
    pub error: Option<String>,
}

/// Finnhub `/stock/candle` body: parallel arrays plus a status flag.
#[derive(Debug, Default, Deserialize)]
pub struct CandlesPayload {
    pub s: String,
    #[serde(default)]
    pub t: Vec<i64>,
    #[serde(default)]
    pub o: Vec<f64>,
    #[serde(default)]
    pub h: Vec<f64>,
    #[serde(default)]
    pub l: Vec<f64>,
    #[serde(default)]
    pub c: Vec<f64>,
    pub v: Option<Vec<f64>>,
}

/// Yahoo `/v8/finance/chart` body. Individual values may be null.
#[derive(Debug, Deserialize)]
pub struct ChartPayload {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

pub fn normalize_quote(symbol: &str, payload: QuotePayload) -> Result<QuoteSnapshot, ProviderError> {
    if let Some(err) = payload.error {
        return Err(ProviderError::NoData(format!("{symbol}: {err}")));
    }
    if payload.c == 0.0 {
        return Err(ProviderError::NoData(format!("{symbol}: quote not found")));
    }

    Ok(QuoteSnapshot {
        symbol: symbol.to_string(),
        price: payload.c,
        change: payload.d.unwrap_or(0.0),
        change_percent: payload.dp.unwrap_or(0.0),
        high: payload.h,
        low: payload.l,
        open: payload.o,
        previous_close: payload.pc,
        timestamp: seconds_to_millis(payload.t)?,
    })
}

fn seconds_to_millis(seconds: i64) -> Result<i64, ProviderError> {
    seconds
        .checked_mul(1000)
        .ok_or_else(|| ProviderError::Malformed(format!("timestamp {seconds} out of range")))
}

pub fn normalize_candles(payload: CandlesPayload) -> Result<Vec<PriceBar>, ProviderError> {
    if payload.s != "ok" {
        return Err(ProviderError::NoData(format!("candle status '{}'", payload.s)));
    }

    let n = payload.t.len();
    if [payload.o.len(), payload.h.len(), payload.l.len(), payload.c.len()]
        .iter()
        .any(|&len| len != n)
    {
        return Err(ProviderError::Malformed(
            "candle arrays have mismatched lengths".into(),
        ));
    }

    let volumes = payload.v.unwrap_or_default();
    let bars = (0..n)
        .map(|i| {
            Ok(PriceBar {
                timestamp: seconds_to_millis(payload.t[i])?,
                open: payload.o[i],
                high: payload.h[i],
                low: payload.l[i],
                close: payload.c[i],
                volume: volumes.get(i).copied().unwrap_or(0.0),
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    Ok(sort_bars(bars))
}

/// CoinGecko `/ohlc` rows: `[timestamp_ms, open, high, low, close]`, no volume.
pub fn normalize_ohlc(rows: &[Vec<f64>]) -> Result<Vec<PriceBar>, ProviderError> {
    let mut bars = Vec::with_capacity(rows.len());
    for row in rows {
        let [ts, open, high, low, close] = row.as_slice() else {
            return Err(ProviderError::Malformed(format!(
                "ohlc row has {} values, expected 5",
                row.len()
            )));
        };
        bars.push(PriceBar {
            timestamp: *ts as i64,
            open: *open,
            high: *high,
            low: *low,
            close: *close,
            volume: 0.0,
        });
    }
    Ok(sort_bars(bars))
}

pub fn normalize_chart(payload: ChartPayload) -> Result<Vec<PriceBar>, ProviderError> {
    let result = payload
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::NoData("chart has no result".into()))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let value = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten().unwrap_or(0.0);

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let close = value(&quote.close, i);
        if close <= 0.0 {
            continue;
        }
        bars.push(PriceBar {
            timestamp: seconds_to_millis(*ts)?,
            open: value(&quote.open, i),
            high: value(&quote.high, i),
            low: value(&quote.low, i),
            close,
            volume: value(&quote.volume, i),
        });
    }

    Ok(sort_bars(bars))
}

/// Stable ascending sort; duplicate timestamps keep their input order.
fn sort_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    bars.sort_by_key(|b| b.timestamp);
    bars
}
