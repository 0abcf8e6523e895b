use crate::model::PriceBar;
use serde::Serialize;

/// Values aligned by index with the source bars; `None` until enough
/// lookback exists.
pub type IndicatorSeries = Vec<Option<f64>>;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

pub struct IndicatorEngine;

impl IndicatorEngine {
    /// Simple moving average in compact form: element `i` is the mean of
    /// `closes[i..i + period]`, so the output has `len - period + 1` values.
    pub fn sma(closes: &[f64], period: usize) -> Vec<f64> {
        if period == 0 || closes.len() < period {
            return Vec::new();
        }
        closes
            .windows(period)
            .map(|window| window.iter().sum::<f64>() / period as f64)
            .collect()
    }

    /// RSI over rolling windows of `period` deltas, compact form with
    /// `len - period` values.
    ///
    /// A window without losses reads 100, a window without any movement
    /// reads 50.
    pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
        if period == 0 || closes.len() < period + 1 {
            return Vec::new();
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = closes
            .windows(2)
            .map(|w| {
                let delta = w[1] - w[0];
                if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) }
            })
            .unzip();

        gains
            .windows(period)
            .zip(losses.windows(period))
            .map(|(g, l)| {
                let avg_gain = g.iter().sum::<f64>() / period as f64;
                let avg_loss = l.iter().sum::<f64>() / period as f64;
                Self::rsi_value(avg_gain, avg_loss)
            })
            .collect()
    }

    fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            return if avg_gain == 0.0 { 50.0 } else { 100.0 };
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }

    pub fn sma_series(bars: &[PriceBar], period: usize) -> IndicatorSeries {
        let closes = closes(bars);
        Self::align(Self::sma(&closes, period), period.saturating_sub(1), bars.len())
    }

    pub fn rsi_series(bars: &[PriceBar], period: usize) -> IndicatorSeries {
        let closes = closes(bars);
        Self::align(Self::rsi(&closes, period), period, bars.len())
    }

    /// Pads a compact indicator with `offset` leading `None`s to `len` slots.
    pub fn align(compact: Vec<f64>, offset: usize, len: usize) -> IndicatorSeries {
        if compact.is_empty() {
            return vec![None; len];
        }
        let mut series: IndicatorSeries = vec![None; offset.min(len)];
        series.extend(compact.into_iter().map(Some));
        series.resize(len, None);
        series
    }
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

/// Latest indicator readings for a series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSnapshot {
    pub last_close: f64,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi14: Option<f64>,
    pub signal: Signal,
}

impl TechnicalSnapshot {
    pub fn from_bars(bars: &[PriceBar]) -> Option<Self> {
        let last_close = bars.last()?.close;
        let closes = closes(bars);
        let latest_sma = |p| IndicatorEngine::sma(&closes, p).last().copied();

        let sma20 = latest_sma(20);
        let sma50 = latest_sma(50);
        let rsi14 = IndicatorEngine::rsi(&closes, 14).last().copied();

        Some(Self {
            last_close,
            sma20,
            sma50,
            sma200: latest_sma(200),
            rsi14,
            signal: Self::signal(last_close, sma20, sma50, rsi14),
        })
    }

    fn signal(price: f64, sma20: Option<f64>, sma50: Option<f64>, rsi: Option<f64>) -> Signal {
        match rsi {
            Some(r) if r < RSI_OVERSOLD => return Signal::Buy,
            Some(r) if r > RSI_OVERBOUGHT => return Signal::Sell,
            _ => {}
        }
        match (sma20, sma50) {
            (Some(fast), Some(slow)) if price > fast && fast > slow => Signal::Buy,
            (Some(fast), Some(slow)) if price < fast && fast < slow => Signal::Sell,
            _ => Signal::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                timestamp: i as i64 * 86_400_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn sma_matches_window_means() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(IndicatorEngine::sma(&closes, 3), vec![2.0, 3.0, 4.0]);
        assert_eq!(IndicatorEngine::sma(&closes, 1), closes.to_vec());
    }

    #[test]
    fn short_series_is_entirely_undefined() {
        let closes = [1.0, 2.0];
        assert!(IndicatorEngine::sma(&closes, 3).is_empty());
        assert!(IndicatorEngine::rsi(&closes, 2).is_empty());
        assert!(IndicatorEngine::sma(&closes, 0).is_empty());

        let series = IndicatorEngine::sma_series(&bars_from(&closes), 3);
        assert_eq!(series, vec![None, None]);
    }

    #[test]
    fn thirty_daily_closes_first_sma20_at_index_19() {
        let closes: Vec<f64> = (100..130).map(f64::from).collect();
        let series = IndicatorEngine::sma_series(&bars_from(&closes), 20);

        assert_eq!(series.len(), 30);
        assert!(series[..19].iter().all(Option::is_none));
        let expected = closes[..20].iter().sum::<f64>() / 20.0;
        assert_eq!(series[19], Some(expected));
        assert_eq!(series[19], Some(109.5));
    }

    #[test]
    fn rsi_without_losses_clamps_to_100() {
        let closes: Vec<f64> = (0..20).map(f64::from).collect();
        let rsi = IndicatorEngine::rsi(&closes, 14);
        assert_eq!(rsi.len(), 20 - 14);
        assert!(rsi.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn flat_rsi_is_fifty() {
        let rsi = IndicatorEngine::rsi(&[5.0; 10], 3);
        assert!(rsi.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn rsi_known_value() {
        // deltas: +1, -1 -> avg gain 0.5, avg loss 0.5
        let rsi = IndicatorEngine::rsi(&[1.0, 2.0, 1.0], 2);
        assert_eq!(rsi, vec![50.0]);
    }

    #[test]
    fn rsi_series_starts_at_period() {
        let closes: Vec<f64> = (0..16).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let series = IndicatorEngine::rsi_series(&bars_from(&closes), 14);
        assert_eq!(series.len(), 16);
        assert!(series[..14].iter().all(Option::is_none));
        assert!(series[14].is_some());
        assert!(series[15].is_some());
    }

    #[test]
    fn snapshot_flags_overbought_uptrend() {
        let closes: Vec<f64> = (1..=60).map(f64::from).collect();
        let snap = TechnicalSnapshot::from_bars(&bars_from(&closes)).unwrap();
        assert_eq!(snap.rsi14, Some(100.0));
        assert_eq!(snap.signal, Signal::Sell);
        assert!(snap.sma200.is_none());
        assert_eq!(snap.sma20, Some(50.5));
    }

    #[test]
    fn snapshot_of_empty_series_is_none() {
        assert!(TechnicalSnapshot::from_bars(&[]).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn sma_length_and_values(closes in prop::collection::vec(0.01f64..10_000.0, 1..120), period in 1usize..40) {
            let out = IndicatorEngine::sma(&closes, period);
            if closes.len() < period {
                prop_assert!(out.is_empty());
            } else {
                prop_assert_eq!(out.len(), closes.len() - period + 1);
                for (i, v) in out.iter().enumerate() {
                    let mean = closes[i..i + period].iter().sum::<f64>() / period as f64;
                    prop_assert!((v - mean).abs() <= 1e-9 * mean.abs().max(1.0));
                }
            }
        }

        #[test]
        fn rsi_is_bounded(closes in prop::collection::vec(0.01f64..10_000.0, 2..120), period in 1usize..30) {
            let out = IndicatorEngine::rsi(&closes, period);
            prop_assert!(out.iter().all(|v| (0.0..=100.0).contains(v)));
            if closes.len() > period {
                prop_assert_eq!(out.len(), closes.len() - period);
            }
        }
    }
}
