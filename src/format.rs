// Human-readable figures for prices, magnitudes and changes.
use crate::model::{CryptoAsset, QuoteSnapshot};
use serde::Serialize;

const SCALES: &[(f64, &str)] = &[(1e12, "T"), (1e9, "B"), (1e6, "M")];
const THOUSAND: (f64, &str) = (1e3, "K");

/// Decimal places chosen from the magnitude of a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePrecision(pub usize);

impl PricePrecision {
    pub fn for_price(price: f64) -> Self {
        let abs = price.abs();
        if abs >= 1.0 {
            PricePrecision(2)
        } else if abs >= 0.01 {
            PricePrecision(4)
        } else {
            PricePrecision(8)
        }
    }
}

/// "$193.42", "$0.0500", "$0.00012300".
pub fn format_price(price: f64) -> String {
    format_price_with(price, PricePrecision::for_price(price))
}

pub fn format_price_with(price: f64, precision: PricePrecision) -> String {
    with_sign(price, |abs| format!("${}", group_thousands(&format!("{:.*}", precision.0, abs))))
}

/// Market caps: T/B/M suffixes, literal dollars below a million.
pub fn format_market_cap(value: f64) -> String {
    with_sign(value, |abs| format!("${}", compact(abs, false)))
}

/// Volumes and supplies: like market caps but also with a K suffix.
pub fn format_volume(value: f64) -> String {
    with_sign(value, |abs| compact(abs, true))
}

pub fn format_percent(value: f64) -> String {
    let sign = if value > 0.0 { "+" } else { "" };
    format!("{sign}{value:.2}%")
}

/// Signed price change using a reference precision, e.g. "+$1.50".
pub fn format_change(change: f64, precision: PricePrecision) -> String {
    let body = format_price_with(change, precision);
    if change > 0.0 { format!("+{body}") } else { body }
}

fn compact(abs: f64, with_thousands: bool) -> String {
    let thousand = with_thousands.then_some(&THOUSAND);
    // A scale applies when the value still reads >= 1 after rounding to cents.
    let rounds_to_unit = |scale: f64| (abs / scale * 100.0).round() >= 100.0;
    match SCALES.iter().chain(thousand).find(|(scale, _)| rounds_to_unit(*scale)) {
        Some((scale, suffix)) => format!("{:.2}{}", abs / scale, suffix),
        None => group_thousands(&format!("{abs:.2}")),
    }
}

fn with_sign(value: f64, body: impl Fn(f64) -> String) -> String {
    if value < 0.0 {
        format!("-{}", body(value.abs()))
    } else {
        body(value)
    }
}

/// Inserts `,` separators into the integer part of a plain decimal string.
fn group_thousands(plain: &str) -> String {
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(plain.len() + digits.len() / 3);
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

/// Display strings for a quote. Every price figure uses the precision of
/// the current price so adjacent numbers line up.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDisplay {
    pub price: String,
    pub change: String,
    pub change_percent: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub previous_close: String,
    pub market_cap: Option<String>,
}

impl QuoteDisplay {
    pub fn new(quote: &QuoteSnapshot, market_cap: Option<f64>) -> Self {
        let precision = PricePrecision::for_price(quote.price);
        let price = |v| format_price_with(v, precision);

        Self {
            price: price(quote.price),
            change: format_change(quote.change, precision),
            change_percent: format_percent(quote.change_percent),
            open: price(quote.open),
            high: price(quote.high),
            low: price(quote.low),
            previous_close: price(quote.previous_close),
            market_cap: market_cap.filter(|m| *m > 0.0).map(format_market_cap),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoDisplay {
    pub price: String,
    pub change_24h: String,
    pub change_percent_24h: String,
    pub market_cap: String,
    pub volume_24h: String,
    pub circulating_supply: String,
}

impl CryptoDisplay {
    pub fn new(asset: &CryptoAsset) -> Self {
        let precision = PricePrecision::for_price(asset.price);
        Self {
            price: format_price_with(asset.price, precision),
            change_24h: format_change(asset.change_24h, precision),
            change_percent_24h: format_percent(asset.change_percent_24h),
            market_cap: format_market_cap(asset.market_cap),
            volume_24h: format!("${}", format_volume(asset.volume_24h)),
            circulating_supply: format_volume(asset.circulating_supply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_cap_suffixes() {
        assert_eq!(format_market_cap(1_680_000_000_000.0), "$1.68T");
        assert_eq!(format_market_cap(89_500_000_000.0), "$89.50B");
        assert_eq!(format_market_cap(12_340_000.0), "$12.34M");
        assert_eq!(format_market_cap(950_000.0), "$950,000.00");
        assert_eq!(format_market_cap(999_995_000.0), "$1.00B");
        assert_eq!(format_market_cap(999_999.999), "$1.00M");
        assert_eq!(format_volume(999_995.0), "1.00M");
    }

    #[test]
    fn volume_uses_thousands_suffix() {
        assert_eq!(format_volume(950_000.0), "950.00K");
        assert_eq!(format_volume(999.0), "999.00");
        assert_eq!(format_volume(2_500_000_000.0), "2.50B");
    }

    #[test]
    fn price_precision_by_magnitude() {
        assert_eq!(format_price(193.42), "$193.42");
        assert_eq!(format_price(0.05), "$0.0500");
        assert_eq!(format_price(0.000123), "$0.00012300");
        assert_eq!(format_price(64_250.5), "$64,250.50");
        assert_eq!(PricePrecision::for_price(1.0), PricePrecision(2));
        assert_eq!(PricePrecision::for_price(0.01), PricePrecision(4));
    }

    #[test]
    fn negative_values_keep_sign_outside_currency() {
        assert_eq!(format_price(-2.5), "-$2.50");
        assert_eq!(format_market_cap(-2_000_000.0), "-$2.00M");
        assert_eq!(format_percent(-0.5), "-0.50%");
        assert_eq!(format_percent(1.234), "+1.23%");
    }

    #[test]
    fn quote_display_shares_precision() {
        let quote = QuoteSnapshot {
            symbol: "SHIB".into(),
            price: 0.0000251,
            change: 0.0000012,
            change_percent: 5.02,
            high: 0.0000262,
            low: 2.0,
            open: 0.000024,
            previous_close: 0.0000239,
            timestamp: 0,
        };
        let display = QuoteDisplay::new(&quote, Some(14_800_000_000.0));
        assert_eq!(display.price, "$0.00002510");
        assert_eq!(display.high, "$0.00002620");
        // a large low still renders with the current price's precision
        assert_eq!(display.low, "$2.00000000");
        assert_eq!(display.change, "+$0.00000120");
        assert_eq!(display.market_cap.as_deref(), Some("$14.80B"));
    }

    #[test]
    fn crypto_display_uses_volume_scale() {
        let asset = CryptoAsset {
            id: "bitcoin".into(),
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
            price: 64_250.5,
            change_24h: -120.4,
            change_percent_24h: -0.19,
            volume_24h: 21_000_000_000.0,
            market_cap: 1_260_000_000_000.0,
            high_24h: 65_000.0,
            low_24h: 63_800.0,
            circulating_supply: 19_700_000.0,
            total_supply: Some(21_000_000.0),
            market_cap_rank: Some(1),
            change_percent_1h: None,
            change_percent_7d: None,
            change_percent_30d: None,
        };
        let display = CryptoDisplay::new(&asset);
        assert_eq!(display.price, "$64,250.50");
        assert_eq!(display.change_24h, "-$120.40");
        assert_eq!(display.market_cap, "$1.26T");
        assert_eq!(display.volume_24h, "$21.00B");
        assert_eq!(display.circulating_supply, "19.70M");
    }

    #[test]
    fn grouping_handles_short_numbers() {
        assert_eq!(group_thousands("12.00"), "12.00");
        assert_eq!(group_thousands("1234567"), "1,234,567");
    }
}
