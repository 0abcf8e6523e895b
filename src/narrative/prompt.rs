use super::{AnalysisInput, Outlook, PriceTarget, StockAnalysis};
use crate::model::NarrativeError;
use chrono::DateTime;
use serde::Deserialize;
use std::fmt::Write;

const HISTORY_BARS: usize = 30;
const NEWS_ITEMS: usize = 5;

pub fn analysis_prompt(input: &AnalysisInput<'_>) -> String {
    let mut prompt = format!(
        "Analyze the stock {} with the following data:\n\nCurrent Price: ${}\n\nRecent Historical Data (last {} sessions):\n",
        input.symbol, input.current_price, HISTORY_BARS
    );

    let start = input.bars.len().saturating_sub(HISTORY_BARS);
    for bar in &input.bars[start..] {
        let date = DateTime::from_timestamp_millis(bar.timestamp)
            .map(|d| d.format("%a %b %d %Y").to_string())
            .unwrap_or_else(|| bar.timestamp.to_string());
        let _ = writeln!(prompt, "Date: {date}, Close: ${}, Volume: {}", bar.close, bar.volume);
    }

    if let Some(t) = input.technicals {
        prompt.push_str("\nTechnical Indicators:\n");
        let fmt = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".into());
        let _ = writeln!(prompt, "SMA20: {}, SMA50: {}, RSI14: {}", fmt(t.sma20), fmt(t.sma50), fmt(t.rsi14));
    }

    prompt.push_str("\nRecent News:\n");
    for item in input.news.iter().take(NEWS_ITEMS) {
        let _ = writeln!(prompt, "- {} (Sentiment: {:.2})", item.headline, item.sentiment);
    }

    prompt.push_str(
        r#"
Provide a comprehensive analysis including:
1. Overall sentiment (BULLISH/BEARISH/NEUTRAL)
2. Confidence level (0-100)
3. Key technical and fundamental points
4. Price targets (low, high, target)
5. Recommended timeframe for the analysis

Respond with JSON only, using this structure:
{
  "sentiment": "BULLISH|BEARISH|NEUTRAL",
  "confidence": number,
  "analysis": "detailed analysis text",
  "keyPoints": ["point1", "point2", "point3"],
  "priceTarget": { "low": number, "high": number, "target": number },
  "timeframe": "1-3 months"
}
"#,
    );
    prompt
}

pub fn strategy_prompt(symbol: &str, goal: &str, risk_tolerance: &str) -> String {
    format!(
        "Generate a trading strategy for {symbol} based on:\n\
         - User Goal: {goal}\n\
         - Risk Tolerance: {risk_tolerance}\n\n\
         Provide specific entry points, exit strategies, stop losses, and position sizing recommendations.\n\
         Keep it practical and actionable."
    )
}

pub fn explain_prompt(indicator: &str, value: f64, context: &str) -> String {
    format!(
        "Explain the technical indicator \"{indicator}\" with current value {value} in the context of: {context}\n\n\
         Provide:\n\
         1. What this indicator means\n\
         2. How to interpret the current value\n\
         3. What signals it might be giving\n\
         4. How it fits into overall technical analysis\n\n\
         Keep it educational but practical for trading decisions."
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisReply {
    sentiment: Outlook,
    confidence: f64,
    analysis: String,
    #[serde(default)]
    key_points: Vec<String>,
    price_target: PriceTarget,
    timeframe: String,
}

/// Models like to wrap JSON in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_analysis(symbol: &str, text: &str) -> Result<StockAnalysis, NarrativeError> {
    let reply: AnalysisReply = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| NarrativeError::Malformed(e.to_string()))?;

    if !(0.0..=100.0).contains(&reply.confidence) {
        return Err(NarrativeError::Malformed(format!(
            "confidence {} outside 0-100",
            reply.confidence
        )));
    }

    Ok(StockAnalysis {
        symbol: symbol.to_string(),
        sentiment: reply.sentiment,
        confidence: reply.confidence,
        analysis: reply.analysis,
        key_points: reply.key_points,
        price_target: reply.price_target,
        timeframe: reply.timeframe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PriceBar;

    const REPLY: &str = r#"{"sentiment":"BULLISH","confidence":72,"analysis":"Uptrend intact.",
        "keyPoints":["Above SMA20","Earnings beat"],
        "priceTarget":{"low":180,"high":215,"target":200},"timeframe":"1-3 months"}"#;

    #[test]
    fn parses_plain_json_reply() {
        let a = parse_analysis("AAPL", REPLY).unwrap();
        assert_eq!(a.symbol, "AAPL");
        assert_eq!(a.sentiment, Outlook::Bullish);
        assert_eq!(a.key_points.len(), 2);
        assert_eq!(a.price_target.target, 200.0);
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{REPLY}\n```");
        assert!(parse_analysis("AAPL", &fenced).is_ok());
    }

    #[test]
    fn prose_reply_is_malformed() {
        let err = parse_analysis("AAPL", "I think the stock looks good.").unwrap_err();
        assert!(matches!(err, NarrativeError::Malformed(_)));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let reply = REPLY.replace("72", "140");
        assert!(matches!(
            parse_analysis("AAPL", &reply),
            Err(NarrativeError::Malformed(_))
        ));
    }

    #[test]
    fn prompt_uses_last_thirty_bars() {
        let bars: Vec<PriceBar> = (0..40)
            .map(|i| PriceBar {
                timestamp: 1_700_000_000_000 + i * 86_400_000,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 100.0 + i as f64,
                volume: 10.0,
            })
            .collect();
        let input = AnalysisInput {
            symbol: "AAPL",
            current_price: 139.0,
            bars: &bars,
            news: &[],
            technicals: None,
        };
        let prompt = analysis_prompt(&input);
        assert_eq!(prompt.matches("Date: ").count(), 30);
        assert!(prompt.contains("Close: $139"));
        assert!(!prompt.contains("Close: $109,"));
    }
}
