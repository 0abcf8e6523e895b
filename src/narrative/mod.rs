// LLM-backed commentary: structured stock analysis plus free-text
// strategy and indicator explanations.

pub mod llm;
pub mod prompt;

pub use llm::LlmClient;

use crate::analyzer::TechnicalSnapshot;
use crate::model::{NarrativeError, NewsItem, PriceBar};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outlook {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTarget {
    pub low: f64,
    pub high: f64,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAnalysis {
    pub symbol: String,
    pub sentiment: Outlook,
    pub confidence: f64,
    pub analysis: String,
    pub key_points: Vec<String>,
    pub price_target: PriceTarget,
    pub timeframe: String,
}

/// Everything the model gets to see for one analysis.
pub struct AnalysisInput<'a> {
    pub symbol: &'a str,
    pub current_price: f64,
    pub bars: &'a [PriceBar],
    pub news: &'a [NewsItem],
    pub technicals: Option<&'a TechnicalSnapshot>,
}

#[async_trait::async_trait]
pub trait NarrativeAnalyzer: Send + Sync {
    async fn analyze(&self, input: &AnalysisInput<'_>) -> Result<StockAnalysis, NarrativeError>;

    async fn strategy(
        &self,
        symbol: &str,
        goal: &str,
        risk_tolerance: &str,
    ) -> Result<String, NarrativeError>;

    async fn explain(
        &self,
        indicator: &str,
        value: f64,
        context: &str,
    ) -> Result<String, NarrativeError>;
}
