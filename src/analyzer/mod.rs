// Analyzer module: derived market analytics over price bars and news text.

pub mod indicators;
pub mod sentiment;

pub use indicators::{IndicatorEngine, IndicatorSeries, TechnicalSnapshot};
pub use sentiment::SentimentScorer;
