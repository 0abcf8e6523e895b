use crate::model::{NewsItem, RawNews, SentimentLabel};

pub const BULLISH_CUTOFF: f64 = 0.3;
pub const BEARISH_CUTOFF: f64 = -0.3;

const KEYWORD_WEIGHT: f64 = 0.2;
const MAX_MAGNITUDE: f64 = 0.8;

const BULLISH_KEYWORDS: &[&str] = &[
    "surge", "surges", "soar", "soars", "rally", "rallies", "gain", "gains", "bullish", "breakout",
    "upgrade", "upgraded", "beat", "beats", "record", "growth", "profit", "adoption", "partnership",
    "outperform", "rise", "rises", "jump", "jumps", "boost", "strong",
];

const BEARISH_KEYWORDS: &[&str] = &[
    "plunge", "plunges", "crash", "crashes", "drop", "drops", "fall", "falls", "bearish", "selloff",
    "downgrade", "downgraded", "miss", "misses", "loss", "losses", "lawsuit", "hack", "fraud",
    "decline", "declines", "weak", "slump", "ban", "investigation", "warning",
];

/// Category groups in priority order; the first group with any hit wins.
const CATEGORY_GROUPS: &[(&str, &[&str])] = &[
    (
        "regulatory",
        &["regulation", "regulatory", "regulator", "regulators", "sec", "lawsuit", "ban", "compliance", "guidelines", "legal"],
    ),
    (
        "technical",
        &["technical", "chart", "pattern", "resistance", "support", "breakout", "rsi", "moving", "indicator"],
    ),
    (
        "adoption",
        &["adoption", "adopt", "adopts", "institutional", "payment", "payments", "partnership", "accept", "accepts"],
    ),
    (
        "development",
        &["upgrade", "network", "developers", "developer", "launch", "launches", "release", "protocol", "mainnet"],
    ),
];

pub const DEFAULT_CATEGORY: &str = "analysis";

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentResult {
    pub score: f64,
    pub label: SentimentLabel,
    pub category: &'static str,
}

/// Crude bag-of-words scorer over a headline and its summary.
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn analyze(headline: &str, summary: &str) -> SentimentResult {
        let text = format!("{} {}", headline, summary).to_lowercase();
        let tokens: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let score = Self::score_tokens(&tokens);
        SentimentResult {
            score,
            label: Self::label(score),
            category: Self::category_tokens(&tokens),
        }
    }

    #[cfg(test)]
    fn score(headline: &str, summary: &str) -> f64 {
        Self::analyze(headline, summary).score
    }

    pub fn label(score: f64) -> SentimentLabel {
        if score > BULLISH_CUTOFF {
            SentimentLabel::Bullish
        } else if score < BEARISH_CUTOFF {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Neutral
        }
    }

    fn score_tokens(tokens: &[&str]) -> f64 {
        let count = |set: &[&str]| tokens.iter().filter(|t| set.contains(t)).count();
        let bullish = count(BULLISH_KEYWORDS);
        let bearish = count(BEARISH_KEYWORDS);

        if bullish > bearish {
            (KEYWORD_WEIGHT * bullish as f64).min(MAX_MAGNITUDE)
        } else if bearish > bullish {
            (-KEYWORD_WEIGHT * bearish as f64).max(-MAX_MAGNITUDE)
        } else {
            0.0
        }
    }

    fn category_tokens(tokens: &[&str]) -> &'static str {
        CATEGORY_GROUPS
            .iter()
            .find(|(_, words)| tokens.iter().any(|t| words.contains(t)))
            .map(|(name, _)| *name)
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Scores a provider article. A provider-supplied category is kept;
    /// otherwise the classifier picks one.
    pub fn score_news(raw: RawNews) -> NewsItem {
        let result = Self::analyze(&raw.headline, &raw.summary);
        let category = raw
            .category
            .filter(|c| !c.is_empty() && c != "general")
            .unwrap_or_else(|| result.category.to_string());

        NewsItem {
            id: raw.id,
            headline: raw.headline,
            summary: raw.summary,
            url: raw.url,
            source: raw.source,
            published_at: raw.published_at,
            category,
            sentiment: result.score,
            sentiment_label: result.label,
            image: raw.image,
            related: raw.related,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn two_bullish_hits_cross_the_cutoff() {
        let r = SentimentScorer::analyze("Shares surge to record", "");
        assert!((r.score - 0.4).abs() < 1e-12);
        assert_eq!(r.label, SentimentLabel::Bullish);
    }

    #[test]
    fn single_hit_stays_neutral() {
        let r = SentimentScorer::analyze("Stock drops after earnings", "");
        assert!((r.score + 0.2).abs() < 1e-12);
        assert_eq!(r.label, SentimentLabel::Neutral);
    }

    #[test]
    fn magnitude_is_capped() {
        let text = "crash plunge selloff slump decline fraud";
        let r = SentimentScorer::analyze(text, text);
        assert_eq!(r.score, -0.8);
        assert_eq!(r.label, SentimentLabel::Bearish);
    }

    #[test]
    fn balanced_counts_score_zero() {
        assert_eq!(SentimentScorer::score("Gains erased by losses", ""), 0.0);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "rally" must not be found inside "morally"
        assert_eq!(SentimentScorer::score("A morally complex story", ""), 0.0);
    }

    #[test]
    fn category_priority_prefers_regulatory() {
        let r = SentimentScorer::analyze(
            "Regulatory update: new guidelines",
            "Chart pattern and network upgrade after institutional adoption",
        );
        assert_eq!(r.category, "regulatory");

        let r = SentimentScorer::analyze("Network upgrade after adoption", "");
        assert_eq!(r.category, "adoption");

        let r = SentimentScorer::analyze("Quarterly outlook", "");
        assert_eq!(r.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn scored_news_keeps_specific_provider_category() {
        let raw = RawNews {
            id: "1".into(),
            headline: "Bitcoin rally continues with strong gains".into(),
            summary: String::new(),
            url: "https://example.com".into(),
            source: "Wire".into(),
            published_at: Utc::now(),
            category: Some("general".into()),
            image: None,
            related: None,
        };
        let item = SentimentScorer::score_news(raw.clone());
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert_eq!(item.sentiment_label, SentimentLabel::Bullish);

        let item = SentimentScorer::score_news(RawNews {
            category: Some("crypto".into()),
            ..raw
        });
        assert_eq!(item.category, "crypto");
    }

    proptest! {
        #[test]
        fn score_is_bounded(headline in ".{0,200}", summary in ".{0,400}") {
            let r = SentimentScorer::analyze(&headline, &summary);
            prop_assert!((-1.0..=1.0).contains(&r.score));
            prop_assert_eq!(r.label, SentimentScorer::label(r.score));
        }
    }
}
