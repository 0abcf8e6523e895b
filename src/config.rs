use serde::Deserialize;
use std::env;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct FinnhubConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_finnhub_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoConfig {
    #[serde(default = "default_coingecko_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YahooConfig {
    #[serde(default = "default_yahoo_url")]
    pub base_url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsApiConfig {
    pub api_key: String,
    #[serde(default = "default_news_api_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    pub finnhub: FinnhubConfig,
    #[serde(default)]
    pub coingecko: CoinGeckoConfig,
    #[serde(default)]
    pub yahoo: YahooConfig,
    pub news_api: Option<NewsApiConfig>,
    pub llm: Option<LlmConfig>,
    #[serde(default = "default_top_stocks")]
    pub top_stocks: Vec<String>,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: default_coingecko_url(),
        }
    }
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: default_yahoo_url(),
            enabled: true,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_database_path() -> String {
    "marketdash.db".into()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_finnhub_url() -> String {
    "https://finnhub.io/api/v1".into()
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".into()
}

fn default_yahoo_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_news_api_url() -> String {
    "https://newsapi.org/v2".into()
}

fn default_llm_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_llm_model() -> String {
    "llama-3.1-70b-versatile".into()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_stocks() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "JPM"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl AppConfig {
    /// Environment values win over the file. Secrets usually live here.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(key) = var("FINNHUB_API_KEY") {
            self.finnhub.api_key = key;
        }
        if let Some(key) = var("NEWS_API_KEY") {
            match &mut self.news_api {
                Some(news) => news.api_key = key,
                None => {
                    self.news_api = Some(NewsApiConfig {
                        api_key: key,
                        base_url: default_news_api_url(),
                    })
                }
            }
        }
        if let Some(key) = var("GROQ_API_KEY") {
            match &mut self.llm {
                Some(llm) => llm.api_key = key,
                None => {
                    self.llm = Some(LlmConfig {
                        api_key: key,
                        base_url: default_llm_url(),
                        model: default_llm_model(),
                        temperature: default_temperature(),
                    })
                }
            }
        }
        if let Some(bind) = var("MARKETDASH_BIND") {
            self.bind = bind;
        }
        if let Some(port) = var("MARKETDASH_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
    }
}

pub fn config_path() -> String {
    env::var("MARKETDASH_CONFIG").unwrap_or_else(|_| "config.json".to_string())
}

pub fn load_config(path: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let mut config: AppConfig = serde_json::from_str(&content)?;
    config.apply_overrides(|name| env::var(name).ok());

    if config.finnhub.api_key.is_empty() {
        return Err("finnhub.api_key is empty and FINNHUB_API_KEY is not set".into());
    }
    Ok(config)
}
