use super::prompt::{analysis_prompt, explain_prompt, parse_analysis, strategy_prompt};
use super::{AnalysisInput, NarrativeAnalyzer, StockAnalysis};
use crate::model::NarrativeError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const STRATEGY_TEMPERATURE: f32 = 0.4;
const EXPLAIN_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completion endpoint.
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl LlmClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }

    /// Sends a single user prompt and returns the first choice's text.
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, NarrativeError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "unknown".into());
            warn!("LLM endpoint responded [{}]: {}", status, text);
            return Err(NarrativeError::Status(status.as_u16()));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::Malformed(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| NarrativeError::Malformed("empty completion".into()))
    }
}

#[async_trait::async_trait]
impl NarrativeAnalyzer for LlmClient {
    async fn analyze(&self, input: &AnalysisInput<'_>) -> Result<StockAnalysis, NarrativeError> {
        info!("Requesting narrative analysis for {} from {}", input.symbol, self.model);
        let text = self.complete(&analysis_prompt(input), self.temperature).await?;
        parse_analysis(input.symbol, &text)
    }

    async fn strategy(
        &self,
        symbol: &str,
        goal: &str,
        risk_tolerance: &str,
    ) -> Result<String, NarrativeError> {
        self.complete(&strategy_prompt(symbol, goal, risk_tolerance), STRATEGY_TEMPERATURE)
            .await
    }

    async fn explain(
        &self,
        indicator: &str,
        value: f64,
        context: &str,
    ) -> Result<String, NarrativeError> {
        self.complete(&explain_prompt(indicator, value, context), EXPLAIN_TEMPERATURE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_openai_shape() {
        let body = ChatRequest {
            model: "llama-3.1-70b-versatile",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.3,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["model"], "llama-3.1-70b-versatile");
    }

    #[test]
    fn response_without_choices_deserializes() {
        let reply: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(reply.choices.is_empty());
    }

    // Hits the real endpoint.
    #[tokio::test]
    #[ignore = "requires GROQ_API_KEY"]
    async fn explain_returns_text() {
        let key = std::env::var("GROQ_API_KEY").unwrap();
        let client = LlmClient::new(
            Client::new(),
            "https://api.groq.com/openai/v1",
            key,
            "llama-3.1-70b-versatile",
            0.3,
        );
        let text = client.explain("RSI", 72.0, "large-cap tech").await.unwrap();
        assert!(!text.is_empty());
    }
}
