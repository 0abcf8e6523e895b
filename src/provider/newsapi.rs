use super::{send_json, NewsProvider};
use crate::model::{ProviderError, RawNews};
use crate::utils::parse_datetime;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

const PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
struct HeadlinesPayload {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// Business headlines, used when the primary news source is down.
pub struct NewsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

fn to_raw_news(index: usize, article: Article) -> Option<RawNews> {
    let headline = article.title.filter(|t| !t.is_empty())?;
    let published_at = article
        .published_at
        .as_deref()
        .and_then(parse_datetime)
        .unwrap_or_else(Utc::now);

    Some(RawNews {
        id: format!("newsapi-{index}"),
        headline,
        summary: article.description.unwrap_or_default(),
        url: article.url.unwrap_or_default(),
        source: article
            .source
            .and_then(|s| s.name)
            .unwrap_or_else(|| "NewsAPI".to_string()),
        published_at,
        category: None,
        image: article.url_to_image,
        related: None,
    })
}

#[async_trait::async_trait]
impl NewsProvider for NewsApiClient {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    async fn market_news(&self, _category: &str) -> Result<Vec<RawNews>, ProviderError> {
        let url = format!("{}/top-headlines", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[
                ("category", "business".to_string()),
                ("country", "us".to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
            ])
            .header("X-Api-Key", &self.api_key);
        let payload: HeadlinesPayload = send_json(request, &url).await?;

        if payload.status != "ok" {
            return Err(ProviderError::Malformed(
                payload.message.unwrap_or_else(|| format!("status '{}'", payload.status)),
            ));
        }

        Ok(payload
            .articles
            .into_iter()
            .enumerate()
            .filter_map(|(i, a)| to_raw_news(i, a))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_does_not_leak_key() {
        let client = NewsApiClient::new(Client::new(), "http://127.0.0.1:1/v2", "NEWSKEY456");
        let err = client.market_news("general").await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
        assert!(!err.to_string().contains("NEWSKEY456"));
    }

    #[test]
    fn articles_without_title_are_skipped() {
        let payload: HeadlinesPayload = serde_json::from_str(
            r#"{"status":"ok","articles":[
                {"source":{"name":"Reuters"},"title":"Stocks rally","description":"d",
                 "url":"https://x","publishedAt":"2024-05-01T12:00:00Z"},
                {"source":{"name":"AP"},"title":null}
            ]}"#,
        )
        .unwrap();
        let items: Vec<RawNews> = payload
            .articles
            .into_iter()
            .enumerate()
            .filter_map(|(i, a)| to_raw_news(i, a))
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "Reuters");
        assert_eq!(items[0].id, "newsapi-0");
        assert_eq!(items[0].published_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }
}
