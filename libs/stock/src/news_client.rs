use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::StockError;

/// NewsAPI rejects a larger `pageSize`.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct NewsClient {
    client: Client,
    base_api: String,
    api_key: String,
}

impl NewsClient {
    pub fn new(
        base_api: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StockError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_api: base_api.into(),
            api_key: api_key.into(),
        })
    }

    /// Most popular English articles matching `query`, at most `top_n`.
    /// No results is an empty list, not an error.
    pub async fn fetch_top(&self, query: &str, top_n: usize) -> Result<Vec<Article>, StockError> {
        if top_n == 0 {
            return Ok(Vec::new());
        }

        debug!(base = %self.base_api, query, top_n, "requesting news");

        let body = self
            .everything_request(query, top_n)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut articles = parse_articles(&body)?;
        articles.truncate(top_n);
        Ok(articles)
    }

    fn everything_request(&self, query: &str, top_n: usize) -> RequestBuilder {
        let url = format!("{}/v2/everything", self.base_api.trim_end_matches('/'));
        let page_size = top_n.min(MAX_PAGE_SIZE).to_string();

        self.client.get(url).query(&[
            ("apiKey", self.api_key.as_str()),
            ("q", query),
            ("sortBy", "popularity"),
            ("language", "en"),
            ("pageSize", page_size.as_str()),
        ])
    }
}

/// Decode a `/v2/everything` body. A body without `articles` yields none.
pub fn parse_articles(body: &str) -> Result<Vec<Article>, StockError> {
    let res: EverythingResponse = serde_json::from_str(body)?;
    Ok(res.articles)
}

//
// Match NewsAPI JSON
// https://newsapi.org/docs/endpoints/everything
//
#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub source: Option<ArticleSource>,

    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

impl Article {
    /// Empty when the provider sends a null title.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Empty when the provider sends a null description.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}
