//! # HTTP Query Client
//!
//! `POST {base}/v1/query` runs a document; continuation links are fetched
//! with `GET`, resolved against the base URL when relative. A path prefix on
//! the base (`https://host/api`) is kept for the query endpoint.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::json;

use tt_core::{BoxError, DataSet, QueryDocument, QueryResponse};
use tt_engine::QueryClient;

use crate::config::ServiceConfig;

pub struct HttpQueryClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpQueryClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, BoxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;
        let mut base =
            Url::parse(&config.url).map_err(|e| format!("invalid service url {}: {}", config.url, e))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            base,
            token: config.token.clone(),
        })
    }

    fn resolve(&self, href: &str) -> Result<Url, BoxError> {
        self.base
            .join(href)
            .map_err(|e| format!("invalid continuation link {}: {}", href, e).into())
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.as_deref() {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }
}

#[async_trait::async_trait]
impl QueryClient for HttpQueryClient {
    async fn execute_query(&self, query: &QueryDocument) -> Result<QueryResponse, BoxError> {
        let url = self.resolve("v1/query")?;
        let req = self
            .client
            .post(url)
            .json(&json!({ "query": query.as_str() }));
        let resp = self.authorize(req).send().await?.error_for_status()?;
        Ok(resp.json::<QueryResponse>().await?)
    }

    async fn continue_query(&self, page: &DataSet, link: &str) -> Result<QueryResponse, BoxError> {
        let href = page
            .link(link)
            .ok_or_else(|| format!("dataset `{}` has no `{}` link", page.name, link))?;
        let url = self.resolve(href.as_str())?;
        let resp = self
            .authorize(self.client.get(url))
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<QueryResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> HttpQueryClient {
        HttpQueryClient::new(&ServiceConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_relative_links_resolve_against_base() {
        let c = client("https://analytics.example.com/");
        assert_eq!(
            c.resolve("/v1/query/cursor/abc?page=2").unwrap().as_str(),
            "https://analytics.example.com/v1/query/cursor/abc?page=2"
        );
    }

    #[test]
    fn test_query_endpoint_keeps_base_path() {
        assert_eq!(
            client("https://analytics.example.com/api").resolve("v1/query").unwrap().as_str(),
            "https://analytics.example.com/api/v1/query"
        );
        assert_eq!(
            client("https://analytics.example.com/api/").resolve("v1/query").unwrap().as_str(),
            "https://analytics.example.com/api/v1/query"
        );
        assert_eq!(
            client("https://analytics.example.com").resolve("v1/query").unwrap().as_str(),
            "https://analytics.example.com/v1/query"
        );
    }

    #[test]
    fn test_absolute_links_are_kept() {
        let c = client("https://analytics.example.com");
        assert_eq!(
            c.resolve("https://other.example.com/follow/1").unwrap().as_str(),
            "https://other.example.com/follow/1"
        );
    }

    #[test]
    fn test_bad_base_url_is_rejected() {
        let err = HttpQueryClient::new(&ServiceConfig {
            url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_missing_link_fails_without_request() {
        let c = client("http://127.0.0.1:9");
        let page = DataSet::new("events", Vec::new(), Default::default());
        let err = c.continue_query(&page, "follow").await.unwrap_err();
        assert_eq!(err.to_string(), "dataset `events` has no `follow` link");
    }
}
