//! reqwest-backed API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::{ApiClient, ApiError, Method};
use crate::config::Config;

/// Client for the upstream JSON API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = Self::new(config.api_base_url.clone(), config.request_timeout())?;
        Ok(match &config.api_token {
            Some(token) => client.with_token(token.clone()),
            None => client,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn prepare(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Maps non-2xx statuses to [`ApiError`] and parses the JSON body.
    /// An empty body reads as `null`.
    async fn read_response(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self.prepare(self.client.get(&url)).query(params).send().await?;
        Self::read_response(response).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(url = %url, method = %method, "Sending request");
        let builder = self.client.request(method, &url);
        let builder = match &body {
            Some(body) => self.prepare(builder).json(body),
            None => self.prepare(builder),
        };
        Self::read_response(builder.send().await?).await
    }
}
