//! Authenticated HTTP client for the CondoChat REST API
//!
//! Wraps reqwest::Client with base-URL joining, optional bearer token
//! injection, and uniform status checking.

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::models::CurrentUser;

/// HTTP client bound to the configured backend.
pub struct ChatClient {
    http: reqwest::Client,
    config: Config,
}

impl ChatClient {
    /// Load config and build the client.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configured user; errors with an edit hint when unset.
    pub fn user(&self) -> Result<CurrentUser> {
        self.config.current_user()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET request with query parameters.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let resp = self
            .with_auth(self.http.get(&url))
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// POST request with a JSON body.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let resp = self
            .with_auth(self.http.post(&url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        check_response(resp, &url).await
    }

    /// PUT request without a body.
    pub async fn put(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("PUT {}", url);

        let resp = self
            .with_auth(self.http.put(&url))
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Check api_token in the config file.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
