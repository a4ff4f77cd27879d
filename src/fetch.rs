//! Discourse topic download.
//!
//! A topic is one authenticated `GET <forum>/t/<id>.json?print=true`; the
//! `print` flag makes Discourse return every post in `post_stream.posts`
//! instead of the first page only.

use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderValue},
};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    config::NutshellConfig,
    error::{NutshellError, Result},
};

/// Client for a single Discourse forum.
#[derive(Debug, Clone)]
pub struct TopicFetcher {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TopicFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    /// [`NutshellError::Configuration`] when no forum API key is configured.
    pub fn new(config: &NutshellConfig) -> Result<Self> {
        let api_key = config.require_forum_api_key()?.to_string();
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| NutshellError::configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.forum_base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn topic_url(&self, topic_id: u64) -> String {
        format!("{}/t/{topic_id}.json", self.base_url)
    }

    /// Download a topic and return the response body untouched.
    ///
    /// # Errors
    /// [`NutshellError::Upstream`] on transport failures and non-2xx statuses.
    pub async fn fetch_raw(&self, topic_id: u64) -> Result<String> {
        let url = format!("{}?print=true", self.topic_url(topic_id));
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| NutshellError::upstream(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        info!(topic_id, %status, content_type = %content_type, "Fetched topic");

        if !status.is_success() {
            return Err(NutshellError::upstream(format!("GET {url} returned {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| NutshellError::upstream(format!("reading body of {url} failed: {e}")))
    }

    /// Download a topic and parse it as JSON.
    pub async fn fetch(&self, topic_id: u64) -> Result<Value> {
        let body = self.fetch_raw(topic_id).await?;
        parse_topic(&body)
    }
}

/// Parse a topic body, reporting non-JSON as a malformed document.
pub fn parse_topic(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| NutshellError::malformed("$", format!("response is not JSON: {e}")))
}
