//! HTTP client for the QnA Maker knowledge-base API.

use std::time::Duration;

use octochat_shared::{OctochatError, QnaMakerConfig, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::KnowledgeBaseService;

/// Header carrying the subscription key on every request.
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// User-Agent string for knowledge-base requests.
const USER_AGENT: &str = concat!("octochat/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a downloaded knowledge base (10 MB).
const MAX_DOWNLOAD_SIZE: u64 = 10 * 1024 * 1024;

const BOM: char = '\u{feff}';

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    name: &'a str,
    urls: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    kb_id: String,
}

/// [`KnowledgeBaseService`] backed by the QnA Maker REST API.
#[derive(Debug, Clone)]
pub struct QnaMakerClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl QnaMakerClient {
    /// Build a client from config and the subscription key.
    pub fn new(config: &QnaMakerConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OctochatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn kb_url(&self, kb_id: &str) -> String {
        format!("{}/knowledgebases/{kb_id}", self.endpoint)
    }
}

impl KnowledgeBaseService for QnaMakerClient {
    #[instrument(skip_all, fields(faq_url = %faq_url, title = %title))]
    async fn create(&self, faq_url: &str, title: &str) -> Result<String> {
        let url = format!("{}/knowledgebases/create", self.endpoint);
        let response = self
            .http
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .json(&CreateRequest {
                name: title,
                urls: [faq_url],
            })
            .send()
            .await
            .map_err(|e| OctochatError::Network(format!("{url}: {e}")))?;

        let body = check_status(&url, response).await?.text().await.map_err(|e| {
            OctochatError::Network(format!("{url}: failed to read body: {e}"))
        })?;
        let created: CreateResponse = serde_json::from_str(&body).map_err(|e| {
            OctochatError::parse(format!("unexpected create response from {url}: {e}"))
        })?;

        debug!(kb_id = %created.kb_id, "knowledge base created");
        Ok(created.kb_id)
    }

    #[instrument(skip_all, fields(kb_id = %kb_id))]
    async fn download_link(&self, kb_id: &str) -> Result<String> {
        let url = self.kb_url(kb_id);
        let response = self
            .http
            .get(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| OctochatError::Network(format!("{url}: {e}")))?;

        let body = check_status(&url, response).await?.text().await.map_err(|e| {
            OctochatError::Network(format!("{url}: failed to read body: {e}"))
        })?;

        // The link comes back as a JSON string literal.
        let link = serde_json::from_str::<String>(&body)
            .unwrap_or_else(|_| body.trim().trim_matches('"').to_string());
        if link.is_empty() {
            return Err(OctochatError::parse(format!("{url}: empty download link")));
        }
        Ok(link)
    }

    #[instrument(skip_all)]
    async fn fetch(&self, link: &str) -> Result<String> {
        let response = self
            .http
            .get(link)
            .send()
            .await
            .map_err(|e| OctochatError::Network(format!("{link}: {e}")))?;
        let response = check_status(link, response).await?;

        if let Some(len) = response.content_length() {
            if len > MAX_DOWNLOAD_SIZE {
                return Err(OctochatError::validation(format!(
                    "{link}: knowledge base too large ({len} bytes, max {MAX_DOWNLOAD_SIZE})"
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OctochatError::Network(format!("{link}: failed to read body: {e}")))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| OctochatError::parse(format!("{link}: knowledge base is not UTF-8: {e}")))?;

        Ok(match text.strip_prefix(BOM) {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }

    #[instrument(skip_all, fields(kb_id = %kb_id))]
    async fn delete(&self, kb_id: &str) -> Result<()> {
        let url = self.kb_url(kb_id);
        let response = self
            .http
            .delete(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| OctochatError::Network(format!("{url}: {e}")))?;
        check_status(&url, response).await?;
        debug!("knowledge base deleted");
        Ok(())
    }
}

/// Map non-success statuses onto the error model.
async fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(OctochatError::NotFound(format!("{url}: {body}")));
    }
    Err(OctochatError::Network(format!("{url}: HTTP {status}: {body}")))
}
