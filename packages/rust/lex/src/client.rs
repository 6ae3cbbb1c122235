//! REST client for the model-building API.

use std::time::Duration;

use octochat_shared::{OctochatError, PlatformConfig, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::BotPlatform;
use crate::model::{AliasDefinition, BotDefinition, IntentDefinition, VersionCreated};

/// Draft version addressed by every put call.
const LATEST: &str = "$LATEST";

/// Header carrying the service's error code.
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

/// User-Agent string for platform requests.
const USER_AGENT: &str = concat!("octochat/", env!("CARGO_PKG_VERSION"));

/// Error body returned alongside non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "__type", alias = "code")]
    kind: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

/// [`BotPlatform`] backed by the model-building REST API.
#[derive(Debug, Clone)]
pub struct LexModelClient {
    http: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl LexModelClient {
    /// Build a client from config and an optional bearer token.
    pub fn new(config: &PlatformConfig, auth_token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OctochatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| OctochatError::Network(format!("{resource}: {e}")))?;
        check_status(resource, response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T> {
        let body = self
            .send(request, resource)
            .await?
            .text()
            .await
            .map_err(|e| OctochatError::Network(format!("{resource}: failed to read body: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| OctochatError::parse(format!("{resource}: unexpected response: {e}")))
    }
}

impl BotPlatform for LexModelClient {
    #[instrument(skip_all, fields(intent = %intent.name))]
    async fn put_intent(&self, intent: &IntentDefinition) -> Result<()> {
        let url = self.url(&format!("/intents/{}/versions/{LATEST}", intent.name));
        self.send(self.http.put(&url).json(intent), &intent.name).await?;
        debug!("intent saved");
        Ok(())
    }

    #[instrument(skip_all, fields(intent = %name))]
    async fn create_intent_version(&self, name: &str) -> Result<String> {
        let url = self.url(&format!("/intents/{name}/versions"));
        let created: VersionCreated = self
            .send_json(self.http.post(&url).json(&serde_json::json!({})), name)
            .await?;
        debug!(version = %created.version, "intent version published");
        Ok(created.version)
    }

    #[instrument(skip_all, fields(bot = %bot.name, intents = bot.intents.len()))]
    async fn put_bot(&self, bot: &BotDefinition) -> Result<()> {
        let url = self.url(&format!("/bots/{}/versions/{LATEST}", bot.name));
        self.send(self.http.put(&url).json(bot), &bot.name).await?;
        debug!("bot saved");
        Ok(())
    }

    #[instrument(skip_all, fields(bot = %name))]
    async fn create_bot_version(&self, name: &str) -> Result<String> {
        let url = self.url(&format!("/bots/{name}/versions"));
        let created: VersionCreated = self
            .send_json(self.http.post(&url).json(&serde_json::json!({})), name)
            .await?;
        debug!(version = %created.version, "bot version published");
        Ok(created.version)
    }

    #[instrument(skip_all, fields(bot = %bot_name, alias = %alias, version = %bot_version))]
    async fn put_bot_alias(&self, bot_name: &str, alias: &str, bot_version: &str) -> Result<()> {
        let url = self.url(&format!("/bots/{bot_name}/aliases/{alias}"));
        let body = AliasDefinition {
            bot_version: bot_version.to_string(),
        };
        let resource = format!("{bot_name}/{alias}");
        self.send(self.http.put(&url).json(&body), &resource).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(bot = %bot_name, alias = %alias))]
    async fn delete_bot_alias(&self, bot_name: &str, alias: &str) -> Result<()> {
        let url = self.url(&format!("/bots/{bot_name}/aliases/{alias}"));
        let resource = format!("{bot_name}/{alias}");
        self.send(self.http.delete(&url), &resource).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(bot = %name))]
    async fn delete_bot(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("/bots/{name}"));
        self.send(self.http.delete(&url), name).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(intent = %name))]
    async fn delete_intent(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("/intents/{name}"));
        self.send(self.http.delete(&url), name).await?;
        Ok(())
    }
}

/// Map non-success statuses onto the error model.
///
/// The error code comes from the `x-amzn-ErrorType` header when present
/// (`NotFoundException:http://...`), otherwise from the JSON body.
async fn check_status(resource: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let header_code = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(':').next())
        .map(str::to_string);
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

    let code = header_code
        .or(body.kind)
        .unwrap_or_else(|| status.as_u16().to_string());
    let message = body.message.unwrap_or(text);

    if status == StatusCode::NOT_FOUND || code == "NotFoundException" {
        return Err(OctochatError::NotFound(format!("{resource}: {message}")));
    }
    Err(OctochatError::platform(code, format!("{resource}: {message}")))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::model::{FulfillmentActivity, IntentRef};

    fn client_for(server: &MockServer, token: Option<&str>) -> LexModelClient {
        let config = PlatformConfig {
            endpoint: server.uri(),
            ..PlatformConfig::default()
        };
        LexModelClient::new(&config, token.map(str::to_string)).unwrap()
    }

    #[tokio::test]
    async fn put_intent_targets_latest_draft() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/intents/Examplecomfa_X/versions/$LATEST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let intent = IntentDefinition {
            name: "Examplecomfa_X".into(),
            sample_utterances: vec!["What is X".into()],
            fulfillment_activity: FulfillmentActivity::code_hook("arn:responder"),
        };
        client_for(&server, Some("secret"))
            .put_intent(&intent)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_version_returns_published_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bots/Examplecomfa/versions"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"version": "4"})),
            )
            .mount(&server)
            .await;

        let version = client_for(&server, None)
            .create_bot_version("Examplecomfa")
            .await
            .unwrap();
        assert_eq!(version, "4");
    }

    #[tokio::test]
    async fn put_bot_sends_definition() {
        let server = MockServer::start().await;
        let bot = BotDefinition::faq_bot(
            "Examplecomfa",
            vec![IntentRef {
                intent_name: "Examplecomfa_X".into(),
                intent_version: "1".into(),
            }],
            "Kendra",
            "en-US",
        );
        Mock::given(method("PUT"))
            .and(path("/bots/Examplecomfa/versions/$LATEST"))
            .and(body_json(serde_json::to_value(&bot).unwrap()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, None).put_bot(&bot).await.unwrap();
    }

    #[tokio::test]
    async fn alias_binds_version() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bots/Examplecomfa/aliases/DEV"))
            .and(body_json(serde_json::json!({"botVersion": "1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server, None)
            .put_bot_alias("Examplecomfa", "DEV", "1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_resource_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/bots/Gone"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header(ERROR_TYPE_HEADER, "NotFoundException:http://internal.amazon.com/")
                    .set_body_json(serde_json::json!({"message": "bot not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, None).delete_bot("Gone").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("bot not found"));
    }

    #[tokio::test]
    async fn conflict_carries_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bots/Examplecomfa/aliases/DEV"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "__type": "ConflictException",
                "message": "bot is still building"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .put_bot_alias("Examplecomfa", "DEV", "1")
            .await
            .unwrap_err();
        match err {
            OctochatError::Platform { code, message } => {
                assert_eq!(code, "ConflictException");
                assert!(message.contains("still building"));
            }
            other => panic!("expected platform error, got {other:?}"),
        }
    }
}
