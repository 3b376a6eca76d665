//! Topic clients - the destination seam and its Pub/Sub REST implementation

use std::sync::atomic::{AtomicU64, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use contracts::PubSubSettings;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{PublishError, Result};

pub const PUBSUB_API: &str = "https://pubsub.googleapis.com";

/// Handle on one destination topic
///
/// A single long-lived instance is shared by every worker, so
/// implementations must tolerate concurrent `publish` calls.
#[trait_variant::make(TopicClient: Send)]
pub trait LocalTopicClient {
    /// Fully qualified topic name, for diagnostics
    fn topic(&self) -> &str;

    /// Whether the topic currently exists
    async fn topic_exists(&self) -> Result<bool>;

    /// Publish one message and return the destination's message id
    async fn publish(&self, data: Vec<u8>) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    #[serde(rename = "messageIds", default)]
    message_ids: Vec<String>,
}

/// Pub/Sub over its REST surface
///
/// Talks to the emulator over plain HTTP without credentials when an
/// emulator host is configured, otherwise to the hosted API with a bearer
/// token.
#[derive(Clone)]
pub struct PubSubRestClient {
    client: reqwest::Client,
    base: String,
    topic_path: String,
    token: Option<String>,
}

impl PubSubRestClient {
    pub fn new(client: reqwest::Client, settings: &PubSubSettings) -> Self {
        let (base, token) = match &settings.emulator_host {
            Some(host) => (format!("http://{host}"), None),
            None => (PUBSUB_API.to_string(), settings.access_token.clone()),
        };
        Self::with_base(client, base, settings.topic_path(), token)
    }

    /// Client against an explicit API base
    pub fn with_base(
        client: reqwest::Client,
        base: impl Into<String>,
        topic_path: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            topic_path: topic_path.into(),
            token,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn topic_url(&self) -> String {
        format!("{}/v1/{}", self.base, self.topic_path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl std::fmt::Debug for PubSubRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubRestClient")
            .field("base", &self.base)
            .field("topic_path", &self.topic_path)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl TopicClient for PubSubRestClient {
    fn topic(&self) -> &str {
        &self.topic_path
    }

    async fn topic_exists(&self) -> Result<bool> {
        let response = self
            .authorize(self.client.get(self.topic_url()))
            .send()
            .await
            .map_err(|e| PublishError::TopicCheck(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(PublishError::TopicCheck(format!(
                "unexpected status {}",
                status.as_u16()
            ))),
        }
    }

    async fn publish(&self, data: Vec<u8>) -> Result<String> {
        let body = json!({ "messages": [{ "data": STANDARD.encode(&data) }] });
        let response = self
            .authorize(self.client.post(format!("{}:publish", self.topic_url())))
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let ack: PublishResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        debug!(ids = ?ack.message_ids, "Publish acknowledged");
        ack.message_ids
            .into_iter()
            .next()
            .filter(|id| !id.is_empty())
            .ok_or(PublishError::MissingAck)
    }
}

/// Logs messages instead of publishing them (`run --dry-run`)
#[derive(Debug)]
pub struct DryRunClient {
    topic: String,
    sequence: AtomicU64,
}

impl DryRunClient {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            sequence: AtomicU64::new(0),
        }
    }
}

impl TopicClient for DryRunClient {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn topic_exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn publish(&self, data: Vec<u8>) -> Result<String> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            topic = %self.topic,
            payload = %String::from_utf8_lossy(&data),
            "Dry run, message not published"
        );
        Ok(format!("dry-run-{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::{DryRunClient, PubSubRestClient, TopicClient, PUBSUB_API};
    use crate::error::PublishError;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use contracts::PubSubSettings;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOPIC: &str = "projects/demo/topics/hirers";

    fn client_for(server: &MockServer, token: Option<&str>) -> PubSubRestClient {
        PubSubRestClient::with_base(
            reqwest::Client::new(),
            server.uri(),
            TOPIC,
            token.map(String::from),
        )
    }

    #[test]
    fn test_emulator_host_selects_plain_http() {
        let settings = PubSubSettings {
            project_id: "demo".into(),
            topic: "hirers".into(),
            emulator_host: Some("localhost:8085".into()),
            access_token: Some("ignored".into()),
        };
        let client = PubSubRestClient::new(reqwest::Client::new(), &settings);

        assert_eq!(client.base(), "http://localhost:8085");
        assert_eq!(client.topic(), TOPIC);
        assert!(client.token.is_none());
    }

    #[test]
    fn test_hosted_api_without_emulator() {
        let settings = PubSubSettings {
            access_token: Some("ya29.token".into()),
            ..Default::default()
        };
        let client = PubSubRestClient::new(reqwest::Client::new(), &settings);
        assert_eq!(client.base(), PUBSUB_API);
        assert!(!format!("{client:?}").contains("ya29"));
    }

    #[tokio::test]
    async fn test_topic_exists_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/{TOPIC}")))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/{TOPIC}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"x"}"#))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(!client.topic_exists().await.unwrap());
        assert!(client.topic_exists().await.unwrap());
        assert!(matches!(
            client.topic_exists().await,
            Err(PublishError::TopicCheck(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_encodes_and_authenticates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/{TOPIC}:publish")))
            .and(header("authorization", "Bearer ya29.token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"messageIds":["4242"]}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("ya29.token"));
        let id = client.publish(br#"{"reference":"r"}"#.to_vec()).await.unwrap();
        assert_eq!(id, "4242");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let data = body["messages"][0]["data"].as_str().unwrap();
        assert_eq!(STANDARD.decode(data).unwrap(), br#"{"reference":"r"}"#);
    }

    #[tokio::test]
    async fn test_publish_without_ids_is_missing_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let result = client_for(&server, None).publish(b"{}".to_vec()).await;
        assert!(matches!(result, Err(PublishError::MissingAck)));
    }

    #[tokio::test]
    async fn test_publish_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let result = client_for(&server, None).publish(b"{}".to_vec()).await;
        assert!(matches!(
            result,
            Err(PublishError::Rejected { status: 403, ref body }) if body == "denied"
        ));
    }

    #[tokio::test]
    async fn test_dry_run_ids() {
        let client = DryRunClient::new(TOPIC);
        assert!(client.topic_exists().await.unwrap());
        assert_eq!(client.publish(b"{}".to_vec()).await.unwrap(), "dry-run-1");
        assert_eq!(client.publish(b"{}".to_vec()).await.unwrap(), "dry-run-2");
    }
}
