//! Clients for the two remote helpers: task decomposition and image
//! generation. The core only sees the [`Decomposer`] and [`ImageGenerator`]
//! traits; the HTTP types here are the production implementations.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::model::config::ServiceConfig;

/// Error type for remote service calls
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("service.{0} is not configured in tasker.toml")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service failed at stage {stage}: {message}")]
    Rejected { stage: String, message: String },
    #[error("image not ready after {0} polls")]
    TimedOut(u32),
    #[error("invalid image payload: {0}")]
    InvalidImage(String),
}

// ---------------------------------------------------------------------------
// Decomposition
// ---------------------------------------------------------------------------

/// Body sent to the decomposition endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecomposeRequest {
    pub task_title: String,
    pub parent_context: Option<String>,
    #[serde(rename = "siblings")]
    pub sibling_titles: Vec<String>,
    pub parent_id: Option<String>,
    pub level: u32,
}

impl DecomposeRequest {
    pub fn new(task_title: String, parent_context: Option<String>, sibling_titles: Vec<String>) -> Self {
        DecomposeRequest {
            task_title,
            parent_context,
            sibling_titles,
            parent_id: None,
            level: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DecomposeResponse {
    success: bool,
    #[serde(default)]
    subtasks: Vec<ProposedSubtask>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProposedSubtask {
    title: String,
}

/// Splits a task into smaller steps
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Titles of the proposed subtasks, in the order they should be added.
    async fn decompose(&self, request: &DecomposeRequest) -> Result<Vec<String>, ServiceError>;
}

pub struct HttpDecomposer {
    client: reqwest::Client,
    url: String,
}

impl HttpDecomposer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpDecomposer {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let url = config
            .decompose_url
            .as_deref()
            .ok_or(ServiceError::NotConfigured("decompose_url"))?;
        Self::new(url, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Decomposer for HttpDecomposer {
    async fn decompose(&self, request: &DecomposeRequest) -> Result<Vec<String>, ServiceError> {
        let response: DecomposeResponse = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        if !response.success {
            return Err(ServiceError::Rejected {
                stage: response.stage.unwrap_or_else(|| "unknown".to_string()),
                message: describe(response.error),
            });
        }
        Ok(response.subtasks.into_iter().map(|s| s.title).collect())
    }
}

fn describe(error: Option<serde_json::Value>) -> String {
    match error {
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => "no details".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

/// A generation job accepted by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedImage {
    pub operation_id: String,
    pub image_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Generating,
    Ready(Vec<u8>),
    Failed(String),
}

/// Two-phase image generation: start a job, then poll it until it settles.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn start(&self, prompt: &str) -> Result<StartedImage, ServiceError>;
    async fn poll(&self, operation_id: &str) -> Result<PollStatus, ServiceError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    #[serde(default = "default_true")]
    success: bool,
    #[serde(default)]
    operation_id: Option<String>,
    #[serde(default)]
    image_description: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

pub struct HttpImageGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageGenerator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpImageGenerator {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let url = config
            .image_url
            .as_deref()
            .ok_or(ServiceError::NotConfigured("image_url"))?;
        Self::new(url, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn start(&self, prompt: &str) -> Result<StartedImage, ServiceError> {
        let response: StartResponse = self
            .client
            .post(format!("{}/start", self.base_url))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?
            .json()
            .await?;
        match response.operation_id {
            Some(operation_id) if response.success => Ok(StartedImage {
                operation_id,
                image_description: response.image_description,
            }),
            _ => Err(ServiceError::Rejected {
                stage: "start".to_string(),
                message: describe(response.error),
            }),
        }
    }

    async fn poll(&self, operation_id: &str) -> Result<PollStatus, ServiceError> {
        let response: StatusResponse = self
            .client
            .get(format!("{}/status/{}", self.base_url, operation_id))
            .send()
            .await?
            .json()
            .await?;
        match response.status.as_str() {
            "generating" => Ok(PollStatus::Generating),
            "ready" => {
                let payload = response
                    .image
                    .ok_or_else(|| ServiceError::InvalidImage("ready without image".into()))?;
                Ok(PollStatus::Ready(decode_image(&payload)?))
            }
            _ => Ok(PollStatus::Failed(describe(response.error))),
        }
    }
}

/// Accepts plain base64 or a `data:image/...;base64,` URL.
pub fn decode_image(payload: &str) -> Result<Vec<u8>, ServiceError> {
    let encoded = match payload.split_once("base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ServiceError::InvalidImage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    #[test]
    fn request_uses_wire_names() {
        let request = DecomposeRequest::new("Clean flat".into(), None, vec!["Shop".into()]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["task_title"], "Clean flat");
        assert!(json["parent_context"].is_null());
        assert_eq!(json["siblings"][0], "Shop");
        assert_eq!(json["level"], 0);
    }

    #[test]
    fn decode_data_url_and_plain() {
        assert_eq!(decode_image("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert_eq!(decode_image("aGk=").unwrap(), b"hi");
        assert!(decode_image("data:image/png;base64,***").is_err());
    }

    #[test]
    fn missing_urls_are_configuration_errors() {
        let config = ServiceConfig::default();
        assert!(matches!(
            HttpDecomposer::from_config(&config),
            Err(ServiceError::NotConfigured("decompose_url"))
        ));
        assert!(matches!(
            HttpImageGenerator::from_config(&config),
            Err(ServiceError::NotConfigured("image_url"))
        ));
    }

    #[tokio::test]
    async fn decomposer_returns_titles_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/decompose")
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"subtasks":[{"title":"Buy paint"},{"title":"Paint wall"}]}"#)
            .create_async()
            .await;

        let client = HttpDecomposer::new(format!("{}/decompose", server.url()), timeout()).unwrap();
        let request = DecomposeRequest::new("Renovate".into(), None, vec![]);
        let titles = client.decompose(&request).await.unwrap();
        assert_eq!(titles, vec!["Buy paint", "Paint wall"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn decomposer_surfaces_service_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/decompose")
            .with_body(r#"{"success":false,"stage":"llm","error":"quota"}"#)
            .create_async()
            .await;

        let client = HttpDecomposer::new(format!("{}/decompose", server.url()), timeout()).unwrap();
        let err = client
            .decompose(&DecomposeRequest::new("X".into(), None, vec![]))
            .await
            .unwrap_err();
        match err {
            ServiceError::Rejected { stage, message } => {
                assert_eq!(stage, "llm");
                assert_eq!(message, "quota");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn image_generator_start_and_poll() {
        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("POST", "/start")
            .with_body(r#"{"operationId":"op-1","imageDescription":"a cat"}"#)
            .create_async()
            .await;
        let _status = server
            .mock("GET", "/status/op-1")
            .with_body(r#"{"status":"ready","image":"data:image/png;base64,aGk="}"#)
            .create_async()
            .await;

        let generator = HttpImageGenerator::new(server.url(), timeout()).unwrap();
        let started = generator.start("a cat").await.unwrap();
        assert_eq!(started.operation_id, "op-1");
        assert_eq!(started.image_description.as_deref(), Some("a cat"));
        assert_eq!(
            generator.poll("op-1").await.unwrap(),
            PollStatus::Ready(b"hi".to_vec())
        );
    }
}
