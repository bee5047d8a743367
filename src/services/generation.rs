use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{FailureClass, SourceRecord};
use crate::services::classifier;

/// Non-prompt parameters forwarded to the generation service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeHints {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// How strongly to deviate from the source image (0.0 - 1.0).
    pub strength: Option<f64>,
}

/// Failure taxonomy of the external generation capability. Only the message
/// is load-bearing downstream: the classifier works on message text, not on
/// this structure.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("transient generation failure: {0}")]
    Transient(String),

    #[error("generation request rejected: {0}")]
    Policy(String),

    #[error("generation failed: {0}")]
    Unknown(String),
}

impl GenerationError {
    pub fn message(&self) -> &str {
        match self {
            GenerationError::Transient(message)
            | GenerationError::Policy(message)
            | GenerationError::Unknown(message) => message,
        }
    }
}

/// The external generation capability. One call per job; the returned string
/// is an opaque artifact reference.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        source: &SourceRecord,
        instruction: &str,
        hints: &ShapeHints,
    ) -> Result<String, GenerationError>;
}

/// Client for Cloudflare Workers AI image-to-image generation.
pub struct WorkersAiImageClient {
    http: Client,
    account_id: String,
    api_token: String,
    output_dir: PathBuf,
}

const IMG2IMG_MODEL: &str = "@cf/runwayml/stable-diffusion-v1-5-img2img";

impl WorkersAiImageClient {
    pub fn new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http: Client::new(),
            account_id: account_id.into(),
            api_token: api_token.into(),
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl GenerationService for WorkersAiImageClient {
    async fn generate(
        &self,
        source: &SourceRecord,
        instruction: &str,
        hints: &ShapeHints,
    ) -> Result<String, GenerationError> {
        let image_bytes = tokio::fs::read(&source.image_key).await.map_err(|e| {
            GenerationError::Unknown(format!(
                "failed to read source image {}: {e}",
                source.image_key
            ))
        })?;

        let url = format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/{}",
            self.account_id, IMG2IMG_MODEL
        );

        let request_body = serde_json::json!({
            "image_b64": base64::engine::general_purpose::STANDARD.encode(&image_bytes),
            "prompt": instruction,
            "width": hints.width,
            "height": hints.height,
            "strength": hints.strength,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    GenerationError::Transient(format!("request did not complete: {e}"))
                } else {
                    GenerationError::Unknown(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_failure(status, &body));
        }

        let artifact_bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Transient(format!("response truncated: {e}")))?;

        let artifact_path = self.output_dir.join(format!("{}.png", Uuid::new_v4()));
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| GenerationError::Unknown(format!("cannot create output dir: {e}")))?;
        tokio::fs::write(&artifact_path, &artifact_bytes)
            .await
            .map_err(|e| GenerationError::Unknown(format!("cannot write artifact: {e}")))?;

        Ok(artifact_path.to_string_lossy().into_owned())
    }
}

/// Map a non-success response to the error taxonomy. Overload and rate
/// limiting are worth retrying; a rejection whose body matches the policy
/// vocabulary is a moderation refusal; anything else stays unknown and is
/// classified downstream by its message text.
fn map_http_failure(status: reqwest::StatusCode, body: &str) -> GenerationError {
    let message = format!("HTTP {status}: {body}");
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        GenerationError::Transient(message)
    } else if classifier::classify(body) == FailureClass::Policy {
        GenerationError::Policy(message)
    } else {
        GenerationError::Unknown(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn server_errors_and_rate_limits_map_to_transient() {
        assert!(matches!(
            map_http_failure(StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable"),
            GenerationError::Transient(_)
        ));
        assert!(matches!(
            map_http_failure(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            GenerationError::Transient(_)
        ));
    }

    #[test]
    fn moderation_rejection_body_maps_to_policy() {
        let error = map_http_failure(
            StatusCode::BAD_REQUEST,
            "request rejected: prompt contains prohibited content",
        );
        assert!(matches!(error, GenerationError::Policy(_)));
        assert!(error.message().contains("prohibited"));
    }

    #[test]
    fn other_client_errors_stay_unknown() {
        assert!(matches!(
            map_http_failure(StatusCode::BAD_REQUEST, "malformed image payload"),
            GenerationError::Unknown(_)
        ));
    }
}
