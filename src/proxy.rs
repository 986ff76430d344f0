//! Relay server client
//!
//! The relay is a thin server-side process that holds the cloud vendor
//! credentials and forwards speech-to-text and translation requests. This
//! module is the client side of that contract; vendor payloads are the
//! relay's concern, not ours.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::audio::AudioRecording;

/// Connect timeout for all relay requests.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall request timeout. Batch speech submissions carry whole
/// recordings, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Timeout for the lightweight config and health probes.
const PROBE_TIMEOUT_SECS: u64 = 10;

/// Errors from the relay boundary
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response from relay: {0}")]
    InvalidResponse(String),

    #[error("Relay error ({status}): {message}")]
    Status { status: u16, message: String },
}

/// Engine configuration advertised by `GET /api/config`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(rename = "hasGoogleAPI", default)]
    pub has_google_api: bool,
    #[serde(rename = "hasAzureAPI", default)]
    pub has_azure_api: bool,
    #[serde(rename = "hasAWSAPI", default)]
    pub has_aws_api: bool,
    #[serde(rename = "hasTranslateAPI", default)]
    pub has_translate_api: bool,
    #[serde(rename = "supportedLanguages", default)]
    pub supported_languages: Vec<String>,
}

/// Response body of `POST /api/speech-to-text`.
///
/// The relay has used both field spellings over time; accept either.
#[derive(Debug, Deserialize)]
struct SpeechToTextResponse {
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl SpeechToTextResponse {
    fn into_transcription(self) -> String {
        self.transcription.or(self.text).unwrap_or_default()
    }
}

/// Request body of `POST /api/translate`.
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    #[serde(rename = "targetLanguage")]
    target_language: &'a str,
}

/// Response body of `POST /api/translate`.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationResponse {
    #[serde(rename = "translatedText")]
    pub translated_text: String,
    #[serde(rename = "originalText", default)]
    pub original_text: String,
    #[serde(rename = "targetLanguage", default)]
    pub target_language: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub services: HealthServices,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthServices {
    #[serde(default)]
    pub google: bool,
    #[serde(default)]
    pub azure: bool,
    #[serde(default)]
    pub aws: bool,
}

/// Client-side view of the relay server.
#[async_trait]
pub trait RemoteProxy: Send + Sync {
    /// Fetch which cloud engines the relay has credentials for.
    async fn fetch_config(&self) -> Result<RelayConfig, ProxyError>;

    /// Submit a whole recording for batch transcription.
    async fn speech_to_text(
        &self,
        recording: AudioRecording,
        language: &str,
    ) -> Result<String, ProxyError>;

    /// Translate a finalized transcript chunk.
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<TranslationResponse, ProxyError>;

    /// Relay liveness and configured vendor services.
    async fn health(&self) -> Result<HealthResponse, ProxyError>;
}

/// HTTP implementation of [`RemoteProxy`].
pub struct ProxyClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for ProxyClient")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-2xx response into `ProxyError::Status` with its body text.
    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProxyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ProxyError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteProxy for ProxyClient {
    async fn fetch_config(&self) -> Result<RelayConfig, ProxyError> {
        let response = self
            .client
            .get(self.url("/api/config"))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let config: RelayConfig = response
            .json()
            .await
            .map_err(|e| ProxyError::InvalidResponse(e.to_string()))?;
        info!(
            google = config.has_google_api,
            azure = config.has_azure_api,
            aws = config.has_aws_api,
            translate = config.has_translate_api,
            languages = ?config.supported_languages,
            "Relay config fetched"
        );
        Ok(config)
    }

    #[instrument(skip(self, recording), fields(bytes = recording.data.len(), format = %recording.format))]
    async fn speech_to_text(
        &self,
        recording: AudioRecording,
        language: &str,
    ) -> Result<String, ProxyError> {
        let file_name = format!("recording.{}", recording.format.extension());
        let part = reqwest::multipart::Part::bytes(recording.data)
            .file_name(file_name)
            .mime_str(recording.format.mime_type())
            .map_err(|e| ProxyError::InvalidResponse(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("audio", part)
            .text("language", language.to_string());

        let response = self
            .client
            .post(self.url("/api/speech-to-text"))
            .multipart(form)
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let body: SpeechToTextResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::InvalidResponse(e.to_string()))?;
        Ok(body.into_transcription())
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<TranslationResponse, ProxyError> {
        let response = self
            .client
            .post(self.url("/api/translate"))
            .json(&TranslateRequest {
                text,
                target_language,
            })
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProxyError::InvalidResponse(e.to_string()))
    }

    async fn health(&self) -> Result<HealthResponse, ProxyError> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProxyError::InvalidResponse(e.to_string()))
    }
}
