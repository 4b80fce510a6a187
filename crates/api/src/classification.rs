//! Client for the external document classification service.
//!
//! [`HttpClassifier`] posts the uploaded file as a multipart `file` part and
//! reads back the inferred document type code plus any extracted key/value
//! data. [`DisabledClassifier`] is used when no endpoint is configured; it
//! classifies nothing and uploads simply stay unclassified.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for classification failures.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The classifier did not answer within the configured bound.
    #[error("Classification timed out after {0}s")]
    Timeout(u64),

    /// The remote server returned a non-2xx status code.
    #[error("Classifier returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Result of classifying one document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Classification {
    /// Code of the inferred document type, e.g. `passport`.
    pub type_code: String,
    /// Key/value data read from the document.
    #[serde(default)]
    pub extracted_data: Option<serde_json::Value>,
}

/// Infers the type of an uploaded document.
///
/// `Ok(None)` means the service could not tell; the document is kept
/// without an inferred type.
#[async_trait]
pub trait DocumentClassifier: Send + Sync {
    async fn classify(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Option<Classification>, ClassificationError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    type_code: Option<String>,
    #[serde(default)]
    extracted_data: Option<serde_json::Value>,
}

/// Classifier backed by an HTTP endpoint.
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    /// Build a client for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClassificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DocumentClassifier for HttpClassifier {
    async fn classify(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Option<Classification>, ClassificationError> {
        let mut part =
            reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        if let Some(content_type) = content_type {
            part = part.mime_str(content_type)?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(ClassificationError::HttpStatus(response.status().as_u16()));
        }

        let body: ClassifierResponse = response.json().await?;
        Ok(body
            .type_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .map(|type_code| Classification {
                type_code,
                extracted_data: body.extracted_data,
            }))
    }
}

// ---------------------------------------------------------------------------
// Disabled implementation
// ---------------------------------------------------------------------------

/// Classifier used when `CLASSIFIER_URL` is unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

#[async_trait]
impl DocumentClassifier for DisabledClassifier {
    async fn classify(
        &self,
        _file_name: &str,
        _content_type: Option<&str>,
        _bytes: &[u8],
    ) -> Result<Option<Classification>, ClassificationError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
