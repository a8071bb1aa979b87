use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::OcrConfig;
use crate::error::ExtractError;

/// Pluggable text-recognition capability for photographed recipe pages.
/// The pipeline only needs raw text lines back; model choice, latency and
/// accuracy are the implementation's concern.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, ExtractError>;
}

/// Recognizer backed by a Vision-style HTTP annotate endpoint. The image
/// is shipped base64-encoded; the response carries the full detected text
/// in one annotation.
pub struct VisionRecognizer {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl VisionRecognizer {
    /// Build from configuration; None when no endpoint or key is configured,
    /// which disables the image scan path.
    pub fn from_config(config: &OcrConfig) -> Option<Self> {
        let endpoint = config.endpoint.clone()?;
        let api_key = config.api_key.clone()?;
        Some(VisionRecognizer {
            client: Client::new(),
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<String, ExtractError> {
        let base64_image = STANDARD.encode(image);

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let request_body = json!({
            "requests": [{
                "image": { "content": base64_image },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        debug!("Sending recognition request for {} image bytes", image.len());

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ExtractError::Recognizer(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Recognizer(format!(
                "recognition endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Recognizer(e.to_string()))?;

        let text = body["responses"][0]["fullTextAnnotation"]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if text.trim().is_empty() {
            return Err(ExtractError::Recognizer(
                "no text detected in image".to_string(),
            ));
        }

        debug!("Recognized {} characters of text", text.len());

        Ok(text)
    }
}
