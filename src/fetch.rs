use std::time::Duration;

use log::debug;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::model::{RawContent, ScanRequest};

/// Retrieves raw content for a scan request: the HTML document behind a
/// URL, or the validated bytes of an uploaded photo. Does not retry;
/// resubmitting is the caller's decision.
pub struct SourceFetcher {
    client: Client,
    max_html_bytes: usize,
    max_image_bytes: usize,
}

impl SourceFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to create HTTP client");

        SourceFetcher {
            client,
            max_html_bytes: config.max_html_bytes,
            max_image_bytes: config.max_image_bytes,
        }
    }

    pub async fn fetch(&self, request: ScanRequest) -> Result<RawContent, FetchError> {
        match request {
            ScanRequest::Url(url) => self.fetch_url(url).await,
            ScanRequest::Image { bytes, mime } => self.accept_image(bytes, &mime),
        }
    }

    /// GET the page, following redirects, enforcing the timeout and the
    /// body-size ceiling. The ceiling is checked while the body streams in
    /// so an oversized page is abandoned early.
    async fn fetch_url(&self, url: String) -> Result<RawContent, FetchError> {
        debug!("Fetching {}", url);

        let mut response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_html_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_html_bytes,
                });
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_html_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_html_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&body).into_owned();
        debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(RawContent::Html { url, body })
    }

    /// Validate an uploaded photo without any network call. Runs before the
    /// recognition capability ever sees the payload.
    fn accept_image(&self, bytes: Vec<u8>, mime: &str) -> Result<RawContent, FetchError> {
        if !mime.starts_with("image/") {
            return Err(FetchError::InvalidType(mime.to_string()));
        }
        if bytes.len() > self.max_image_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_image_bytes,
            });
        }

        debug!("Accepted {} image of {} bytes", mime, bytes.len());
        Ok(RawContent::Image { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> SourceFetcher {
        SourceFetcher::new(&FetchConfig::default())
    }

    #[tokio::test]
    async fn rejects_non_image_mime() {
        let result = fetcher()
            .fetch(ScanRequest::Image {
                bytes: vec![0u8; 16],
                mime: "application/pdf".to_string(),
            })
            .await;

        assert!(matches!(result, Err(FetchError::InvalidType(ref t)) if t == "application/pdf"));
    }

    #[tokio::test]
    async fn rejects_oversized_image_before_recognition() {
        // 11 MB exceeds the 10 MB ceiling
        let result = fetcher()
            .fetch(ScanRequest::Image {
                bytes: vec![0u8; 11 * 1024 * 1024],
                mime: "image/jpeg".to_string(),
            })
            .await;

        assert!(matches!(result, Err(FetchError::TooLarge { .. })));
    }

    #[tokio::test]
    async fn accepts_image_at_the_ceiling() {
        let result = fetcher()
            .fetch(ScanRequest::Image {
                bytes: vec![0u8; 1024],
                mime: "image/png".to_string(),
            })
            .await;

        assert!(matches!(result, Ok(RawContent::Image { ref bytes }) if bytes.len() == 1024));
    }
}
