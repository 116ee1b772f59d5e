//! DeepL API provider for machine translation
//!
//! # Authentication
//!
//! The provider loads the API key from the `DEEPL_API_KEY` environment
//! variable (a `.env` file in the working directory is honoured by the CLI).
//!
//! # Retries
//!
//! Rate limited (HTTP 429) responses and transport errors are retried with
//! exponential backoff and up to 30% random jitter. Any other failure is
//! returned immediately.
//!
//! # Example
//!
//! ```ignore
//! use globify_mt::{DeeplTranslator, MachineTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = DeeplTranslator::from_env()?;
//!     let result = provider.translate("Hello, world!", "en", "fr").await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{MtError, MtResult};
use crate::translator::{MachineTranslator, deepl_language_code};

const FREE_API_URL: &str = "https://api-free.deepl.com/v2/translate";

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    #[allow(dead_code)]
    detected_source_language: Option<String>,
    text: String,
}

/// DeepL API v2 provider
#[derive(Clone)]
pub struct DeeplTranslator {
    /// API key for authentication
    api_key: String,
    /// HTTP client for async requests
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    initial_backoff: Duration,
}

impl DeeplTranslator {
    /// Maximum characters per request text
    const MAX_CHARS_PER_STRING: usize = 128_000;

    /// Create a new DeeplTranslator with an explicit API key
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - New provider instance
    /// * `Err(MtError)` - If API key is empty or HTTP client creation fails
    pub fn new(api_key: String) -> MtResult<Self> {
        if api_key.trim().is_empty() {
            return Err(MtError::Config("API key cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MtError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: FREE_API_URL.to_string(),
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Create a DeeplTranslator from the `DEEPL_API_KEY` environment variable
    pub fn from_env() -> MtResult<Self> {
        let api_key = std::env::var("DEEPL_API_KEY").map_err(|_| {
            MtError::Config("DEEPL_API_KEY environment variable not set".to_string())
        })?;

        Self::new(api_key)
    }

    /// Point the provider at another endpoint, e.g. the paid API
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, initial_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff = initial_backoff;
        self
    }

    /// Backoff plus up to 30% random jitter
    fn with_jitter(backoff: Duration) -> Duration {
        let factor: f64 = rand::rng().random_range(0.0..0.3);
        backoff + backoff.mul_f64(factor)
    }

    async fn send_with_retries(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        let source_lang = deepl_language_code(source_locale);
        let target_lang = deepl_language_code(target_locale);
        let params = [
            ("text", text),
            ("target_lang", target_lang.as_str()),
            ("source_lang", source_lang.as_str()),
        ];

        let mut backoff = self.initial_backoff;
        let mut last_error: Option<MtError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let wait = Self::with_jitter(backoff);
                warn!(
                    "DeepL request failed, retrying in {:.2}s (attempt {}/{})",
                    wait.as_secs_f64(),
                    attempt,
                    self.max_retries
                );
                tokio::time::sleep(wait).await;
                backoff *= 2;
            }

            let response = match self
                .client
                .post(&self.base_url)
                .header(AUTHORIZATION, format!("DeepL-Auth-Key {}", self.api_key))
                .form(&params)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(MtError::from(e));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = None;
                continue;
            }

            let body = response.text().await?;
            if !status.is_success() {
                return Err(MtError::Translation(format!(
                    "DeepL API request failed with status {}: {}",
                    status, body
                )));
            }
            return Self::parse_response(&body);
        }

        Err(last_error.unwrap_or(MtError::RateLimited {
            attempts: self.max_retries + 1,
        }))
    }

    fn parse_response(body: &str) -> MtResult<String> {
        let response: DeeplResponse = serde_json::from_str(body).map_err(|e| {
            MtError::Translation(format!("Failed to parse DeepL response JSON: {}", e))
        })?;

        response
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| MtError::Translation("DeepL response contained no translations".to_string()))
    }
}

impl std::fmt::Debug for DeeplTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeeplTranslator")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for DeeplTranslator {
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        if text.is_empty() {
            return Ok(String::new());
        }
        if source_locale == target_locale {
            return Ok(text.to_string());
        }

        if text.chars().count() > Self::MAX_CHARS_PER_STRING {
            return Err(MtError::Translation(format!(
                "Text exceeds maximum length of {} characters",
                Self::MAX_CHARS_PER_STRING
            )));
        }

        debug!("DeepL {} -> {}: {:?}", source_locale, target_locale, text);
        self.send_with_retries(text, source_locale, target_locale)
            .await
    }

    fn provider_name(&self) -> &str {
        "DeepL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Initialization Tests ==========

    #[test]
    fn test_new_with_valid_key() {
        let provider = DeeplTranslator::new("test-api-key".to_string());
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().provider_name(), "DeepL");
    }

    #[test]
    fn test_new_with_empty_key() {
        match DeeplTranslator::new("".to_string()) {
            Err(MtError::Config(msg)) => assert!(msg.contains("empty")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_new_with_whitespace_key() {
        assert!(DeeplTranslator::new("   ".to_string()).is_err());
    }

    // ========== Shortcut Tests ==========

    #[tokio::test]
    async fn test_translate_empty_text() {
        let provider = DeeplTranslator::new("test-key".to_string()).unwrap();
        assert_eq!(provider.translate("", "en", "fr").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_translate_same_locale_is_identity() {
        let provider = DeeplTranslator::new("test-key".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9/unreachable");
        assert_eq!(
            provider.translate("Hello", "en", "en").await.unwrap(),
            "Hello"
        );
    }

    #[tokio::test]
    async fn test_translate_text_too_long() {
        let provider = DeeplTranslator::new("test-key".to_string()).unwrap();
        let long_text = "x".repeat(DeeplTranslator::MAX_CHARS_PER_STRING + 1);
        match provider.translate(&long_text, "en", "fr").await {
            Err(MtError::Translation(msg)) => assert!(msg.contains("exceeds maximum")),
            _ => panic!("Expected Translation error"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_after_retries() {
        let provider = DeeplTranslator::new("test-key".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9/v2/translate")
            .with_retry_policy(1, Duration::from_millis(1));
        let result = provider.translate("Hello", "en", "fr").await;
        assert!(matches!(result, Err(MtError::Network(_))));
    }

    #[tokio::test]
    async fn test_length_limit_counts_characters_not_bytes() {
        let provider = DeeplTranslator::new("test-key".to_string())
            .unwrap()
            .with_base_url("http://127.0.0.1:9/v2/translate")
            .with_retry_policy(0, Duration::from_millis(1));
        // Two bytes per character: over the limit in bytes, within it in characters.
        let text = "é".repeat(DeeplTranslator::MAX_CHARS_PER_STRING);
        let result = provider.translate(&text, "en", "fr").await;
        assert!(matches!(result, Err(MtError::Network(_))));
    }

    // ========== Response Parsing Tests ==========

    #[test]
    fn test_parse_response() {
        let body = r#"{"translations":[{"detected_source_language":"EN","text":"Bonjour"}]}"#;
        assert_eq!(DeeplTranslator::parse_response(body).unwrap(), "Bonjour");
    }

    #[test]
    fn test_parse_response_without_translations() {
        let result = DeeplTranslator::parse_response(r#"{"translations":[]}"#);
        assert!(matches!(result, Err(MtError::Translation(msg)) if msg.contains("no translations")));
    }

    #[test]
    fn test_parse_response_invalid_json() {
        assert!(DeeplTranslator::parse_response("<html>").is_err());
    }

    #[test]
    fn test_jitter_is_bounded() {
        let backoff = Duration::from_millis(1000);
        for _ in 0..50 {
            let wait = DeeplTranslator::with_jitter(backoff);
            assert!(wait >= backoff);
            assert!(wait <= Duration::from_millis(1300));
        }
    }

    // ========== Debug Implementation Test ==========

    #[test]
    fn test_debug_output() {
        let provider = DeeplTranslator::new("test-key".to_string()).unwrap();
        let debug_str = format!("{:?}", provider);
        assert!(debug_str.contains("***"));
        assert!(!debug_str.contains("test-key"));
    }

    // ========== Integration Tests (require real API key) ==========

    #[tokio::test]
    #[ignore] // Run with: cargo test --ignored
    async fn test_real_api_single_translation() {
        if std::env::var("DEEPL_API_KEY").is_err() {
            eprintln!("Skipping: DEEPL_API_KEY not set");
            return;
        }

        let provider = DeeplTranslator::from_env().unwrap();
        let result = provider.translate("Hello", "en", "fr").await.unwrap();
        println!("Translation: {} → {}", "Hello", result);
        assert!(!result.is_empty());
    }
}
