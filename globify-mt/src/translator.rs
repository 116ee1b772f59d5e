//! Machine Translation trait and utilities
//!
//! This module defines the `MachineTranslator` trait for backend abstraction,
//! so the merge engine never depends on a specific provider (DeepL, mock, ...).
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
//!     println!("{}", result); // "Bonjour, le monde !"
//!     Ok(())
//! }
//! ```

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::{MtError, MtResult};

/// Accepted locale codes: a two-letter language, optionally followed by a
/// title-cased four-letter script (`en`, `zh-Hant`).
static LOCALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-[A-Z][a-z]{3})?$").expect("locale pattern is a valid regex")
});

/// Generic trait for machine translation backends
///
/// Implementations handle the actual translation work, whether through an
/// API (DeepL) or deterministic logic (Mock). Any retry policy belongs to the
/// implementation; an error returned here is final for that call.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate a single text string from source to target locale
    ///
    /// # Arguments
    ///
    /// * `text` - The text to translate
    /// * `source_locale` - Source language code (e.g., "en", "zh-Hans")
    /// * `target_locale` - Target language code (e.g., "fr")
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The translated text
    /// * `Err(MtError)` - If translation fails
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String>;

    /// Get the name of this translation provider, used in logs
    fn provider_name(&self) -> &str;
}

/// Checks a locale code against the accepted format.
///
/// ```ignore
/// validate_locale("en")?;      // OK
/// validate_locale("zh-Hant")?; // OK
/// validate_locale("en-US").unwrap_err();
/// ```
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::InvalidLocale("Locale code is empty".to_string()));
    }
    if !is_valid_locale(locale) {
        return Err(MtError::InvalidLocale(format!(
            "'{}' must look like 'en' or 'zh-Hant'",
            locale
        )));
    }
    Ok(())
}

pub fn is_valid_locale(locale: &str) -> bool {
    LOCALE_PATTERN.is_match(locale)
}

/// Language code in the form DeepL expects: `en` → `EN`, `zh-Hant` → `ZH-HANT`
pub fn deepl_language_code(locale: &str) -> String {
    locale.to_uppercase()
}
