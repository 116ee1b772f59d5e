//! Machine translation of locale documents for globify
//!
//! This crate keeps a set of locale files in sync with a base locale. Each
//! run translates only the entries whose source text changed since the last
//! run, either as whole strings or, in structured mode, segment by segment so
//! placeholders, tags and plural branches survive translation intact.
//!
//! # Workflow Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use globify::Document;
//! use globify_mt::{MergeEngine, MockMode, MockTranslator, TranslationMode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source: Document = serde_json::from_str(r#"{"welcome": "Hello, {name}!"}"#).unwrap();
//!     let previous = Document::new();
//!
//!     let translator = Arc::new(MockTranslator::new(MockMode::Prefix));
//!     let engine = MergeEngine::new(translator, TranslationMode::Structured, 4);
//!     let report = engine.merge(&source, "en", "fr", &previous).await;
//!
//!     // {"welcome": "[fr] Hello, {name}[fr] !"}
//!     println!("{}", serde_json::to_string(&report.document).unwrap());
//! }
//! ```

pub mod app;
pub mod config;
pub mod deepl;
pub mod error;
pub mod merge;
pub mod mock;
pub mod template;
pub mod translator;


// Re-export main types for convenient access
pub use app::{AppError, LocaleSummary, RunSummary, Runner};
pub use config::{CONFIG_FILE_NAME, Config, ConfigError};
pub use deepl::DeeplTranslator;
pub use error::{MtError, MtResult};
pub use merge::{LeafFailure, MergeEngine, MergeReport, TranslationMode, TranslationRequest};
pub use mock::{MockMode, MockTranslator};
pub use template::{translate_message, translate_template};
pub use translator::{MachineTranslator, deepl_language_code, is_valid_locale, validate_locale};
