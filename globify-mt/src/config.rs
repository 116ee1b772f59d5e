//! Project configuration, read from `globify.config.json`.
//!
//! ```json
//! {
//!   "translationType": "structured",
//!   "fileExtension": "json",
//!   "baseLanguage": "en",
//!   "languages": ["fr", "de", "zh-Hant"],
//!   "folder": "locales",
//!   "concurrency": 4
//! }
//! ```
//!
//! `translationType` also accepts the older `simple-json` / `ast-json` names.

use std::fs;
use std::path::{Path, PathBuf};

use globify::locale_file_path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::merge::TranslationMode;
use crate::translator::is_valid_locale;

pub const CONFIG_FILE_NAME: &str = "globify.config.json";

/// The only file format currently supported
pub const SUPPORTED_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no globify.config.json found in {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    InvalidMode(String),
    #[error("fileExtension must be 'json', found '{0}'")]
    UnsupportedExtension(String),
    #[error("{field} '{value}' must look like 'en' or 'zh-Hant'")]
    InvalidLocale { field: &'static str, value: String },
    #[error("folder cannot be empty")]
    EmptyFolder,
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// `literal` or `structured`
    pub translation_type: String,
    pub file_extension: String,
    pub base_language: String,
    #[serde(default)]
    pub languages: Vec<String>,
    pub folder: PathBuf,
    /// Maximum number of backend calls in flight per merge
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Config {
    /// Reads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `globify.config.json` from `dir`.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Err(ConfigError::NotFound(dir.to_path_buf()));
        }
        Self::load(&path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mode()?;

        if self.file_extension != SUPPORTED_EXTENSION {
            return Err(ConfigError::UnsupportedExtension(
                self.file_extension.clone(),
            ));
        }

        if !is_valid_locale(&self.base_language) {
            return Err(ConfigError::InvalidLocale {
                field: "baseLanguage",
                value: self.base_language.clone(),
            });
        }

        if let Some(invalid) = self.languages.iter().find(|l| !is_valid_locale(l)) {
            return Err(ConfigError::InvalidLocale {
                field: "language",
                value: invalid.clone(),
            });
        }

        if self.folder.as_os_str().is_empty() {
            return Err(ConfigError::EmptyFolder);
        }

        Ok(())
    }

    pub fn mode(&self) -> Result<TranslationMode, ConfigError> {
        self.translation_type
            .parse()
            .map_err(ConfigError::InvalidMode)
    }

    /// Path of the file holding `locale`'s messages.
    pub fn locale_file(&self, locale: &str) -> PathBuf {
        locale_file_path(&self.folder, locale, &self.file_extension)
    }

    /// Configured languages other than the base language, in file order.
    pub fn target_languages(&self) -> impl Iterator<Item = &str> {
        self.languages
            .iter()
            .map(String::as_str)
            .filter(move |l| *l != self.base_language)
    }
}
