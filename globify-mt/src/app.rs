//! Translating every configured locale file in a project.

use std::sync::Arc;

use globify::{Document, Storage, StorageError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::error::MtError;
use crate::merge::{LeafFailure, MergeEngine};
use crate::translator::MachineTranslator;

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("translator setup failed: {0}")]
    Translator(#[from] MtError),
}

/// Outcome for one target locale.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleSummary {
    pub locale: String,
    pub translated: usize,
    pub reused: usize,
    pub failures: Vec<LeafFailure>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Translatable leaves in the base locale file
    pub source_entries: usize,
    pub locales: Vec<LocaleSummary>,
}

impl RunSummary {
    pub fn total_failures(&self) -> usize {
        self.locales.iter().map(|l| l.failures.len()).sum()
    }
}

/// Reads the base locale file and brings every target locale file up to date.
pub struct Runner {
    config: Config,
    engine: MergeEngine,
    storage: Arc<dyn Storage>,
}

impl Runner {
    pub fn new(
        config: Config,
        translator: Arc<dyn MachineTranslator>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let engine = MergeEngine::new(translator, config.mode()?, config.concurrency);
        Ok(Self {
            config,
            engine,
            storage,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Targets are processed one after another. A storage error stops the
    /// run; files written for earlier targets are kept.
    pub async fn run(&self) -> Result<RunSummary, AppError> {
        let base = self.config.base_language.as_str();
        let base_path = self.config.locale_file(base);
        info!(
            "Translating {} into {:?} ({} mode, concurrency {})",
            base_path.display(),
            self.config.languages,
            self.engine.mode(),
            self.engine.concurrency()
        );
        let source = self.storage.read(&base_path)?;

        let mut summary = RunSummary {
            source_entries: source.leaf_count(),
            ..RunSummary::default()
        };
        for locale in self.config.target_languages() {
            let previous = self.read_previous(locale);
            let report = self.engine.merge(&source, base, locale, &previous).await;

            let target_path = self.config.locale_file(locale);
            self.storage.write(&target_path, &report.document)?;

            for failure in &report.failures {
                warn!("[{}] '{}' left untranslated: {}", locale, failure.path, failure.error);
            }
            info!(
                "Wrote {} ({} translated, {} reused, {} failed)",
                target_path.display(),
                report.translated,
                report.reused,
                report.failures.len()
            );

            summary.locales.push(LocaleSummary {
                locale: locale.to_string(),
                translated: report.translated,
                reused: report.reused,
                failures: report.failures,
            });
        }

        Ok(summary)
    }

    /// The existing translation for `locale`, or an empty document when there
    /// is none or it cannot be read.
    fn read_previous(&self, locale: &str) -> Document {
        let path = self.config.locale_file(locale);
        match self.storage.exists(&path) {
            Ok(true) => {}
            Ok(false) => return Document::new(),
            Err(e) => {
                warn!("Could not check {}: {}", path.display(), e);
                return Document::new();
            }
        }

        match self.storage.read(&path) {
            Ok(document) => {
                info!("Using {} as baseline", path.display());
                document
            }
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                Document::new()
            }
        }
    }
}
