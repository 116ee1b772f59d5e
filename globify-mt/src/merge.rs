//! Incremental translation of whole locale documents.
//!
//! [`MergeEngine::merge`] walks the source document and builds the target
//! document level by level. Leaves whose previous translation still matches
//! are reused, everything else goes through the backend. All leaf
//! translations of one merge share a single semaphore, so the number of
//! backend calls in flight never exceeds the configured concurrency, however
//! deep the document is.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use globify::{Document, Entry, is_metadata_key};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{MtError, MtResult};
use crate::template::translate_message;
use crate::translator::MachineTranslator;

/// How a changed leaf is sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// The whole string is translated as one unit.
    #[default]
    #[serde(alias = "simple-json")]
    Literal,
    /// The string is parsed as a template and only literal text is translated.
    #[serde(alias = "ast-json")]
    Structured,
}

impl fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationMode::Literal => write!(f, "literal"),
            TranslationMode::Structured => write!(f, "structured"),
        }
    }
}

impl FromStr for TranslationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" | "simple-json" => Ok(TranslationMode::Literal),
            "structured" | "ast-json" => Ok(TranslationMode::Structured),
            other => Err(format!(
                "unknown translation mode '{}', expected 'literal' or 'structured'",
                other
            )),
        }
    }
}

/// A leaf that needs a fresh translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Dot-joined key path, e.g. `menu.file.open`
    pub path: String,
    pub source: String,
    /// The stale translation, if the target document had one
    pub previous: Option<String>,
}

/// A leaf whose translation failed. The merged document holds its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafFailure {
    pub path: String,
    pub error: MtError,
}

/// Result of merging one document into one target locale.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub document: Document,
    pub failures: Vec<LeafFailure>,
    /// Leaves that went through the backend successfully
    pub translated: usize,
    /// Leaves copied from the previous translation
    pub reused: usize,
}

impl MergeReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Translates documents with a shared backend and a bounded number of
/// concurrent calls.
#[derive(Clone)]
pub struct MergeEngine {
    translator: Arc<dyn MachineTranslator>,
    mode: TranslationMode,
    concurrency: usize,
}

impl fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeEngine")
            .field("translator", &self.translator.provider_name())
            .field("mode", &self.mode)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl MergeEngine {
    /// A concurrency of 0 is treated as 1 (fully sequential).
    pub fn new(
        translator: Arc<dyn MachineTranslator>,
        mode: TranslationMode,
        concurrency: usize,
    ) -> Self {
        Self {
            translator,
            mode,
            concurrency: concurrency.max(1),
        }
    }

    pub fn mode(&self) -> TranslationMode {
        self.mode
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Builds the `to` document from `source`, reusing leaves of `previous`
    /// that are identical to their source.
    ///
    /// Backend failures never abort the merge: the failed leaf keeps its
    /// source text and the failure is listed in the report.
    pub async fn merge(
        &self,
        source: &Document,
        from: &str,
        to: &str,
        previous: &Document,
    ) -> MergeReport {
        let run = MergeRun {
            engine: self,
            from,
            to,
            pool: Semaphore::new(self.concurrency),
        };
        let outcome = run.merge_level(source, Some(previous), String::new()).await;

        MergeReport {
            document: outcome.document,
            failures: outcome.failures,
            translated: outcome.translated,
            reused: outcome.reused,
        }
    }

    async fn translate_text(&self, text: &str, from: &str, to: &str) -> MtResult<String> {
        if text.is_empty() || from == to {
            return Ok(text.to_string());
        }
        match self.mode {
            TranslationMode::Literal => self.translator.translate(text, from, to).await,
            TranslationMode::Structured => {
                translate_message(text, from, to, self.translator.as_ref()).await
            }
        }
    }
}

/// State shared by every level of a single merge.
struct MergeRun<'a> {
    engine: &'a MergeEngine,
    from: &'a str,
    to: &'a str,
    pool: Semaphore,
}

/// Result of one nesting level, owned by the task that built it.
#[derive(Default)]
struct LevelOutcome {
    document: Document,
    failures: Vec<LeafFailure>,
    translated: usize,
    reused: usize,
}

enum Merged {
    Leaf(String, Option<LeafFailure>),
    Subtree(LevelOutcome),
}

impl LevelOutcome {
    fn absorb(&mut self, key: &str, merged: Merged) {
        match merged {
            Merged::Leaf(text, None) => {
                self.translated += 1;
                self.document.insert(key, Entry::Leaf(text));
            }
            Merged::Leaf(text, Some(failure)) => {
                self.failures.push(failure);
                self.document.insert(key, Entry::Leaf(text));
            }
            Merged::Subtree(child) => {
                self.translated += child.translated;
                self.reused += child.reused;
                self.failures.extend(child.failures);
                self.document.insert(key, Entry::Subtree(child.document));
            }
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

impl MergeRun<'_> {
    fn merge_level<'b>(
        &'b self,
        source: &'b Document,
        previous: Option<&'b Document>,
        path: String,
    ) -> BoxFuture<'b, LevelOutcome> {
        Box::pin(async move {
            let mut outcome = LevelOutcome::default();
            let mut pending: Vec<BoxFuture<'b, (&'b str, Merged)>> = Vec::new();

            for (key, entry) in source {
                if is_metadata_key(key) {
                    outcome.document.insert(key, entry.clone());
                    continue;
                }

                let previous_entry = previous.and_then(|p| p.get(key));
                let child_path = join_path(&path, key);

                match entry {
                    Entry::Passthrough(_) => {
                        outcome.document.insert(key, entry.clone());
                    }
                    Entry::Leaf(text) => match previous_entry.and_then(Entry::as_leaf) {
                        Some(prev) if prev == text => {
                            debug!("Reusing '{}'", child_path);
                            outcome.reused += 1;
                            outcome.document.insert(key, Entry::Leaf(prev.to_string()));
                        }
                        prev => {
                            let request = TranslationRequest {
                                path: child_path,
                                source: text.clone(),
                                previous: prev.map(str::to_string),
                            };
                            pending.push(
                                async move { (key.as_str(), self.translate_leaf(request).await) }
                                    .boxed(),
                            );
                        }
                    },
                    Entry::Subtree(child) => {
                        let previous_child = previous_entry.and_then(Entry::as_subtree);
                        pending.push(
                            async move {
                                let merged =
                                    self.merge_level(child, previous_child, child_path).await;
                                (key.as_str(), Merged::Subtree(merged))
                            }
                            .boxed(),
                        );
                    }
                }
            }

            for (key, merged) in join_all(pending).await {
                outcome.absorb(key, merged);
            }
            outcome
        })
    }

    async fn translate_leaf(&self, request: TranslationRequest) -> Merged {
        let TranslationRequest {
            path,
            source,
            previous,
        } = request;

        let result = match self.pool.acquire().await {
            Ok(_permit) => {
                debug!(
                    "Translating '{}' ({})",
                    path,
                    if previous.is_some() { "changed" } else { "new" }
                );
                self.engine.translate_text(&source, self.from, self.to).await
            }
            Err(_) => Err(MtError::Translation("translation pool closed".to_string())),
        };

        match result {
            Ok(translated) => Merged::Leaf(translated, None),
            Err(error) => {
                warn!(
                    "Failed to translate '{}' to {}: {}, keeping source text",
                    path, self.to, error
                );
                Merged::Leaf(source, Some(LeafFailure { path, error }))
            }
        }
    }
}
