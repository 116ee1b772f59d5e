//! Mock Machine Translator for testing
//!
//! This module provides a deterministic, API-free translator for testing
//! the merge engine without requiring API keys or network access. It also
//! backs the CLI's `--mock` flag for dry runs.
//!
//! # Example
//!
//! ```ignore
//! use globify_mt::{MachineTranslator, MockMode, MockTranslator};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Prefix);
//!     let result = mock.translate("hello", "en", "fr").await.unwrap();
//!     assert_eq!(result, "[fr] hello");
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MtError, MtResult};
use crate::translator::MachineTranslator;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Prepend the target locale: "hello" → "[fr] hello"
    Prefix,

    /// Append locale suffix: "hello" → "hello_fr"
    Suffix,

    /// Use predefined mappings for realistic translations
    /// (text, target_locale) → translation, falling back to `Prefix`
    Mappings(HashMap<(String, String), String>),

    /// Simulate API errors for every call
    Error(String),

    /// Fail only for the listed source texts, `Prefix` for everything else
    FailOn(HashSet<String>),

    /// No-op: return input unchanged
    NoOp,
}

#[derive(Debug, Default)]
struct CallStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Mock translator that simulates various translation scenarios
///
/// Clones share their call statistics, so a test can hand a clone to the
/// engine and inspect the original afterwards.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    stats: Arc<CallStats>,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Create a MockTranslator with simulated network delay
    ///
    /// ```ignore
    /// let mock = MockTranslator::with_delay(MockMode::Prefix, 50);
    /// // Each translation will have ~50ms delay
    /// ```
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode,
            delay_ms,
            stats: Arc::new(CallStats::default()),
        }
    }

    /// Convenience constructor for `MockMode::FailOn`
    pub fn failing_on<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockMode::FailOn(texts.into_iter().map(Into::into).collect()))
    }

    /// Number of `translate` calls made so far
    pub fn calls(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in flight at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.stats.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn apply_translation(&self, text: &str, target: &str) -> MtResult<String> {
        let prefixed = || format!("[{}] {}", target, text);
        match &self.mode {
            MockMode::Prefix => Ok(prefixed()),
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => {
                let key = (text.to_string(), target.to_string());
                Ok(map.get(&key).cloned().unwrap_or_else(prefixed))
            }
            MockMode::Error(msg) => Err(MtError::Translation(msg.clone())),
            MockMode::FailOn(texts) if texts.contains(text) => Err(MtError::Translation(
                format!("mock failure for '{}'", text),
            )),
            MockMode::FailOn(_) => Ok(prefixed()),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats
            .peak_in_flight
            .fetch_max(current, Ordering::SeqCst);

        self.apply_delay().await;
        let result = self.apply_translation(text, target_locale);

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn provider_name(&self) -> &str {
        "Mock Translator"
    }
}
