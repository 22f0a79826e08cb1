/*!
 * Mock translator for testing.
 *
 * This module provides a scripted backend that simulates different behaviors:
 * - `MockTranslator::echo()` - Returns the payload unchanged
 * - `MockTranslator::prefixing(..)` - Rewrites every block's text
 * - `MockTranslator::no_content()` - Always returns the "no content" sentinel
 * - `MockTranslator::failing()` - Always fails with an error
 *
 * It also counts calls and tracks how many calls overlap in time, which the
 * concurrency tests rely on.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use super::{Translator, no_content};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Returns the payload unchanged
    Echo,
    /// Prefixes the text of every block
    Prefix(String),
    /// Always returns the "no content" sentinel
    NoContent,
    /// Drops the last block of the payload
    DropLastBlock,
    /// Repeats every block text four times
    Oversize,
    /// Fails the first `n` requests with the sentinel, then echoes
    FailFirst(usize),
    /// Fails every Nth request with an API error, echoes otherwise
    Intermittent { fail_every: usize },
    /// Always fails with an API error
    Failing,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub text: String,
    pub reference: String,
}

/// Mock translator with call accounting
#[derive(Debug)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Artificial latency per call
    delay: Option<Duration>,
    /// Total calls
    request_count: Arc<AtomicUsize>,
    /// Calls currently running
    in_flight: Arc<AtomicUsize>,
    /// Highest observed value of `in_flight`
    max_in_flight: Arc<AtomicUsize>,
    /// Every call, in arrival order
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn prefixing(prefix: impl Into<String>) -> Self {
        Self::new(MockBehavior::Prefix(prefix.into()))
    }

    pub fn no_content() -> Self {
        Self::new(MockBehavior::NoContent)
    }

    pub fn dropping_last_block() -> Self {
        Self::new(MockBehavior::DropLastBlock)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Adds latency to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Applies `f` to the text part of each `id\ntimespan\ntext` block
    pub fn map_block_texts(payload: &str, f: impl Fn(&str) -> String) -> String {
        payload
            .split("\n\n")
            .map(|block| {
                let mut parts = block.splitn(3, '\n');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(id), Some(timespan), Some(text)) => format!("{}\n{}\n{}", id, timespan, f(text)),
                    _ => block.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn respond(&self, count: usize, text: &str) -> Result<String, ProviderError> {
        match &self.behavior {
            MockBehavior::Echo => Ok(text.to_string()),
            MockBehavior::Prefix(prefix) => Ok(Self::map_block_texts(text, |t| format!("{}{}", prefix, t))),
            MockBehavior::NoContent => Ok(no_content(text)),
            MockBehavior::DropLastBlock => {
                let mut blocks: Vec<&str> = text.split("\n\n").collect();
                blocks.pop();
                Ok(blocks.join("\n\n"))
            }
            MockBehavior::Oversize => Ok(Self::map_block_texts(text, |t| t.repeat(4))),
            MockBehavior::FailFirst(n) => {
                if count < *n {
                    Ok(no_content(text))
                } else {
                    Ok(text.to_string())
                }
            }
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                    })
                } else {
                    Ok(text.to_string())
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),
        }
    }
}

impl Clone for MockTranslator {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            delay: self.delay,
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
            calls: Arc::clone(&self.calls),
        }
    }
}

/// Decrements the in-flight counter even if the call future is dropped
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, reference: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(MockCall {
            text: text.to_string(),
            reference: reference.to_string(),
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.respond(count, text)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
