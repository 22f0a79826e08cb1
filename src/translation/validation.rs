/*!
 * Response validation.
 *
 * A combined backend reply is parsed back into `index / timespan / text`
 * blocks and accepted only when it is structurally sound. Texts are taken
 * positionally; the index echoed by the backend is ignored.
 */

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ProviderError, TranslationError};
use crate::providers::NO_CONTENT_SENTINEL;
use crate::subtitle_processor::Segment;

/// Index line, timespan line (`-->`, `->` or any longer arrow), then the text
/// up to the next blank line or end of input. The text may be empty.
static BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*(\d+)[ \t]*\n([^\n]*-+>[^\n]*)(?:\n\n|\n?\z|\n(.*?)(?:\n\n|\n?\z))").unwrap()
});

/// Default ratio between translated and original text length that is still accepted
pub const DEFAULT_OVERSIZE_FACTOR: usize = 3;

/// One block parsed from a backend reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    /// Index as echoed by the backend; informational only
    pub index: String,
    pub timespan: String,
    pub text: String,
}

/// Removes zero-width spaces and carriage returns
fn normalize(response: &str) -> String {
    response.replace('\u{200b}', "").replace("\r\n", "\n").replace('\r', "\n")
}

/// Parses every well-formed block of `response`, in order
pub fn parse_blocks(response: &str) -> Vec<ParsedBlock> {
    let normalized = normalize(response);
    BLOCK_REGEX
        .captures_iter(&normalized)
        .map(|caps| ParsedBlock {
            index: caps[1].to_string(),
            timespan: caps[2].trim().to_string(),
            text: caps.get(3).map_or("", |m| m.as_str()).to_string(),
        })
        .collect()
}

/// Whether the reply is the degraded "no content" result
pub fn is_no_content(response: &str) -> bool {
    normalize(response).trim_start().starts_with(NO_CONTENT_SENTINEL)
}

/// Checks a backend reply against the segments of its batch
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    oversize_factor: usize,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseValidator {
    pub fn new() -> Self {
        Self {
            oversize_factor: DEFAULT_OVERSIZE_FACTOR,
        }
    }

    pub fn with_oversize_factor(mut self, factor: usize) -> Self {
        self.oversize_factor = factor.max(1);
        self
    }

    /// Validates the outcome of one backend call.
    ///
    /// # Returns
    /// * `Ok(texts)` - one translated text per original segment, in order
    /// * `Err(TranslationError)` - a retryable batch-level failure
    pub fn validate(
        &self,
        outcome: Result<String, ProviderError>,
        originals: &[Segment],
    ) -> Result<Vec<String>, TranslationError> {
        let response = outcome?;
        self.check_response(&response, originals)
    }

    /// Applies the content rules to a reply that was received
    pub fn check_response(&self, response: &str, originals: &[Segment]) -> Result<Vec<String>, TranslationError> {
        if is_no_content(response) {
            return Err(TranslationError::MalformedResponse(
                "backend returned no content".to_string(),
            ));
        }

        let blocks = parse_blocks(response);
        if blocks.len() < originals.len() {
            return Err(TranslationError::MalformedResponse(format!(
                "expected {} blocks, got {}",
                originals.len(),
                blocks.len()
            )));
        }
        if blocks.len() > originals.len() {
            warn!(
                "Response has {} blocks for {} segments, ignoring the surplus",
                blocks.len(),
                originals.len()
            );
        }

        for (index, (block, original)) in blocks.iter().zip(originals).enumerate() {
            let translated = block.text.chars().count();
            let source = original.text.chars().count();
            if translated > self.oversize_factor * source.max(1) {
                return Err(TranslationError::OversizeTranslation {
                    index,
                    translated,
                    original: source,
                });
            }
        }

        Ok(blocks
            .into_iter()
            .take(originals.len())
            .map(|block| block.text)
            .collect())
    }
}
