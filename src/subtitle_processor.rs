use std::fmt;
use std::fs;
use std::path::Path;
use log::{debug, warn};

use crate::errors::{SegmentError, SubtitleError};

// @module: Subtitle segments and SRT reading/writing

// @struct: Single timed subtitle segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    // @field: Sequential label, e.g. "12"
    pub id: String,

    // @field: Opaque range, e.g. "00:00:01,000 --> 00:00:02,500"
    pub timespan: String,

    // @field: Subtitle text, may contain line breaks
    pub text: String,

    // @field: Sticky per-segment failure
    pub error: Option<SegmentError>,
}

impl Segment {
    /// Creates a segment without error state
    pub fn new(id: impl Into<String>, timespan: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timespan: timespan.into(),
            text: text.into(),
            error: None,
        }
    }

    /// Whether a translation failure was recorded for this segment
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Wire block of a segment: `id\ntimespan\ntext`.
///
/// This is the unit the batcher concatenates and the shape the response
/// validator expects back from the backend.
pub fn format_block(segment: &Segment) -> String {
    let mut block = String::with_capacity(segment.id.len() + segment.timespan.len() + segment.text.len() + 2);
    block.push_str(&segment.id);
    block.push('\n');
    block.push_str(&segment.timespan);
    block.push('\n');
    block.push_str(&segment.text);
    block
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{}", self.timespan)?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Parses SRT content into segments.
///
/// A blank line closes a segment; the first line of a segment is its id, the
/// second its timespan and every further line belongs to the text. Runs of
/// blank lines are ignored and a final segment without trailing blank line is
/// kept.
pub fn parse_srt_string(content: &str) -> Result<Vec<Segment>, SubtitleError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut segments = Vec::new();
    let mut id: Option<String> = None;
    let mut timespan: Option<String> = None;
    let mut text_lines: Vec<&str> = Vec::new();
    let mut started_at = 0;

    // Trailing "" closes the last open entry
    for (line_no, raw) in content.lines().chain(std::iter::once("")).enumerate() {
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() {
            if let Some(entry_id) = id.take() {
                let Some(entry_timespan) = timespan.take() else {
                    return Err(SubtitleError::MalformedEntry {
                        id: entry_id,
                        line: started_at,
                        message: "missing timespan line".to_string(),
                    });
                };
                segments.push(Segment::new(entry_id, entry_timespan, text_lines.join("\n")));
                text_lines.clear();
            }
            continue;
        }

        if id.is_none() {
            id = Some(line.trim().to_string());
            started_at = line_no + 1;
        } else if timespan.is_none() {
            timespan = Some(line.trim().to_string());
        } else {
            text_lines.push(line);
        }
    }

    debug!("Parsed {} subtitle segments", segments.len());
    Ok(segments)
}

/// Reads and parses an SRT file
pub fn read_srt_file<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>, SubtitleError> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_srt_string(&content)
}

/// Renders translated segments as SRT.
///
/// In bilingual mode each entry carries the original text above the
/// translation; originals are matched by position.
pub fn render_srt(translated: &[Segment], originals: &[Segment], bilingual: bool) -> String {
    let mut out = String::new();
    for (i, segment) in translated.iter().enumerate() {
        out.push_str(&segment.id);
        out.push('\n');
        out.push_str(&segment.timespan);
        out.push('\n');
        if bilingual {
            if let Some(original) = originals.get(i) {
                out.push_str(&original.text);
                out.push('\n');
            } else {
                warn!("No original text for segment {} in bilingual output", segment.id);
            }
        }
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }
    out
}

/// Writes translated segments to an SRT file
pub fn write_srt_file<P: AsRef<Path>>(
    translated: &[Segment],
    originals: &[Segment],
    path: P,
    bilingual: bool,
) -> Result<(), SubtitleError> {
    fs::write(path.as_ref(), render_srt(translated, originals, bilingual))?;
    Ok(())
}
