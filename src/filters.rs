/*!
 * Subtitle pre- and post-processing filters.
 *
 * These run outside the translation pipeline: the first three clean up the
 * source before it is batched, `trim_annotations` cleans up the result.
 */

use chrono::{Duration, NaiveTime};
use log::{debug, warn};

use crate::subtitle_processor::Segment;

/// Timestamp layout of an SRT timespan endpoint
const TIME_FORMAT: &str = "%H:%M:%S,%3f";

/// Separator between the two timestamps of a timespan
const TIMESPAN_SEPARATOR: &str = " --> ";

const MIN_DISPLAY_MS: i64 = 1200;
const MAX_DISPLAY_MS: i64 = 3000;
const MS_PER_CHAR: i64 = 100;
const NEXT_SEGMENT_GAP_MS: i64 = 50;

/// Collapses 2-6 character units repeated three or more times to two repetitions
pub fn reduce_repeated_patterns(segments: &mut [Segment]) {
    for segment in segments.iter_mut() {
        let mut text = segment.text.clone();
        loop {
            let collapsed = collapse_repeats(&text);
            if collapsed == text {
                break;
            }
            text = collapsed;
        }
        if text != segment.text {
            debug!("Segment {}: collapsed repeated patterns", segment.id);
            segment.text = text;
        }
    }
}

/// One left-to-right pass; the longest unit wins at each position
fn collapse_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let mut consumed = false;
        for unit in (2..=6).rev() {
            if i + unit * 3 > chars.len() {
                continue;
            }
            let pattern = &chars[i..i + unit];
            if pattern.iter().any(|c| c.is_whitespace()) {
                continue;
            }

            let mut repeats = 1;
            while i + (repeats + 1) * unit <= chars.len()
                && chars[i + repeats * unit..i + (repeats + 1) * unit] == *pattern
            {
                repeats += 1;
            }

            if repeats >= 3 {
                out.extend(pattern.iter().chain(pattern.iter()));
                i += repeats * unit;
                consumed = true;
                break;
            }
        }

        if !consumed {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

/// Whether `text` is one character repeated, e.g. `"ーーーー"`
pub fn is_repeated_character(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

/// Drops segments made of a single repeated character and renumbers ids from 1
pub fn remove_repeated_character_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let before = segments.len();
    let kept: Vec<Segment> = segments
        .into_iter()
        .filter(|segment| !is_repeated_character(&segment.text))
        .enumerate()
        .map(|(i, mut segment)| {
            segment.id = (i + 1).to_string();
            segment
        })
        .collect();

    if kept.len() != before {
        debug!("Removed {} repeated-character segments", before - kept.len());
    }
    kept
}

/// Parses `start --> end`
pub fn parse_timespan(timespan: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = timespan.split_once(TIMESPAN_SEPARATOR)?;
    let start = NaiveTime::parse_from_str(start.trim(), TIME_FORMAT).ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), TIME_FORMAT).ok()?;
    Some((start, end))
}

pub fn format_timespan(start: NaiveTime, end: NaiveTime) -> String {
    format!(
        "{}{}{}",
        start.format(TIME_FORMAT),
        TIMESPAN_SEPARATOR,
        end.format(TIME_FORMAT)
    )
}

/// Extends segments displayed for less than 1.2 seconds.
///
/// The new duration is 100 ms per character, clamped to 1.2-3 seconds, and
/// the end is pulled back to 50 ms before the next segment when it would
/// overlap it. Segments with unparseable timespans are left untouched.
pub fn extend_short_segments(segments: &mut [Segment]) {
    let next_starts: Vec<Option<NaiveTime>> = segments
        .iter()
        .skip(1)
        .map(|segment| parse_timespan(&segment.timespan).map(|(start, _)| start))
        .chain(std::iter::once(None))
        .collect();

    for (segment, next_start) in segments.iter_mut().zip(next_starts) {
        let Some((start, end)) = parse_timespan(&segment.timespan) else {
            warn!("Segment {}: cannot parse timespan '{}'", segment.id, segment.timespan);
            continue;
        };

        if end - start >= Duration::milliseconds(MIN_DISPLAY_MS) {
            continue;
        }

        let wanted = (segment.text.chars().count() as i64 * MS_PER_CHAR).clamp(MIN_DISPLAY_MS, MAX_DISPLAY_MS);
        let mut new_end = start + Duration::milliseconds(wanted);
        if let Some(next_start) = next_start {
            if new_end > next_start {
                new_end = next_start - Duration::milliseconds(NEXT_SEGMENT_GAP_MS);
            }
        }

        if new_end > end {
            segment.timespan = format_timespan(start, new_end);
        }
    }
}

/// Cuts translations that have more line breaks than their source.
///
/// Backends sometimes append notes after the translated lines; everything
/// past the source's line count is dropped.
pub fn trim_annotations(originals: &[Segment], translated: &mut [Segment]) {
    for (original, segment) in originals.iter().zip(translated.iter_mut()) {
        let source_lines = original.text.matches('\n').count() + 1;
        if segment.text.matches('\n').count() + 1 > source_lines {
            let trimmed: Vec<&str> = segment.text.split('\n').take(source_lines).collect();
            segment.text = trimmed.join("\n");
        }
    }
}
