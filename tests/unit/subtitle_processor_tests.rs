/*!
 * Tests for SRT reading and writing
 */

use anyhow::Result;
use stbatch::errors::SubtitleError;
use stbatch::subtitle_processor::{parse_srt_string, read_srt_file, write_srt_file};

use crate::common::{create_temp_dir, create_test_file, create_test_subtitle};

#[test]
fn test_readSrtFile_shouldParseSample() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = create_test_subtitle(dir.path(), "sample.srt")?;

    let segments = read_srt_file(&path)?;
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].id, "1");
    assert_eq!(segments[1].timespan, "00:00:05,000 --> 00:00:09,000");
    assert_eq!(segments[2].text, "For testing purposes.");
    assert!(segments.iter().all(|s| s.error.is_none()));
    Ok(())
}

#[test]
fn test_writeSrtFile_thenRead_shouldPreserveSegments() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = create_test_subtitle(dir.path(), "sample.srt")?;
    let segments = read_srt_file(&path)?;

    let out = dir.path().join("out.srt");
    write_srt_file(&segments, &segments, &out, false)?;
    assert_eq!(read_srt_file(&out)?, segments);
    Ok(())
}

#[test]
fn test_writeSrtFile_bilingual_shouldPutOriginalAboveTranslation() -> Result<()> {
    let dir = create_temp_dir()?;
    let originals = parse_srt_string("1\n00:00:01,000 --> 00:00:02,000\nこんにちは\n")?;
    let mut translated = originals.clone();
    translated[0].text = "Hello".to_string();

    let out = dir.path().join("bilingual.srt");
    write_srt_file(&translated, &originals, &out, true)?;

    let content = std::fs::read_to_string(&out)?;
    assert_eq!(content, "1\n00:00:01,000 --> 00:00:02,000\nこんにちは\nHello\n\n");
    Ok(())
}

#[test]
fn test_readSrtFile_withMissingTimespan_shouldFail() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = create_test_file(dir.path(), "broken.srt", "1\n00:00:01,000 --> 00:00:02,000\nOk\n\n2\n")?;

    let result = read_srt_file(&path);
    assert!(matches!(result, Err(SubtitleError::MalformedEntry { .. })));
    Ok(())
}

#[test]
fn test_readSrtFile_withMissingFile_shouldReturnIoError() {
    let result = read_srt_file("/definitely/not/here.srt");
    assert!(matches!(result, Err(SubtitleError::Io(_))));
}
