/*!
 * Tests for segment batching
 */

use stbatch::errors::TranslationError;
use stbatch::subtitle_processor::format_block;
use stbatch::translation::batch::{BLOCK_SEPARATOR, plan_batches, single_segment_batch};

use crate::common::segments;

/// Texts of varying length, some multi-line, some non-ASCII
fn varied_texts() -> Vec<String> {
    (0..60)
        .map(|i| match i % 4 {
            0 => "short".to_string(),
            1 => format!("line {}\nsecond line", i),
            2 => "日本語のテキスト".repeat(1 + i % 3),
            _ => "x".repeat(5 + (i * 13) % 40),
        })
        .collect()
}

#[test]
fn test_planBatches_withReference_shouldPartitionAndRespectBudget() {
    let owned = varied_texts();
    let texts: Vec<&str> = owned.iter().map(String::as_str).collect();
    let input = segments(&texts);
    let reference = segments(&texts[..30]);

    for budget in [200, 350, 1000, 5000] {
        let batches = plan_batches(&input, &reference, budget).unwrap();

        let mut next = 0;
        for batch in &batches {
            assert_eq!(batch.start_index, next, "gap or overlap at budget {}", budget);
            assert!(batch.end_index > batch.start_index);
            assert!(batch.size() <= budget);
            next = batch.end_index;
        }
        assert_eq!(next, input.len());
    }
}

#[test]
fn test_planBatches_payloadShouldJoinBlocksWithBlankLines() {
    let input = segments(&["Hello", "World", "Foo"]);
    let batches = plan_batches(&input, &[], 10_000).unwrap();
    assert_eq!(batches.len(), 1);

    let expected: Vec<String> = input.iter().map(format_block).collect();
    assert_eq!(batches[0].payload, expected.join(BLOCK_SEPARATOR));
}

#[test]
fn test_planBatches_withBudgetForTwoBlocks_shouldNotLeaveSingletons() {
    let input = segments(&["a", "b", "c", "d", "e", "f", "g"]);
    let largest = input.iter().map(|s| format_block(s).chars().count()).max().unwrap();

    let batches = plan_batches(&input, &[], 2 * largest + BLOCK_SEPARATOR.len()).unwrap();
    let (last, rest) = batches.split_last().unwrap();
    assert!(rest.iter().all(|batch| batch.len() >= 2));
    assert!(last.len() >= 1);
}

#[test]
fn test_planBatches_withOversizedSegmentLater_shouldFailWithItsId() {
    let long = "y".repeat(500);
    let input = segments(&["ok", "fine", &long, "ok"]);

    match plan_batches(&input, &[], 100) {
        Err(TranslationError::SegmentTooLarge { id, budget, .. }) => {
            assert_eq!(id, "3");
            assert_eq!(budget, 100);
        }
        other => panic!("expected SegmentTooLarge, got {:?}", other),
    }
}

#[test]
fn test_singleSegmentBatch_shouldCarryAlignedReference() {
    let input = segments(&["one", "two"]);
    let reference = segments(&["uno", "dos"]);

    let single = single_segment_batch(&input, &reference, 1);
    assert_eq!(single.range(), 1..2);
    assert_eq!(single.payload, format_block(&input[1]));
    assert_eq!(single.reference_payload, format_block(&reference[1]));

    let without = single_segment_batch(&input, &[], 0);
    assert!(without.reference_payload.is_empty());
}
