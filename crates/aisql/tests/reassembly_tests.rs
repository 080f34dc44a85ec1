//! Stream reassembly under incremental, cumulative and mixed delivery
//!
//! Covers the concrete delivery scenarios plus property tests for:
//! - Pure deltas concatenate in order
//! - Pure snapshots collapse to the last one
//! - Empty fragments never change the result

use proptest::prelude::*;

use aisql::stream::{
    DeliveryMode, SseDecoder, SseEvent, StreamReassembler, fragment_from_event, reassemble,
    reassemble_sse,
};

fn fold<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    fragments
        .into_iter()
        .fold(StreamReassembler::new(), reassemble)
        .into_text()
}

// =============================================================================
// Concrete Scenarios
// =============================================================================

const FULL: &str = "人工智能是计算机科学的一个分支。";

#[test]
fn cumulative_snapshots_do_not_duplicate() {
    let text = fold(["人工智能", "人工智能是计算机科学", FULL]);
    assert_eq!(text, FULL);
    assert_eq!(text.chars().count(), 16);
}

#[test]
fn incremental_deltas_concatenate() {
    assert_eq!(fold(["人工智能", "是计算机科学", "的一个分支。"]), FULL);
}

#[test]
fn delta_then_full_reset() {
    let mut reassembler = StreamReassembler::new();
    reassembler.extend(["人工智能", "是计算机科学", FULL]);

    assert_eq!(reassembler.accumulated(), FULL);
    assert_eq!(reassembler.mode(), DeliveryMode::Mixed);
}

#[test]
fn sse_capture_split_at_every_byte() {
    let capture = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"人工智能\"}}]}\r\n\r\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"是计算机科学\"}}]}\n\n",
        "data:{\"choices\":[{\"delta\":{\"content\":\"的一个分支。\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let expected = reassemble_sse(capture).unwrap();
    assert_eq!(expected.content, FULL);

    let bytes = capture.as_bytes();
    for split in 1..bytes.len() {
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(&bytes[..split]);
        events.extend(decoder.feed(&bytes[split..]));
        events.extend(decoder.finish());

        let mut reassembler = StreamReassembler::new();
        for event in events {
            if let SseEvent::Data(data) = event {
                if let Some(fragment) = fragment_from_event(&data).unwrap() {
                    reassembler.push(&fragment);
                }
            }
        }
        assert_eq!(reassembler.accumulated(), FULL, "split at byte {split}");
    }
}

// =============================================================================
// Properties
// =============================================================================

/// Deltas that can never contain one another: each carries its own `<i>` tag
fn distinct_deltas() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{0,6}", 1..12).prop_map(|bodies| {
        bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| format!("<{i}>{body}"))
            .collect()
    })
}

/// Snapshots where each one wraps the previous in new text on either side
fn growing_snapshots() -> impl Strategy<Value = Vec<String>> {
    (
        "[a-z]{1,4}",
        prop::collection::vec(("[a-z]{0,3}", "[a-z]{0,3}"), 0..10),
    )
        .prop_map(|(seed, wraps)| {
            let mut snapshots = vec![seed];
            for (before, after) in wraps {
                let previous = snapshots.last().cloned().unwrap_or_default();
                snapshots.push(format!("{before}{previous}{after}"));
            }
            snapshots
        })
}

proptest! {
    #[test]
    fn pure_deltas_concatenate(fragments in distinct_deltas()) {
        let text = fold(fragments.iter().map(String::as_str));
        prop_assert_eq!(text, fragments.concat());
    }

    #[test]
    fn pure_snapshots_keep_the_last(snapshots in growing_snapshots()) {
        let text = fold(snapshots.iter().map(String::as_str));
        prop_assert_eq!(&text, snapshots.last().unwrap());
    }

    #[test]
    fn empty_fragments_are_ignored(
        fragments in prop::collection::vec("[ab]{0,3}", 0..12),
        inserts in prop::collection::vec(0usize..16, 0..8),
    ) {
        let mut padded = fragments.clone();
        for at in inserts {
            let at = at.min(padded.len());
            padded.insert(at, String::new());
        }

        prop_assert_eq!(
            fold(fragments.iter().map(String::as_str)),
            fold(padded.iter().map(String::as_str))
        );
    }

    #[test]
    fn push_and_pure_fold_agree(fragments in prop::collection::vec("[abc]{0,4}", 0..10)) {
        let mut reassembler = StreamReassembler::new();
        for fragment in &fragments {
            reassembler.push(fragment);
        }
        let folded = fragments
            .iter()
            .fold(StreamReassembler::new(), |state, f| reassemble(state, f));
        prop_assert_eq!(reassembler, folded);
    }
}
