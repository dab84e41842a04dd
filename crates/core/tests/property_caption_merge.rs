use proptest::prelude::*;
use vidbrief_core::{
    captions::{MIN_SEGMENT_DURATION, merge_cues},
    types::CaptionCue,
};

const VOCAB: [&str; 8] = ["so", "the", "model", "is", "fast", "and", "cheap", "uh"];

fn arb_cue() -> impl Strategy<Value = CaptionCue> {
    (
        0.0f64..120.0,
        0.0f64..4.0,
        prop::collection::vec(prop::sample::select(VOCAB.to_vec()), 0..7),
    )
        .prop_map(|(start, len, words)| CaptionCue::new(start, start + len, words.join(" ")))
}

/// Cues whose texts are windows over a sequence of distinct words, each long
/// enough to survive both duration filters.
fn arb_window_cues() -> impl Strategy<Value = Vec<CaptionCue>> {
    prop::collection::vec((0usize..40, 1usize..8, 0.6f64..5.0), 1..30).prop_map(|windows| {
        windows
            .into_iter()
            .enumerate()
            .map(|(i, (offset, len, duration))| {
                let text = (offset..offset + len)
                    .map(|w| format!("w{w}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                let start = i as f64 * 1.5;
                CaptionCue::new(start, start + duration, text)
            })
            .collect()
    })
}

proptest! {
    /// Property: every merged segment is longer than the minimum duration
    #[test]
    fn prop_segments_respect_min_duration(cues in prop::collection::vec(arb_cue(), 0..40)) {
        if let Ok(segments) = merge_cues(&cues) {
            prop_assert!(!segments.is_empty());
            for seg in &segments {
                prop_assert!(seg.end > seg.start);
                prop_assert!(seg.duration() > MIN_SEGMENT_DURATION);
                prop_assert!(!seg.text.trim().is_empty());
            }
        }
    }

    /// Property: merged output contains no word that was not in the input
    #[test]
    fn prop_merge_only_removes_words(cues in prop::collection::vec(arb_cue(), 1..40)) {
        if let Ok(segments) = merge_cues(&cues) {
            for seg in &segments {
                for word in seg.text.split_whitespace() {
                    prop_assert!(VOCAB.contains(&word));
                }
                prop_assert!(!seg.text.contains("  "));
            }
        }
    }

    /// Property: merging already merged segments changes nothing
    ///
    /// Holds when segment words are distinct and nothing is filtered out;
    /// repeated phrases can expose a new overlap on a second pass.
    #[test]
    fn prop_merge_is_idempotent_on_distinct_words(cues in arb_window_cues()) {
        let once = merge_cues(&cues).expect("window cues always survive the filters");
        let as_cues: Vec<CaptionCue> = once.iter().map(CaptionCue::from).collect();
        let twice = merge_cues(&as_cues).expect("merged segments survive the filters");
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn repeated_phrases_can_overlap_again() {
    // "a b" then "b a b c": the only overlap is "b", leaving "a b c",
    // which overlaps all of "a b" on a second pass.
    let cues = vec![
        CaptionCue::new(0.0, 2.0, "a b"),
        CaptionCue::new(2.0, 4.0, "b a b c"),
    ];
    let once = merge_cues(&cues).unwrap();
    assert_eq!(once[1].text, "a b c");

    let as_cues: Vec<CaptionCue> = once.iter().map(CaptionCue::from).collect();
    let twice = merge_cues(&as_cues).unwrap();
    assert_eq!(twice[1].text, "c");
}
