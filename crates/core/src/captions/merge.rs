//! Collapses rolling auto-caption cues into non-redundant segments.
//!
//! Auto-generated captions repeat the tail of the previous line at the start
//! of the next one while the caption window scrolls. Each incoming cue is
//! compared word-by-word against the last merged segment; the longest run of
//! words that is both a suffix of that segment and a prefix of the cue is
//! dropped from the cue.

use crate::types::{CaptionCue, Segment};

use super::CaptionError;

/// Cues at or below this duration are treated as noise and dropped before merging.
pub const MIN_CUE_DURATION: f64 = 0.1;

/// Merged segments at or below this duration are dropped after merging.
pub const MIN_SEGMENT_DURATION: f64 = 0.5;

/// Normalize whitespace and drop empty or noise cues.
pub fn clean_cues(cues: &[CaptionCue]) -> Vec<CaptionCue> {
    cues.iter()
        .filter_map(|cue| {
            let text = cue.text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty() && cue.duration() > MIN_CUE_DURATION)
                .then(|| CaptionCue::new(cue.start, cue.end, text))
        })
        .collect()
}

/// Length of the longest word run that ends `prev` and starts `current`.
///
/// Scans from the largest feasible length downward and stops at the first
/// match, so a short repeated phrase can never shadow a longer true overlap.
pub fn boundary_overlap(prev: &[&str], current: &[&str]) -> usize {
    let max = prev.len().min(current.len());
    (1..=max)
        .rev()
        .find(|&j| prev[prev.len() - j..] == current[..j])
        .unwrap_or(0)
}

/// Merge an ordered cue stream into deduplicated segments.
///
/// Output order follows cue order; segments are never re-sorted by time.
/// Returns [`CaptionError::NoUsableSegments`] when nothing survives the
/// filters, which callers treat as a signal to use another transcript source.
pub fn merge_cues(cues: &[CaptionCue]) -> Result<Vec<Segment>, CaptionError> {
    let cleaned = clean_cues(cues);

    let merged = cleaned.into_iter().fold(Vec::<Segment>::new(), |mut acc, cue| {
        let Some(prev) = acc.last_mut() else {
            acc.push(cue.into());
            return acc;
        };

        let prev_words: Vec<&str> = prev.text.split_whitespace().collect();
        let cue_words: Vec<&str> = cue.text.split_whitespace().collect();
        let overlap = boundary_overlap(&prev_words, &cue_words);

        if overlap == 0 {
            acc.push(cue.into());
            return acc;
        }

        let remaining = &cue_words[overlap..];
        if remaining.is_empty() {
            prev.end = cue.end;
        } else {
            let text = remaining.join(" ");
            acc.push(Segment {
                start: cue.start,
                end: cue.end,
                text,
            });
        }
        acc
    });

    let segments: Vec<Segment> = merged
        .into_iter()
        .filter(|seg| !seg.text.trim().is_empty() && seg.duration() > MIN_SEGMENT_DURATION)
        .collect();

    tracing::debug!(
        cues = cues.len(),
        segments = segments.len(),
        "merged caption cues"
    );

    if segments.is_empty() {
        return Err(CaptionError::NoUsableSegments { cues: cues.len() });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(start: f64, end: f64, text: &str) -> CaptionCue {
        CaptionCue::new(start, end, text)
    }

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn rolling_captions_lose_repeated_words() {
        let cues = vec![
            cue(0.0, 2.0, "hello world"),
            cue(1.5, 4.0, "world how are"),
            cue(3.5, 6.0, "are you today"),
        ];

        let merged = merge_cues(&cues).unwrap();
        assert_eq!(
            merged,
            vec![
                seg(0.0, 2.0, "hello world"),
                seg(1.5, 4.0, "how are"),
                seg(3.5, 6.0, "you today"),
            ]
        );
    }

    #[test]
    fn pure_repeats_extend_previous_segment() {
        let cues = vec![
            cue(0.0, 1.0, "we are live"),
            cue(1.0, 2.0, "are live"),
            cue(2.0, 3.0, "live"),
            cue(3.0, 4.5, "we are live"),
        ];

        let merged = merge_cues(&cues).unwrap();
        assert_eq!(merged, vec![seg(0.0, 4.5, "we are live")]);
    }

    #[test]
    fn no_overlap_appends_verbatim() {
        let cues = vec![cue(0.0, 1.0, "first line"), cue(1.0, 2.0, "second line")];
        let merged = merge_cues(&cues).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].text, "second line");
    }

    #[test]
    fn noise_cues_are_dropped_before_merging() {
        let cues = vec![
            cue(0.0, 2.0, "  spaced\n   out  "),
            cue(2.0, 2.05, "blip"),
            cue(2.1, 4.0, "   "),
            cue(4.0, 6.0, "out again"),
        ];

        let merged = merge_cues(&cues).unwrap();
        assert_eq!(
            merged,
            vec![seg(0.0, 2.0, "spaced out"), seg(4.0, 6.0, "again")]
        );
    }

    #[test]
    fn short_segments_are_dropped_after_merging() {
        let cues = vec![cue(0.0, 2.0, "kept"), cue(2.0, 2.4, "too short")];
        let merged = merge_cues(&cues).unwrap();
        assert_eq!(merged, vec![seg(0.0, 2.0, "kept")]);
    }

    #[test]
    fn overlap_prefers_longest_run() {
        let prev = ["a", "b", "a", "b"];
        let current = ["a", "b", "a", "b", "c"];
        assert_eq!(boundary_overlap(&prev, &current), 4);
        assert_eq!(boundary_overlap(&["x"], &["y"]), 0);
        assert_eq!(boundary_overlap(&[], &["y"]), 0);
    }

    #[test]
    fn overlap_is_case_sensitive() {
        assert_eq!(boundary_overlap(&["Hello"], &["hello", "there"]), 0);
    }

    #[test]
    fn empty_input_is_a_failure() {
        assert!(matches!(
            merge_cues(&[]),
            Err(CaptionError::NoUsableSegments { cues: 0 })
        ));
    }

    #[test]
    fn everything_filtered_is_a_failure() {
        let cues = vec![cue(0.0, 0.3, "quick"), cue(1.0, 1.05, "blip")];
        assert!(matches!(
            merge_cues(&cues),
            Err(CaptionError::NoUsableSegments { cues: 2 })
        ));
    }
}
