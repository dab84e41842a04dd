pub mod merge;
pub mod vtt;

use thiserror::Error;

pub use merge::{MIN_CUE_DURATION, MIN_SEGMENT_DURATION, boundary_overlap, clean_cues, merge_cues};
pub use vtt::{parse_timestamp, parse_vtt};

use crate::format::format_transcript;

/// Caption normalization failures.
///
/// These are recoverable: the pipeline responds by switching to audio
/// transcription instead of failing the video.
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("no captions found")]
    NoCues,

    #[error("no usable segments left after filtering {cues} captions")]
    NoUsableSegments { cues: usize },

    #[error("malformed caption file at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Parse, merge and render a WebVTT document into the timestamped transcript.
pub fn normalize_vtt(input: &str) -> Result<String, CaptionError> {
    let cues = parse_vtt(input)?;
    if cues.is_empty() {
        return Err(CaptionError::NoCues);
    }

    let segments = merge_cues(&cues)?;
    tracing::info!(
        cues = cues.len(),
        segments = segments.len(),
        "processed captions into clean segments"
    );

    Ok(format_transcript(&segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_rolling_captions() {
        let input = "WEBVTT\n\n\
00:00:00.000 --> 00:00:02.000\nhello world\n\n\
00:00:01.500 --> 00:00:04.000\nworld how are\n\n\
00:00:03.500 --> 00:00:06.000\nare you today\n";

        assert_eq!(
            normalize_vtt(input).unwrap(),
            "[0.000s -> 2.000s] hello world\n\
[1.500s -> 4.000s] how are\n\
[3.500s -> 6.000s] you today"
        );
    }

    #[test]
    fn header_only_file_has_no_cues() {
        assert!(matches!(
            normalize_vtt("WEBVTT\nKind: captions\n"),
            Err(CaptionError::NoCues)
        ));
    }
}
