use std::time::Duration;

use crate::types::{Comment, Segment};

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// `[12.340s -> 15.000s] text`
pub fn format_segment_line(start: f64, end: f64, text: &str) -> String {
    format!("[{:.3}s -> {:.3}s] {}", start, end, text.trim())
}

/// Render segments one per line with millisecond timestamps.
pub fn format_transcript(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| format_segment_line(seg.start, seg.end, &seg.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `{rank}. [{likes} likes] {author}: {text}` with newlines flattened.
pub fn format_comment_line(rank: usize, comment: &Comment) -> String {
    format!(
        "{}. [{} likes] {}: {}",
        rank,
        comment.like_count,
        comment.author,
        comment.text.replace('\n', " ")
    )
}

pub const SUMMARY_SEPARATOR_WIDTH: usize = 30;

/// Summary file body: model output followed by the raw context it was given.
pub fn format_summary_document(summary: &str, context: &str) -> String {
    let rule = "=".repeat(SUMMARY_SEPARATOR_WIDTH);
    format!("{summary}\n\n{rule}\nRAW DATA\n{rule}\n{context}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_line_has_millisecond_precision() {
        assert_eq!(
            format_segment_line(1.5, 4.0, " how are "),
            "[1.500s -> 4.000s] how are"
        );
    }

    #[test]
    fn comment_line_flattens_newlines() {
        let comment = Comment::new("bob", "line one\nline two", 7);
        assert_eq!(
            format_comment_line(3, &comment),
            "3. [7 likes] bob: line one line two"
        );
    }

    #[test]
    fn summary_document_layout() {
        let doc = format_summary_document("S", "C");
        assert_eq!(
            doc,
            format!("S\n\n{0}\nRAW DATA\n{0}\nC", "=".repeat(30))
        );
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
