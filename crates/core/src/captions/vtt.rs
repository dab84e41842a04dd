//! Minimal WebVTT reader for YouTube subtitle downloads.

use crate::types::CaptionCue;

use super::CaptionError;

const TIMING_ARROW: &str = "-->";

/// Parse a WebVTT document into caption cues, in file order.
///
/// Inline markup (`<c>`, karaoke timestamps like `<00:00:01.200>`, `<i>`)
/// is stripped and multi-line payloads are joined with a space. Header,
/// `NOTE`, `STYLE` and `REGION` blocks are skipped.
pub fn parse_vtt(input: &str) -> Result<Vec<CaptionCue>, CaptionError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut blocks = blocks(input);
    match blocks.next() {
        Some((_, header)) if header.first().is_some_and(|l| l.starts_with("WEBVTT")) => {}
        _ => {
            return Err(CaptionError::Malformed {
                line: 1,
                reason: "missing WEBVTT signature".to_string(),
            });
        }
    }

    let mut cues = Vec::new();
    for (first_line, lines) in blocks {
        if lines
            .first()
            .is_some_and(|l| l.starts_with("NOTE") || l.starts_with("STYLE") || l.starts_with("REGION"))
        {
            continue;
        }

        let Some(timing_idx) = lines.iter().position(|l| l.contains(TIMING_ARROW)) else {
            continue;
        };

        let line_no = first_line + timing_idx;
        let (start, end) = parse_timing(lines[timing_idx], line_no)?;

        let text = lines[timing_idx + 1..]
            .iter()
            .map(|l| decode_entities(&strip_tags(l)))
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        cues.push(CaptionCue::new(start, end, text));
    }

    Ok(cues)
}

/// Split into blank-line separated blocks, tagged with their 1-based first line.
fn blocks(input: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    let mut out: Vec<(usize, Vec<&str>)> = Vec::new();
    let mut current: Option<(usize, Vec<&str>)> = None;

    for (idx, raw) in input.lines().enumerate() {
        // A whitespace-only line is cue payload, not a separator.
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            if let Some(block) = current.take() {
                out.push(block);
            }
            continue;
        }
        current
            .get_or_insert_with(|| (idx + 1, Vec::new()))
            .1
            .push(line);
    }
    if let Some(block) = current {
        out.push(block);
    }

    out.into_iter()
}

fn parse_timing(line: &str, line_no: usize) -> Result<(f64, f64), CaptionError> {
    let malformed = |reason: String| CaptionError::Malformed {
        line: line_no,
        reason,
    };

    let (start, rest) = line
        .split_once(TIMING_ARROW)
        .ok_or_else(|| malformed("missing cue timing".to_string()))?;
    let end = rest.split_whitespace().next().unwrap_or_default();

    let start = parse_timestamp(start.trim())
        .ok_or_else(|| malformed(format!("invalid start timestamp {:?}", start.trim())))?;
    let end = parse_timestamp(end).ok_or_else(|| malformed(format!("invalid end timestamp {end:?}")))?;

    Ok((start, end))
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm`, in seconds.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.replace(',', ".");
    let parts: Vec<&str> = raw.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((hours * 3600 + minutes * 60) as f64 + seconds)
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn decode_entities(line: &str) -> String {
    line.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
