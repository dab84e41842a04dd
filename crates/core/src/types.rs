use serde::{Deserialize, Deserializer, Serialize};

/// A raw caption entry as emitted by the caption parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl CaptionCue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A caption segment after overlap removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl From<CaptionCue> for Segment {
    fn from(cue: CaptionCue) -> Self {
        Self {
            start: cue.start,
            end: cue.end,
            text: cue.text,
        }
    }
}

impl From<&Segment> for CaptionCue {
    fn from(seg: &Segment) -> Self {
        Self {
            start: seg.start,
            end: seg.end,
            text: seg.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default = "default_author", deserialize_with = "null_as_anon")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like_count: u64,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>, like_count: u64) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            like_count,
        }
    }
}

/// The subset of a yt-dlp `.info.json` that the summarizer consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
    /// Length in seconds, when yt-dlp reports it.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Output of a speech-to-text provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: String,
}

fn default_author() -> String {
    "Anon".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_anon<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_author))
}
