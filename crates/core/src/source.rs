//! Input resolution: which YouTube inputs were given and which videos they
//! expand to.

use std::{
    fmt,
    num::NonZeroUsize,
    path::Path,
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;
use tokio::{fs, process::Command};

use crate::error::{Result, VidbriefError};

static SHORT_LINK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([A-Za-z0-9_-]{11})").expect("static regex"));
static WATCH_PARAM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})").expect("static regex"));
static HANDLE_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([^/?#]+)").expect("static regex"));

const CHANNEL_ID_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Video,
    Playlist,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub kind: SourceKind,
    /// Channel URLs are normalized to their `/videos` tab.
    pub url: String,
}

fn is_channel_id(input: &str) -> bool {
    input.starts_with("UC") && input.len() == CHANNEL_ID_LEN
}

/// Whether `input` names YouTube content directly rather than an input file.
pub fn is_youtube_input(input: &str) -> bool {
    let input = input.trim();
    ((input.contains("youtube.com") || input.contains("youtu.be")) && input.contains("http"))
        || input.starts_with('@')
        || is_channel_id(input)
}

pub fn classify(input: &str) -> Source {
    let input = input.trim();

    if is_channel_id(input) {
        return Source {
            kind: SourceKind::Channel,
            url: format!("https://www.youtube.com/channel/{input}/videos"),
        };
    }
    if let Some(handle) = input.strip_prefix('@') {
        return Source {
            kind: SourceKind::Channel,
            url: format!("https://www.youtube.com/@{handle}/videos"),
        };
    }
    if input.contains("/@") || input.contains("/channel/") || input.contains("/c/") {
        let url = if input.contains("/videos") {
            input.to_string()
        } else {
            format!("{}/videos", input.trim_end_matches('/'))
        };
        return Source {
            kind: SourceKind::Channel,
            url,
        };
    }

    let has_video = input.contains("?v=") || input.contains("&v=");
    let kind = if (input.contains("youtube.com/playlist?") && input.contains("list="))
        || (input.contains("?list=") && !has_video)
    {
        SourceKind::Playlist
    } else {
        SourceKind::Video
    };

    Source {
        kind,
        url: input.to_string(),
    }
}

/// Extract the 11 character video id from a watch or short link.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    SHORT_LINK_ID
        .captures(url)
        .or_else(|| WATCH_PARAM_ID.captures(url))
        .map(|caps| caps[1].to_string())
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Resolve the CLI input to a list of YouTube inputs.
///
/// Anything that does not look like a YouTube URL or identifier is read as a
/// file with one input per line.
pub async fn read_inputs(input: &str) -> Result<Vec<String>> {
    if is_youtube_input(input) {
        return Ok(vec![input.trim().to_string()]);
    }

    if !Path::new(input).exists() {
        let reason = if input.contains("http") {
            "URLs must contain 'youtube.com' or 'youtu.be'"
        } else {
            "not a YouTube URL and no such input file"
        };
        return Err(VidbriefError::InvalidInput {
            input: input.to_string(),
            reason: reason.to_string(),
        });
    }

    let content = fs::read_to_string(input).await?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// How many videos to take from a channel's upload list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLimit {
    Count(NonZeroUsize),
    All,
}

impl Default for ChannelLimit {
    fn default() -> Self {
        ChannelLimit::Count(NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN))
    }
}

impl FromStr for ChannelLimit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(ChannelLimit::All);
        }
        s.parse::<NonZeroUsize>()
            .map(ChannelLimit::Count)
            .map_err(|_| format!("channel limit must be a positive integer or 'all', got: {s}"))
    }
}

impl fmt::Display for ChannelLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelLimit::Count(n) => write!(f, "{n}"),
            ChannelLimit::All => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    pub id: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct PlaylistListing {
    pub id: String,
    pub title: String,
    pub uploader: String,
    pub videos: Vec<VideoEntry>,
}

#[derive(Debug, Clone)]
pub struct ChannelListing {
    pub id: String,
    pub name: String,
    /// `@handle` when the URL carried one, otherwise the channel name.
    pub handle: String,
    pub description: String,
    pub videos: Vec<VideoEntry>,
}

#[derive(Debug, Deserialize)]
struct FlatListing {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    channel_id: Option<String>,
    description: Option<String>,
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
}

impl FlatListing {
    /// Deleted and private videos come back as null entries or without an id.
    fn videos(&self) -> Vec<VideoEntry> {
        self.entries
            .iter()
            .flatten()
            .filter_map(|entry| {
                let id = entry.id.as_deref().filter(|id| !id.is_empty())?;
                Some(VideoEntry {
                    id: id.to_string(),
                    url: watch_url(id),
                    title: entry
                        .title
                        .clone()
                        .unwrap_or_else(|| "Unknown Title".to_string()),
                })
            })
            .collect()
    }
}

pub fn parse_playlist_listing(json: &str) -> Result<PlaylistListing> {
    let listing: FlatListing = serde_json::from_str(json)?;
    Ok(PlaylistListing {
        videos: listing.videos(),
        id: listing.id.unwrap_or_else(|| "unknown".to_string()),
        title: listing
            .title
            .unwrap_or_else(|| "Untitled Playlist".to_string()),
        uploader: listing.uploader.unwrap_or_else(|| "Unknown".to_string()),
    })
}

pub fn parse_channel_listing(json: &str, channel_url: &str) -> Result<ChannelListing> {
    let listing: FlatListing = serde_json::from_str(json)?;
    let videos = listing.videos();
    let name = listing
        .channel
        .or(listing.uploader)
        .unwrap_or_else(|| "Unknown Channel".to_string());
    let handle = HANDLE_IN_URL
        .captures(channel_url)
        .map(|caps| format!("@{}", &caps[1]))
        .unwrap_or_else(|| name.clone());

    Ok(ChannelListing {
        id: listing
            .channel_id
            .or(listing.id)
            .unwrap_or_else(|| "unknown".to_string()),
        name,
        handle,
        description: listing
            .description
            .unwrap_or_else(|| "No description available".to_string()),
        videos,
    })
}

async fn flat_listing(url: &str, limit: Option<NonZeroUsize>) -> Result<String> {
    let mut cmd = Command::new("yt-dlp");
    cmd.arg("--flat-playlist")
        .arg("-J")
        .arg("--no-warnings");
    if let Some(limit) = limit {
        cmd.arg("--playlist-end").arg(limit.to_string());
    }
    let output = cmd.arg(url).output().await?;

    if !output.status.success() {
        return Err(VidbriefError::DownloadFailed {
            url: url.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// List a playlist's videos without downloading them
pub async fn expand_playlist(url: &str) -> Result<PlaylistListing> {
    let json = flat_listing(url, None).await?;
    let listing = parse_playlist_listing(&json)?;
    tracing::info!(
        playlist = %listing.id,
        title = %listing.title,
        videos = listing.videos.len(),
        "expanded playlist"
    );
    Ok(listing)
}

/// List a channel's latest uploads, newest first
pub async fn expand_channel(url: &str, limit: ChannelLimit) -> Result<ChannelListing> {
    let limit = match limit {
        ChannelLimit::Count(n) => Some(n),
        ChannelLimit::All => None,
    };
    let json = flat_listing(url, limit).await?;
    let listing = parse_channel_listing(&json, url)?;
    tracing::info!(
        channel = %listing.id,
        name = %listing.name,
        videos = listing.videos.len(),
        "expanded channel"
    );
    Ok(listing)
}
