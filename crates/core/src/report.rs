//! Batch bookkeeping and the playlist/channel index files.

use std::{fmt::Write as _, path::PathBuf};

use crate::{
    cache::sanitize_component,
    source::{ChannelListing, PlaylistListing, VideoEntry},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoStatus {
    Success { summary_path: PathBuf },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub status: VideoStatus,
}

impl VideoResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, VideoStatus::Success { .. })
    }
}

/// Results of a batch run, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    results: Vec<VideoResult>,
}

impl BatchReport {
    pub fn record(&mut self, result: VideoResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[VideoResult] {
        &self.results
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &VideoResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn find(&self, video_id: &str) -> Option<&VideoResult> {
        self.results.iter().find(|r| r.video_id == video_id)
    }

    fn counts_for(&self, videos: &[VideoEntry]) -> (usize, usize) {
        videos
            .iter()
            .filter_map(|v| self.find(&v.id))
            .fold((0, 0), |(ok, failed), r| {
                if r.is_success() {
                    (ok + 1, failed)
                } else {
                    (ok, failed + 1)
                }
            })
    }

    fn video_lines(&self, videos: &[VideoEntry], out: &mut String) {
        for video in videos {
            let (marker, link) = match self.find(&video.id).map(|r| &r.status) {
                Some(VideoStatus::Success { .. }) => {
                    ("✅", format!("[View Summary](SUMMARY_{}.md)", video.id))
                }
                Some(VideoStatus::Failed { error }) => ("❌", format!("Failed: {error}")),
                None => ("⏭️", "Skipped".to_string()),
            };
            let _ = writeln!(out, "- {marker} **{}** ({}) - {link}", video.title, video.id);
        }
    }

    /// Contents of `PLAYLIST_<id>_INFO.md`.
    pub fn playlist_info(&self, playlist: &PlaylistListing) -> String {
        let (ok, failed) = self.counts_for(&playlist.videos);
        let mut out = format!(
            "# Playlist: {}\n\n**Uploader**: {}\n**Total Videos**: {}\n**Successfully Processed**: {ok}\n**Failed**: {failed}\n\n## Videos\n\n",
            playlist.title,
            playlist.uploader,
            playlist.videos.len(),
        );
        self.video_lines(&playlist.videos, &mut out);
        out
    }

    /// Contents of `CHANNEL_<handle>_INFO.md`.
    pub fn channel_info(&self, channel: &ChannelListing) -> String {
        let (ok, failed) = self.counts_for(&channel.videos);
        let mut out = format!(
            "# Channel: {}\n\n**Username**: {}\n**Channel ID**: {}\n**Total Videos Processed**: {}\n**Successfully Processed**: {ok}\n**Failed**: {failed}\n\n## Description\n\n{}\n\n## Videos (Latest to Oldest)\n\n",
            channel.name,
            channel.handle,
            channel.id,
            channel.videos.len(),
            channel.description,
        );
        self.video_lines(&channel.videos, &mut out);
        out
    }
}

pub fn playlist_dir_name(playlist: &PlaylistListing) -> String {
    format!("PLAYLIST_{}", sanitize_component(&playlist.id))
}

/// Falls back to the display name when there is no handle, so it is sanitized.
pub fn channel_dir_name(channel: &ChannelListing) -> String {
    format!("CHANNEL_{}", sanitize_component(&channel.handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::watch_url;

    fn entry(id: &str, title: &str) -> VideoEntry {
        VideoEntry {
            id: id.to_string(),
            url: watch_url(id),
            title: title.to_string(),
        }
    }

    fn report() -> BatchReport {
        let mut report = BatchReport::default();
        report.record(VideoResult {
            video_id: "aaa".to_string(),
            title: "First".to_string(),
            status: VideoStatus::Success {
                summary_path: PathBuf::from("PLAYLIST_PL1/SUMMARY_aaa.md"),
            },
        });
        report.record(VideoResult {
            video_id: "bbb".to_string(),
            title: "Second".to_string(),
            status: VideoStatus::Failed {
                error: "Download failed".to_string(),
            },
        });
        report
    }

    #[test]
    fn counts_outcomes() {
        let report = report();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.failed().next().unwrap().video_id, "bbb");
    }

    #[test]
    fn playlist_info_lists_every_video() {
        let playlist = PlaylistListing {
            id: "PL1".to_string(),
            title: "Talks".to_string(),
            uploader: "Someone".to_string(),
            videos: vec![entry("aaa", "First"), entry("bbb", "Second"), entry("ccc", "Third")],
        };
        let info = report().playlist_info(&playlist);

        assert!(info.starts_with("# Playlist: Talks\n\n**Uploader**: Someone\n**Total Videos**: 3\n"));
        assert!(info.contains("**Successfully Processed**: 1\n**Failed**: 1\n"));
        assert!(info.contains("- ✅ **First** (aaa) - [View Summary](SUMMARY_aaa.md)\n"));
        assert!(info.contains("- ❌ **Second** (bbb) - Failed: Download failed\n"));
        assert!(info.contains("- ⏭️ **Third** (ccc) - Skipped\n"));
        assert_eq!(playlist_dir_name(&playlist), "PLAYLIST_PL1");
    }

    #[test]
    fn channel_info_includes_description() {
        let channel = ChannelListing {
            id: "UC1".to_string(),
            name: "Creator".to_string(),
            handle: "@creator".to_string(),
            description: "About us".to_string(),
            videos: vec![entry("aaa", "First")],
        };
        let info = report().channel_info(&channel);
        assert!(info.contains("**Username**: @creator\n**Channel ID**: UC1\n"));
        assert!(info.contains("## Description\n\nAbout us\n\n## Videos (Latest to Oldest)\n\n"));
        assert!(info.contains("**Failed**: 0\n"));
        assert_eq!(channel_dir_name(&channel), "CHANNEL_@creator");
    }

    #[test]
    fn channel_dir_name_is_a_single_path_component() {
        let channel = ChannelListing {
            id: "UC1".to_string(),
            name: "AC/DC Live".to_string(),
            handle: "AC/DC Live".to_string(),
            description: String::new(),
            videos: Vec::new(),
        };
        assert_eq!(channel_dir_name(&channel), "CHANNEL_AC_DC_Live");

        let dotted = ChannelListing {
            handle: "../..".to_string(),
            ..channel
        };
        let dir = PathBuf::from("out").join(channel_dir_name(&dotted));
        assert_eq!(dir.components().count(), 2);
        assert_eq!(channel_dir_name(&dotted), format!("CHANNEL_{}", "_".repeat(5)));
    }
}
