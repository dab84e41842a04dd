//! Trims a video's cache directory according to the configured [`SaveMode`].
//!
//! Cleanup never fails a video: a file that cannot be removed is logged and
//! left behind.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{
    cache::{find_audio_artifacts, find_metadata_artifacts},
    config::SaveMode,
};

/// Remove downloaded and converted audio once a transcript exists, unless
/// `mode` keeps media. Returns the number of files removed.
pub async fn discard_audio(cache_dir: &Path, mode: SaveMode) -> usize {
    if mode.keeps_media() {
        return 0;
    }
    remove_files(find_audio_artifacts(cache_dir)).await
}

/// Apply `mode` after the summary file has been written.
pub async fn cleanup_cache(cache_dir: &Path, mode: SaveMode) {
    let removed = match mode {
        SaveMode::All => 0,
        SaveMode::Meta => discard_audio(cache_dir, mode).await,
        SaveMode::Media => remove_files(find_metadata_artifacts(cache_dir)).await,
        SaveMode::None => {
            if let Err(err) = fs::remove_dir_all(cache_dir).await {
                tracing::warn!(dir = %cache_dir.display(), error = %err, "failed to remove cache dir");
            }
            return;
        }
    };
    if removed > 0 {
        tracing::debug!(dir = %cache_dir.display(), removed, ?mode, "trimmed cache");
    }
}

async fn remove_files(paths: Vec<PathBuf>) -> usize {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!(file = %path.display(), error = %err, "failed to remove cached file");
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILES: [&str; 5] = [
        "audio.m4a",
        "audio.wav",
        "video.info.json",
        "video.en.vtt",
        "transcript.txt",
    ];

    fn populated() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in FILES {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        dir
    }

    fn remaining(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn audio_is_dropped_after_transcription_by_default() {
        let dir = populated();
        assert_eq!(discard_audio(dir.path(), SaveMode::default()).await, 2);
        assert_eq!(
            remaining(dir.path()),
            vec!["transcript.txt", "video.en.vtt", "video.info.json"]
        );
    }

    #[tokio::test]
    async fn media_modes_keep_audio() {
        let dir = populated();
        assert_eq!(discard_audio(dir.path(), SaveMode::Media).await, 0);
        assert_eq!(discard_audio(dir.path(), SaveMode::All).await, 0);
        assert_eq!(remaining(dir.path()).len(), FILES.len());
    }

    #[tokio::test]
    async fn media_mode_drops_metadata_after_summary() {
        let dir = populated();
        cleanup_cache(dir.path(), SaveMode::Media).await;
        assert_eq!(remaining(dir.path()), vec!["audio.m4a", "audio.wav"]);
    }

    #[tokio::test]
    async fn all_keeps_everything_and_none_removes_the_dir() {
        let dir = populated();
        cleanup_cache(dir.path(), SaveMode::All).await;
        assert_eq!(remaining(dir.path()).len(), FILES.len());

        let cache = dir.path().join("abc");
        std::fs::create_dir(&cache).unwrap();
        std::fs::write(cache.join("audio.wav"), "x").unwrap();
        cleanup_cache(&cache, SaveMode::None).await;
        assert!(!cache.exists());
    }
}
