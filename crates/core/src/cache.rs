use std::path::{Path, PathBuf};

const AUDIO_EXTENSIONS: [&str; 6] = ["m4a", "webm", "opus", "mp3", "ogg", "aac"];

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vidbrief")
}

/// Replace anything outside `[A-Za-z0-9@_-]` so `name` is a single safe path component.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Per-video working directory, keyed by the YouTube video id.
pub fn get_cache_dir(root: &Path, video_id: &str) -> PathBuf {
    root.join(sanitize_component(video_id))
}

pub fn get_model_dir(root: &Path) -> PathBuf {
    root.join("models")
}

/// Find the yt-dlp `.info.json` written for a video
pub fn find_info_json(cache_dir: &Path) -> Option<PathBuf> {
    find_file(cache_dir, |name| name.ends_with(".info.json"))
}

/// Find a downloaded subtitle track, preferring `lang`
pub fn find_subtitle_file(cache_dir: &Path, lang: &str) -> Option<PathBuf> {
    let preferred = format!(".{lang}.vtt");
    find_file(cache_dir, |name| name.ends_with(&preferred))
        .or_else(|| find_file(cache_dir, |name| name.ends_with(".vtt")))
}

/// Find a downloaded audio stream (before conversion to WAV)
pub fn find_audio_in_cache(cache_dir: &Path) -> Option<PathBuf> {
    find_file(cache_dir, |name| {
        name.starts_with("audio.")
            && Path::new(name)
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
    })
}

/// Get the path for the 16 kHz mono WAV fed to whisper
pub fn get_audio_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("audio.wav")
}

/// Get the path for a cached transcript file
pub fn get_transcript_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("transcript.txt")
}

/// Every audio file in the cache: downloaded streams and the converted WAV.
pub fn find_audio_artifacts(cache_dir: &Path) -> Vec<PathBuf> {
    find_files(cache_dir, |name| name.starts_with("audio."))
}

/// Info JSON, caption tracks and the cached transcript.
pub fn find_metadata_artifacts(cache_dir: &Path) -> Vec<PathBuf> {
    find_files(cache_dir, |name| {
        name.ends_with(".info.json") || name.ends_with(".vtt") || name == "transcript.txt"
    })
}

fn find_file(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    find_files(dir, matches).into_iter().next()
}

fn find_files(dir: &Path, matches: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| matches(&name.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    // read_dir order is platform dependent
    found.sort();
    found
}
