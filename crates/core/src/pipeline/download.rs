use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::{process::Command, time::timeout};

use crate::{
    cache::find_audio_in_cache,
    config::DownloadConfig,
    error::{Result, VidbriefError},
    retry::RetryPolicy,
};

/// Base name for every yt-dlp artifact in a video's cache dir.
pub const OUTPUT_BASENAME: &str = "video";

const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio[ext=opus]/bestaudio";

/// Fetch `.info.json` (with comments) and, unless disabled, subtitle tracks.
/// The media itself is not downloaded.
pub async fn fetch_metadata(
    url: &str,
    cache_dir: &Path,
    config: &DownloadConfig,
    subtitles: bool,
) -> Result<()> {
    let template = cache_dir.join(format!("{OUTPUT_BASENAME}.%(ext)s"));

    let mut args: Vec<OsString> = vec![
        "--write-info-json".into(),
        "--write-comments".into(),
        "--skip-download".into(),
        "--no-warnings".into(),
    ];
    if subtitles {
        args.extend([
            "--write-subs".into(),
            "--write-auto-subs".into(),
            "--sub-lang".into(),
            config.sub_lang.clone().into(),
            "--sub-format".into(),
            "vtt".into(),
        ]);
    }
    args.extend(["-o".into(), template.into_os_string(), url.into()]);

    let timeout_after = Duration::from_secs(config.timeout_secs);
    RetryPolicy::from_config(config)
        .execute("fetch_metadata", || run_yt_dlp(url, &args, timeout_after))
        .await?;

    Ok(())
}

/// Download the best audio-only stream, returning its path.
pub async fn download_audio(url: &str, cache_dir: &Path, config: &DownloadConfig) -> Result<PathBuf> {
    let template = cache_dir.join("audio.%(ext)s");
    let args: Vec<OsString> = vec![
        "-f".into(),
        AUDIO_FORMAT.into(),
        "--no-warnings".into(),
        "--print".into(),
        "after_move:filepath".into(),
        "-o".into(),
        template.into_os_string(),
        url.into(),
    ];

    // Audio streams are large; allow twice the metadata timeout.
    let timeout_after = Duration::from_secs(config.timeout_secs.saturating_mul(2));
    let stdout = RetryPolicy::from_config(config)
        .execute("download_audio", || run_yt_dlp(url, &args, timeout_after))
        .await?;

    let printed = stdout.lines().rev().find(|l| !l.trim().is_empty()).map(str::trim);
    match printed.map(PathBuf::from) {
        Some(path) if path.exists() => Ok(path),
        _ => find_audio_in_cache(cache_dir).ok_or_else(|| VidbriefError::DownloadFailed {
            url: url.to_string(),
            reason: "yt-dlp finished but no audio file was written".to_string(),
        }),
    }
}

async fn run_yt_dlp(url: &str, args: &[OsString], timeout_after: Duration) -> Result<String> {
    tracing::debug!(url, ?args, "running yt-dlp");

    let output = timeout(timeout_after, Command::new("yt-dlp").args(args).output())
        .await
        .map_err(|_| VidbriefError::DownloadFailed {
            url: url.to_string(),
            reason: format!("yt-dlp timed out after {}s", timeout_after.as_secs()),
        })??;

    if !output.status.success() {
        return Err(VidbriefError::DownloadFailed {
            url: url.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
