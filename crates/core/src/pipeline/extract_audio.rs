use std::path::Path;

use tokio::process::Command;

use crate::error::{Result, VidbriefError};

/// Sample rate whisper.cpp expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Convert downloaded media to 16 kHz mono PCM WAV using ffmpeg
pub async fn extract_audio(media_path: &Path, audio_path: &Path) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(media_path)
        .arg("-ar")
        .arg(WHISPER_SAMPLE_RATE.to_string())
        .arg("-ac")
        .arg("1")
        .arg("-c:a")
        .arg("pcm_s16le")
        .arg(audio_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(VidbriefError::AudioExtractionFailed {
            video_path: media_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}
