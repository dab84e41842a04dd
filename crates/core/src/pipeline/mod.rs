//! Per-video stages: metadata, transcript, context, summary file.
//!
//! Each stage is a plain async function; the CLI sequences them and owns
//! progress output and caching decisions.

pub mod cleanup;
pub mod download;
pub mod extract_audio;
pub mod summarize;
pub mod transcribe;

use std::path::{Path, PathBuf};

use tokio::fs;

pub use cleanup::{cleanup_cache, discard_audio};
pub use download::{download_audio, fetch_metadata};
pub use extract_audio::extract_audio;
pub use summarize::{Summarizer, required_api_key};
pub use transcribe::{ensure_model, render_transcript, transcribe_api, transcribe_local};

use crate::{
    cache::{find_info_json, find_subtitle_file, get_audio_path},
    captions::normalize_vtt,
    config::Config,
    context::{AssembledContext, BudgetPolicy, ContextAllocator, ContextInput},
    error::{Result, VidbriefError},
    format::format_summary_document,
    retry::RetryPolicy,
    tokenizer::Tokenizer,
    types::VideoInfo,
};

/// Read the yt-dlp `.info.json` from a video's cache dir.
pub async fn load_video_info(cache_dir: &Path, video_id: &str) -> Result<VideoInfo> {
    let path = find_info_json(cache_dir).ok_or_else(|| VidbriefError::MetadataMissing {
        video_id: video_id.to_string(),
        reason: format!("no .info.json in {}", cache_dir.display()),
    })?;

    let json = fs::read_to_string(&path).await?;
    let mut info: VideoInfo = serde_json::from_str(&json)?;
    if info.id.is_empty() {
        info.id = video_id.to_string();
    }

    tracing::debug!(
        video_id,
        title = %info.title,
        duration = info.duration,
        comments = info.comments.len(),
        "loaded video metadata"
    );
    Ok(info)
}

/// Transcript built from downloaded captions.
///
/// `Ok(None)` means the caller should fall back to audio transcription:
/// either no caption file exists or it did not normalize into any segment.
pub async fn captions_transcript(cache_dir: &Path, lang: &str) -> Result<Option<String>> {
    let Some(path) = find_subtitle_file(cache_dir, lang) else {
        tracing::info!(dir = %cache_dir.display(), "no subtitle file found");
        return Ok(None);
    };

    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                file = %path.display(),
                error = %err,
                "could not read subtitle file, falling back to audio transcription"
            );
            return Ok(None);
        }
    };
    // Stray bytes in a caption track are replaced rather than failing the video.
    let vtt = String::from_utf8_lossy(&bytes);
    match normalize_vtt(&vtt) {
        Ok(transcript) => Ok(Some(transcript)),
        Err(err) => {
            tracing::warn!(
                file = %path.display(),
                error = %err,
                "caption processing failed, falling back to audio transcription"
            );
            Ok(None)
        }
    }
}

/// Download audio and run the configured speech-to-text provider.
pub async fn transcribe_fallback(
    url: &str,
    cache_dir: &Path,
    root_cache_dir: &Path,
    config: &Config,
) -> Result<String> {
    let media = download_audio(url, cache_dir, &config.download).await?;
    let language = config.transcription.language.as_deref();

    let provider = config.transcription_provider()?;
    let transcript = match provider.api() {
        None => {
            let wav = get_audio_path(cache_dir);
            extract_audio(&media, &wav).await?;
            let model = ensure_model(root_cache_dir, &config.transcription.whisper_model).await?;
            let transcript = transcribe_local(&wav, &model, language).await?;
            render_transcript(&transcript)
        }
        Some(api) => {
            let api_key = config
                .api_key(api.env_var)
                .ok_or_else(|| VidbriefError::MissingApiKey {
                    env_var: api.env_var.to_string(),
                })?;
            let retry = RetryPolicy::from_config(&config.download);
            transcribe_api(&media, &api, &api_key, language, &retry).await?
        }
    };

    discard_audio(cache_dir, config.save).await;
    Ok(transcript)
}

/// Fail early when an API transcription provider has no key configured.
pub fn check_transcription_key(config: &Config) -> Result<()> {
    if let Some(api) = config.transcription_provider()?.api() {
        config
            .api_key(api.env_var)
            .ok_or_else(|| VidbriefError::MissingApiKey {
                env_var: api.env_var.to_string(),
            })?;
    }
    Ok(())
}

/// Assemble the bounded context for one video.
pub fn build_context(
    info: &VideoInfo,
    transcript: &str,
    tokenizer: &Tokenizer,
    policy: &BudgetPolicy,
) -> AssembledContext {
    ContextAllocator::new(tokenizer, policy).allocate(&ContextInput {
        title: &info.title,
        description: &info.description,
        transcript,
        comments: &info.comments,
    })
}

pub fn summary_path(output_dir: &Path, video_id: &str) -> PathBuf {
    output_dir.join(format!("SUMMARY_{video_id}.md"))
}

/// Write `SUMMARY_<id>.md`. Without a summary only the context is written.
pub async fn save_summary(
    output_dir: &Path,
    video_id: &str,
    summary: Option<&str>,
    context: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).await?;
    let path = summary_path(output_dir, video_id);
    let body = match summary {
        Some(summary) => format_summary_document(summary, context),
        None => context.to_string(),
    };
    fs::write(&path, body).await?;
    Ok(path)
}
