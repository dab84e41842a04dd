use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::{fs, process::Command};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    cache::get_model_dir,
    error::{Result, VidbriefError},
    format::{format_segment_line, format_transcript},
    provider::TranscriptionApi,
    retry::RetryPolicy,
    types::{Segment, Transcript},
};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Download the ggml model into the cache unless it is already there
pub async fn ensure_model(root_cache_dir: &Path, model_name: &str) -> Result<PathBuf> {
    let download_url = format!("{MODEL_BASE_URL}/{model_name}");
    let model_dir = get_model_dir(root_cache_dir);
    fs::create_dir_all(&model_dir).await?;

    let model_path = model_dir.join(model_name);
    if model_path.exists() {
        return Ok(model_path);
    }

    tracing::info!(url = %download_url, "downloading whisper model");
    let partial = model_path.with_extension("part");
    let output = Command::new("curl")
        .arg("-fL")
        .arg(&download_url)
        .arg("-o")
        .arg(&partial)
        .output()
        .await?;

    if !output.status.success() {
        let _ = fs::remove_file(&partial).await;
        return Err(VidbriefError::ModelDownloadFailed {
            url: download_url,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    fs::rename(&partial, &model_path).await?;

    Ok(model_path)
}

/// Transcribe a 16 kHz mono WAV with whisper.cpp.
///
/// Inference is CPU bound and runs on the blocking pool.
pub async fn transcribe_local(
    audio_path: &Path,
    model_path: &Path,
    language: Option<&str>,
) -> Result<Transcript> {
    let audio_path = audio_path.to_path_buf();
    let model_path = model_path.to_path_buf();
    let language = language.map(str::to_string);

    let failed_path = audio_path.clone();
    tokio::task::spawn_blocking(move || run_whisper(&audio_path, &model_path, language.as_deref()))
        .await
        .map_err(|e| VidbriefError::TranscriptFailed {
            audio_path: failed_path,
            reason: e.to_string(),
        })?
}

fn run_whisper(audio_path: &Path, model_path: &Path, language: Option<&str>) -> Result<Transcript> {
    let mut reader = hound::WavReader::open(audio_path)?;
    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
        .collect::<std::result::Result<_, _>>()?;

    let model_path = model_path
        .to_str()
        .ok_or_else(|| VidbriefError::TranscriptFailed {
            audio_path: audio_path.to_path_buf(),
            reason: format!("model path is not valid UTF-8: {}", model_path.display()),
        })?;

    let ctx_params = WhisperContextParameters {
        use_gpu: cfg!(feature = "cuda"),
        flash_attn: cfg!(feature = "cuda"),
        ..Default::default()
    };
    let ctx = WhisperContext::new_with_params(model_path, ctx_params)?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
    params.set_language(language.or(Some("auto")));
    params.set_print_progress(false);
    params.set_print_realtime(false);

    let mut state = ctx.create_state()?;
    state.full(params, &samples)?;

    let mut text = String::new();
    let mut segments: Vec<Segment> = Vec::new();

    for segment in state.as_iter() {
        let Ok(seg_text) = segment.to_str() else {
            continue;
        };
        segments.push(Segment {
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
            text: seg_text.trim().to_string(),
        });
        text.push_str(seg_text);
    }

    let language_index = state.full_lang_id_from_state();
    let language = whisper_rs::get_lang_str(language_index).unwrap_or("unknown");

    tracing::info!(segments = segments.len(), language, "local transcription finished");

    Ok(Transcript {
        text,
        segments,
        language: language.to_string(),
    })
}

/// Timestamped lines when segments exist, otherwise the plain text.
pub fn render_transcript(transcript: &Transcript) -> String {
    let segments: Vec<Segment> = transcript
        .segments
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .cloned()
        .collect();
    if segments.is_empty() {
        transcript.text.trim().to_string()
    } else {
        format_transcript(&segments)
    }
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    segments: Option<Vec<ApiSegment>>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: Option<f64>,
    end: Option<f64>,
    #[serde(default)]
    text: String,
}

/// Render a `verbose_json` transcription response.
///
/// Segments without timestamps are kept as bare text lines.
pub fn render_verbose_json(body: &str) -> Result<String> {
    let response: VerboseTranscription = serde_json::from_str(body)?;

    let lines: Vec<String> = response
        .segments
        .unwrap_or_default()
        .iter()
        .filter(|seg| !seg.text.trim().is_empty())
        .map(|seg| match (seg.start, seg.end) {
            (Some(start), Some(end)) => format_segment_line(start, end, &seg.text),
            _ => seg.text.trim().to_string(),
        })
        .collect();

    if !lines.is_empty() {
        return Ok(lines.join("\n"));
    }
    Ok(response.text.unwrap_or_default().trim().to_string())
}

/// Upload audio to an OpenAI-compatible transcription endpoint
pub async fn transcribe_api(
    audio_path: &Path,
    api: &TranscriptionApi,
    api_key: &str,
    language: Option<&str>,
    retry: &RetryPolicy,
) -> Result<String> {
    let bytes = fs::read(audio_path).await?;
    let file_name = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let client = reqwest::Client::new();

    tracing::info!(
        url = api.api_url,
        model = api.model,
        bytes = bytes.len(),
        "sending audio for transcription"
    );

    let body = retry
        .execute("transcribe_api", || {
            let mut form = reqwest::multipart::Form::new()
                .text("model", api.model)
                .text("response_format", "verbose_json")
                .part(
                    "file",
                    reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone()),
                );
            if let Some(lang) = language {
                form = form.text("language", lang.to_string());
            }
            let request = client
                .post(api.api_url)
                .bearer_auth(api_key)
                .multipart(form);

            async move {
                let response = request.send().await?;
                let status = response.status();
                let text = response.text().await?;
                if !status.is_success() {
                    return Err(VidbriefError::TranscriptFailed {
                        audio_path: audio_path.to_path_buf(),
                        reason: format!("HTTP {}: {}", status.as_u16(), text),
                    });
                }
                Ok(text)
            }
        })
        .await?;

    render_verbose_json(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_json_segments_become_timestamped_lines() {
        let body = r#"{
            "text": "hello world. how are you",
            "segments": [
                {"start": 0.0, "end": 2.5, "text": " hello world."},
                {"start": 2.5, "end": 4.0, "text": "  "},
                {"start": 4.0, "end": 6.25, "text": " how are you"}
            ]
        }"#;
        assert_eq!(
            render_verbose_json(body).unwrap(),
            "[0.000s -> 2.500s] hello world.\n[4.000s -> 6.250s] how are you"
        );
    }

    #[test]
    fn verbose_json_without_segments_uses_text() {
        assert_eq!(
            render_verbose_json(r#"{"text": " plain text "}"#).unwrap(),
            "plain text"
        );
        assert_eq!(
            render_verbose_json(r#"{"segments": [{"text": "no times"}]}"#).unwrap(),
            "no times"
        );
    }

    #[test]
    fn renders_local_transcripts() {
        let transcript = Transcript {
            text: " hi there".to_string(),
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 1.2,
                    text: "hi".to_string(),
                },
                Segment {
                    start: 1.2,
                    end: 2.0,
                    text: "there".to_string(),
                },
            ],
            language: "en".to_string(),
        };
        assert_eq!(
            render_transcript(&transcript),
            "[0.000s -> 1.200s] hi\n[1.200s -> 2.000s] there"
        );

        let bare = Transcript {
            text: " just text ".to_string(),
            segments: Vec::new(),
            language: "en".to_string(),
        };
        assert_eq!(render_transcript(&bare), "just text");
    }
}
