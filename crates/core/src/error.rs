use std::path::PathBuf;
use thiserror::Error;

use crate::{captions::CaptionError, config::ConfigError};

#[derive(Error, Debug)]
pub enum VidbriefError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Tokenizer {encoding} is unavailable: {reason}")]
    TokenizerUnavailable { encoding: String, reason: String },

    #[error("Caption processing failed: {0}")]
    Captions(#[from] CaptionError),

    #[error("Unrecognized input {input}: {reason}")]
    InvalidInput { input: String, reason: String },

    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Metadata for {video_id} is missing: {reason}")]
    MetadataMissing { video_id: String, reason: String },

    #[error("Whisper model download failed from {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Audio extraction failed for {video_path}: {reason}")]
    AudioExtractionFailed { video_path: PathBuf, reason: String },

    #[error("Transcription failed for {audio_path}: {reason}")]
    TranscriptFailed { audio_path: PathBuf, reason: String },

    #[error("Summary generation failed: {reason}")]
    SummaryFailed { reason: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("WAV decode error: {0}")]
    WavError(#[from] hound::Error),

    #[error("Whisper error: {0}")]
    WhisperError(#[from] whisper_rs::WhisperError),
}

pub type Result<T> = std::result::Result<T, VidbriefError>;
