pub mod cache;
pub mod captions;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod retry;
pub mod source;
pub mod tokenizer;
pub mod types;

pub use captions::{CaptionError, merge_cues, normalize_vtt, parse_vtt};
pub use config::{Config, ConfigError};
pub use context::{
    AllocationOutcome, AssembledContext, BudgetPolicy, ContextAllocator, ContextDiagnostics,
    ContextInput,
};
pub use error::{Result, VidbriefError};
pub use provider::{Provider, TranscriptionProvider};
pub use tokenizer::{Encoding, Tokenizer};
pub use types::{CaptionCue, Comment, Segment, Transcript, VideoInfo};
