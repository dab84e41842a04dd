use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use vidbrief_core::{
    Config, Provider, Tokenizer,
    cache::get_root_cache_dir,
    config::{LogFormat, SaveMode},
    pipeline::{Summarizer, check_transcription_key, required_api_key},
    source::{ChannelLimit, read_inputs},
};

use crate::run::{RunOptions, Runner};

mod logging;
mod run;
mod ui;

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliProvider {
    Openai,
    Anthropic,
    Gemini,
    Groq,
    Openrouter,
    Cerebras,
    Grok,
    Ollama,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Openai => Provider::Openai,
            CliProvider::Anthropic => Provider::Anthropic,
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Groq => Provider::Groq,
            CliProvider::Openrouter => Provider::Openrouter,
            CliProvider::Cerebras => Provider::Cerebras,
            CliProvider::Grok => Provider::Grok,
            CliProvider::Ollama => Provider::Ollama,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliTranscription {
    Local,
    Openai,
    Groq,
}

impl CliTranscription {
    fn id(self) -> &'static str {
        match self {
            CliTranscription::Local => "local",
            CliTranscription::Openai => "openai",
            CliTranscription::Groq => "groq",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliSave {
    /// Keep only the summary
    None,
    /// Keep metadata, captions and transcript
    Meta,
    /// Keep downloaded audio
    Media,
    /// Keep everything
    All,
}

impl From<CliSave> for SaveMode {
    fn from(cli: CliSave) -> Self {
        match cli {
            CliSave::None => SaveMode::None,
            CliSave::Meta => SaveMode::Meta,
            CliSave::Media => SaveMode::Media,
            CliSave::All => SaveMode::All,
        }
    }
}

#[derive(Parser)]
#[command(name = "vidbrief")]
#[command(
    about = "Fetch YouTube captions, metadata and comments, and produce token-budgeted AI summaries"
)]
struct Cli {
    /// Video, playlist or channel URL, channel ID or @handle, or a file with one input per line
    input: String,

    /// Configuration file (defaults to ./vidbrief.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM provider for the summary
    #[arg(short, long)]
    provider: Option<CliProvider>,

    /// Model name; defaults to the provider's default model
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL for self-hosted providers
    #[arg(long)]
    base_url: Option<String>,

    /// Context window budget in tokens
    #[arg(long, allow_negative_numbers = true)]
    max_tokens: Option<i64>,

    /// Comments guaranteed a place when the transcript fits
    #[arg(long)]
    min_comments: Option<usize>,

    /// Transcription backend used when captions are unavailable
    #[arg(long)]
    transcription_provider: Option<CliTranscription>,

    /// Skip captions and always transcribe the audio
    #[arg(long)]
    no_subtitles: bool,

    /// Videos to take from a channel, or "all"
    #[arg(long, default_value = "10")]
    channel_limit: ChannelLimit,

    /// Cached artifacts to keep after each video (default: meta)
    #[arg(long)]
    save: Option<CliSave>,

    /// Force re-processing even if cached files exist
    #[arg(short, long)]
    force: bool,

    /// Directory for summary files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write the assembled context without calling the LLM
    #[arg(long)]
    context_only: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            let provider: Provider = provider.into();
            config.llm.provider = provider.id().to_string();
            if self.model.is_none() {
                config.llm.model = provider.config().default_model.to_string();
            }
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.llm.base_url = Some(base_url.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.context.max_tokens = max_tokens;
        }
        if let Some(min_comments) = self.min_comments {
            config.context.min_comments = min_comments;
        }
        if let Some(transcription) = self.transcription_provider {
            config.transcription.provider = transcription.id().to_string();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = Some(output_dir.clone());
        }
        if let Some(save) = self.save {
            config.save = save.into();
        }
        if self.json_logs {
            config.logging.format = LogFormat::Json;
        }
    }
}

extern "C" fn whisper_log_callback(
    _level: u32,
    _message: *const std::ffi::c_char,
    _user_data: *mut std::ffi::c_void,
) {
    // silent
}

fn exit_with(err: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), err);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| exit_with(e));
    cli.apply(&mut config);
    if let Err(e) = config.validate() {
        exit_with(e);
    }
    logging::init(&config.logging)?;

    unsafe {
        whisper_rs::set_log_callback(Some(whisper_log_callback), std::ptr::null_mut());
    }

    // Validate API keys early
    let summarizer = if cli.context_only {
        None
    } else {
        if let Err(e) = required_api_key(&config) {
            exit_with(e);
        }
        Some(Summarizer::from_config(&config).unwrap_or_else(|e| exit_with(e)))
    };
    if let Err(e) = check_transcription_key(&config) {
        exit_with(e);
    }

    let policy = config.budget_policy()?;
    let tokenizer =
        Tokenizer::for_model(policy.provider(), policy.model()).unwrap_or_else(|e| exit_with(e));

    println!("{}", style("vidbrief").bold().cyan());
    ui::rule();
    ui::done(&format!(
        "Tokenizer: {}{} for {}",
        tokenizer.encoding().name(),
        if tokenizer.is_approximate() { " (approximate)" } else { "" },
        policy.model()
    ));

    let inputs = read_inputs(&cli.input).await.unwrap_or_else(|e| exit_with(e));
    if inputs.is_empty() {
        exit_with("no inputs to process");
    }

    let output_root = config
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let plan = run::plan(&inputs, &output_root, cli.channel_limit).await;
    tracing::info!(videos = plan.jobs.len(), "processing plan ready");

    let options = RunOptions {
        force: cli.force,
        no_subtitles: cli.no_subtitles,
        context_only: cli.context_only,
    };
    let runner = Runner::new(config, get_root_cache_dir(), tokenizer, summarizer, options)?;
    let report = runner.run(&plan).await;

    run::write_listing_info(&plan, &report).await?;
    run::print_summary(&report);

    if report.succeeded() == 0 && !report.results().is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
