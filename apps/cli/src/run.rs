use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use console::style;
use tokio::fs;
use vidbrief_core::{
    AllocationOutcome, BudgetPolicy, Config, Tokenizer,
    cache::{find_info_json, get_cache_dir, get_transcript_path},
    format::format_duration,
    pipeline::{
        Summarizer, build_context, captions_transcript, cleanup_cache, fetch_metadata,
        load_video_info, save_summary, transcribe_fallback,
    },
    report::{BatchReport, VideoResult, VideoStatus, channel_dir_name, playlist_dir_name},
    source::{
        ChannelLimit, ChannelListing, PlaylistListing, SourceKind, classify, expand_channel,
        expand_playlist, extract_video_id,
    },
};

use crate::ui;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub force: bool,
    pub no_subtitles: bool,
    pub context_only: bool,
}

/// One video to process and where its summary goes.
#[derive(Debug, Clone)]
pub struct Job {
    pub video_id: String,
    pub url: String,
    pub title: String,
    pub output_dir: PathBuf,
}

/// Jobs expanded from the inputs, plus the listings that need index files.
#[derive(Default)]
pub struct Plan {
    pub jobs: Vec<Job>,
    pub playlists: Vec<(PathBuf, PlaylistListing)>,
    pub channels: Vec<(PathBuf, ChannelListing)>,
}

pub async fn plan(inputs: &[String], output_root: &Path, limit: ChannelLimit) -> Plan {
    let mut plan = Plan::default();

    for input in inputs {
        let source = classify(input);
        match source.kind {
            SourceKind::Playlist => {
                let listing = match ui::step(
                    "Listing playlist...",
                    |l: &PlaylistListing| format!("Playlist: {} ({} videos)", l.title, l.videos.len()),
                    expand_playlist(&source.url),
                )
                .await
                {
                    Ok(listing) => listing,
                    Err(_) => continue,
                };
                let dir = output_root.join(playlist_dir_name(&listing));
                plan.jobs.extend(listing.videos.iter().map(|v| Job {
                    video_id: v.id.clone(),
                    url: v.url.clone(),
                    title: v.title.clone(),
                    output_dir: dir.clone(),
                }));
                plan.playlists.push((dir, listing));
            }
            SourceKind::Channel => {
                let listing = match ui::step(
                    &format!("Listing channel (limit {limit})..."),
                    |l: &ChannelListing| format!("Channel: {} ({} videos)", l.name, l.videos.len()),
                    expand_channel(&source.url, limit),
                )
                .await
                {
                    Ok(listing) => listing,
                    Err(_) => continue,
                };
                let dir = output_root.join(channel_dir_name(&listing));
                plan.jobs.extend(listing.videos.iter().map(|v| Job {
                    video_id: v.id.clone(),
                    url: v.url.clone(),
                    title: v.title.clone(),
                    output_dir: dir.clone(),
                }));
                plan.channels.push((dir, listing));
            }
            SourceKind::Video => match extract_video_id(&source.url) {
                Some(video_id) => plan.jobs.push(Job {
                    video_id,
                    url: source.url,
                    title: "Unknown".to_string(),
                    output_dir: output_root.to_path_buf(),
                }),
                None => ui::warn(&format!("Could not extract video ID: {input}")),
            },
        }
    }

    plan
}

pub struct Runner {
    config: Config,
    root_cache_dir: PathBuf,
    tokenizer: Tokenizer,
    policy: BudgetPolicy,
    summarizer: Option<Summarizer>,
    options: RunOptions,
}

impl Runner {
    pub fn new(
        config: Config,
        root_cache_dir: PathBuf,
        tokenizer: Tokenizer,
        summarizer: Option<Summarizer>,
        options: RunOptions,
    ) -> Result<Self> {
        let policy = config.budget_policy()?;
        Ok(Self {
            config,
            root_cache_dir,
            tokenizer,
            policy,
            summarizer,
            options,
        })
    }

    pub async fn run(&self, plan: &Plan) -> BatchReport {
        let mut report = BatchReport::default();
        let total = plan.jobs.len();

        for (idx, job) in plan.jobs.iter().enumerate() {
            println!(
                "\n{} {} {}",
                style(format!("[{}/{}]", idx + 1, total)).dim(),
                style(&job.video_id).cyan().bold(),
                style(&job.title).dim()
            );
            ui::rule();

            let (title, status) = match self.process(job).await {
                Ok((title, summary_path)) => {
                    ui::done(&format!("Saved {}", style(summary_path.display()).cyan()));
                    (title, VideoStatus::Success { summary_path })
                }
                Err(err) => {
                    tracing::error!(video_id = %job.video_id, error = %err, "video failed");
                    println!("{} {}", style("Error:").red().bold(), err);
                    (
                        job.title.clone(),
                        VideoStatus::Failed {
                            error: err.to_string(),
                        },
                    )
                }
            };
            report.record(VideoResult {
                video_id: job.video_id.clone(),
                title,
                status,
            });
        }

        report
    }

    async fn process(&self, job: &Job) -> Result<(String, PathBuf)> {
        let cache_dir = get_cache_dir(&self.root_cache_dir, &job.video_id);
        if self.options.force && cache_dir.exists() {
            fs::remove_dir_all(&cache_dir).await?;
        }
        fs::create_dir_all(&cache_dir).await?;

        // Step 1: metadata, comments and captions
        if find_info_json(&cache_dir).is_some() {
            ui::cached("Metadata fetched");
        } else {
            ui::step(
                "Fetching metadata and comments...",
                |_: &()| "Metadata fetched".to_string(),
                fetch_metadata(
                    &job.url,
                    &cache_dir,
                    &self.config.download,
                    !self.options.no_subtitles,
                ),
            )
            .await?;
        }
        let info = load_video_info(&cache_dir, &job.video_id).await?;
        let length = info
            .duration
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(|d| format!(" ({})", format_duration(d)))
            .unwrap_or_default();
        ui::done(&format!(
            "{}{} with {} comments",
            style(&info.title).bold(),
            length,
            info.comments.len()
        ));

        // Step 2: transcript
        let transcript = self.transcript(job, &cache_dir).await?;

        // Step 3: bounded context
        let context = build_context(&info, &transcript, &self.tokenizer, &self.policy);
        let d = &context.diagnostics;
        let outcome = match context.outcome {
            AllocationOutcome::Overflow => style("title+description exceed budget").red(),
            AllocationOutcome::InsufficientSpace => style("no room for transcript").yellow(),
            AllocationOutcome::FullWithBackfill { .. } => style("full transcript").green(),
            AllocationOutcome::Truncated { .. } => style("transcript truncated").yellow(),
        };
        ui::done(&format!(
            "Context: {} / {} tokens, {} comments, {}",
            d.final_tokens,
            self.policy.max_tokens(),
            d.comments_included,
            outcome
        ));

        // Step 4: summary
        let summary = match &self.summarizer {
            Some(summarizer) if !self.options.context_only => Some(
                ui::step(
                    &format!(
                        "Summarizing with {} ({})...",
                        summarizer.provider(),
                        summarizer.model()
                    ),
                    |_: &String| format!("Summary generated ({})", summarizer.provider()),
                    summarizer.summarize(&context.text),
                )
                .await?,
            ),
            _ => None,
        };

        let path = save_summary(
            &job.output_dir,
            &job.video_id,
            summary.as_deref(),
            &context.text,
        )
        .await?;
        cleanup_cache(&cache_dir, self.config.save).await;

        Ok((info.title, path))
    }

    async fn transcript(&self, job: &Job, cache_dir: &Path) -> Result<String> {
        let transcript_path = get_transcript_path(cache_dir);
        if transcript_path.exists() {
            ui::cached("Transcript ready");
            return Ok(fs::read_to_string(&transcript_path).await?);
        }

        let from_captions = if self.options.no_subtitles {
            None
        } else {
            captions_transcript(cache_dir, &self.config.download.sub_lang).await?
        };

        let transcript = match from_captions {
            Some(transcript) => {
                ui::done("Transcript built from captions");
                transcript
            }
            None => {
                let provider = self.config.transcription_provider()?;
                ui::step(
                    &format!("No usable captions, transcribing with {}...", provider.name()),
                    |_: &String| format!("Transcribed with {}", provider.name()),
                    transcribe_fallback(&job.url, cache_dir, &self.root_cache_dir, &self.config),
                )
                .await?
            }
        };

        fs::write(&transcript_path, &transcript).await?;
        Ok(transcript)
    }
}

/// Write `*_INFO.md` for each expanded playlist and channel.
pub async fn write_listing_info(plan: &Plan, report: &BatchReport) -> Result<()> {
    for (dir, playlist) in &plan.playlists {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}_INFO.md", playlist_dir_name(playlist)));
        fs::write(&path, report.playlist_info(playlist)).await?;
        ui::done(&format!("Playlist index saved to {}", path.display()));
    }
    for (dir, channel) in &plan.channels {
        fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}_INFO.md", channel_dir_name(channel)));
        fs::write(&path, report.channel_info(channel)).await?;
        ui::done(&format!("Channel index saved to {}", path.display()));
    }
    Ok(())
}

pub fn print_summary(report: &BatchReport) {
    if report.results().is_empty() {
        return;
    }

    println!();
    ui::rule();
    println!("{}", style("Processing Summary").blue().bold());
    println!("{} {}", style("Successful:").green(), report.succeeded());
    println!("{} {}", style("Failed:").red(), report.failed().count());

    let failed: Vec<&VideoResult> = report.failed().collect();
    if !failed.is_empty() {
        println!("\n{}", style("Failed Videos:").yellow());
        for result in failed {
            println!("  - {}: {}", result.video_id, result.title);
            if let VideoStatus::Failed { error } = &result.status {
                println!("    Error: {error}");
            }
        }
    }
}
