//! Splits a fixed token budget between title, description, transcript and
//! ranked comments.
//!
//! Every input reaches exactly one [`AllocationOutcome`]:
//!
//! - [`Overflow`](AllocationOutcome::Overflow): title and description alone
//!   exhaust the budget. Both content sections are replaced by a marker.
//! - [`InsufficientSpace`](AllocationOutcome::InsufficientSpace): the minimum
//!   comment set leaves no room for any transcript. Those comments are still
//!   rendered, so this outcome and `Overflow` may exceed the budget.
//! - [`FullWithBackfill`](AllocationOutcome::FullWithBackfill): the whole
//!   transcript fits and leftover tokens go to further ranked comments.
//! - [`Truncated`](AllocationOutcome::Truncated): the transcript is cut at a
//!   token boundary and only the minimum comments are kept.
//!
//! Section sizes come from one pass of budget arithmetic. The token count of
//! the assembled string is recomputed afterwards for diagnostics only.

use std::borrow::Cow;

use crate::{format::format_comment_line, tokenizer::Tokenizer, types::Comment};

use super::BudgetPolicy;

pub const TRANSCRIPT_HEADER: &str = "TRANSCRIPT:\n";
pub const COMMENTS_HEADER: &str = "\n\nCOMMENTS:\n";
pub const CONTENT_TOO_LARGE: &str = "[Content too large]";
pub const INSUFFICIENT_SPACE: &str = "[Insufficient space for transcript]";
pub const NO_COMMENTS: &str = "No comments found.";

pub struct ContextInput<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub transcript: &'a str,
    pub comments: &'a [Comment],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationOutcome {
    Overflow,
    InsufficientSpace,
    FullWithBackfill { backfilled: usize },
    Truncated { kept_tokens: usize, total_tokens: usize },
}

impl AllocationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AllocationOutcome::Overflow => "overflow",
            AllocationOutcome::InsufficientSpace => "insufficient_space",
            AllocationOutcome::FullWithBackfill { .. } => "full_with_backfill",
            AllocationOutcome::Truncated { .. } => "truncated",
        }
    }

    /// Title and description did not fit; the output is degraded but valid.
    pub fn is_overflow(&self) -> bool {
        matches!(self, AllocationOutcome::Overflow)
    }

    /// Outcomes whose fixed sections are rendered regardless of the budget.
    pub fn may_exceed_budget(&self) -> bool {
        matches!(
            self,
            AllocationOutcome::Overflow | AllocationOutcome::InsufficientSpace
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextDiagnostics {
    pub base_tokens: usize,
    pub comments_tokens: usize,
    pub transcript_tokens: usize,
    /// Advisory recount of the assembled string.
    pub final_tokens: usize,
    pub comments_included: usize,
}

#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub outcome: AllocationOutcome,
    pub diagnostics: ContextDiagnostics,
}

struct Selection<'a> {
    outcome: AllocationOutcome,
    transcript: Cow<'a, str>,
    comment_lines: Vec<String>,
    comments_tokens: usize,
    transcript_tokens: usize,
}

impl Selection<'_> {
    fn overflow() -> Self {
        Self {
            outcome: AllocationOutcome::Overflow,
            transcript: Cow::Borrowed(CONTENT_TOO_LARGE),
            comment_lines: Vec::new(),
            comments_tokens: 0,
            transcript_tokens: 0,
        }
    }

    fn comments_section(&self) -> String {
        match self.outcome {
            AllocationOutcome::Overflow => CONTENT_TOO_LARGE.to_string(),
            _ if self.comment_lines.is_empty() => NO_COMMENTS.to_string(),
            _ => self.comment_lines.join("\n"),
        }
    }
}

/// Order comments by `like_count`, highest first. Ties keep input order.
pub fn rank_comments(comments: &[Comment]) -> Vec<&Comment> {
    let mut ranked: Vec<&Comment> = comments.iter().collect();
    ranked.sort_by(|a, b| b.like_count.cmp(&a.like_count));
    ranked
}

pub struct ContextAllocator<'a> {
    tokenizer: &'a Tokenizer,
    policy: &'a BudgetPolicy,
}

impl<'a> ContextAllocator<'a> {
    pub fn new(tokenizer: &'a Tokenizer, policy: &'a BudgetPolicy) -> Self {
        Self { tokenizer, policy }
    }

    pub fn allocate(&self, input: &ContextInput<'_>) -> AssembledContext {
        let title_block = format!("TITLE: {}\n", input.title);
        let description_block = format!("DESCRIPTION:\n{}\n\n", input.description);
        let base_tokens =
            self.tokenizer.count(&title_block) + self.tokenizer.count(&description_block);

        let available = self.policy.max_tokens() as i64
            - base_tokens as i64
            - self.policy.token_buffer() as i64;

        let selection = if available <= 0 {
            tracing::warn!(
                base_tokens,
                max_tokens = self.policy.max_tokens(),
                "title and description exceed the context budget"
            );
            Selection::overflow()
        } else {
            self.select(input, available)
        };

        let text = format!(
            "{title_block}{description_block}{TRANSCRIPT_HEADER}{}{COMMENTS_HEADER}{}",
            selection.transcript,
            selection.comments_section()
        );

        let diagnostics = ContextDiagnostics {
            base_tokens,
            comments_tokens: selection.comments_tokens,
            transcript_tokens: selection.transcript_tokens,
            final_tokens: self.tokenizer.count(&text),
            comments_included: selection.comment_lines.len(),
        };

        tracing::info!(
            outcome = selection.outcome.label(),
            encoding = self.tokenizer.encoding().name(),
            approximate = self.tokenizer.is_approximate(),
            base_tokens = diagnostics.base_tokens,
            comments_tokens = diagnostics.comments_tokens,
            transcript_tokens = diagnostics.transcript_tokens,
            final_tokens = diagnostics.final_tokens,
            max_tokens = self.policy.max_tokens(),
            "assembled context"
        );
        if diagnostics.final_tokens > self.policy.max_tokens()
            && !selection.outcome.may_exceed_budget()
        {
            tracing::warn!(
                final_tokens = diagnostics.final_tokens,
                max_tokens = self.policy.max_tokens(),
                "assembled context exceeds budget; consider a larger token_buffer"
            );
        }

        AssembledContext {
            text,
            outcome: selection.outcome,
            diagnostics,
        }
    }

    fn select<'i>(&self, input: &ContextInput<'i>, available: i64) -> Selection<'i> {
        let ranked = rank_comments(input.comments);
        let target = self.policy.min_comments().min(ranked.len());

        let mut comment_lines: Vec<String> = ranked[..target]
            .iter()
            .enumerate()
            .map(|(idx, comment)| format_comment_line(idx + 1, comment))
            .collect();
        let mut comments_tokens: usize = comment_lines.iter().map(|l| self.line_cost(l)).sum();

        let header_tokens =
            self.tokenizer.count(TRANSCRIPT_HEADER) + self.tokenizer.count(COMMENTS_HEADER);
        let transcript_budget = available - comments_tokens as i64 - header_tokens as i64;

        tracing::debug!(
            comments = comment_lines.len(),
            comments_tokens,
            transcript_budget,
            "reserved minimum comments"
        );

        if transcript_budget <= 0 {
            tracing::warn!(
                comments = comment_lines.len(),
                comments_tokens,
                "no space left for transcript after minimum comments"
            );
            return Selection {
                outcome: AllocationOutcome::InsufficientSpace,
                transcript: Cow::Borrowed(INSUFFICIENT_SPACE),
                comment_lines,
                comments_tokens,
                transcript_tokens: 0,
            };
        }

        let budget = transcript_budget as usize;
        let tokens = self.tokenizer.encode(input.transcript);

        if tokens.len() <= budget {
            let mut remaining = budget - tokens.len();
            let mut backfilled = 0;
            for (idx, comment) in ranked.iter().enumerate().skip(target) {
                let line = format_comment_line(idx + 1, comment);
                let cost = self.line_cost(&line);
                if cost > remaining {
                    break;
                }
                remaining -= cost;
                comments_tokens += cost;
                comment_lines.push(line);
                backfilled += 1;
            }
            if backfilled > 0 {
                tracing::debug!(backfilled, remaining, "backfilled comments");
            }

            Selection {
                outcome: AllocationOutcome::FullWithBackfill { backfilled },
                transcript: Cow::Borrowed(input.transcript),
                comment_lines,
                comments_tokens,
                transcript_tokens: tokens.len(),
            }
        } else {
            let (transcript, kept_tokens) = self.tokenizer.decode_prefix(&tokens, budget);
            tracing::debug!(
                total_tokens = tokens.len(),
                kept_tokens,
                budget,
                "truncating transcript"
            );
            Selection {
                outcome: AllocationOutcome::Truncated {
                    kept_tokens,
                    total_tokens: tokens.len(),
                },
                transcript: Cow::Owned(transcript),
                comment_lines,
                comments_tokens,
                transcript_tokens: kept_tokens,
            }
        }
    }

    /// A rendered comment costs its line plus the joining newline.
    fn line_cost(&self, line: &str) -> usize {
        self.tokenizer.count(&format!("{line}\n"))
    }
}
