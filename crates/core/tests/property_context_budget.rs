use std::sync::LazyLock;

use proptest::prelude::*;
use vidbrief_core::{
    context::{
        AllocationOutcome, BudgetPolicy, ContextAllocator, ContextInput,
        allocator::{COMMENTS_HEADER, TRANSCRIPT_HEADER},
        rank_comments,
    },
    format::format_comment_line,
    tokenizer::{Encoding, Tokenizer},
    types::Comment,
};

static TOKENIZER: LazyLock<Tokenizer> =
    LazyLock::new(|| Tokenizer::from_encoding(Encoding::Cl100kBase).expect("cl100k_base loads"));

const BUFFER: usize = 64;

fn words(range: std::ops::Range<usize>) -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,9}", range).prop_map(|w| w.join(" "))
}

fn arb_comments() -> impl Strategy<Value = Vec<Comment>> {
    prop::collection::vec(
        ("[a-z]{1,8}", words(1..25), 0u64..6),
        0..30,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .map(|(author, text, likes)| Comment::new(author, text, likes))
            .collect()
    })
}

fn line_cost(rank: usize, comment: &Comment) -> usize {
    TOKENIZER.count(&format!("{}\n", format_comment_line(rank, comment)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the assembled context fits the budget unless title and
    /// description alone overflow it, or the minimum comments leave no room
    /// for the transcript (those comments are kept whole)
    #[test]
    fn prop_context_fits_budget(
        title in words(1..12),
        description in words(0..80),
        transcript in words(0..600),
        comments in arb_comments(),
        max_tokens in 80usize..1500,
        min_comments in 0usize..12,
    ) {
        let policy = BudgetPolicy::new(max_tokens as i64, min_comments, BUFFER, "openai", "gpt-4").unwrap();
        let ctx = ContextAllocator::new(&TOKENIZER, &policy).allocate(&ContextInput {
            title: &title,
            description: &description,
            transcript: &transcript,
            comments: &comments,
        });

        if !ctx.outcome.may_exceed_budget() {
            prop_assert!(
                ctx.diagnostics.final_tokens <= max_tokens,
                "{} > {} ({:?})", ctx.diagnostics.final_tokens, max_tokens, ctx.outcome
            );
        }
        prop_assert_eq!(ctx.diagnostics.final_tokens, TOKENIZER.count(&ctx.text));
    }

    /// Property: comments appear as the ranked-order prefix, and backfill
    /// stops only at a comment that would not fit
    #[test]
    fn prop_backfill_is_greedy_ranked_prefix(
        transcript in words(0..60),
        comments in arb_comments(),
        max_tokens in 150usize..900,
        min_comments in 0usize..4,
    ) {
        let policy = BudgetPolicy::new(max_tokens as i64, min_comments, BUFFER, "openai", "gpt-4").unwrap();
        let ctx = ContextAllocator::new(&TOKENIZER, &policy).allocate(&ContextInput {
            title: "T",
            description: "D",
            transcript: &transcript,
            comments: &comments,
        });

        let AllocationOutcome::FullWithBackfill { backfilled } = ctx.outcome else {
            return Ok(());
        };

        let ranked = rank_comments(&comments);
        let included = ctx.diagnostics.comments_included;
        prop_assert_eq!(included, min_comments.min(ranked.len()) + backfilled);

        let expected: Vec<String> = ranked[..included]
            .iter()
            .enumerate()
            .map(|(i, c)| format_comment_line(i + 1, c))
            .collect();
        if !expected.is_empty() {
            let suffix = format!("COMMENTS:\n{}", expected.join("\n"));
            prop_assert!(ctx.text.ends_with(&suffix));
        }

        // The first excluded comment is the one the backfill loop stopped at.
        if included < ranked.len() {
            let spent = ctx.diagnostics.base_tokens
                + BUFFER
                + TOKENIZER.count(TRANSCRIPT_HEADER)
                + TOKENIZER.count(COMMENTS_HEADER)
                + ctx.diagnostics.transcript_tokens
                + ctx.diagnostics.comments_tokens;
            let next = line_cost(included + 1, ranked[included]);
            prop_assert!(spent + next > max_tokens);
        }
    }

    /// Property: equal like counts keep their input order
    #[test]
    fn prop_ranking_is_stable(likes in prop::collection::vec(0u64..4, 0..40)) {
        let comments: Vec<Comment> = likes
            .iter()
            .enumerate()
            .map(|(i, &l)| Comment::new(format!("{i}"), "x", l))
            .collect();
        let ranked = rank_comments(&comments);

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].like_count >= pair[1].like_count);
            if pair[0].like_count == pair[1].like_count {
                let a: usize = pair[0].author.parse().unwrap();
                let b: usize = pair[1].author.parse().unwrap();
                prop_assert!(a < b);
            }
        }
    }
}
