//! Byte-pair-encoding token accounting.
//!
//! The encoding is picked from a priority-ordered rule table keyed on the
//! `(provider, model)` pair; the first matching rule wins. Providers without
//! a public tokenizer (Anthropic) are served by `cl100k_base` as a stand-in,
//! so their counts are estimates and the resulting [`Tokenizer`] reports
//! itself as approximate.

use tiktoken_rs::{
    CoreBPE,
    tokenizer::{Tokenizer as ModelTokenizer, get_tokenizer},
};

use crate::error::{Result, VidbriefError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    O200kBase,
    Cl100kBase,
    P50kBase,
    P50kEdit,
    R50kBase,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::O200kBase => "o200k_base",
            Encoding::Cl100kBase => "cl100k_base",
            Encoding::P50kBase => "p50k_base",
            Encoding::P50kEdit => "p50k_edit",
            Encoding::R50kBase => "r50k_base",
        }
    }

    fn load(self) -> anyhow::Result<CoreBPE> {
        match self {
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            Encoding::P50kBase => tiktoken_rs::p50k_base(),
            Encoding::P50kEdit => tiktoken_rs::p50k_edit(),
            Encoding::R50kBase => tiktoken_rs::r50k_base(),
        }
    }
}

/// Result of running the selection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingChoice {
    pub encoding: Encoding,
    /// Counts are a stand-in for a tokenizer we cannot run locally.
    pub approximate: bool,
    pub rule: &'static str,
}

struct EncodingRule {
    name: &'static str,
    applies: fn(provider: &str, model: &str) -> bool,
    resolve: fn(model: &str) -> (Encoding, bool),
}

const FALLBACK_ENCODING: Encoding = Encoding::Cl100kBase;

/// Checked top to bottom. Provider and model are lowercased before matching.
const ENCODING_RULES: &[EncodingRule] = &[
    EncodingRule {
        name: "openai-model",
        applies: is_openai,
        resolve: resolve_openai_model,
    },
    EncodingRule {
        name: "no-public-tokenizer",
        applies: has_no_public_tokenizer,
        resolve: stand_in_encoding,
    },
    EncodingRule {
        name: "o200k-family",
        applies: is_o200k_family,
        resolve: o200k_encoding,
    },
];

fn is_openai(provider: &str, _model: &str) -> bool {
    provider == "openai"
}

fn resolve_openai_model(model: &str) -> (Encoding, bool) {
    let encoding = match get_tokenizer(model) {
        Some(ModelTokenizer::O200kBase) => Encoding::O200kBase,
        Some(ModelTokenizer::Cl100kBase) => Encoding::Cl100kBase,
        Some(ModelTokenizer::P50kBase) => Encoding::P50kBase,
        Some(ModelTokenizer::P50kEdit) => Encoding::P50kEdit,
        Some(ModelTokenizer::R50kBase) | Some(ModelTokenizer::Gpt2) => Encoding::R50kBase,
        #[allow(unreachable_patterns)]
        _ => FALLBACK_ENCODING,
    };
    (encoding, false)
}

fn has_no_public_tokenizer(provider: &str, _model: &str) -> bool {
    matches!(provider, "anthropic" | "claude")
}

fn stand_in_encoding(_model: &str) -> (Encoding, bool) {
    (FALLBACK_ENCODING, true)
}

fn is_o200k_family(_provider: &str, model: &str) -> bool {
    model.contains("gpt-4o") || model.contains("o1")
}

fn o200k_encoding(_model: &str) -> (Encoding, bool) {
    (Encoding::O200kBase, false)
}

/// Pick the encoding for a provider/model pair without loading it.
pub fn select_encoding(provider: &str, model: &str) -> EncodingChoice {
    let provider = provider.trim().to_lowercase();
    let model = model.trim().to_lowercase();

    ENCODING_RULES
        .iter()
        .find(|rule| (rule.applies)(&provider, &model))
        .map(|rule| {
            let (encoding, approximate) = (rule.resolve)(&model);
            EncodingChoice {
                encoding,
                approximate,
                rule: rule.name,
            }
        })
        .unwrap_or(EncodingChoice {
            encoding: FALLBACK_ENCODING,
            approximate: false,
            rule: "default",
        })
}

pub struct Tokenizer {
    bpe: CoreBPE,
    choice: EncodingChoice,
}

impl Tokenizer {
    /// Load the encoding selected for `provider`/`model`.
    ///
    /// Fails with [`VidbriefError::TokenizerUnavailable`] when the BPE ranks
    /// cannot be loaded; every budget decision depends on these counts, so
    /// there is no heuristic fallback.
    pub fn for_model(provider: &str, model: &str) -> Result<Self> {
        let choice = select_encoding(provider, model);
        if choice.approximate {
            tracing::debug!(
                provider,
                model,
                encoding = choice.encoding.name(),
                "no public tokenizer for provider, token counts are estimates"
            );
        }
        Self::load(choice)
    }

    pub fn from_encoding(encoding: Encoding) -> Result<Self> {
        Self::load(EncodingChoice {
            encoding,
            approximate: false,
            rule: "explicit",
        })
    }

    fn load(choice: EncodingChoice) -> Result<Self> {
        let bpe = choice
            .encoding
            .load()
            .map_err(|e| VidbriefError::TokenizerUnavailable {
                encoding: choice.encoding.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { bpe, choice })
    }

    pub fn encoding(&self) -> Encoding {
        self.choice.encoding
    }

    pub fn is_approximate(&self) -> bool {
        self.choice.approximate
    }

    /// Special-token markers in the input are encoded as ordinary text.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.encode(text).len()
    }

    pub fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| VidbriefError::TokenizerUnavailable {
                encoding: self.choice.encoding.name().to_string(),
                reason: format!("decode failed: {e}"),
            })
    }

    /// Keep the first `max_tokens` tokens of `text`.
    pub fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.encode(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }
        self.decode_prefix(&tokens, max_tokens).0
    }

    /// Decode at most `max_tokens` leading tokens, returning the text and
    /// the number of tokens it came from.
    ///
    /// A cut through a multi-byte character does not decode to valid UTF-8;
    /// the prefix then shrinks one token at a time until it does.
    pub fn decode_prefix(&self, tokens: &[u32], max_tokens: usize) -> (String, usize) {
        let mut end = max_tokens.min(tokens.len());
        while end > 0 {
            if let Ok(text) = self.decode(&tokens[..end]) {
                return (text, end);
            }
            end -= 1;
        }
        (String::new(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_models_resolve_by_name() {
        assert_eq!(
            select_encoding("openai", "gpt-4o-mini").encoding,
            Encoding::O200kBase
        );
        assert_eq!(
            select_encoding("OpenAI", "gpt-4").encoding,
            Encoding::Cl100kBase
        );
        assert_eq!(select_encoding("openai", "gpt-4").rule, "openai-model");
    }

    #[test]
    fn unknown_openai_model_falls_back() {
        let choice = select_encoding("openai", "not-a-real-model");
        assert_eq!(choice.encoding, Encoding::Cl100kBase);
        assert!(!choice.approximate);
    }

    #[test]
    fn anthropic_is_an_approximation() {
        let choice = select_encoding("anthropic", "claude-sonnet-4");
        assert_eq!(choice.encoding, Encoding::Cl100kBase);
        assert!(choice.approximate);
        assert!(select_encoding("claude", "whatever").approximate);
    }

    #[test]
    fn model_pattern_applies_to_other_providers() {
        let choice = select_encoding("openrouter", "openai/gpt-4o");
        assert_eq!(choice.encoding, Encoding::O200kBase);
        assert_eq!(choice.rule, "o200k-family");
    }

    #[test]
    fn default_encoding() {
        let choice = select_encoding("ollama", "llama3.1");
        assert_eq!(choice.encoding, Encoding::Cl100kBase);
        assert_eq!(choice.rule, "default");
    }

    #[test]
    fn count_empty_is_zero() {
        let tok = Tokenizer::from_encoding(Encoding::Cl100kBase).unwrap();
        assert_eq!(tok.count(""), 0);
        assert!(tok.count("Hello, world!") > 0);
    }

    #[test]
    fn truncate_respects_limit() {
        let tok = Tokenizer::from_encoding(Encoding::Cl100kBase).unwrap();
        let text = "one two three four five six seven eight nine ten";
        let cut = tok.truncate(text, 4);
        assert!(tok.count(&cut) <= 4);
        assert!(text.starts_with(&cut));
        assert_eq!(tok.truncate(text, 1_000), text);
    }

    #[test]
    fn truncate_to_zero_is_empty() {
        let tok = Tokenizer::from_encoding(Encoding::Cl100kBase).unwrap();
        assert_eq!(tok.truncate("something", 0), "");
    }

    #[test]
    fn decode_prefix_survives_multibyte_cut() {
        let tok = Tokenizer::from_encoding(Encoding::Cl100kBase).unwrap();
        let text = "日本語のテキストと絵文字 🎉🎉🎉 が混在 𝔘𝔫𝔦𝔠𝔬𝔡𝔢 𓀀𓀁";
        let tokens = tok.encode(text);
        let mut backed_off = false;
        for n in 0..=tokens.len() {
            let (prefix, used) = tok.decode_prefix(&tokens, n);
            assert!(text.starts_with(&prefix));
            assert!(used <= n);
            assert_eq!(tok.decode(&tokens[..used]).unwrap(), prefix);
            backed_off |= used < n;
        }
        // rare four-byte characters span several tokens
        assert!(backed_off);
    }
}
