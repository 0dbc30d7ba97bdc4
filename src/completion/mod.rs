//! Generative completion collaborator.
//!
//! The gateway treats the model as text in, JSON text out. Prompts and the
//! expected reply shapes live in `prompts.rs`; `gemini.rs` is the one
//! concrete backend.

pub mod gemini;
pub mod prompts;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use prompts::{CompanyProfile, ParsedContact};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion timed out after {0} seconds")]
    Timeout(u64),

    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion reply had no text")]
    Empty,

    #[error("completion reply is not the expected JSON: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one prompt and return the raw text reply.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Remove Markdown code fences models like to wrap JSON in.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Strip fences and deserialize.
pub fn decode_reply<T: DeserializeOwned>(reply: &str) -> Result<T, CompletionError> {
    serde_json::from_str(strip_code_fences(reply)).map_err(|e| CompletionError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_decode_reply() {
        let profile: CompanyProfile =
            decode_reply("```json\n{\"summary\":\"Okna\",\"industry\":null}\n```").unwrap();
        assert_eq!(profile.summary, "Okna");
        assert_eq!(profile.industry, None);

        assert!(matches!(
            decode_reply::<CompanyProfile>("Sorry, I can't help."),
            Err(CompletionError::Decode(_))
        ));
    }
}
