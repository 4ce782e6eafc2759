//! Generation request construction: normalization, length hint, prompt

use super::errors::SummarizeError;
use serde::{Deserialize, Serialize};

const PROMPT_PREFIX: &str = "Summarize the following conversation: \n###\n";
const PROMPT_SUFFIX: &str = "\n### Summary:";

/// Fraction of the dialogue's word count suggested as summary length
const TARGET_LENGTH_RATIO: f64 = 0.15;

/// Decoding parameters handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodingParams {
    pub min_new_tokens: usize,
    pub max_new_tokens: usize,
    /// 0.0 selects greedy decoding
    pub temperature: f64,
    /// Nucleus threshold; 1.0 disables it
    pub top_p: f64,
    pub top_k: Option<usize>,
    pub seed: u64,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            min_new_tokens: 10,
            max_new_tokens: 256,
            temperature: 0.9,
            top_p: 1.0,
            top_k: Some(50),
            seed: 42,
        }
    }
}

/// One user submission, ready for the model
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    dialogue: String,
    target_length: usize,
    params: DecodingParams,
}

impl GenerationRequest {
    /// Normalize raw input and build a request. Blank input is rejected
    /// before anything reaches the model.
    pub fn new(raw: &str, params: DecodingParams) -> Result<Self, SummarizeError> {
        let dialogue = normalize_dialogue(raw);
        if dialogue.is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let target_length = target_summary_length(&dialogue);
        Ok(Self {
            dialogue,
            target_length,
            params,
        })
    }

    pub fn dialogue(&self) -> &str {
        &self.dialogue
    }

    /// Suggested summary length in words. Only a hint in the prompt.
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn params(&self) -> &DecodingParams {
        &self.params
    }

    pub fn prompt(&self) -> String {
        format!(
            "{}{} The generated summary should be around {} words.{}",
            PROMPT_PREFIX, self.dialogue, self.target_length, PROMPT_SUFFIX
        )
    }
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn normalize_dialogue(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `max(1, round(0.15 * words))`
pub fn target_summary_length(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((TARGET_LENGTH_RATIO * words as f64).round() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_irregular_whitespace() {
        assert_eq!(normalize_dialogue("Hello   world"), "Hello world");
        assert_eq!(
            normalize_dialogue("  Amanda: hi\n\n\tTom:  hey there \r\n"),
            "Amanda: hi Tom: hey there"
        );
    }

    #[test]
    fn rejects_blank_input() {
        for raw in ["", "   ", "\n\t \r\n"] {
            let err = GenerationRequest::new(raw, DecodingParams::default()).unwrap_err();
            assert!(matches!(err, SummarizeError::EmptyInput));
        }
    }

    #[test]
    fn target_length_is_fifteen_percent() {
        let twenty = vec!["word"; 20].join(" ");
        assert_eq!(target_summary_length(&twenty), 3);
        assert_eq!(target_summary_length("one two"), 1);
        assert_eq!(target_summary_length(""), 1);
        assert_eq!(target_summary_length(&vec!["w"; 100].join(" ")), 15);
    }

    #[test]
    fn prompt_wraps_normalized_dialogue() -> anyhow::Result<()> {
        let request = GenerationRequest::new("Amanda:  I baked cookies.\nJerry: Sure!", DecodingParams::default())?;
        assert_eq!(request.dialogue(), "Amanda: I baked cookies. Jerry: Sure!");
        assert_eq!(request.target_length(), 1);

        let prompt = request.prompt();
        assert!(prompt.starts_with("Summarize the following conversation: \n###\nAmanda: I baked"));
        assert!(prompt.contains("around 1 words."));
        assert!(prompt.ends_with("\n### Summary:"));
        Ok(())
    }

    #[test]
    fn default_params_match_reference_decoding() {
        let params = DecodingParams::default();
        assert_eq!(params.min_new_tokens, 10);
        assert_eq!(params.max_new_tokens, 256);
        assert_eq!(params.top_k, Some(50));
        assert!((params.temperature - 0.9).abs() < f64::EPSILON);
        assert!((params.top_p - 1.0).abs() < f64::EPSILON);
    }
}
