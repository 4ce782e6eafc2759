//! Weightless stand-in model

use super::source::{Fragment, FragmentStream, SummaryModel};
use crate::types::GenerationRequest;
use anyhow::Result;

/// Stand-in used when no model weights could be loaded.
///
/// Streams the leading words of the dialogue, as many as the request's
/// target length, so the page stays usable without a model.
pub struct StubSummarizer;

impl StubSummarizer {
    pub fn new() -> Self {
        tracing::info!("📦 Creating stub summarizer (no model loaded)");
        Self
    }
}

impl Default for StubSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryModel for StubSummarizer {
    fn generate<'a>(&'a mut self, request: &GenerationRequest) -> Result<FragmentStream<'a>> {
        tracing::info!("🎯 Stub generation for {} chars", request.dialogue().len());

        let words: Vec<String> = request
            .dialogue()
            .split_whitespace()
            .take(request.target_length())
            .map(|word| format!("{} ", word))
            .collect();

        // Mirrors a real decoder: the start token decodes to nothing
        let fragments = std::iter::once(Fragment::text(""))
            .chain(words.into_iter().map(Fragment::text))
            .chain(std::iter::once(Fragment::terminal()))
            .map(Ok);

        Ok(Box::new(fragments))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DecodingParams;

    #[test]
    fn yields_leading_words_up_to_target_length() -> Result<()> {
        let dialogue = (1..=40).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let request = GenerationRequest::new(&dialogue, DecodingParams::default())?;
        let mut stub = StubSummarizer::new();

        let fragments = stub.generate(&request)?.collect::<Result<Vec<_>>>()?;
        assert_eq!(fragments.first(), Some(&Fragment::text("")));
        assert_eq!(fragments.last(), Some(&Fragment::terminal()));

        let words: usize = fragments.iter().map(|f| f.text.split_whitespace().count()).sum();
        assert_eq!(words, request.target_length());
        assert_eq!(words, 6);
        Ok(())
    }
}
