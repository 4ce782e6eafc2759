//! The model boundary: a request in, a lazy sequence of text fragments out

use crate::types::GenerationRequest;
use anyhow::Result;

/// A piece of newly finalized text. The terminal fragment is always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub is_final: bool,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn terminal() -> Self {
        Self {
            text: String::new(),
            is_final: true,
        }
    }
}

/// Finite, non-restartable fragment sequence for one run
pub type FragmentStream<'a> = Box<dyn Iterator<Item = Result<Fragment>> + 'a>;

/// Anything that can turn a request into streamed summary text
pub trait SummaryModel: Send {
    /// Start decoding. The stream borrows the model until it is dropped,
    /// so only one run can be in flight per model.
    fn generate<'a>(&'a mut self, request: &GenerationRequest) -> Result<FragmentStream<'a>>;

    fn name(&self) -> &str;
}
