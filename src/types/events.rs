use serde::{Deserialize, Serialize};

/// Events delivered to a session's SSE stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Full accumulated display text for a run, heading-formatted markdown
    Summary { run_id: u64, markdown: String },
    Stats {
        run_id: u64,
        words: usize,
        first_output_ms: Option<u64>,
        elapsed_ms: u64,
    },
    Complete { run_id: u64 },
    Error { run_id: u64, message: String },
    Cleared,
}

impl StreamEvent {
    pub fn summary(run_id: u64, markdown: String) -> Self {
        Self::Summary { run_id, markdown }
    }

    pub fn complete(run_id: u64) -> Self {
        Self::Complete { run_id }
    }

    pub fn error(run_id: u64, message: String) -> Self {
        Self::Error { run_id, message }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Summary { .. } => "summary",
            Self::Stats { .. } => "stats",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Cleared => "cleared",
        }
    }

    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let data = StreamEvent::complete(7).to_sse_data();
        assert_eq!(data, r#"{"type":"complete","run_id":7}"#);
        assert_eq!(StreamEvent::Cleared.event_type(), "cleared");
    }
}
