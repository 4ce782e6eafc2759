mod session;
pub mod streaming;
mod metrics;
pub mod ml;
pub mod template;

pub use session::{Session, SessionManager};
pub use metrics::{MetricsService, MetricsStats};
pub use ml::{SummaryModel, StubSummarizer, Seq2SeqSummarizer};
pub use streaming::{summarize_blocking, StreamingAccumulator};
