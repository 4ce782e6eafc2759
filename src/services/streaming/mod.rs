//! Incremental display of generated text

mod accumulator;
mod pipeline;
mod sink;

pub use accumulator::{RunReport, StreamState, StreamingAccumulator, DEFAULT_PACING, DISPLAY_HEADING};
pub use pipeline::{run_stream, summarize_blocking};
pub use sink::{ChannelSink, DisplaySink, RunHandle, TerminalSink};
