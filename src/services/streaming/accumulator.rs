//! Incremental accumulation of generated text
//!
//! Fragments arrive from the decoding loop one at a time. Each one is
//! appended to the running text and the whole text is pushed to the
//! display, followed by a short pacing delay so the reveal stays visible.

use super::sink::DisplaySink;
use crate::types::SinkError;
use std::time::{Duration, Instant};

/// Markdown prefix the display text is rendered under
pub const DISPLAY_HEADING: &str = "###### ";

pub const DEFAULT_PACING: Duration = Duration::from_millis(30);

/// Per-run state. Private to one generation run.
#[derive(Debug, Default)]
pub struct StreamState {
    text: String,
    started_at: Option<Instant>,
    first_output_at: Option<Instant>,
    word_count: usize,
    fragments: usize,
    finished: bool,
}

impl StreamState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn first_output_at(&self) -> Option<Instant> {
        self.first_output_at
    }

    /// Sum of whitespace-split word counts per fragment. A word split
    /// across two fragments is counted twice.
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub text: String,
    pub word_count: usize,
    pub fragments: usize,
    pub time_to_first_output: Option<Duration>,
    pub elapsed: Duration,
}

pub struct StreamingAccumulator<S: DisplaySink> {
    sink: S,
    state: StreamState,
    pacing: Duration,
}

impl<S: DisplaySink> StreamingAccumulator<S> {
    pub fn new(sink: S, pacing: Duration) -> Self {
        Self {
            sink,
            state: StreamState::default(),
            pacing,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Take one fragment from the decoding loop and refresh the display.
    /// A failed push ends the run: the error goes back to the driving loop.
    pub fn on_fragment(&mut self, fragment: &str, is_final: bool) -> Result<(), SinkError> {
        let now = Instant::now();
        if self.state.started_at.is_none() {
            self.state.started_at = Some(now);
        }
        if self.state.first_output_at.is_none() && !fragment.trim().is_empty() {
            self.state.first_output_at = Some(now);
            tracing::debug!("[STREAM] First output after {} fragments", self.state.fragments);
        }

        self.state.text.push_str(fragment);
        self.state.word_count += fragment.split_whitespace().count();
        self.state.fragments += 1;
        if is_final {
            self.state.finished = true;
        }

        self.sink.push(&format!("{}{}", DISPLAY_HEADING, self.state.text))?;

        if !self.pacing.is_zero() {
            std::thread::sleep(self.pacing);
        }
        Ok(())
    }

    pub fn finish(self) -> RunReport {
        let started = self.state.started_at.unwrap_or_else(Instant::now);
        RunReport {
            time_to_first_output: self.state.first_output_at.map(|t| t.duration_since(started)),
            elapsed: started.elapsed(),
            word_count: self.state.word_count,
            fragments: self.state.fragments,
            text: self.state.text,
        }
    }
}
