//! Display surfaces the accumulator pushes into

use crate::types::{SinkError, StreamEvent};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, watch};

/// How long a push waits for room in a session channel nobody is draining
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Receives the whole accumulated text on every push, never a diff.
pub trait DisplaySink {
    fn push(&mut self, text: &str) -> Result<(), SinkError>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for &mut S {
    fn push(&mut self, text: &str) -> Result<(), SinkError> {
        (**self).push(text)
    }
}

/// Handle on one run of one session. Cloneable so the worker can push
/// display updates while the caller reports stats and completion.
///
/// The sender is read from the session's slot on every send, so a browser
/// reconnecting mid-run keeps receiving the run's output.
#[derive(Clone)]
pub struct RunHandle {
    run_id: u64,
    current: Arc<AtomicU64>,
    sender: watch::Receiver<mpsc::Sender<StreamEvent>>,
}

impl RunHandle {
    pub fn new(
        run_id: u64,
        current: Arc<AtomicU64>,
        sender: watch::Receiver<mpsc::Sender<StreamEvent>>,
    ) -> Self {
        Self { run_id, current, sender }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// False once a newer run or a Clear has taken over the session
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.run_id
    }

    fn sender(&self) -> Result<mpsc::Sender<StreamEvent>, SinkError> {
        if !self.is_current() {
            return Err(SinkError::Superseded);
        }
        Ok(self.sender.borrow().clone())
    }

    /// Send from async code
    pub async fn send(&self, event: StreamEvent) -> Result<(), SinkError> {
        self.sender()?
            .send_timeout(event, SEND_TIMEOUT)
            .await
            .map_err(timeout_error)
    }

    /// Send from a blocking worker. Inside the runtime's blocking pool the
    /// wait is bounded by [`SEND_TIMEOUT`]; outside a runtime it is not.
    pub fn blocking_send(&self, event: StreamEvent) -> Result<(), SinkError> {
        let sender = self.sender()?;
        match Handle::try_current() {
            Ok(handle) => handle
                .block_on(sender.send_timeout(event, SEND_TIMEOUT))
                .map_err(timeout_error),
            Err(_) => sender.blocking_send(event).map_err(|_| SinkError::Closed),
        }
    }

    pub fn sink(&self) -> ChannelSink {
        ChannelSink { handle: self.clone() }
    }
}

fn timeout_error<T>(e: SendTimeoutError<T>) -> SinkError {
    match e {
        SendTimeoutError::Timeout(_) => SinkError::Stalled,
        SendTimeoutError::Closed(_) => SinkError::Closed,
    }
}

/// Forwards display updates to a session's SSE channel
pub struct ChannelSink {
    handle: RunHandle,
}

impl DisplaySink for ChannelSink {
    fn push(&mut self, text: &str) -> Result<(), SinkError> {
        self.handle
            .blocking_send(StreamEvent::summary(self.handle.run_id, text.to_string()))
    }
}

/// Writes to a terminal-like writer. Only the part of the text not yet
/// written is emitted, so the output reads as a continuous stream.
pub struct TerminalSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn push(&mut self, text: &str) -> Result<(), SinkError> {
        let Some(suffix) = text.get(self.written..) else {
            return Ok(());
        };
        self.writer
            .write_all(suffix.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| SinkError::Write(e.to_string()))?;
        self.written = text.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(run_id: u64, current: u64) -> (RunHandle, Arc<AtomicU64>, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let (_slot, slot_rx) = watch::channel(tx);
        let current = Arc::new(AtomicU64::new(current));
        (RunHandle::new(run_id, current.clone(), slot_rx), current, rx)
    }

    #[test]
    fn channel_sink_forwards_full_text() {
        let (handle, _current, mut rx) = handle(3, 3);
        let mut sink = handle.sink();

        sink.push("###### Amanda").unwrap();
        sink.push("###### Amanda baked").unwrap();

        assert_eq!(rx.try_recv().unwrap(), StreamEvent::summary(3, "###### Amanda".into()));
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::summary(3, "###### Amanda baked".into()));
    }

    #[test]
    fn channel_sink_stops_when_superseded() {
        let (handle, current, mut rx) = handle(1, 1);
        let mut sink = handle.sink();

        current.store(2, Ordering::Release);
        assert_eq!(sink.push("###### late"), Err(SinkError::Superseded));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_reports_closed_receiver() {
        let (handle, _current, rx) = handle(0, 0);
        drop(rx);
        assert_eq!(handle.sink().push("x"), Err(SinkError::Closed));
    }

    #[test]
    fn follows_sender_swapped_into_slot() {
        let (old_tx, old_rx) = mpsc::channel(8);
        let (slot, slot_rx) = watch::channel(old_tx);
        let handle = RunHandle::new(1, Arc::new(AtomicU64::new(1)), slot_rx);
        drop(old_rx);

        let (new_tx, mut new_rx) = mpsc::channel(8);
        slot.send_replace(new_tx);

        handle.sink().push("###### after").unwrap();
        assert_eq!(new_rx.try_recv().unwrap(), StreamEvent::summary(1, "###### after".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn full_channel_times_out_instead_of_blocking() {
        let (tx, _rx) = mpsc::channel(1);
        let (_slot, slot_rx) = watch::channel(tx);
        let handle = RunHandle::new(1, Arc::new(AtomicU64::new(1)), slot_rx);

        handle.send(StreamEvent::complete(1)).await.unwrap();
        assert_eq!(handle.send(StreamEvent::complete(1)).await, Err(SinkError::Stalled));
    }

    #[test]
    fn terminal_sink_writes_only_new_suffix() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.push("###### ").unwrap();
        sink.push("###### Jerry").unwrap();
        sink.push("###### Jerry agrees.").unwrap();
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "###### Jerry agrees.");
    }
}
