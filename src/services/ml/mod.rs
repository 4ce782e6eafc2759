//! Machine Learning services

pub mod device;
pub mod seq2seq;
pub mod source;
pub mod stub;
pub mod text_streamer;

pub use device::DeviceManager;
pub use seq2seq::Seq2SeqSummarizer;
pub use source::{Fragment, FragmentStream, SummaryModel};
pub use stub::StubSummarizer;
pub use text_streamer::{TextStreamer, TokenDecoder};
