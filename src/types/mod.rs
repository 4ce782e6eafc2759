pub mod errors;
pub mod events;
pub mod request;

pub use errors::{AppError, SinkError, SummarizeError};
pub use events::StreamEvent;
pub use request::{DecodingParams, GenerationRequest};
