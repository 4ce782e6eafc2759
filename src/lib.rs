// Core modules
pub mod config;
pub mod state;
pub mod services;
pub mod types;
pub mod web;

// Re-exports
pub use config::Config;
pub use state::AppState;
pub use services::template::engine::TemplateEngine;
pub use services::ml::{Seq2SeqSummarizer, StubSummarizer, SummaryModel};
