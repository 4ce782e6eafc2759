//! Template rendering service

pub mod engine;

pub use engine::{render_markdown, TemplateEngine};
