//! Error types shared by the generation path and the web layer

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// Failure while pushing text to a display surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// A newer submission (or a Clear) took over the session
    #[error("run superseded by a newer submission")]
    Superseded,
    #[error("display channel closed")]
    Closed,
    /// Nobody drained the session channel within the send timeout
    #[error("display channel stalled")]
    Stalled,
    #[error("display write failed: {0}")]
    Write(String),
}

/// Failure of a single summarization run
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Please enter a dialogue!")]
    EmptyInput,
    #[error("generation failed: {0:#}")]
    Model(anyhow::Error),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl SummarizeError {
    /// Whether the run stopped because something replaced it, not because it broke
    pub fn is_superseded(&self) -> bool {
        matches!(self, SummarizeError::Sink(SinkError::Superseded))
    }
}

/// Errors returned from HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("unknown session: {0}")]
    SessionNotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SummarizeError> for AppError {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::EmptyInput => AppError::Validation(err.to_string()),
            other => AppError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(e) => {
                tracing::error!("[WEB] Internal error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = format!(
            r#"<div class="error">{}</div>"#,
            html_escape::encode_text(&self.to_string())
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_maps_to_validation() {
        let err: AppError = SummarizeError::EmptyInput.into();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Please enter a dialogue!"));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn superseded_is_detected_through_conversion() {
        let err: SummarizeError = SinkError::Superseded.into();
        assert!(err.is_superseded());
        assert!(!SummarizeError::EmptyInput.is_superseded());
    }
}
