use crate::services::template::render_markdown;
use crate::state::AppState;
use crate::types::{AppError, StreamEvent};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

pub async fn stream_events(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    tracing::info!("📡 SSE connection established for session: {}", session_id);

    let receiver = state
        .sessions
        .write()
        .await
        .take_receiver(&session_id)
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    let stream = ReceiverStream::new(receiver).map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    ))
}

/// Summary text is rendered to HTML here so the page only swaps markup
pub fn to_sse_event(event: &StreamEvent) -> Event {
    let data = match event {
        StreamEvent::Summary { run_id, markdown } => json!({
            "run_id": run_id,
            "html": render_markdown(markdown),
        })
        .to_string(),
        other => other.to_sse_data(),
    };

    Event::default().event(event.event_type()).data(data)
}
