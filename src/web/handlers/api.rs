//! API endpoint handlers

use crate::services::streaming::{summarize_blocking, RunHandle, DISPLAY_HEADING};
use crate::services::MetricsStats;
use crate::state::AppState;
use crate::types::{AppError, GenerationRequest, StreamEvent, SummarizeError};
use axum::{
    extract::{Form, State},
    response::{Html, Json},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SummarizeForm {
    session_id: String,
    dialogue: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionForm {
    session_id: String,
}

/// Validate the dialogue, answer with the summary container and start
/// generation in the background. Updates arrive over the session's SSE stream.
pub async fn summarize(
    State(state): State<AppState>,
    Form(form): Form<SummarizeForm>,
) -> Result<Html<String>, AppError> {
    let request = GenerationRequest::new(&form.dialogue, state.config.decoding.clone())?;

    let run = state
        .sessions
        .write()
        .await
        .begin_run(&form.session_id, &form.dialogue)
        .ok_or_else(|| AppError::SessionNotFound(form.session_id.clone()))?;

    tracing::info!(
        "Received dialogue: {} words for session {} (run {})",
        request.dialogue().split_whitespace().count(),
        form.session_id,
        run.run_id()
    );

    let html = state.templates.render_summary_container(run.run_id())?;

    tokio::spawn(generate_summary_buffered(state, form.session_id, request, run));

    Ok(Html(html))
}

/// Reset the session. Any run still streaming stops at its next push.
pub async fn clear(
    State(state): State<AppState>,
    Form(form): Form<SessionForm>,
) -> Result<Html<String>, AppError> {
    if !state.sessions.write().await.clear(&form.session_id) {
        return Err(AppError::SessionNotFound(form.session_id));
    }
    Ok(Html(String::new()))
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsStats> {
    Json(state.metrics.get_stats())
}

/// Run one generation on a blocking worker and report how it ended
async fn generate_summary_buffered(
    state: AppState,
    session_id: String,
    request: GenerationRequest,
    run: RunHandle,
) {
    let run_id = run.run_id();
    let model = state.model.clone();
    let pacing = state.config.stream_delay();
    let sink = run.sink();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut guard = model
            .lock()
            .map_err(|_| SummarizeError::Model(anyhow::anyhow!("model lock poisoned")))?;
        summarize_blocking(&mut **guard, &request, sink, pacing)
    })
    .await
    .unwrap_or_else(|e| Err(SummarizeError::Model(anyhow::anyhow!("generation task failed: {}", e))));

    match outcome {
        Ok(report) => {
            state.metrics.record_run(&report);
            state.sessions.write().await.finish_run(
                &session_id,
                run_id,
                format!("{}{}", DISPLAY_HEADING, report.text),
            );
            let stats = StreamEvent::Stats {
                run_id,
                words: report.word_count,
                first_output_ms: report.time_to_first_output.map(|d| d.as_millis() as u64),
                elapsed_ms: report.elapsed.as_millis() as u64,
            };
            for event in [stats, StreamEvent::complete(run_id)] {
                report_event(&run, &session_id, event).await;
            }
        }
        Err(e) if e.is_superseded() => {
            state.metrics.record_superseded();
            tracing::info!("Run {} for session {} superseded", run_id, session_id);
        }
        Err(e) => {
            state.metrics.record_failure();
            tracing::error!("Run {} for session {} failed: {}", run_id, session_id, e);
            // Whatever was already displayed stays; the error is shown below it
            report_event(&run, &session_id, StreamEvent::error(run_id, e.to_string())).await;
        }
    }
}

async fn report_event(run: &RunHandle, session_id: &str, event: StreamEvent) {
    let event_type = event.event_type();
    if let Err(e) = run.send(event).await {
        tracing::debug!(
            "[STREAM] {} event for session {} (run {}) not delivered: {}",
            event_type,
            session_id,
            run.run_id(),
            e
        );
    }
}
