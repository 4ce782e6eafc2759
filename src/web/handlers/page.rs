use crate::state::AppState;
use crate::types::AppError;
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct IndexParams {
    /// Resume an existing session after a reload
    session: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Html<String>, AppError> {
    let mut sessions = state.sessions.write().await;
    sessions.evict_idle(state.config.session_idle());

    let session_id = params
        .session
        .filter(|id| sessions.get(id).is_some())
        .unwrap_or_else(|| Uuid::now_v7().to_string());
    let session = sessions.create_session(&session_id);

    let html = state.templates.render_index(
        &session.id,
        &session.input_text,
        session.generated_summary.as_deref(),
    )?;

    Ok(Html(html))
}
