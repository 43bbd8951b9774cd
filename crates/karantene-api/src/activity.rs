use axum::Extension;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use karantene_types::models::ActivityRecord;

use crate::auth::AppState;
use crate::context::{NO_ACTIVITY, PageContext};
use crate::error::ApiError;
use crate::middleware::Session;
use crate::views;

/// GET `/aktivitet`: the full log, newest first.
pub async fn aktivitet(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let mut rows = tokio::task::spawn_blocking(move || db.all_activity()).await??;
    rows.reverse();
    let records: Vec<ActivityRecord> = rows.into_iter().map(Into::into).collect();

    let ctx = PageContext::build(&state, &navn, "/aktivitet")
        .await?
        .with_extra(serde_json::to_value(&records).map_err(anyhow::Error::new)?);
    Ok(views::render_view(&state, "aktivitet", &ctx))
}

/// GET `/latest`: the most recent activity as bare text, for pollers.
pub async fn latest(
    State(state): State<AppState>,
    Extension(Session(_navn)): Extension<Session>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.latest_activity()).await??;
    let text = row.map(|r| r.text).unwrap_or_else(|| NO_ACTIVITY.to_string());
    Ok(text.into_response())
}
