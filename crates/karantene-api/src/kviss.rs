use axum::Extension;
use axum::extract::State;
use axum::response::Response;

use karantene_types::models::LiveQuizRecord;

use crate::auth::AppState;
use crate::context::PageContext;
use crate::error::ApiError;
use crate::middleware::Session;
use crate::views;

/// GET `/kviss`: the live quiz surface. Listing only for now; the
/// quiz tables are in place but rounds are not run over HTTP yet.
pub async fn kviss(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let quiz = tokio::task::spawn_blocking(move || db.latest_quiz()).await??;
    let record: Option<LiveQuizRecord> = quiz.map(Into::into);

    let ctx = PageContext::build(&state, &navn, "/kviss")
        .await?
        .with_extra(serde_json::to_value(&record).map_err(anyhow::Error::new)?);
    Ok(views::render_view(&state, "kviss", &ctx))
}
