use axum::{Extension, Form};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::info;

use karantene_types::api::PermissionForm;
use karantene_types::models::{Capability, PermissionRecord};

use crate::auth::{self, AppState};
use crate::context::PageContext;
use crate::error::{self, ApiError};
use crate::middleware::Session;
use crate::views;

async fn caller_may_admin(state: &AppState, navn: &str) -> Result<bool, ApiError> {
    let db = state.db.clone();
    let user = navn.to_string();
    Ok(
        tokio::task::spawn_blocking(move || {
            db.check_permission(&user, &[Capability::Tilganger])
        })
        .await??,
    )
}

/// GET `/tilganger`: every permission row, for the admin page.
pub async fn list(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
) -> Result<Response, ApiError> {
    if !caller_may_admin(&state, &navn).await? {
        return Ok(error::forbidden(&state, Some(&navn), "/tilganger").await);
    }

    let db = state.db.clone();
    let all = tokio::task::spawn_blocking(move || db.all_permissions()).await??;

    let ctx = PageContext::build(&state, &navn, "/tilganger")
        .await?
        .with_extra(serde_json::to_value(&all).map_err(anyhow::Error::new)?);
    Ok(views::render_view(&state, "tilganger", &ctx))
}

/// POST `/tilganger`: whole-row upsert of the three grantable flags.
/// `bdfl` always lands false here; raising it takes direct store
/// access.
pub async fn upsert(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
    Form(form): Form<PermissionForm>,
) -> Result<Response, ApiError> {
    if !caller_may_admin(&state, &navn).await? {
        return Ok(error::forbidden(&state, Some(&navn), "/tilganger").await);
    }

    let record = PermissionRecord {
        user: auth::normalize_name(&form.user),
        kvissmaster: form.kvissmaster,
        status: form.status,
        tilganger: form.tilganger,
        bdfl: false,
    };

    info!(
        "{} set permissions for {}: kvissmaster={} status={} tilganger={}",
        navn, record.user, record.kvissmaster, record.status, record.tilganger
    );

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.set_permissions(&record)).await??;

    Ok(StatusCode::NO_CONTENT.into_response())
}
