use axum::Extension;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use karantene_types::api::StatusForm;
use karantene_types::events::{GatewayEvent, MessagePayload};
use karantene_types::models::{Capability, StatusRecord};

use crate::auth::AppState;
use crate::context::PageContext;
use crate::error::{self, ApiError};
use crate::middleware::Session;
use crate::views;

/// `/status` carries four verbs on one path: GET to read, POST to
/// set, UPDATE to edit, DELETE to clear. All of them require the
/// status capability, so dispatch happens here rather than in the
/// router.
pub async fn dispatch(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let user = navn.clone();
    let allowed =
        tokio::task::spawn_blocking(move || db.check_permission(&user, &[Capability::Status]))
            .await??;
    if !allowed {
        return Ok(error::forbidden(&state, Some(&navn), "/status").await);
    }

    if method == Method::GET {
        let db = state.db.clone();
        let mut rows = tokio::task::spawn_blocking(move || db.all_status()).await??;
        rows.reverse();
        let records: Vec<StatusRecord> = rows.into_iter().map(Into::into).collect();

        let ctx = PageContext::build(&state, &navn, "/status")
            .await?
            .with_extra(serde_json::to_value(&records).map_err(anyhow::Error::new)?);
        return Ok(views::render_view(&state, "status", &ctx));
    }

    // DELETE carries no body; an empty form just has no txt
    let form: StatusForm = serde_urlencoded::from_bytes(&body).unwrap_or_default();

    let db = state.db.clone();
    let user = navn.clone();
    let latest = match method.as_str() {
        "POST" => {
            let txt = form.txt.ok_or(ApiError::BadRequest)?;
            tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                db.add_status(&txt, &user)?;
                db.latest_status(1)
            })
            .await??
        }
        "UPDATE" => {
            let txt = form.txt.ok_or(ApiError::BadRequest)?;
            tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                db.edit_latest_status(&txt)?;
                db.latest_status(1)
            })
            .await??
        }
        "DELETE" => {
            tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                db.delete_latest_status()?;
                db.latest_status(1)
            })
            .await??
        }
        _ => return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    };

    // Push whatever is current now; deleting the last row leaves
    // nothing to announce.
    if let Some(row) = latest.into_iter().next() {
        let record: StatusRecord = row.into();
        state
            .dispatcher
            .broadcast(GatewayEvent::NewMessage(MessagePayload::Status(record.text)));
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}
