use axum::{Extension, Form};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use karantene_types::api::MessageForm;
use karantene_types::events::{GatewayEvent, MessagePayload};
use karantene_types::models::MessageRecord;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Session;

/// POST `/message`: append, re-read the committed row, push it out.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
    Form(form): Form<MessageForm>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let user = navn.clone();
    let row =
        tokio::task::spawn_blocking(move || db.add_message_returning(&form.msg, &user)).await??;

    if let Some(row) = row {
        let record: MessageRecord = row.into();
        state
            .dispatcher
            .broadcast(GatewayEvent::NewMessage(MessagePayload::Chat(
                record.time,
                record.user,
                record.text,
            )));
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}
