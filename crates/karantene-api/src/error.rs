use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::auth::AppState;
use crate::context::PageContext;

/// Errors a handler propagates. Validation failures and permission
/// denials are not errors; they re-render or redirect. See
/// [`not_found`] and [`forbidden`] for the themed conditions.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request")]
    BadRequest,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Storage(anyhow::Error::new(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST.into_response(),
            ApiError::Storage(err) => {
                error!("Storage error: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub async fn not_found(state: &AppState, user: Option<&str>, path: &str) -> Response {
    error_view(
        state,
        user,
        path,
        "page_not_found",
        "Fant ikke siden",
        StatusCode::NOT_FOUND,
    )
    .await
}

pub async fn forbidden(state: &AppState, user: Option<&str>, path: &str) -> Response {
    error_view(
        state,
        user,
        path,
        "forbidden",
        "Du har ikke tilgang hit",
        StatusCode::FORBIDDEN,
    )
    .await
}

/// Themed error page: the full context when a session exists, the
/// degraded one otherwise.
async fn error_view(
    state: &AppState,
    user: Option<&str>,
    path: &str,
    view: &str,
    message: &str,
    code: StatusCode,
) -> Response {
    let ctx = match user {
        Some(navn) => match PageContext::build(state, navn, path).await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("Context build failed while rendering '{}': {}", view, e);
                PageContext::anonymous(path)
            }
        },
        None => PageContext::anonymous(path),
    };
    let ctx = ctx.with_error(message);

    match state.views.render(view, &ctx) {
        Some(body) => (code, Html(body)).into_response(),
        None => (code, message.to_string()).into_response(),
    }
}
