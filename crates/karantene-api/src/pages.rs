use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;

use crate::auth::AppState;
use crate::context::PageContext;
use crate::error::{self, ApiError};
use crate::middleware::Session;
use crate::views;

/// GET `/{page}` is the escape hatch for static content pages: render
/// the named view if the catalog has it, 404 otherwise.
pub async fn sub_page(
    State(state): State<AppState>,
    Extension(Session(navn)): Extension<Session>,
    Path(page): Path<String>,
) -> Result<Response, ApiError> {
    let path = format!("/{page}");

    if !state.views.contains(&page) {
        return Ok(error::not_found(&state, Some(&navn), &path).await);
    }

    let ctx = PageContext::build(&state, &navn, &path).await?;
    Ok(views::render_view(&state, &page, &ctx))
}
