use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::auth::AppState;
use crate::context::PageContext;

type RenderFn = Box<dyn Fn(&PageContext) -> String + Send + Sync>;

/// The named view collection. What the views produce is their own
/// business; handlers only need existence checks and dispatch.
#[derive(Default)]
pub struct Views {
    views: HashMap<String, RenderFn>,
}

impl Views {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, render: F)
    where
        F: Fn(&PageContext) -> String + Send + Sync + 'static,
    {
        self.views.insert(name.to_string(), Box::new(render));
    }

    /// Backs the generic sub-page route's existence check.
    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn render(&self, name: &str, ctx: &PageContext) -> Option<String> {
        self.views.get(name).map(|render| render(ctx))
    }
}

/// Render a registered view, or 500 when the router promised a view
/// the catalog doesn't have.
pub fn render_view(state: &AppState, name: &str, ctx: &PageContext) -> Response {
    match state.views.render(name, ctx) {
        Some(body) => Html(body).into_response(),
        None => {
            error!("View '{}' is not registered", name);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
