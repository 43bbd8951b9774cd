use std::sync::{Arc, LazyLock};

use axum::Form;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};
use axum::response::{IntoResponse, Redirect, Response};
use regex::Regex;
use tracing::info;

use karantene_db::Database;
use karantene_gateway::dispatcher::Dispatcher;
use karantene_types::api::LoginForm;

use crate::context::PageContext;
use crate::error::ApiError;
use crate::middleware;
use crate::views::{self, Views};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub views: Views,
}

pub const APP_NAME: &str = "Karanteneforum";

/// Cookie key; doubles as the login form's name field.
pub const NAME_COOKIE: &str = "strindtnavn";

/// One year. The cookie is the whole session and should outlast the
/// quarantine.
const COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

pub const VALID_NAME: &str = "Gyldige strindtnavn: #XXX navn / bXXX navn / UXX navn";
pub const VALID_KIRKEGARD: &str = "Feil kirkegård...";

static NAME_VALIDATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#b?|[ub])\d+ \w+$").expect("name pattern"));
static KIRKEGARD_VALIDATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^havstein$").expect("kirkegård pattern"));

/// Trimmed and lower-cased: the canonical form stored in the cookie
/// and used as the user key everywhere.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Expects an already normalized name.
pub fn name_is_valid(navn: &str) -> bool {
    NAME_VALIDATOR.is_match(navn)
}

pub fn kirkegard_is_valid(raw: &str) -> bool {
    KIRKEGARD_VALIDATOR.is_match(raw.trim())
}

fn session_cookie(navn: &str) -> String {
    format!("{NAME_COOKIE}={navn}; Path=/; HttpOnly; SameSite=Lax; Max-Age={COOKIE_MAX_AGE}")
}

fn clear_session_cookie() -> String {
    format!("{NAME_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// GET `/` is the one route with an inline gate: main page with a
/// session, login page without.
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    match middleware::session_name(&headers) {
        Some(navn) => {
            let ctx = PageContext::build(&state, &navn, "/").await?;
            Ok(views::render_view(&state, "main", &ctx))
        }
        None => Ok(views::render_view(
            &state,
            "login",
            &PageContext::anonymous("/"),
        )),
    }
}

/// POST `/` is login. Venue first, then name; each failure re-renders
/// the login view with its own message and leaves no other trace.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if !kirkegard_is_valid(&form.kirkegard) {
        let ctx = PageContext::anonymous("/").with_error(VALID_KIRKEGARD);
        return Ok(views::render_view(&state, "login", &ctx));
    }

    let navn = normalize_name(&form.strindtnavn);
    if !name_is_valid(&navn) {
        let ctx = PageContext::anonymous("/").with_error(VALID_NAME);
        return Ok(views::render_view(&state, "login", &ctx));
    }

    let db = state.db.clone();
    let user = navn.clone();
    tokio::task::spawn_blocking(move || db.add_activity(&format!("{user} ankom hybelen!"), &user))
        .await??;

    info!("{} ankom hybelen", navn);

    let mut response = Redirect::to("/").into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&session_cookie(&navn)).expect("session cookie header"),
    );
    Ok(response)
}

/// POST `/logout`: record the departure if a session exists, then
/// expire the cookie either way.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(navn) = middleware::session_name(&headers) {
        let db = state.db.clone();
        let user = navn.clone();
        tokio::task::spawn_blocking(move || db.add_activity(&format!("{user} dro hjem..."), &user))
            .await??;
        info!("{} dro hjem", navn);
    }

    let mut response = Redirect::to("/").into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&clear_session_cookie()).expect("logout cookie header"),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_three_name_shapes() {
        assert!(name_is_valid("#123 ola"));
        assert!(name_is_valid("#b12 kari"));
        assert!(name_is_valid("b7 per"));
        assert!(name_is_valid("u42 oda"));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(!name_is_valid("123 ola")); // no prefix
        assert!(!name_is_valid("#12ola")); // no space
        assert!(!name_is_valid("#12")); // no word
        assert!(!name_is_valid("ola")); // no unit
        assert!(!name_is_valid("#12 ola igjen")); // trailing junk
        assert!(!name_is_valid(""));
    }

    #[test]
    fn upper_case_prefixes_pass_after_normalization() {
        let navn = normalize_name("  U1 Ola  ");
        assert_eq!(navn, "u1 ola");
        assert!(name_is_valid(&navn));
    }

    #[test]
    fn kirkegard_matches_case_insensitively_and_exactly() {
        assert!(kirkegard_is_valid("havstein"));
        assert!(kirkegard_is_valid("HAVSTEIN"));
        assert!(kirkegard_is_valid("  Havstein "));
        assert!(!kirkegard_is_valid("havstein kirkegård"));
        assert!(!kirkegard_is_valid("moholt"));
        assert!(!kirkegard_is_valid(""));
    }

    #[test]
    fn session_cookie_carries_the_name() {
        let cookie = session_cookie("u1 ola");
        assert!(cookie.starts_with("strindtnavn=u1 ola;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));

        let cleared = clear_session_cookie();
        assert!(cleared.contains("Max-Age=0"));
    }
}
