use axum::extract::Request;
use axum::http::{HeaderMap, header::COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::NAME_COOKIE;

/// The authenticated caller's normalized name, inserted as a request
/// extension by [`require_session`].
#[derive(Debug, Clone)]
pub struct Session(pub String);

/// Gate for authenticated routes: a missing cookie means a redirect
/// to the entry point, never an error.
pub async fn require_session(mut req: Request, next: Next) -> Response {
    match session_name(req.headers()) {
        Some(navn) => {
            req.extensions_mut().insert(Session(navn));
            next.run(req).await
        }
        None => Redirect::to("/").into_response(),
    }
}

/// Read the identity cookie. The cookie IS the session; no
/// server-side table backs it.
pub fn session_name(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_value(raw, NAME_COOKIE)
        {
            return Some(value.to_string());
        }
    }
    None
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, value)) = trimmed.split_once('=')
            && cookie_name == name
            && !value.is_empty()
        {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn reads_the_identity_cookie() {
        let headers = headers_with_cookie("strindtnavn=u1 ola");
        assert_eq!(session_name(&headers).as_deref(), Some("u1 ola"));
    }

    #[test]
    fn picks_the_right_cookie_among_several() {
        let headers = headers_with_cookie("theme=dark; strindtnavn=b2 kari; lang=no");
        assert_eq!(session_name(&headers).as_deref(), Some("b2 kari"));
    }

    #[test]
    fn missing_or_empty_cookie_is_no_session() {
        assert!(session_name(&HeaderMap::new()).is_none());
        assert!(session_name(&headers_with_cookie("theme=dark")).is_none());
        assert!(session_name(&headers_with_cookie("strindtnavn=")).is_none());
    }
}
