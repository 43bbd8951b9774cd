mod views;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::{HeaderMap, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get, post};
use tower_http::trace::TraceLayer;
use tracing::info;

use karantene_api::auth::{self, AppState, AppStateInner};
use karantene_api::middleware::{require_session, session_name};
use karantene_api::{activity, error, kviss, messages, pages, permissions, status};
use karantene_db::Database;
use karantene_gateway::connection;
use karantene_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "karantene_server=debug,karantene_api=debug,karantene_db=debug,karantene_gateway=debug,tower_http=debug"
                    .into()
            }),
        )
        .init();

    // Config
    let db_path = std::env::var("KARANTENE_DB_PATH").unwrap_or_else(|_| "karanteneforum.db".into());
    let host = std::env::var("KARANTENE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("KARANTENE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Shared state
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher,
        views: views::catalog(),
    });

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Karanteneforum listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // Everything behind the session gate. The generic page route goes
    // last so the named routes win.
    let protected = Router::new()
        .route("/latest", get(activity::latest))
        .route("/aktivitet", get(activity::aktivitet))
        .route("/tilganger", get(permissions::list).post(permissions::upsert))
        .route("/message", post(messages::post_message))
        .route("/status", any(status::dispatch))
        .route("/kviss", get(kviss::kviss))
        .route("/{page}", get(pages::sub_page))
        .layer(middleware::from_fn(require_session));

    Router::new()
        .route("/", get(auth::index).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/ws", get(ws_upgrade))
        .merge(protected)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upgrade to the broadcast channel. The cookie is the whole
/// handshake; without it the client goes back to the login page.
async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(navn) = session_name(&headers) else {
        return Redirect::to("/").into_response();
    };

    let dispatcher = state.dispatcher.clone();
    let db = state.db.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, db, navn))
}

/// Multi-segment paths land here; single unknown segments go through
/// the generic page route instead.
async fn fallback(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let navn = session_name(&headers);
    error::not_found(&state, navn.as_deref(), uri.path()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use karantene_types::events::{GatewayEvent, MessagePayload};
    use karantene_types::models::{Capability, PermissionRecord};
    use tower::ServiceExt;

    const FORM: &str = "application/x-www-form-urlencoded";

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Arc::new(Database::open(std::path::Path::new(":memory:")).expect("test db")),
            dispatcher: Dispatcher::new(),
            views: views::catalog(),
        })
    }

    fn cookie(navn: &str) -> String {
        format!("strindtnavn={navn}")
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn index_without_cookie_shows_login() {
        let state = test_state();
        let response = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("kirkegard"));
        assert!(body.contains("strindtnavn"));
    }

    #[tokio::test]
    async fn index_with_cookie_shows_main_page() {
        let state = test_state();
        state.db.add_status("alle friske", "u1 ola").unwrap();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("u1 ola"));
        assert!(body.contains("alle friske"));
    }

    #[tokio::test]
    async fn gated_route_redirects_without_cookie() {
        let state = test_state();
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/aktivitet")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn login_sets_cookie_and_logs_arrival() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("kirkegard=Havstein&strindtnavn=U1%20Ola"))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");

        let set_cookie = response.headers().get(SET_COOKIE).expect("set-cookie");
        let set_cookie = set_cookie.to_str().expect("cookie header");
        assert!(set_cookie.starts_with("strindtnavn=u1 ola;"));
        assert!(set_cookie.contains("HttpOnly"));

        let all = state.db.all_activity().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "u1 ola ankom hybelen!");
        assert_eq!(all[0].user, "u1 ola");
    }

    #[tokio::test]
    async fn login_with_bad_name_rerenders_and_leaves_no_trace() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("kirkegard=havstein&strindtnavn=ola"))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let body = body_text(response).await;
        assert!(body.contains(auth::VALID_NAME));

        assert!(state.db.all_activity().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_with_wrong_kirkegard_gets_the_venue_error() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("kirkegard=moholt&strindtnavn=u1%20ola"))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(auth::VALID_KIRKEGARD));
        assert!(state.db.all_activity().unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_logs_departure() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));

        let latest = state.db.latest_activity().unwrap().unwrap();
        assert_eq!(latest.text, "u1 ola dro hjem...");
    }

    #[tokio::test]
    async fn message_post_appends_and_broadcasts() {
        let state = test_state();
        let mut rx = state.dispatcher.subscribe();

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/message")
                    .header(COOKIE, cookie("u1 ola"))
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("msg=hei"))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let all = state.db.all_messages().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user, "u1 ola");
        assert_eq!(all[0].text, "hei");

        match rx.try_recv().expect("one broadcast") {
            GatewayEvent::NewMessage(MessagePayload::Chat(_, user, text)) => {
                assert_eq!(user, "u1 ola");
                assert_eq!(text, "hei");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tilganger_is_forbidden_without_the_flag() {
        let state = test_state();
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/tilganger")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn tilganger_upsert_normalizes_and_never_grants_bdfl() {
        let state = test_state();
        state
            .db
            .set_permissions(&PermissionRecord {
                tilganger: true,
                ..PermissionRecord::none("u1 ola")
            })
            .unwrap();

        let list = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/tilganger")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(list.status(), StatusCode::OK);
        assert!(body_text(list).await.contains("u1 ola"));

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tilganger")
                    .header(COOKIE, cookie("u1 ola"))
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("user=B2%20Kari&status=true&kvissmaster=false"))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let rec = state.db.get_permissions("b2 kari").unwrap();
        assert!(rec.status);
        assert!(!rec.kvissmaster);
        assert!(!rec.tilganger);
        assert!(!rec.bdfl);
    }

    #[tokio::test]
    async fn status_requires_the_status_flag() {
        let state = test_state();
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/status")
                    .header(COOKIE, cookie("u1 ola"))
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("txt=alle%20friske"))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        // The denied write must not have landed
        assert!(state.db.latest_status(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn bdfl_satisfies_the_status_gate() {
        let state = test_state();
        state
            .db
            .set_permissions(&PermissionRecord {
                bdfl: true,
                ..PermissionRecord::none("#1 magnus")
            })
            .unwrap();
        assert!(
            state
                .db
                .check_permission("#1 magnus", &[Capability::Status])
                .unwrap()
        );

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/status")
                    .header(COOKIE, cookie("#1 magnus"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_lifecycle_post_update_delete() {
        let state = test_state();
        state
            .db
            .set_permissions(&PermissionRecord {
                status: true,
                ..PermissionRecord::none("u1 ola")
            })
            .unwrap();
        let mut rx = state.dispatcher.subscribe();

        let post = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/status")
                    .header(COOKIE, cookie("u1 ola"))
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("txt=alle%20friske"))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(post.status(), StatusCode::NO_CONTENT);
        assert!(matches!(
            rx.try_recv().unwrap(),
            GatewayEvent::NewMessage(MessagePayload::Status(text)) if text == "alle friske"
        ));

        let update = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("UPDATE")
                    .uri("/status")
                    .header(COOKIE, cookie("u1 ola"))
                    .header(CONTENT_TYPE, FORM)
                    .body(Body::from("txt=nesten%20friske"))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(update.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            state.db.latest_status(1).unwrap()[0].text,
            "nesten friske"
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            GatewayEvent::NewMessage(MessagePayload::Status(text)) if text == "nesten friske"
        ));

        let delete = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/status")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(delete.status(), StatusCode::NO_CONTENT);
        assert!(state.db.latest_status(1).unwrap().is_empty());
        // Nothing left to announce after the delete
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn latest_returns_bare_activity_text() {
        let state = test_state();

        let empty = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/latest")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(body_text(empty).await, "<ingen aktivitet>");

        state.db.add_activity("u1 ola skålet!", "u1 ola").unwrap();
        let latest = router(state)
            .oneshot(
                Request::builder()
                    .uri("/latest")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(body_text(latest).await, "u1 ola skålet!");
    }

    #[tokio::test]
    async fn aktivitet_lists_newest_first() {
        let state = test_state();
        state.db.add_activity("først", "u1 ola").unwrap();
        state.db.add_activity("sist", "u1 ola").unwrap();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/aktivitet")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        let first = body.find("sist").expect("newest entry");
        let second = body.find("først").expect("oldest entry");
        assert!(first < second);
    }

    #[tokio::test]
    async fn known_subpage_renders_and_unknown_is_not_found() {
        let state = test_state();

        let agenda = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/agenda")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(agenda.status(), StatusCode::OK);

        let missing = router(state)
            .oneshot(
                Request::builder()
                    .uri("/finnesikke")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn kviss_page_renders_for_any_session() {
        let state = test_state();
        state
            .db
            .add_quiz("#1 magnus", "fredagskviss", "ukens kviss", None)
            .unwrap();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/kviss")
                    .header(COOKIE, cookie("u1 ola"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("fredagskviss"));
    }
}
