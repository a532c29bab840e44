use axum::{
    debug_handler,
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    auth::Authenticator,
    backend::SqliteStore,
    db::Room,
    include_res, res,
    rooms::{FilterMode, RoomDirectory},
    session,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IndexQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    mode: FilterMode,
    room: Option<Uuid>,
}

fn room_item_html(room: &Room, selected: Option<Uuid>) -> String {
    let tags = room
        .tags
        .iter()
        .map(|tag| format!("<span class=\"tag\">{}</span>", res::escape(tag)))
        .collect::<String>();

    include_res!(str, "/pages/room_item.html")
        .replace("{id}", &room.id.to_string())
        .replace("{selected}", if selected == Some(room.id) { "selected" } else { "" })
        .replace("{created_at}", &room.created_at.format(&Rfc3339).unwrap_or_default())
        .replace("{tags}", &tags)
        .replace("{name}", &res::escape(&room.name))
}

/// The chat shell: room list on the left, the chat window on the right.
#[debug_handler(state = crate::AppState)]
pub async fn index(
    State(auth): State<Authenticator>,
    State(store): State<SqliteStore>,
    session: Session,

    Query(IndexQuery { q, mode, room }): Query<IndexQuery>,
) -> AppResult<Response> {
    let Some(user_id) = session::current_user(&session).await else {
        return Ok(Redirect::to("/login").into_response());
    };
    let Some(profile) = auth.current_user(user_id).await? else {
        tracing::warn!(%user_id, "session for a user without a profile");
        session::sign_out(&session).await?;
        return Ok(Redirect::to("/login").into_response());
    };

    let directory = RoomDirectory::load(&store).await;
    let rooms = directory.filter(&q, mode);
    let room_items = if rooms.is_empty() {
        "<li class=\"empty\">No matching rooms found.</li>".to_owned()
    } else {
        rooms.into_iter().map(|r| room_item_html(r, room)).collect()
    };

    let notice = session::take_notice(&session).await;

    Ok(Html(
        include_res!(str, "/pages/index.html")
            .replace("{notice}", &res::banner("notice", notice.as_deref()))
            .replace("{name_checked}", if mode == FilterMode::Name { "checked" } else { "" })
            .replace("{tag_checked}", if mode == FilterMode::Tag { "checked" } else { "" })
            .replace("{selected_room}", &room.map(|id| id.to_string()).unwrap_or_default())
            .replace("{q}", &res::escape(&q))
            .replace("{username}", &res::escape(&profile.username))
            .replace("{room_items}", &room_items)
    ).into_response())
}

pub async fn chat_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_res!(str, "/chat.js"),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use crate::{AppState, app, auth::Authenticator, backend::DataStore, testing::memory_store};

    async fn test_app() -> (Router, AppState) {
        let (store, feed) = memory_store().await;
        let state = AppState {
            auth: Authenticator::new(store.clone(), 4),
            store,
            feed,
        };
        let router = app(state.clone(), SessionManagerLayer::new(MemoryStore::default()));
        (router, state)
    }

    fn form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.body(Body::from(body.to_owned())).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        request.body(Body::empty()).unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Signs up and in, returning the session cookie.
    async fn signed_in(router: &Router, email: &str) -> String {
        let response = router
            .clone()
            .oneshot(form("/signup", &format!("email={email}&password=hunter22&username=Ada"), None))
            .await
            .unwrap();
        assert_eq!(location(&response), "/login");

        let response = router
            .clone()
            .oneshot(form("/login", &format!("email={email}&password=hunter22"), None))
            .await
            .unwrap();
        assert_eq!(location(&response), "/");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        cookie.split(';').next().unwrap().to_owned()
    }

    #[tokio::test]
    async fn signed_out_visitors_go_to_login() {
        let (router, _) = test_app().await;

        for uri in ["/", "/r/new"] {
            let response = router.clone().oneshot(get(uri, None)).await.unwrap();
            assert!(response.status().is_redirection(), "{uri}");
            assert_eq!(location(&response), "/login");
        }

        let response = router.oneshot(get("/login", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_password_shows_an_error() {
        let (router, _) = test_app().await;
        signed_in(&router, "ada@example.com").await;

        let response = router
            .oneshot(form("/login", "email=ada@example.com&password=nope-nope", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn created_room_is_listed_and_filterable() {
        let (router, state) = test_app().await;
        let cookie = signed_in(&router, "ada@example.com").await;

        let response = router
            .clone()
            .oneshot(form("/r/new", "name=Ops+Room&tags=urgent,+ops", Some(&cookie)))
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        let rooms = state.store.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(location(&response), format!("/?room={}", rooms[0].id));
        assert_eq!(rooms[0].tags, ["urgent", "ops"]);

        let page = body_text(router.clone().oneshot(get("/?q=URG&mode=tag", Some(&cookie))).await.unwrap()).await;
        assert!(page.contains("Ops Room"));

        let page = body_text(router.clone().oneshot(get("/?q=urg&mode=name", Some(&cookie))).await.unwrap()).await;
        assert!(page.contains("No matching rooms found."));
    }

    #[tokio::test]
    async fn search_term_is_echoed_literally() {
        let (router, _) = test_app().await;
        let cookie = signed_in(&router, "ada@example.com").await;

        let page = body_text(router.oneshot(get("/?q=%7Broom_items%7D", Some(&cookie))).await.unwrap()).await;
        assert!(page.contains("value=\"&#123;room_items&#125;\""), "{page}");
        assert_eq!(page.matches("No matching rooms found.").count(), 1);
    }

    #[tokio::test]
    async fn broken_password_hash_is_a_server_error() {
        let (router, state) = test_app().await;
        // stored with an unusable hash
        crate::testing::profile(&state.store, "carol").await;

        let response = router
            .oneshot(form("/login", "email=carol@example.com&password=hunter22", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let page = body_text(response).await;
        assert!(page.contains("carol@example.com"));
        assert!(!page.to_lowercase().contains("hash"), "{page}");
    }

    #[tokio::test]
    async fn blank_room_name_creates_nothing() {
        let (router, state) = test_app().await;
        let cookie = signed_in(&router, "ada@example.com").await;

        let response = router.oneshot(form("/r/new", "name=++&tags=x", Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.store.list_rooms().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (router, _) = test_app().await;
        let cookie = signed_in(&router, "ada@example.com").await;

        let response = router.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
        assert_eq!(location(&response), "/login");

        let response = router.oneshot(get("/", Some(&cookie))).await.unwrap();
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn only_the_creator_deletes_a_room() {
        let (router, state) = test_app().await;
        let ada = signed_in(&router, "ada@example.com").await;
        let bob = signed_in(&router, "bob@example.com").await;

        router.clone().oneshot(form("/r/new", "name=Lobby", Some(&ada))).await.unwrap();
        let room_id = state.store.list_rooms().await.unwrap()[0].id;

        let response = router
            .clone()
            .oneshot(form(&format!("/r/{room_id}/delete"), "", Some(&bob)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .oneshot(form(&format!("/r/{room_id}/delete"), "", Some(&ada)))
            .await
            .unwrap();
        assert_eq!(location(&response), "/");
        assert!(state.store.list_rooms().await.unwrap().is_empty());
    }
}
