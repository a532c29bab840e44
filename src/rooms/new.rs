use axum::{Form, debug_handler, extract::State, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{backend::SqliteStore, include_res, res, session};

use super::RoomDirectory;

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomForm {
    name: String,
    /// Comma separated.
    #[serde(default)]
    tags: String,
}

fn new_room_html(error: Option<&str>, name: &str, tags: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/new_room.html")
            .replace("{error}", &res::banner("error", error))
            .replace("{name}", &res::escape(name))
            .replace("{tags}", &res::escape(tags))
    )
}

#[debug_handler]
pub(crate) async fn new_room_page(session: Session) -> Response {
    if session::current_user(&session).await.is_none() {
        return Redirect::to("/login").into_response();
    }

    new_room_html(None, "", "").into_response()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_room(
    State(store): State<SqliteStore>,
    session: Session,

    Form(NewRoomForm { name, tags }): Form<NewRoomForm>,
) -> Response {
    let Some(user_id) = session::current_user(&session).await else {
        return Redirect::to("/login").into_response();
    };

    let tag_list: Vec<String> = tags.split(',').map(str::to_owned).collect();

    match RoomDirectory::default().create_room(&store, user_id, &name, &tag_list).await {
        Ok(Some(room)) => Redirect::to(&format!("/?room={}", room.id)).into_response(),
        Ok(None) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            new_room_html(Some("Give the room a name."), &name, &tags),
        ).into_response(),
        Err(err) => {
            tracing::warn!(%user_id, "couldn't create room: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                new_room_html(Some("Couldn't create the room, try again."), &name, &tags),
            ).into_response()
        }
    }
}
