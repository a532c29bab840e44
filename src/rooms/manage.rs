use axum::{debug_handler, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Redirect, Response}};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{backend::{DataStore, SqliteStore}, error::StoreError, res, session};

use super::membership;

#[debug_handler(state = crate::AppState)]
pub(crate) async fn exit_room(
    Path(room_id): Path<Uuid>,
    State(store): State<SqliteStore>,
    session: Session,
) -> Response {
    let Some(user_id) = session::current_user(&session).await else {
        return Redirect::to("/login").into_response();
    };

    if let Err(err) = membership::exit(&store, room_id, user_id).await {
        tracing::warn!(%room_id, %user_id, "couldn't leave room: {err}");
        session::set_notice(&session, "Couldn't leave the room.").await;
    }
    Redirect::to(&format!("/?room={room_id}")).into_response()
}

/// Only the room's creator may delete it.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_room(
    Path(room_id): Path<Uuid>,
    State(store): State<SqliteStore>,
    session: Session,
) -> Response {
    let Some(user_id) = session::current_user(&session).await else {
        return Redirect::to("/login").into_response();
    };

    let room = match store.room_detail(room_id).await {
        Ok(detail) => detail.room,
        Err(StoreError::NotFound(_)) => return res::sorry("room"),
        Err(err) => {
            tracing::warn!(%room_id, "couldn't load room: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if room.created_by != user_id {
        return StatusCode::FORBIDDEN.into_response();
    }

    match store.delete_room(room_id).await {
        Ok(()) => {
            tracing::info!(%room_id, %user_id, "deleted room");
            Redirect::to("/").into_response()
        }
        Err(err) => {
            tracing::warn!(%room_id, "couldn't delete room: {err}");
            session::set_notice(&session, "Couldn't delete the room.").await;
            Redirect::to(&format!("/?room={room_id}")).into_response()
        }
    }
}
