use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade, ws::{Message as WsMessage, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tower_sessions::Session;

use crate::{
    backend::{BroadcastFeed, DataStore, RealtimeFeed, SqliteStore},
    session,
};

use super::window::{ChatWindow, Command};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(store): State<SqliteStore>,
    State(feed): State<BroadcastFeed>,
    session: Session,

    ws: WebSocketUpgrade,
) -> Response {
    let Some(user_id) = session::current_user(&session).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    ws.on_upgrade(move |socket| run(socket, ChatWindow::new(store, feed, user_id)))
}

/// Pumps commands from the browser into the window and its updates back out,
/// until either side goes away. The window, and with it any subscription, is
/// dropped on the way out.
async fn run<S: DataStore, F: RealtimeFeed>(socket: WebSocket, mut window: ChatWindow<S, F>) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        let updates = tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<Command>(text.as_str()) {
                    Ok(command) => window.handle(command),
                    Err(err) => {
                        tracing::debug!("ignoring bad command: {err}");
                        continue;
                    }
                },
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
            updates = window.next() => updates,
        };

        for update in updates {
            let text = match serde_json::to_string(&update) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!("couldn't encode update: {err}");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                return;
            }
        }
    }
}
