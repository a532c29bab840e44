pub mod composer;
pub mod directory;
pub mod membership;
pub mod msg;
pub mod reconciler;
pub mod window;

mod manage;
mod new;
mod ws;

use axum::{Router, routing::{get, post}};

use crate::AppState;

pub use directory::{FilterMode, RoomDirectory};
pub use window::{ChatWindow, Command, Update};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/r/new", get(new::new_room_page).post(new::new_room))
        .route("/r/{uuid}/exit", post(manage::exit_room))
        .route("/r/{uuid}/delete", post(manage::delete_room))
        .route("/ws", get(ws::chat_ws))
}
