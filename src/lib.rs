pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod res;
pub mod rooms;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

use axum::{Router, extract::FromRef, http::StatusCode, response::{IntoResponse, Response}};
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use backend::{BroadcastFeed, SqliteStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: SqliteStore,
    pub feed: BroadcastFeed,
    pub auth: auth::Authenticator,
}

pub fn app(app_state: AppState, session_layer: SessionManagerLayer<MemoryStore>) -> Router {
    Router::new()
        .route("/", axum::routing::get(index::index))
        .route("/chat.js", axum::routing::get(index::chat_js))
        .merge(auth::router())
        .merge(rooms::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("{:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
