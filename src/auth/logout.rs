use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::session;

/// Always lands on the login page, even if the session couldn't be flushed.
#[debug_handler]
pub(crate) async fn logout(session: Session) -> Redirect {
    if let Err(err) = session::sign_out(&session).await {
        tracing::warn!("sign out failed: {err}");
    }
    Redirect::to("/login")
}
