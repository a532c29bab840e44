use tower_sessions::Session;
use uuid::Uuid;

use crate::error::AuthError;

pub const USER_ID: &str = "user_id";
pub const NOTICE: &str = "notice";

/// The signed-in user, if any. A session that cannot be read counts as signed out.
pub async fn current_user(session: &Session) -> Option<Uuid> {
    match session.get::<Uuid>(USER_ID).await {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::warn!("couldn't read session: {err}");
            None
        }
    }
}

pub async fn sign_in(session: &Session, user_id: Uuid) -> Result<(), AuthError> {
    session.cycle_id().await?;
    session.insert(USER_ID, user_id).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> Result<(), AuthError> {
    session.flush().await?;
    Ok(())
}

/// One-shot message shown on the next page render.
pub async fn set_notice(session: &Session, notice: &str) {
    if let Err(err) = session.insert(NOTICE, notice).await {
        tracing::warn!("couldn't store notice: {err}");
    }
}

pub async fn take_notice(session: &Session) -> Option<String> {
    session.remove::<String>(NOTICE).await.unwrap_or_else(|err| {
        tracing::warn!("couldn't read notice: {err}");
        None
    })
}
