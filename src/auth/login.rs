use axum::{Form, debug_handler, extract::State, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{AppResult, error::AuthError, include_res, res, session};

use super::Authenticator;

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    email: String,
    password: String,
}

fn login_html(error: Option<&str>, notice: Option<&str>, email: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/login.html")
            .replace("{error}", &res::banner("error", error))
            .replace("{notice}", &res::banner("notice", notice))
            .replace("{email}", &res::escape(email))
    )
}

#[debug_handler]
pub(crate) async fn login_page(session: Session) -> Response {
    if session::current_user(&session).await.is_some() {
        return Redirect::to("/").into_response();
    }

    let notice = session::take_notice(&session).await;
    login_html(None, notice.as_deref(), "").into_response()
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(auth): State<Authenticator>,
    session: Session,

    Form(LoginForm { email, password }): Form<LoginForm>,
) -> AppResult<Response> {
    match auth.sign_in_with_password(&email, &password).await {
        Ok(profile) => {
            session::sign_in(&session, profile.id).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err @ AuthError::InvalidCredentials) => {
            tracing::warn!(%email, "sign in failed: {err}");
            Ok((
                StatusCode::UNAUTHORIZED,
                login_html(Some(&err.to_string()), None, &email),
            ).into_response())
        }
        Err(err) => {
            tracing::error!(%email, "sign in failed: {err}");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                login_html(Some("Couldn't sign you in, try again."), None, &email),
            ).into_response())
        }
    }
}
