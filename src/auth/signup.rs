use axum::{Form, debug_handler, extract::State, http::StatusCode, response::{Html, IntoResponse, Redirect, Response}};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{error::AuthError, include_res, res, session};

use super::Authenticator;

#[derive(Deserialize)]
pub(crate) struct SignupForm {
    email: String,
    password: String,
    #[serde(default)]
    username: String,
}

fn signup_html(error: Option<&str>, email: &str, username: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/signup.html")
            .replace("{error}", &res::banner("error", error))
            .replace("{email}", &res::escape(email))
            .replace("{username}", &res::escape(username))
    )
}

#[debug_handler]
pub(crate) async fn signup_page() -> impl IntoResponse {
    signup_html(None, "", "")
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn signup(
    State(auth): State<Authenticator>,
    session: Session,

    Form(SignupForm { email, password, username }): Form<SignupForm>,
) -> Response {
    match auth.sign_up(&email, &password, &username).await {
        Ok(_) => {
            session::set_notice(&session, "Account created, log in to continue.").await;
            Redirect::to("/login").into_response()
        }
        Err(err) => {
            let status = match err {
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(%email, "sign up failed: {err}");
            (status, signup_html(Some(&err.to_string()), &email, &username)).into_response()
        }
    }
}
