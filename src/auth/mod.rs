use axum::{Router, routing::get};
use rand::seq::IndexedRandom;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{AppState, backend::{DataStore, SqliteStore}, db::Profile, error::{AuthError, StoreError}};

mod login;
mod logout;
mod signup;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/signup", get(signup::signup_page).post(signup::signup))
        .route("/logout", get(logout::logout))
}

/// Password accounts and the profiles created alongside them.
#[derive(Clone)]
pub struct Authenticator {
    store: SqliteStore,
    bcrypt_cost: u32,
}

impl Authenticator {
    pub fn new(store: SqliteStore, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    fn db_pool(&self) -> &SqlitePool {
        self.store.pool()
    }

    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<Profile, AuthError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput("password must be at least 6 characters"));
        }

        let username = match username.trim() {
            "" => random_username(),
            name => name.to_owned(),
        };

        let password_hash = bcrypt::hash(password, self.bcrypt_cost)?;
        let profile = Profile {
            id: Uuid::now_v7(),
            username,
            email,
        };

        let mut tx = self.db_pool().begin().await.map_err(StoreError::from)?;
        sqlx::query("INSERT INTO users (id,email,password_hash,created_at) VALUES (?,?,?,?)")
            .bind(profile.id)
            .bind(&profile.email)
            .bind(&password_hash)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::on_insert("user"))
            .map_err(|err| match err {
                StoreError::Duplicate(_) => AuthError::EmailTaken,
                err => err.into(),
            })?;
        sqlx::query("INSERT INTO profiles (id,username,email) VALUES (?,?,?)")
            .bind(profile.id)
            .bind(&profile.username)
            .bind(&profile.email)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::on_insert("profile"))?;
        tx.commit().await.map_err(StoreError::from)?;

        tracing::info!(user_id = %profile.id, username = %profile.username, "signed up");
        Ok(profile)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let email = email.trim().to_lowercase();
        let row: Option<(Uuid, String)> = sqlx::query_as("SELECT id,password_hash FROM users WHERE email=?")
            .bind(&email)
            .fetch_optional(self.db_pool())
            .await
            .map_err(StoreError::from)?;

        let Some((user_id, password_hash)) = row else {
            return Err(AuthError::InvalidCredentials);
        };
        if !bcrypt::verify(password, &password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(profile) = self.current_user(user_id).await? else {
            tracing::error!(%user_id, "user has no profile");
            return Err(AuthError::Store(StoreError::NotFound("profile")));
        };

        tracing::info!(%user_id, username = %profile.username, "welcome back");
        Ok(profile)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<Option<Profile>, AuthError> {
        Ok(self.store.profile(user_id).await?)
    }
}

fn random_username() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Lucky",
    ];
    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Phoenix", "Griffin",
        "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    match (adjectives.choose(&mut rng), nouns.choose(&mut rng)) {
        (Some(adjective), Some(noun)) => format!("{adjective} {noun}"),
        _ => "Nameless User".to_owned(),
    }
}
