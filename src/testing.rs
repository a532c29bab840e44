use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    backend::{BroadcastFeed, SqliteStore},
    db::Profile,
};

pub(crate) async fn memory_pool() -> SqlitePool {
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&db_pool).await.unwrap();
    db_pool
}

pub(crate) async fn memory_store() -> (SqliteStore, BroadcastFeed) {
    let feed = BroadcastFeed::new(64);
    (SqliteStore::new(memory_pool().await, feed.clone()), feed)
}

/// A user with a profile, without going through bcrypt.
pub(crate) async fn profile(store: &SqliteStore, username: &str) -> Profile {
    let profile = Profile {
        id: Uuid::now_v7(),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
    };

    sqlx::query("INSERT INTO users (id,email,password_hash,created_at) VALUES (?,?,?,?)")
        .bind(profile.id)
        .bind(&profile.email)
        .bind("not-a-hash")
        .bind(OffsetDateTime::now_utc())
        .execute(store.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO profiles (id,username,email) VALUES (?,?,?)")
        .bind(profile.id)
        .bind(&profile.username)
        .bind(&profile.email)
        .execute(store.pool())
        .await
        .unwrap();

    profile
}
