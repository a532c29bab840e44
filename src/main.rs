use anyhow::Context;
use huddle::{AppState, auth::Authenticator, backend::{BroadcastFeed, SqliteStore}, config::Config};
use sqlx::sqlite::SqlitePoolOptions;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("huddle=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_idle_minutes)));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("couldn't open {}", config.database_url))?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let feed = BroadcastFeed::new(config.realtime_capacity);
    let store = SqliteStore::new(db_pool, feed.clone());
    let app_state = AppState {
        auth: Authenticator::new(store.clone(), config.bcrypt_cost),
        store,
        feed,
    };

    let app = huddle::app(app_state, session_layer);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("couldn't bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
