//! Gazette - a single-author blog backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gazette::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxPostRepository, SqlxSettingsRepository, SqlxTagRepository, SqlxUserRepository,
        },
        schema,
    },
    services::{PostService, SettingsService, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazette=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gazette...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    schema::ensure_schema(&pool).await?;
    tracing::info!("Database schema ready");

    // Create repositories and services
    let posts = Arc::new(PostService::new(
        SqlxPostRepository::boxed(pool.clone()),
        SqlxTagRepository::boxed(pool.clone()),
    ));
    let users = Arc::new(UserService::new(SqlxUserRepository::boxed(pool.clone())));
    let settings = Arc::new(SettingsService::new(
        SqlxSettingsRepository::boxed(pool.clone()),
        config.blog.url.clone(),
    ));

    // Backfill missing settings rows before the API goes live. Attributed
    // to the administrator when one exists, otherwise to the first user
    // that will be registered.
    let seed_user = users.administrator_id().await?.unwrap_or(1);
    settings.ensure_defaults(chrono::Utc::now(), seed_user).await?;
    tracing::info!("Settings defaults ensured");

    let state = AppState {
        pool,
        posts,
        users,
        settings,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
