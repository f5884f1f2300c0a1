use std::sync::Arc;

use anyhow::Result;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use application::auth_service::AuthService;
use application::feed_service::FeedService;
use application::notification_hub::NotificationHub;
use data::repositories::postgres::post_repository::PostgresPostRepository;
use data::repositories::postgres::user_repository::PostgresUserRepository;
use infrastructure::assets::ImageStore;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::jwt::JwtService;
use infrastructure::logging::init_logging;
use infrastructure::settings::Settings;
use presentation::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level)?;

    let pool = create_pool(&settings.database_url, settings.database_max_connections).await?;
    run_migrations(&pool).await?;

    let images = ImageStore::new(&settings.images_dir)?;
    let hub = Arc::new(NotificationHub::new());
    let jwt = Arc::new(JwtService::new(
        &settings.jwt_secret,
        settings.jwt_ttl_seconds,
    ));

    let user_repo = PostgresUserRepository::new(pool.clone());
    let post_repo = PostgresPostRepository::new(pool);

    let auth_service = Arc::new(AuthService::new(user_repo.clone(), jwt.clone()));
    let feed_service = Arc::new(FeedService::new(
        post_repo,
        user_repo,
        images.clone(),
        hub.clone(),
    ));

    let state = AppState::new(
        auth_service,
        feed_service,
        hub,
        jwt,
        images,
        settings.feed_page_size,
    );

    server::run_http(&settings, state).await
}
