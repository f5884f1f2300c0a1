use std::sync::Arc;

use crate::application::auth_service::AuthService;
use crate::application::feed_service::FeedService;
use crate::application::notification_hub::NotificationHub;
use crate::data::repositories::postgres::post_repository::PostgresPostRepository;
use crate::data::repositories::postgres::user_repository::PostgresUserRepository;
use crate::infrastructure::assets::ImageStore;
use crate::infrastructure::jwt::JwtService;

pub(crate) mod app_error;
pub(crate) mod handlers;
pub(crate) mod http_handlers;
pub(crate) mod middleware;
pub(crate) mod openapi;
pub(crate) mod routes;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) auth_service: Arc<AuthService<PostgresUserRepository>>,
    pub(crate) feed_service:
        Arc<FeedService<PostgresPostRepository, PostgresUserRepository, ImageStore>>,
    pub(crate) hub: Arc<NotificationHub>,
    pub(crate) jwt: Arc<JwtService>,
    pub(crate) images: ImageStore,
    pub(crate) feed_page_size: u32,
}

impl AppState {
    pub(crate) fn new(
        auth_service: Arc<AuthService<PostgresUserRepository>>,
        feed_service: Arc<
            FeedService<PostgresPostRepository, PostgresUserRepository, ImageStore>,
        >,
        hub: Arc<NotificationHub>,
        jwt: Arc<JwtService>,
        images: ImageStore,
        feed_page_size: u32,
    ) -> Self {
        Self {
            auth_service,
            feed_service,
            hub,
            jwt,
            images,
            feed_page_size,
        }
    }
}
