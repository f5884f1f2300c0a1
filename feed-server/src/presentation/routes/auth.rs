use axum::Router;
use axum::routing::post;

use crate::presentation::AppState;
use crate::presentation::handlers::auth::{login, signup};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}
