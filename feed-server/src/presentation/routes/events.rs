use axum::Router;
use axum::routing::get;

use crate::presentation::AppState;
use crate::presentation::handlers::events::feed_events;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(feed_events))
}
