pub(crate) mod auth;
pub(crate) mod events;
pub(crate) mod images;
pub(crate) mod posts;
