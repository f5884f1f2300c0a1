use serde::Serialize;

use super::post::Post;
use super::user::CreatorRef;

/// A created post together with its owner projection, as returned to the
/// caller and broadcast to feed subscribers.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreatedPost {
    #[serde(flatten)]
    pub(crate) post: Post,
    pub(crate) creator: CreatorRef,
}

/// Ephemeral post-mutation event. Emit-and-forget: it exists only for the
/// moment of broadcast and is never persisted.
///
/// Wire shape: `{"action": "create"|"update"|"delete", "post": ...}` where
/// `post` is a full snapshot for create/update and just the id for delete.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", content = "post", rename_all = "lowercase")]
pub(crate) enum FeedEvent {
    Create(CreatedPost),
    Update(Post),
    Delete(i64),
}
