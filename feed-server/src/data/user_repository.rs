use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::user::User;

#[derive(Debug, Clone)]
pub(crate) struct UserCredentials {
    pub(crate) user: User,
    pub(crate) password_hash: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewUser {
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) password_hash: String,
}

#[async_trait]
pub(crate) trait UserRepository: Send + Sync {
    async fn create_user(&self, input: NewUser) -> Result<User, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DomainError>;

    /// Explicit ownership-list maintenance; the feed service coordinates the
    /// two-step update (post row first, then the owner's reference list).
    async fn append_post_ref(&self, user_id: i64, post_id: i64) -> Result<(), DomainError>;
    async fn remove_post_ref(&self, user_id: i64, post_id: i64) -> Result<(), DomainError>;
}
