use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::{notification::Notification, user::UserSummary},
    repository::errors::RepositoryError,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Newest first.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError>;
    /// Unread only, newest first.
    async fn find_unread_by_user_id(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, RepositoryError>;
    /// Inserts a new record or replaces the one stored under the same id.
    async fn save(&self, notification: &Notification) -> Result<Notification, RepositoryError>;
    async fn count_unread(&self, user_id: &str) -> Result<i64, RepositoryError>;
    async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserSummary>, RepositoryError>;
}
