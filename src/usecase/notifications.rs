use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::domain::user::UserSummary;
use crate::usecase::contracts::{NotificationRepository, UserRepository};
use crate::usecase::error::UsecaseError;

pub struct NotificationsUseCase<N, U>
where
    N: NotificationRepository,
    U: UserRepository,
{
    notification_repository: N,
    user_repository: U,
}

impl<N, U> NotificationsUseCase<N, U>
where
    N: NotificationRepository,
    U: UserRepository,
{
    pub fn new(notification_repository: N, user_repository: U) -> Self {
        Self {
            notification_repository,
            user_repository,
        }
    }

    async fn trigger_user(&self, trigger_user_id: &str) -> Result<UserSummary, UsecaseError> {
        self.user_repository
            .find_by_id(trigger_user_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Trigger user".to_string()))
    }

    async fn store(&self, notification: Notification) -> Result<Notification, UsecaseError> {
        let saved = self.notification_repository.save(&notification).await?;

        metrics::counter!("notifications_created_total", "type" => saved.notification_type.as_str())
            .increment(1);
        tracing::info!(
            notification_id = %saved.id,
            user_id = %saved.user_id,
            notification_type = %saved.notification_type,
            "notification created"
        );
        Ok(saved)
    }

    #[tracing::instrument(skip(self), fields(%post_id, %post_owner_id, %trigger_user_id))]
    pub async fn create_like_notification(
        &self,
        post_id: &str,
        post_owner_id: &str,
        trigger_user_id: &str,
    ) -> Result<Notification, UsecaseError> {
        tracing::debug!("creating like notification");

        let trigger_user = self.trigger_user(trigger_user_id).await?;
        let notification = Notification::like(
            post_id.to_string(),
            post_owner_id.to_string(),
            trigger_user.id,
            &trigger_user.name,
        );

        self.store(notification).await
    }

    #[tracing::instrument(skip(self, comment_content), fields(%post_id, %post_owner_id, %trigger_user_id))]
    pub async fn create_comment_notification(
        &self,
        post_id: &str,
        post_owner_id: &str,
        trigger_user_id: &str,
        comment_content: &str,
    ) -> Result<Notification, UsecaseError> {
        tracing::debug!("creating comment notification");

        let trigger_user = self.trigger_user(trigger_user_id).await?;
        let notification = Notification::comment(
            post_id.to_string(),
            post_owner_id.to_string(),
            trigger_user.id,
            &trigger_user.name,
            comment_content,
        );

        self.store(notification).await
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn get_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>, UsecaseError> {
        tracing::debug!("listing notifications");

        let notifications = self.notification_repository.find_by_user_id(user_id).await?;

        tracing::debug!(user_id = %user_id, count = notifications.len(), "retrieved notifications");
        Ok(notifications)
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn get_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>, UsecaseError> {
        tracing::debug!("listing unread notifications");

        let notifications = self.notification_repository.find_unread_by_user_id(user_id).await?;

        tracing::debug!(user_id = %user_id, count = notifications.len(), "retrieved unread notifications");
        Ok(notifications)
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn count_unread(&self, user_id: &str) -> Result<i64, UsecaseError> {
        tracing::debug!("counting unread notifications");

        let count = self.notification_repository.count_unread(user_id).await?;

        tracing::debug!(user_id = %user_id, count, "unread count retrieved");
        Ok(count)
    }

    /// Succeeds without writing when the notification is already read.
    #[tracing::instrument(skip(self), fields(notification_id = %id))]
    pub async fn mark_notification_as_read(&self, id: Uuid) -> Result<(), UsecaseError> {
        tracing::debug!("marking notification as read");

        let mut notification = self
            .notification_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Notification".to_string()))?;

        if notification.mark_read() {
            self.notification_repository.save(&notification).await?;
            tracing::debug!(notification_id = %id, "notification marked as read");
        } else {
            tracing::debug!(notification_id = %id, "notification already read");
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, UsecaseError> {
        tracing::debug!("marking all notifications as read");

        let updated = self.notification_repository.mark_all_as_read(user_id).await?;

        tracing::debug!(user_id = %user_id, updated, "all notifications marked as read");
        Ok(updated)
    }
}
