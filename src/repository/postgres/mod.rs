use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    domain::notification::{Notification, NotificationType},
    domain::user::UserSummary,
    repository::errors::RepositoryError,
    usecase::contracts::{NotificationRepository, UserRepository},
};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: String,
    notification_type: String,
    post_id: String,
    trigger_user_id: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification, RepositoryError> {
        let notification_type = self
            .notification_type
            .parse::<NotificationType>()
            .map_err(RepositoryError::DatabaseError)?;

        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            notification_type,
            post_id: self.post_id,
            trigger_user_id: self.trigger_user_id,
            message: self.message,
            read: self.is_read,
            created_at: self.created_at,
        })
    }
}

fn into_notifications(rows: Vec<NotificationRow>) -> Result<Vec<Notification>, RepositoryError> {
    rows.into_iter().map(NotificationRow::into_notification).collect()
}

pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        tracing::debug!("finding notifications by user_id");

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, notification_type, post_id, trigger_user_id, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, count = rows.len(), "found notifications");
        into_notifications(rows)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn find_unread_by_user_id(&self, user_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        tracing::debug!("finding unread notifications by user_id");

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, notification_type, post_id, trigger_user_id, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1 AND is_read = FALSE
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, count = rows.len(), "found unread notifications");
        into_notifications(rows)
    }

    #[tracing::instrument(skip(self), fields(notification_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, RepositoryError> {
        tracing::debug!("finding notification by id");

        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, notification_type, post_id, trigger_user_id, message, is_read, created_at
            FROM notifications
            WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(NotificationRow::into_notification).transpose()
    }

    #[tracing::instrument(skip(self, notification), fields(notification_id = %notification.id, user_id = %notification.user_id))]
    async fn save(&self, notification: &Notification) -> Result<Notification, RepositoryError> {
        tracing::debug!("saving notification");

        // Only the read flag is mutable once a record exists.
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            INSERT INTO notifications (id, user_id, notification_type, post_id, trigger_user_id, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET is_read = notifications.is_read OR EXCLUDED.is_read
            RETURNING id, user_id, notification_type, post_id, trigger_user_id, message, is_read, created_at
            "#
        )
        .bind(notification.id)
        .bind(&notification.user_id)
        .bind(notification.notification_type.as_str())
        .bind(&notification.post_id)
        .bind(&notification.trigger_user_id)
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(notification_id = %notification.id, "notification saved");
        row.into_notification()
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn count_unread(&self, user_id: &str) -> Result<i64, RepositoryError> {
        tracing::debug!("counting unread notifications");

        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, RepositoryError> {
        tracing::debug!("marking all notifications as read");

        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, updated = result.rows_affected(), "notifications marked as read");
        Ok(result.rows_affected())
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn find_by_id(&self, id: &str) -> Result<Option<UserSummary>, RepositoryError> {
        tracing::debug!("finding user by id");

        let user = sqlx::query_as::<_, UserSummary>("SELECT id, name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
