use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::notification::{Notification, NotificationType};
use crate::usecase::contracts::{NotificationRepository, UserRepository};
use crate::usecase::error::UsecaseError;
use crate::AppState;

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    pub user_id: String,
}

impl UserQuery {
    fn into_user_id(self) -> Result<String, UsecaseError> {
        if let Err(validation_errors) = self.validate() {
            tracing::warn!(?validation_errors, "validation failed");
            return Err(UsecaseError::Validation("userId is required".to_string()));
        }
        Ok(self.user_id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub post_id: String,
    pub trigger_user_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            notification_type: n.notification_type,
            post_id: n.post_id,
            trigger_user_id: n.trigger_user_id,
            message: n.message,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

fn to_response(notifications: Vec<Notification>) -> Vec<NotificationResponse> {
    notifications.into_iter().map(NotificationResponse::from).collect()
}

#[tracing::instrument(skip(state))]
pub async fn list_notifications<N, U>(
    State(state): State<Arc<AppState<N, U>>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, UsecaseError>
where
    N: NotificationRepository,
    U: UserRepository,
{
    let user_id = query.into_user_id()?;
    tracing::debug!(%user_id, "handling list notifications request");

    let notifications = state
        .notifications_usecase
        .get_user_notifications(&user_id)
        .await?;

    tracing::debug!(count = notifications.len(), "notifications listed");
    Ok((StatusCode::OK, Json(to_response(notifications))))
}

#[tracing::instrument(skip(state))]
pub async fn list_unread_notifications<N, U>(
    State(state): State<Arc<AppState<N, U>>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, UsecaseError>
where
    N: NotificationRepository,
    U: UserRepository,
{
    let user_id = query.into_user_id()?;
    tracing::debug!(%user_id, "handling list unread notifications request");

    let notifications = state
        .notifications_usecase
        .get_unread_notifications(&user_id)
        .await?;

    tracing::debug!(count = notifications.len(), "unread notifications listed");
    Ok((StatusCode::OK, Json(to_response(notifications))))
}

#[tracing::instrument(skip(state))]
pub async fn get_unread_count<N, U>(
    State(state): State<Arc<AppState<N, U>>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, UsecaseError>
where
    N: NotificationRepository,
    U: UserRepository,
{
    let user_id = query.into_user_id()?;
    tracing::debug!(%user_id, "handling unread count request");

    let unread_count = state.notifications_usecase.count_unread(&user_id).await?;

    Ok((StatusCode::OK, Json(UnreadCountResponse { unread_count })))
}

#[tracing::instrument(skip(state), fields(notification_id = %id))]
pub async fn mark_as_read<N, U>(
    State(state): State<Arc<AppState<N, U>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, UsecaseError>
where
    N: NotificationRepository,
    U: UserRepository,
{
    tracing::debug!("handling mark as read request");

    // A malformed id cannot name a stored notification.
    let id = Uuid::parse_str(&id).map_err(|_| UsecaseError::NotFound("Notification".to_string()))?;

    state.notifications_usecase.mark_notification_as_read(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state))]
pub async fn mark_all_as_read<N, U>(
    State(state): State<Arc<AppState<N, U>>>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, UsecaseError>
where
    N: NotificationRepository,
    U: UserRepository,
{
    let user_id = query.into_user_id()?;
    tracing::debug!(%user_id, "handling mark all as read request");

    let updated = state.notifications_usecase.mark_all_as_read(&user_id).await?;

    Ok((StatusCode::OK, Json(MarkAllReadResponse { updated })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_query_validation_valid() {
        let query = UserQuery {
            user_id: "u1".to_string(),
        };

        assert!(query.validate().is_ok());
        assert_eq!(query.into_user_id().unwrap(), "u1");
    }

    #[test]
    fn test_user_query_validation_empty() {
        let query = UserQuery {
            user_id: "".to_string(),
        };

        assert!(query.validate().is_err());
        assert!(matches!(query.into_user_id(), Err(UsecaseError::Validation(_))));
    }

    #[test]
    fn test_user_query_validation_whitespace() {
        let query = UserQuery {
            user_id: "   ".to_string(),
        };

        assert!(query.validate().is_err());
    }

    #[test]
    fn test_user_query_missing_defaults_to_empty() {
        let query: UserQuery = serde_json::from_str("{}").unwrap();
        assert!(query.user_id.is_empty());
    }

    #[test]
    fn test_notification_response_serialization() {
        let notification = Notification::comment(
            "post-1".to_string(),
            "owner-1".to_string(),
            "alice-id".to_string(),
            "Alice",
            "thanks!",
        );

        let json = serde_json::to_value(NotificationResponse::from(notification)).unwrap();
        assert_eq!(json["type"], "COMMENT");
        assert_eq!(json["userId"], "owner-1");
        assert_eq!(json["postId"], "post-1");
        assert_eq!(json["triggerUserId"], "alice-id");
        assert_eq!(json["message"], "Alice commented on your post: thanks!");
        assert_eq!(json["read"], false);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_unread_count_response_serialization() {
        let json = serde_json::to_string(&UnreadCountResponse { unread_count: 4 }).unwrap();
        assert_eq!(json, r#"{"unreadCount":4}"#);
    }
}
