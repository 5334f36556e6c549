use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_nats::jetstream::{self, consumer::pull, AckKind};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::usecase::contracts::{NotificationRepository, UserRepository};
use crate::usecase::error::UsecaseError;
use crate::usecase::notifications::NotificationsUseCase;
use crate::AppState;

pub const STREAM_NAME: &str = "POST_EVENTS";
pub const LIKED_SUBJECT: &str = "posts.liked";
pub const COMMENTED_SUBJECT: &str = "posts.commented";
const CONSUMER_NAME: &str = "notifications";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostLiked {
    #[validate(length(min = 1))]
    pub post_id: String,
    #[validate(length(min = 1))]
    pub post_owner_id: String,
    #[validate(length(min = 1))]
    pub trigger_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostCommented {
    #[validate(length(min = 1))]
    pub post_id: String,
    #[validate(length(min = 1))]
    pub post_owner_id: String,
    #[validate(length(min = 1))]
    pub trigger_user_id: String,
    pub comment_content: String,
}

/// An action on a post that may notify the post owner.
#[derive(Debug, Clone, PartialEq)]
pub enum PostEvent {
    Liked(PostLiked),
    Commented(PostCommented),
}

impl PostEvent {
    pub fn post_owner_id(&self) -> &str {
        match self {
            PostEvent::Liked(e) => &e.post_owner_id,
            PostEvent::Commented(e) => &e.post_owner_id,
        }
    }

    pub fn trigger_user_id(&self) -> &str {
        match self {
            PostEvent::Liked(e) => &e.trigger_user_id,
            PostEvent::Commented(e) => &e.trigger_user_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown subject: {0}")]
    UnknownSubject(String),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid payload: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

pub fn decode(subject: &str, payload: &[u8]) -> Result<PostEvent, DecodeError> {
    match subject {
        LIKED_SUBJECT => {
            let event: PostLiked = serde_json::from_slice(payload)?;
            event.validate()?;
            Ok(PostEvent::Liked(event))
        }
        COMMENTED_SUBJECT => {
            let event: PostCommented = serde_json::from_slice(payload)?;
            event.validate()?;
            Ok(PostEvent::Commented(event))
        }
        other => Err(DecodeError::UnknownSubject(other.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Done with the message, whether or not a notification was written.
    Ack,
    /// Transient failure; ask JetStream to redeliver.
    Retry,
}

#[tracing::instrument(skip(usecase, event), fields(post_owner_id = %event.post_owner_id(), trigger_user_id = %event.trigger_user_id()))]
pub async fn handle_event<N, U>(usecase: &NotificationsUseCase<N, U>, event: PostEvent) -> Disposition
where
    N: NotificationRepository,
    U: UserRepository,
{
    if event.post_owner_id() == event.trigger_user_id() {
        tracing::debug!("self action, no notification");
        return Disposition::Ack;
    }

    let result = match &event {
        PostEvent::Liked(e) => {
            usecase
                .create_like_notification(&e.post_id, &e.post_owner_id, &e.trigger_user_id)
                .await
        }
        PostEvent::Commented(e) => {
            usecase
                .create_comment_notification(
                    &e.post_id,
                    &e.post_owner_id,
                    &e.trigger_user_id,
                    &e.comment_content,
                )
                .await
        }
    };

    match result {
        Ok(_) => Disposition::Ack,
        Err(UsecaseError::Internal(e)) => {
            tracing::error!(error = %e, "failed to store notification, will retry");
            Disposition::Retry
        }
        Err(e) => {
            tracing::warn!(error = %e, "dropping post event");
            Disposition::Ack
        }
    }
}

async fn process_message<N, U>(msg: &jetstream::Message, usecase: &NotificationsUseCase<N, U>) -> Disposition
where
    N: NotificationRepository,
    U: UserRepository,
{
    match decode(msg.subject.as_str(), &msg.payload) {
        Ok(event) => handle_event(usecase, event).await,
        Err(e) => {
            tracing::warn!(subject = %msg.subject, error = %e, "discarding undecodable post event");
            Disposition::Ack
        }
    }
}

pub async fn run_consumer<N, U>(client: async_nats::Client, state: Arc<AppState<N, U>>) -> anyhow::Result<()>
where
    N: NotificationRepository,
    U: UserRepository,
{
    let jetstream = jetstream::new(client);

    let stream = jetstream
        .get_or_create_stream(jetstream::stream::Config {
            name: STREAM_NAME.to_string(),
            subjects: vec![LIKED_SUBJECT.to_string(), COMMENTED_SUBJECT.to_string()],
            ..Default::default()
        })
        .await
        .context("failed to create POST_EVENTS stream")?;
    tracing::info!(stream = STREAM_NAME, "NATS JetStream stream ready");

    let consumer = stream
        .get_or_create_consumer(
            CONSUMER_NAME,
            pull::Config {
                durable_name: Some(CONSUMER_NAME.to_string()),
                ack_wait: Duration::from_secs(30),
                max_deliver: 3,
                ..Default::default()
            },
        )
        .await
        .context("failed to create consumer")?;
    tracing::info!("post event consumer ready, starting message loop");

    loop {
        let mut messages = match consumer.fetch().max_messages(10).messages().await {
            Ok(msgs) => msgs,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch post events");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        while let Some(msg_result) = messages.next().await {
            let msg = match msg_result {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!(error = %e, "error receiving post event");
                    continue;
                }
            };

            let ack = match process_message(&msg, &state.notifications_usecase).await {
                Disposition::Ack => msg.ack().await,
                Disposition::Retry => msg.ack_with(AckKind::Nak(None)).await,
            };
            if let Err(e) = ack {
                tracing::error!(error = %e, "failed to acknowledge post event");
            }
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::{Notification, NotificationType};
    use crate::domain::user::UserSummary;
    use crate::repository::errors::RepositoryError;
    use crate::usecase::contracts::{MockNotificationRepository, MockUserRepository};

    fn liked_on(post: &str, owner: &str, trigger: &str) -> PostEvent {
        PostEvent::Liked(PostLiked {
            post_id: post.to_string(),
            post_owner_id: owner.to_string(),
            trigger_user_id: trigger.to_string(),
        })
    }

    fn liked(owner: &str, trigger: &str) -> PostEvent {
        liked_on("post-1", owner, trigger)
    }

    fn known_user_repo() -> MockUserRepository {
        let mut mock_user_repo = MockUserRepository::new();
        mock_user_repo.expect_find_by_id().returning(|id| {
            Ok(Some(UserSummary {
                id: id.to_string(),
                name: "Alice".to_string(),
            }))
        });
        mock_user_repo
    }

    #[test]
    fn test_decode_liked() {
        let payload = br#"{"postId":"p1","postOwnerId":"u1","triggerUserId":"u2"}"#;
        let event = decode(LIKED_SUBJECT, payload).unwrap();

        assert_eq!(event, liked_on("p1", "u1", "u2"));
    }

    #[test]
    fn test_decode_commented() {
        let payload =
            br#"{"postId":"p1","postOwnerId":"u1","triggerUserId":"u2","commentContent":"great"}"#;
        let event = decode(COMMENTED_SUBJECT, payload).unwrap();

        match event {
            PostEvent::Commented(e) => assert_eq!(e.comment_content, "great"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(
            decode("posts.shared", b"{}"),
            Err(DecodeError::UnknownSubject(_))
        ));
        assert!(matches!(
            decode(LIKED_SUBJECT, br#"{"postId":"p1"}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            decode(LIKED_SUBJECT, br#"{"postId":"","postOwnerId":"u1","triggerUserId":"u2"}"#),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_like_event() {
        let mut mock_notification_repo = MockNotificationRepository::new();
        mock_notification_repo
            .expect_save()
            .withf(|n: &Notification| n.notification_type == NotificationType::Like && n.user_id == "owner-1")
            .times(1)
            .returning(|n| Ok(n.clone()));

        let usecase = NotificationsUseCase::new(mock_notification_repo, known_user_repo());
        let disposition = handle_event(&usecase, liked("owner-1", "alice-id")).await;

        assert_eq!(disposition, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_handle_self_action_creates_nothing() {
        let mut mock_notification_repo = MockNotificationRepository::new();
        let mut mock_user_repo = MockUserRepository::new();
        mock_notification_repo.expect_save().times(0);
        mock_user_repo.expect_find_by_id().times(0);

        let usecase = NotificationsUseCase::new(mock_notification_repo, mock_user_repo);
        let disposition = handle_event(&usecase, liked("owner-1", "owner-1")).await;

        assert_eq!(disposition, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_handle_unknown_trigger_user_is_dropped() {
        let mut mock_notification_repo = MockNotificationRepository::new();
        let mut mock_user_repo = MockUserRepository::new();
        mock_user_repo.expect_find_by_id().times(1).returning(|_| Ok(None));
        mock_notification_repo.expect_save().times(0);

        let usecase = NotificationsUseCase::new(mock_notification_repo, mock_user_repo);
        let disposition = handle_event(&usecase, liked("owner-1", "ghost")).await;

        assert_eq!(disposition, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_handle_store_failure_is_retried() {
        let mut mock_notification_repo = MockNotificationRepository::new();
        mock_notification_repo
            .expect_save()
            .times(1)
            .returning(|_| Err(RepositoryError::DatabaseError("timeout".to_string())));

        let usecase = NotificationsUseCase::new(mock_notification_repo, known_user_repo());
        let event = PostEvent::Commented(PostCommented {
            post_id: "post-1".to_string(),
            post_owner_id: "owner-1".to_string(),
            trigger_user_id: "alice-id".to_string(),
            comment_content: "hello".to_string(),
        });

        assert_eq!(handle_event(&usecase, event).await, Disposition::Retry);
    }
}
