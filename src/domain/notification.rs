use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Like,
    Comment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "LIKE",
            NotificationType::Comment => "COMMENT",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(NotificationType::Like),
            "COMMENT" => Ok(NotificationType::Comment),
            other => Err(format!("unknown notification type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub post_id: String,
    pub trigger_user_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: String,
        notification_type: NotificationType,
        post_id: String,
        trigger_user_id: String,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            notification_type,
            post_id,
            trigger_user_id,
            message,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn like(post_id: String, post_owner_id: String, trigger_user_id: String, trigger_user_name: &str) -> Self {
        let message = format!("{} liked your post.", trigger_user_name);
        Self::new(post_owner_id, NotificationType::Like, post_id, trigger_user_id, message)
    }

    /// The comment text is embedded verbatim; length and escaping are the caller's concern.
    pub fn comment(
        post_id: String,
        post_owner_id: String,
        trigger_user_id: String,
        trigger_user_name: &str,
        comment_content: &str,
    ) -> Self {
        let message = format!("{} commented on your post: {}", trigger_user_name, comment_content);
        Self::new(post_owner_id, NotificationType::Comment, post_id, trigger_user_id, message)
    }

    /// Returns `true` if the flag changed.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_notification_creation() {
        let notification = Notification::like(
            "post-1".to_string(),
            "owner-1".to_string(),
            "alice-id".to_string(),
            "Alice",
        );

        assert_eq!(notification.user_id, "owner-1");
        assert_eq!(notification.post_id, "post-1");
        assert_eq!(notification.trigger_user_id, "alice-id");
        assert_eq!(notification.notification_type, NotificationType::Like);
        assert_eq!(notification.message, "Alice liked your post.");
        assert!(!notification.read);
    }

    #[test]
    fn test_comment_notification_keeps_content_verbatim() {
        let content = "<b>nice</b> & thanks";
        let notification = Notification::comment(
            "post-1".to_string(),
            "owner-1".to_string(),
            "bob-id".to_string(),
            "Bob",
            content,
        );

        assert_eq!(notification.notification_type, NotificationType::Comment);
        assert_eq!(
            notification.message,
            "Bob commented on your post: <b>nice</b> & thanks"
        );
    }

    #[test]
    fn test_mark_read_is_one_way() {
        let mut notification = Notification::like(
            "post-1".to_string(),
            "owner-1".to_string(),
            "alice-id".to_string(),
            "Alice",
        );

        assert!(notification.mark_read());
        assert!(notification.read);
        assert!(!notification.mark_read());
        assert!(notification.read);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Notification::like("p".to_string(), "o".to_string(), "t".to_string(), "T");
        let b = Notification::like("p".to_string(), "o".to_string(), "t".to_string(), "T");

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_notification_type_parsing() {
        assert_eq!("LIKE".parse::<NotificationType>(), Ok(NotificationType::Like));
        assert_eq!("COMMENT".parse::<NotificationType>(), Ok(NotificationType::Comment));
        assert!("like".parse::<NotificationType>().is_err());
        assert_eq!(NotificationType::Comment.to_string(), "COMMENT");
    }
}
