use serde::{Deserialize, Serialize};

/// The slice of a user profile this service reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
}
