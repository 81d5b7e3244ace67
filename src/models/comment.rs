//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::User;

/// A comment on a post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier
    pub id: Uuid,
    /// Post this comment belongs to
    #[serde(default)]
    pub post_id: Option<Uuid>,
    /// Author summary
    #[serde(default)]
    pub user: Option<User>,
    /// Comment text
    #[serde(default)]
    pub message: String,
    /// Number of likes
    #[serde(default)]
    pub like_count: u32,
    /// When the comment was written
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating a comment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    /// Post being commented on
    pub post_id: Uuid,
    /// Author
    pub user: AuthorRef,
    /// Comment text
    pub message: String,
}

/// Reference to the author in a create payload
#[derive(Debug, Clone, Serialize)]
pub struct AuthorRef {
    /// Author id
    pub id: Uuid,
}

impl NewComment {
    /// Create a comment payload
    pub fn new(post_id: Uuid, author_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            post_id,
            user: AuthorRef { id: author_id },
            message: message.into(),
        }
    }
}
