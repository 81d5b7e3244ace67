//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::User;

/// A post as listed in the feed
///
/// The backend omits zero counts, so both counters default to 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier
    pub id: Uuid,
    /// Author summary
    #[serde(default)]
    pub user: Option<User>,
    /// Image payload (base64)
    #[serde(default)]
    pub image: String,
    /// Caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of likes
    #[serde(default)]
    pub like_count: u32,
    /// Number of comments
    #[serde(default)]
    pub comment_count: u32,
    /// When the post was created
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a post
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Author
    pub user: User,
    /// Image payload (base64)
    pub image: String,
    /// Caption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Post {
    /// Create an empty post with the given id and timestamp
    pub fn new(id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user: None,
            image: String::new(),
            description: None,
            like_count: 0,
            comment_count: 0,
            created_at,
        }
    }

    /// Author handle, or an empty string for anonymous summaries
    pub fn author_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.username.as_str())
    }

    /// Get a short preview of the caption (for list display)
    pub fn preview(&self, max_len: usize) -> String {
        let caption = self.description.as_deref().unwrap_or_default().replace('\n', " ");
        if caption.chars().count() <= max_len {
            caption
        } else {
            let cut: String = caption.chars().take(max_len.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }

    /// Get relative time string (e.g., "5m", "2h", "3d")
    pub fn relative_time(&self) -> String {
        let duration = Utc::now().signed_duration_since(self.created_at);

        if duration.num_seconds() < 60 {
            format!("{}s", duration.num_seconds().max(0))
        } else if duration.num_minutes() < 60 {
            format!("{}m", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h", duration.num_hours())
        } else if duration.num_days() < 7 {
            format!("{}d", duration.num_days())
        } else {
            self.created_at.format("%b %d").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_missing_counts_default_to_zero() {
        let json = r#"{
            "id": "0a8e6a34-5b53-4d7e-9b2a-1f0c3a9c8d11",
            "user": {"id": "6f1c2f7e-4d6a-4f43-9d3c-1c1d1a0b2e3f", "username": "ana"},
            "image": "aGVsbG8=",
            "createdAt": "2024-05-01T12:30:00.123456Z"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.author_name(), "ana");
        assert!(post.description.is_none());
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let mut post = Post::new(Uuid::new_v4(), Utc::now());
        post.description = Some("pôr do sol na praia\ncom amigos".into());
        assert_eq!(post.preview(10), "pôr do ...");
        assert_eq!(post.preview(100), "pôr do sol na praia com amigos");
    }

    #[test]
    fn test_relative_time() {
        let post = Post::new(Uuid::new_v4(), Utc::now() - Duration::hours(3));
        assert_eq!(post.relative_time(), "3h");
    }
}
