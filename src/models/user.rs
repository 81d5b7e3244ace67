//! User model (the summary the backend returns for profiles and authors)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user profile as returned by the backend
///
/// Author summaries embedded in posts only carry `id`, `username` and
/// `avatar`, so everything but the id is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Login name
    #[serde(default)]
    pub username: String,
    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Profile bio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Avatar image (base64)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Number of followers
    #[serde(default, alias = "followeCount")]
    pub follower_count: u32,
}

impl User {
    /// Create a bare user with only an id and username
    pub fn new(id: Uuid, username: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            email: None,
            full_name: None,
            description: None,
            avatar: None,
            follower_count: 0,
        }
    }

    /// Name to show in listings: the full name when set, the handle otherwise
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }

    /// Handle with the `@` prefix
    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }
}
