//! Login and registration payloads

use serde::Serialize;

use crate::error::{Error, Result};

const REQUIRED_FIELDS: &str = "username and password are required";

/// Username/password pair sent to the login endpoint
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Login name
    pub username: String,
    /// Secret
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must be non-empty
    pub fn validate(&self) -> Result<()> {
        validate_pair(&self.username, &self.password)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration payload; only username and password are checked
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Login name
    pub username: String,
    /// Secret
    pub password: String,
    /// Contact email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Avatar image (base64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Profile bio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Profile {
    /// Create a profile with just the required fields
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Both required fields must be non-empty
    pub fn validate(&self) -> Result<()> {
        validate_pair(&self.username, &self.password)
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

fn validate_pair(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(Error::Validation(REQUIRED_FIELDS.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_rejected() {
        assert!(Credentials::new("", "secret1").validate().is_err());
        assert!(Credentials::new("ana", "").validate().is_err());
        assert!(Credentials::new("ana", "secret1").validate().is_ok());
    }

    #[test]
    fn test_optional_profile_fields_pass_through() {
        let mut profile = Profile::new("ana", "secret1");
        profile.full_name = Some("Ana".into());
        assert!(profile.validate().is_ok());

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["fullName"], "Ana");
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_password_not_in_debug() {
        let creds = Credentials::new("ana", "secret1");
        assert!(!format!("{creds:?}").contains("secret1"));
    }
}
