//! `reqwest` implementation of every gateway

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Comment, Credentials, NewComment, NewPost, Post, Profile, User};

use super::{CommentGateway, LoginGateway, PostGateway, UserGateway};

/// HTTP client for the y-net API
///
/// Holds no auth state: the bearer token is attached per request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8080/api/v1`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base_url(), config.request_timeout())
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client.request(method, self.api_url(endpoint))
    }

    fn authed(&self, method: Method, endpoint: &str, token: &str) -> RequestBuilder {
        self.request(method, endpoint)
            .header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Send and fail on non-success status
    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::debug!("API error {}: {}", status, message.trim());
        Err(Error::Gateway {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    /// Send and decode a JSON body; the backend encodes empty lists as `null`
    async fn fetch<T: DeserializeOwned + Default>(request: RequestBuilder) -> Result<T> {
        let response = Self::send(request).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(T::default());
        }
        let value: Option<T> = serde_json::from_slice(&bytes)?;
        Ok(value.unwrap_or_default())
    }

    async fn fetch_token(request: RequestBuilder) -> Result<String> {
        let envelope: TokenEnvelope = Self::fetch(request).await?;
        if envelope.token.is_empty() {
            return Err(Error::InvalidToken);
        }
        Ok(envelope.token)
    }

    async fn fetch_id(request: RequestBuilder) -> Result<Uuid> {
        let created: Created = Self::fetch(request).await?;
        created
            .id
            .ok_or_else(|| Error::NotFound("created resource id".to_string()))
    }
}

fn page_query(limit: usize, cursor: Option<&str>) -> String {
    match cursor {
        Some(cursor) if !cursor.is_empty() => {
            format!("?limit={}&cursor={}", limit, urlencoding::encode(cursor))
        }
        _ => format!("?limit={limit}"),
    }
}

impl LoginGateway for ApiClient {
    async fn register(&self, profile: &Profile) -> Result<String> {
        Self::fetch_token(self.request(Method::POST, "/login/register").json(profile)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<String> {
        Self::fetch_token(self.request(Method::POST, "/login").json(credentials)).await
    }

    async fn refresh_token(&self, token: &str) -> Result<String> {
        // The server strips the scheme prefix before parsing
        let body = TokenEnvelope {
            token: format!("Bearer {token}"),
        };
        Self::fetch_token(self.request(Method::POST, "/login/refreshtoken").json(&body)).await
    }
}

impl UserGateway for ApiClient {
    async fn get_by_id(&self, token: &str, id: Uuid) -> Result<Option<User>> {
        let request = self.authed(Method::GET, &format!("/users/{id}"), token);
        match Self::fetch::<Vec<User>>(request).await {
            Ok(users) => Ok(users.into_iter().find(|u| u.id == id)),
            Err(Error::Gateway { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn search(&self, token: &str, term: &str) -> Result<Vec<User>> {
        let endpoint = format!("/users/search/{}", urlencoding::encode(term));
        Self::fetch(self.authed(Method::GET, &endpoint, token)).await
    }

    async fn update(&self, token: &str, user: &User) -> Result<()> {
        let endpoint = format!("/users/{}", user.id);
        Self::send(self.authed(Method::PUT, &endpoint, token).json(user)).await?;
        Ok(())
    }

    async fn delete(&self, token: &str, id: Uuid) -> Result<()> {
        Self::send(self.authed(Method::DELETE, &format!("/users/{id}"), token)).await?;
        Ok(())
    }

    async fn follow(&self, token: &str, follower: Uuid, followed: Uuid) -> Result<()> {
        let endpoint = format!("/users/follow/{follower}_{followed}");
        Self::send(self.authed(Method::POST, &endpoint, token)).await?;
        Ok(())
    }

    async fn unfollow(&self, token: &str, follower: Uuid, followed: Uuid) -> Result<()> {
        let endpoint = format!("/users/unfollow/{follower}_{followed}");
        Self::send(self.authed(Method::DELETE, &endpoint, token)).await?;
        Ok(())
    }

    async fn check_follow(&self, token: &str, follower: Uuid, followed: Uuid) -> Result<bool> {
        let endpoint = format!("/users/checkfollower/{follower}_{followed}");
        let result: FollowsJson = Self::fetch(self.authed(Method::GET, &endpoint, token)).await?;
        Ok(result.follows)
    }

    async fn followers(&self, token: &str, id: Uuid) -> Result<Vec<User>> {
        Self::fetch(self.authed(Method::GET, &format!("/users/followers/{id}"), token)).await
    }

    async fn followed(&self, token: &str, id: Uuid) -> Result<Vec<User>> {
        Self::fetch(self.authed(Method::GET, &format!("/users/followed/{id}"), token)).await
    }

    async fn list_posts(
        &self,
        token: &str,
        user_id: Uuid,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<Post>> {
        let endpoint = format!("/users/posts/{user_id}{}", page_query(limit, cursor));
        Self::fetch(self.authed(Method::GET, &endpoint, token)).await
    }
}

impl PostGateway for ApiClient {
    async fn create(&self, token: &str, post: &NewPost) -> Result<Uuid> {
        Self::fetch_id(self.authed(Method::POST, "/posts", token).json(post)).await
    }

    async fn list(&self, token: &str, limit: usize, cursor: Option<&str>) -> Result<Vec<Post>> {
        let endpoint = format!("/posts{}", page_query(limit, cursor));
        Self::fetch(self.authed(Method::GET, &endpoint, token)).await
    }

    async fn get(&self, token: &str, id: Uuid) -> Result<Post> {
        let request = self.authed(Method::GET, &format!("/posts/{id}"), token);
        let post: Option<Post> = Self::fetch(request).await?;
        post.ok_or_else(|| Error::NotFound(format!("post {id}")))
    }

    async fn update(&self, token: &str, post: &Post) -> Result<()> {
        let endpoint = format!("/posts/{}", post.id);
        Self::send(self.authed(Method::PUT, &endpoint, token).json(post)).await?;
        Ok(())
    }

    async fn delete(&self, token: &str, id: Uuid) -> Result<()> {
        Self::send(self.authed(Method::DELETE, &format!("/posts/{id}"), token)).await?;
        Ok(())
    }

    async fn like(&self, token: &str, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let endpoint = format!("/posts/likes/{user_id}_{post_id}");
        Self::send(self.authed(Method::POST, &endpoint, token)).await?;
        Ok(())
    }

    async fn unlike(&self, token: &str, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let endpoint = format!("/posts/likes/{user_id}_{post_id}");
        Self::send(self.authed(Method::DELETE, &endpoint, token)).await?;
        Ok(())
    }

    async fn check_liked(&self, token: &str, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let endpoint = format!("/posts/check/{user_id}_{post_id}");
        let result: LikedJson = Self::fetch(self.authed(Method::GET, &endpoint, token)).await?;
        Ok(result.liked)
    }

    async fn likes(&self, token: &str, post_id: Uuid) -> Result<Vec<User>> {
        Self::fetch(self.authed(Method::GET, &format!("/posts/likes/{post_id}"), token)).await
    }
}

impl CommentGateway for ApiClient {
    async fn create(&self, token: &str, comment: &NewComment) -> Result<Uuid> {
        Self::fetch_id(self.authed(Method::POST, "/comments", token).json(comment)).await
    }

    async fn list_for_post(&self, token: &str, post_id: Uuid) -> Result<Vec<Comment>> {
        Self::fetch(self.authed(Method::GET, &format!("/comments/{post_id}"), token)).await
    }

    async fn update(&self, token: &str, comment: &Comment) -> Result<()> {
        let endpoint = format!("/comments/{}", comment.id);
        Self::send(self.authed(Method::PUT, &endpoint, token).json(comment)).await?;
        Ok(())
    }

    async fn delete(&self, token: &str, id: Uuid) -> Result<()> {
        Self::send(self.authed(Method::DELETE, &format!("/comments/{id}"), token)).await?;
        Ok(())
    }
}

// ==================== API Types ====================

/// Canonical token envelope for register, login and refresh
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenEnvelope {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct Created {
    #[serde(default)]
    id: Option<Uuid>,
}

/// `liked` is omitted by the server when false
#[derive(Debug, Default, Deserialize)]
struct LikedJson {
    #[serde(default)]
    liked: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FollowsJson {
    #[serde(default)]
    follows: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_has_no_cursor() {
        assert_eq!(page_query(10, None), "?limit=10");
        assert_eq!(page_query(10, Some("")), "?limit=10");
    }

    #[test]
    fn test_cursor_is_url_encoded() {
        assert_eq!(page_query(5, Some("YQ+b/c=")), "?limit=5&cursor=YQ%2Bb%2Fc%3D");
    }

    #[test]
    fn test_liked_defaults_to_false() {
        let liked: LikedJson = serde_json::from_str("{}").unwrap();
        assert!(!liked.liked);
        let liked: LikedJson = serde_json::from_str(r#"{"liked":true}"#).unwrap();
        assert!(liked.liked);
    }

    #[test]
    fn test_null_list_decodes_empty() {
        let posts: Option<Vec<Post>> = serde_json::from_str("null").unwrap();
        assert!(posts.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/api/v1/", Duration::from_secs(10)).unwrap();
        assert_eq!(client.api_url("/posts"), "http://localhost:8080/api/v1/posts");
    }
}
