//! Gateways to the y-net REST API
//!
//! Each concern the client talks to the backend about is a trait, so the
//! session and feed layers can be driven by the real HTTP client or by a
//! fake in tests. Every authenticated call takes the bearer token as an
//! argument; no gateway keeps auth state of its own.

pub mod http;

use std::future::Future;

use uuid::Uuid;

use crate::error::Result;
use crate::models::{Comment, Credentials, NewComment, NewPost, Post, Profile, User};

pub use http::ApiClient;

/// Token issuance: login, registration and refresh
pub trait LoginGateway: Send + Sync + 'static {
    /// Register a new account and return its first token
    fn register(&self, profile: &Profile) -> impl Future<Output = Result<String>> + Send;

    /// Exchange credentials for a token
    fn login(&self, credentials: &Credentials) -> impl Future<Output = Result<String>> + Send;

    /// Exchange a still-valid token for a fresh one
    fn refresh_token(&self, token: &str) -> impl Future<Output = Result<String>> + Send;
}

/// User profiles and the follow graph
pub trait UserGateway: Send + Sync + 'static {
    /// Look up a single user; `None` when the backend knows no such id
    fn get_by_id(&self, token: &str, id: Uuid)
    -> impl Future<Output = Result<Option<User>>> + Send;

    /// Search users by username fragment
    fn search(&self, token: &str, term: &str) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Update a profile
    fn update(&self, token: &str, user: &User) -> impl Future<Output = Result<()>> + Send;

    /// Delete an account
    fn delete(&self, token: &str, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    /// Make `follower` follow `followed`
    fn follow(
        &self,
        token: &str,
        follower: Uuid,
        followed: Uuid,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Undo a follow
    fn unfollow(
        &self,
        token: &str,
        follower: Uuid,
        followed: Uuid,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Whether `follower` follows `followed`
    fn check_follow(
        &self,
        token: &str,
        follower: Uuid,
        followed: Uuid,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Users following `id`
    fn followers(&self, token: &str, id: Uuid) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// Users `id` follows
    fn followed(&self, token: &str, id: Uuid) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// One page of a user's own posts
    fn list_posts(
        &self,
        token: &str,
        user_id: Uuid,
        limit: usize,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Post>>> + Send;
}

/// Posts and likes
pub trait PostGateway: Send + Sync + 'static {
    /// Publish a post and return its id
    fn create(&self, token: &str, post: &NewPost) -> impl Future<Output = Result<Uuid>> + Send;

    /// One page of the global feed, newest first
    fn list(
        &self,
        token: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Post>>> + Send;

    /// Fetch a single post
    fn get(&self, token: &str, id: Uuid) -> impl Future<Output = Result<Post>> + Send;

    /// Update caption or image
    fn update(&self, token: &str, post: &Post) -> impl Future<Output = Result<()>> + Send;

    /// Delete a post
    fn delete(&self, token: &str, id: Uuid) -> impl Future<Output = Result<()>> + Send;

    /// Like a post on behalf of `user_id`
    fn like(&self, token: &str, user_id: Uuid, post_id: Uuid)
    -> impl Future<Output = Result<()>> + Send;

    /// Remove a like
    fn unlike(
        &self,
        token: &str,
        user_id: Uuid,
        post_id: Uuid,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Whether `user_id` has liked `post_id`
    fn check_liked(
        &self,
        token: &str,
        user_id: Uuid,
        post_id: Uuid,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Users who liked a post
    fn likes(&self, token: &str, post_id: Uuid) -> impl Future<Output = Result<Vec<User>>> + Send;
}

/// Comments on posts
pub trait CommentGateway: Send + Sync + 'static {
    /// Add a comment and return its id
    fn create(&self, token: &str, comment: &NewComment)
    -> impl Future<Output = Result<Uuid>> + Send;

    /// Comments on a post
    fn list_for_post(
        &self,
        token: &str,
        post_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Edit a comment
    fn update(&self, token: &str, comment: &Comment) -> impl Future<Output = Result<()>> + Send;

    /// Delete a comment
    fn delete(&self, token: &str, id: Uuid) -> impl Future<Output = Result<()>> + Send;
}
