//! Test fixtures: an in-memory backend and a clock that follows tokio time

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeZone, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::api::{LoginGateway, PostGateway, UserGateway};
use crate::error::{Error, Result};
use crate::feed::decode_cursor;
use crate::models::{Credentials, NewPost, Post, Profile, User};
use crate::session::Clock;

/// Unsigned JWT carrying `id` and `exp`
pub fn make_token(id: Uuid, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({ "id": id.to_string(), "exp": exp });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Unix clock starting at `base` and advancing with tokio's (pausable) time
pub struct TokioClock {
    base: i64,
    start: Instant,
}

impl TokioClock {
    pub fn new(base: i64) -> Self {
        Self {
            base,
            start: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> i64 {
        self.base + self.start.elapsed().as_secs() as i64
    }
}

/// Newest post the fake hands out; later posts are progressively older
const FIRST_POST_AT: i64 = 1_699_990_000;

#[derive(Default)]
struct Backend {
    users: Mutex<HashMap<Uuid, User>>,
    login_token: Mutex<Option<String>>,
    refresh_tokens: Mutex<VecDeque<String>>,
    posts: Mutex<Vec<Post>>,
    likes: Mutex<HashSet<(Uuid, Uuid)>>,
    cursors: Mutex<Vec<Option<String>>>,
    fail_list: AtomicBool,
    fail_likes: AtomicBool,
    post_seq: AtomicUsize,
    login_calls: AtomicUsize,
    register_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    list_calls: AtomicUsize,
    check_liked_calls: AtomicUsize,
    like_calls: AtomicUsize,
    unlike_calls: AtomicUsize,
}

/// Scriptable stand-in for the REST backend.
///
/// Every call yields once before answering, like a network round trip, so
/// concurrent callers interleave the way they would against the server.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Backend>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

fn rejected() -> Error {
    Error::Gateway {
        status: 401,
        message: "unauthorized".to_string(),
    }
}

fn unavailable() -> Error {
    Error::Gateway {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

async fn round_trip(token: &str) -> Result<()> {
    tokio::task::yield_now().await;
    if crate::session::decode_token(token).is_none() {
        return Err(rejected());
    }
    Ok(())
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str) -> User {
        let user = User::new(Uuid::new_v4(), username);
        lock(&self.inner.users).insert(user.id, user.clone());
        user
    }

    /// Token returned by login and register; without one both are rejected
    pub fn set_login_token(&self, token: String) {
        *lock(&self.inner.login_token) = Some(token);
    }

    /// Queue a token for the next refresh; an empty queue rejects refreshes
    pub fn push_refresh_token(&self, token: String) {
        lock(&self.inner.refresh_tokens).push_back(token);
    }

    /// Append `count` posts older than every existing one
    pub fn add_posts(&self, count: usize) -> Vec<Post> {
        let author = User::new(Uuid::new_v4(), "poster");
        let created: Vec<Post> = (0..count)
            .map(|_| {
                let seq = self.inner.post_seq.fetch_add(1, Ordering::SeqCst);
                let at = Utc
                    .timestamp_opt(FIRST_POST_AT - seq as i64 * 60, 250_000_000)
                    .unwrap();
                let mut post = Post::new(Uuid::new_v4(), at);
                post.user = Some(author.clone());
                post.description = Some(format!("post #{seq}"));
                post.like_count = 2;
                post
            })
            .collect();
        lock(&self.inner.posts).extend(created.iter().cloned());
        created
    }

    /// Drop every post server-side
    pub fn clear_posts(&self) {
        lock(&self.inner.posts).clear();
    }

    /// Server-side posts in feed order
    pub fn posts(&self) -> Vec<Post> {
        lock(&self.inner.posts).clone()
    }

    pub fn set_liked(&self, user_id: Uuid, post_id: Uuid) {
        lock(&self.inner.likes).insert((user_id, post_id));
    }

    pub fn clear_liked(&self, user_id: Uuid, post_id: Uuid) {
        lock(&self.inner.likes).remove(&(user_id, post_id));
    }

    pub fn fail_list(&self, fail: bool) {
        self.inner.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_likes(&self, fail: bool) {
        self.inner.fail_likes.store(fail, Ordering::SeqCst);
    }

    /// Cursor of every feed request, in call order
    pub fn list_cursors(&self) -> Vec<Option<String>> {
        lock(&self.inner.cursors).clone()
    }

    pub fn login_calls(&self) -> usize {
        self.inner.login_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.inner.register_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    pub fn check_liked_calls(&self) -> usize {
        self.inner.check_liked_calls.load(Ordering::SeqCst)
    }

    pub fn like_calls(&self) -> usize {
        self.inner.like_calls.load(Ordering::SeqCst)
    }

    pub fn unlike_calls(&self) -> usize {
        self.inner.unlike_calls.load(Ordering::SeqCst)
    }

    fn issue_login_token(&self) -> Result<String> {
        lock(&self.inner.login_token).clone().ok_or_else(rejected)
    }

    fn set_like(&self, user_id: Uuid, post_id: Uuid, liked: bool) -> Result<()> {
        if self.inner.fail_likes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let changed = if liked {
            lock(&self.inner.likes).insert((user_id, post_id))
        } else {
            lock(&self.inner.likes).remove(&(user_id, post_id))
        };
        if !changed {
            return Err(Error::Gateway {
                status: 409,
                message: "like state already set".to_string(),
            });
        }
        if let Some(post) = lock(&self.inner.posts).iter_mut().find(|p| p.id == post_id) {
            post.like_count = if liked {
                post.like_count + 1
            } else {
                post.like_count.saturating_sub(1)
            };
        }
        Ok(())
    }
}

impl LoginGateway for FakeBackend {
    async fn register(&self, _profile: &Profile) -> Result<String> {
        self.inner.register_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.issue_login_token()
    }

    async fn login(&self, _credentials: &Credentials) -> Result<String> {
        self.inner.login_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.issue_login_token()
    }

    async fn refresh_token(&self, token: &str) -> Result<String> {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
        round_trip(token).await?;
        lock(&self.inner.refresh_tokens)
            .pop_front()
            .ok_or_else(rejected)
    }
}

impl UserGateway for FakeBackend {
    async fn get_by_id(&self, token: &str, id: Uuid) -> Result<Option<User>> {
        round_trip(token).await?;
        Ok(lock(&self.inner.users).get(&id).cloned())
    }

    async fn search(&self, token: &str, term: &str) -> Result<Vec<User>> {
        round_trip(token).await?;
        Ok(lock(&self.inner.users)
            .values()
            .filter(|u| u.username.contains(term))
            .cloned()
            .collect())
    }

    async fn update(&self, token: &str, user: &User) -> Result<()> {
        round_trip(token).await?;
        lock(&self.inner.users).insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, token: &str, id: Uuid) -> Result<()> {
        round_trip(token).await?;
        lock(&self.inner.users).remove(&id);
        Ok(())
    }

    async fn follow(&self, token: &str, _follower: Uuid, _followed: Uuid) -> Result<()> {
        round_trip(token).await
    }

    async fn unfollow(&self, token: &str, _follower: Uuid, _followed: Uuid) -> Result<()> {
        round_trip(token).await
    }

    async fn check_follow(&self, token: &str, _follower: Uuid, _followed: Uuid) -> Result<bool> {
        round_trip(token).await?;
        Ok(false)
    }

    async fn followers(&self, token: &str, _id: Uuid) -> Result<Vec<User>> {
        round_trip(token).await?;
        Ok(Vec::new())
    }

    async fn followed(&self, token: &str, _id: Uuid) -> Result<Vec<User>> {
        round_trip(token).await?;
        Ok(Vec::new())
    }

    async fn list_posts(
        &self,
        token: &str,
        user_id: Uuid,
        limit: usize,
        _cursor: Option<&str>,
    ) -> Result<Vec<Post>> {
        round_trip(token).await?;
        Ok(lock(&self.inner.posts)
            .iter()
            .filter(|p| p.user.as_ref().is_some_and(|u| u.id == user_id))
            .take(limit)
            .cloned()
            .collect())
    }
}

impl PostGateway for FakeBackend {
    async fn create(&self, token: &str, post: &NewPost) -> Result<Uuid> {
        round_trip(token).await?;
        let mut created = Post::new(Uuid::new_v4(), Utc::now());
        created.user = Some(post.user.clone());
        created.image = post.image.clone();
        created.description = post.description.clone();
        let id = created.id;
        lock(&self.inner.posts).insert(0, created);
        Ok(id)
    }

    async fn list(&self, token: &str, limit: usize, cursor: Option<&str>) -> Result<Vec<Post>> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.cursors).push(cursor.map(str::to_string));
        round_trip(token).await?;
        if self.inner.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let after = match cursor {
            Some(c) => Some(decode_cursor(c).ok_or_else(|| Error::Gateway {
                status: 400,
                message: "invalid cursor".to_string(),
            })?),
            None => None,
        };
        Ok(lock(&self.inner.posts)
            .iter()
            .filter(|p| after.is_none_or(|pos| (p.created_at, p.id) < pos))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, token: &str, id: Uuid) -> Result<Post> {
        round_trip(token).await?;
        lock(&self.inner.posts)
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("post {id}")))
    }

    async fn update(&self, token: &str, post: &Post) -> Result<()> {
        round_trip(token).await?;
        if let Some(existing) = lock(&self.inner.posts).iter_mut().find(|p| p.id == post.id) {
            *existing = post.clone();
        }
        Ok(())
    }

    async fn delete(&self, token: &str, id: Uuid) -> Result<()> {
        round_trip(token).await?;
        lock(&self.inner.posts).retain(|p| p.id != id);
        Ok(())
    }

    async fn like(&self, token: &str, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.inner.like_calls.fetch_add(1, Ordering::SeqCst);
        round_trip(token).await?;
        self.set_like(user_id, post_id, true)
    }

    async fn unlike(&self, token: &str, user_id: Uuid, post_id: Uuid) -> Result<()> {
        self.inner.unlike_calls.fetch_add(1, Ordering::SeqCst);
        round_trip(token).await?;
        self.set_like(user_id, post_id, false)
    }

    async fn check_liked(&self, token: &str, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        self.inner.check_liked_calls.fetch_add(1, Ordering::SeqCst);
        round_trip(token).await?;
        Ok(lock(&self.inner.likes).contains(&(user_id, post_id)))
    }

    async fn likes(&self, token: &str, post_id: Uuid) -> Result<Vec<User>> {
        round_trip(token).await?;
        let likers: Vec<Uuid> = lock(&self.inner.likes)
            .iter()
            .filter(|(_, p)| *p == post_id)
            .map(|(u, _)| *u)
            .collect();
        let users = lock(&self.inner.users);
        Ok(likers.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}
