//! Cursor-paginated feed with like reconciliation
//!
//! `FeedReconciler` keeps the posts loaded so far, in server order, and the
//! set of those posts the viewer has liked. Pages are appended strictly
//! after the current tail using a cursor derived from the last post. Like
//! state is re-read from the server for each new page and only changed
//! locally once the server has confirmed a like or unlike.

pub mod cursor;

use std::collections::HashSet;

use tokio::sync::watch;
use uuid::Uuid;

use crate::api::PostGateway;
use crate::error::{Error, Result};
use crate::models::Post;
use crate::session::Session;

pub use cursor::{decode_cursor, encode_cursor};

/// Everything the UI renders for the feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    /// Posts in server order, newest first
    pub items: Vec<Post>,
    /// Ids of loaded posts the viewer has liked
    pub liked: HashSet<Uuid>,
    /// Nothing further to page in until a reload
    pub no_more_posts: bool,
    /// First page in flight
    pub is_loading: bool,
    /// A follow-up page in flight
    pub is_loading_more: bool,
    /// The last page request failed (as opposed to running out of posts)
    pub last_load_failed: bool,
    /// Posts with a like or unlike awaiting confirmation
    pub pending_likes: HashSet<Uuid>,
}

impl FeedState {
    /// Whether any page request is in flight
    pub const fn is_busy(&self) -> bool {
        self.is_loading || self.is_loading_more
    }

    /// Whether the viewer has liked `post_id`
    pub fn is_liked(&self, post_id: Uuid) -> bool {
        self.liked.contains(&post_id)
    }

    /// Cursor for the page after the current tail
    pub fn next_cursor(&self) -> Option<String> {
        self.items.last().map(encode_cursor)
    }
}

/// What a page request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Not started: another load in flight, or nothing to load
    Skipped,
    /// This many posts were added
    Loaded(usize),
    /// The server had no more posts
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    First,
    More,
}

/// Feed list, pagination and like state for the current viewer
pub struct FeedReconciler<G> {
    gateway: G,
    session: watch::Receiver<Session>,
    state: watch::Sender<FeedState>,
}

impl<G: PostGateway> FeedReconciler<G> {
    /// Create an empty feed acting as whoever `session` says is logged in
    pub fn new(gateway: G, session: watch::Receiver<Session>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            gateway,
            session,
            state,
        }
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Copy of the current state
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Loaded posts
    pub fn items(&self) -> Vec<Post> {
        self.state.borrow().items.clone()
    }

    /// Whether the end of the feed was reached
    pub fn no_more_posts(&self) -> bool {
        self.state.borrow().no_more_posts
    }

    /// Whether the viewer has liked `post_id`
    pub fn is_liked(&self, post_id: Uuid) -> bool {
        self.state.borrow().is_liked(post_id)
    }

    /// Load the first page, replacing the list.
    ///
    /// A no-op while another page request is in flight.
    pub async fn initial_load(&self, page_size: usize) -> Result<LoadOutcome> {
        let started = self.state.send_if_modified(|s| {
            if s.is_busy() {
                return false;
            }
            s.is_loading = true;
            true
        });
        if !started {
            tracing::debug!("Initial load skipped: a load is already in flight");
            return Ok(LoadOutcome::Skipped);
        }

        self.fetch_page(LoadKind::First, page_size, None).await
    }

    /// Append the page after the current tail.
    ///
    /// A no-op while loading, before anything is loaded, or once the end of
    /// the feed was reached.
    pub async fn load_more(&self, page_size: usize) -> Result<LoadOutcome> {
        let mut cursor = None;
        let started = self.state.send_if_modified(|s| {
            if s.is_busy() || s.no_more_posts {
                return false;
            }
            let Some(next) = s.next_cursor() else {
                return false;
            };
            cursor = Some(next);
            s.is_loading_more = true;
            true
        });
        if !started {
            tracing::debug!("Load more skipped");
            return Ok(LoadOutcome::Skipped);
        }

        self.fetch_page(LoadKind::More, page_size, cursor).await
    }

    /// Forget everything loaded and start over from the first page
    pub async fn reload(&self, page_size: usize) -> Result<LoadOutcome> {
        let started = self.state.send_if_modified(|s| {
            if s.is_busy() {
                return false;
            }
            s.items.clear();
            s.liked.clear();
            s.no_more_posts = false;
            s.last_load_failed = false;
            s.is_loading = true;
            true
        });
        if !started {
            tracing::debug!("Reload skipped: a load is already in flight");
            return Ok(LoadOutcome::Skipped);
        }

        self.fetch_page(LoadKind::First, page_size, None).await
    }

    async fn fetch_page(
        &self,
        kind: LoadKind,
        page_size: usize,
        cursor: Option<String>,
    ) -> Result<LoadOutcome> {
        let result = match self.viewer() {
            Ok((_, token)) => self.gateway.list(&token, page_size, cursor.as_deref()).await,
            Err(e) => Err(e),
        };

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to load feed page: {}", e);
                self.state.send_modify(|s| {
                    if kind == LoadKind::First {
                        s.items.clear();
                        s.liked.clear();
                    }
                    s.is_loading = false;
                    s.is_loading_more = false;
                    s.no_more_posts = true;
                    s.last_load_failed = true;
                });
                return Err(e);
            }
        };

        if page.is_empty() {
            self.state.send_modify(|s| {
                if kind == LoadKind::First {
                    s.items.clear();
                    s.liked.clear();
                }
                s.is_loading = false;
                s.is_loading_more = false;
                s.no_more_posts = true;
                s.last_load_failed = false;
            });
            tracing::debug!("Feed exhausted");
            return Ok(LoadOutcome::Exhausted);
        }

        let count = page.len();
        self.state.send_modify(|s| {
            match kind {
                LoadKind::First => {
                    s.items = page.clone();
                    s.liked.clear();
                    s.no_more_posts = false;
                }
                LoadKind::More => s.items.extend(page.iter().cloned()),
            }
            s.is_loading = false;
            s.is_loading_more = false;
            s.last_load_failed = false;
        });
        tracing::debug!("Loaded {} posts", count);

        self.reconcile_likes(&page).await;
        Ok(LoadOutcome::Loaded(count))
    }

    /// Re-read like state for `posts` from the server.
    ///
    /// Posts whose check fails keep their current membership.
    pub async fn reconcile_likes(&self, posts: &[Post]) {
        let Ok((viewer, token)) = self.viewer() else {
            return;
        };

        for post in posts {
            match self.gateway.check_liked(&token, viewer, post.id).await {
                Ok(liked) => {
                    self.state.send_if_modified(|s| {
                        if s.pending_likes.contains(&post.id)
                            || !s.items.iter().any(|p| p.id == post.id)
                        {
                            return false;
                        }
                        if liked {
                            s.liked.insert(post.id)
                        } else {
                            s.liked.remove(&post.id)
                        }
                    });
                }
                Err(e) => tracing::warn!("Could not check like on {}: {}", post.id, e),
            }
        }
    }

    /// Put a post fetched outside the feed (e.g. a detail view) in the list
    /// so its like state can be reconciled and toggled.
    ///
    /// Returns false if the post is already tracked.
    pub fn track(&self, post: Post) -> bool {
        self.state.send_if_modified(|s| {
            if s.items.iter().any(|p| p.id == post.id) {
                return false;
            }
            s.items.push(post);
            true
        })
    }

    /// Like or unlike `post_id`, returning whether it is now liked.
    ///
    /// Only posts in the list can be toggled. Local state changes only after
    /// the server confirms.
    pub async fn toggle_like(&self, post_id: Uuid) -> Result<bool> {
        let (viewer, token) = self.viewer()?;

        let mut was_liked = false;
        let mut refused = None;
        self.state.send_if_modified(|s| {
            if !s.items.iter().any(|p| p.id == post_id) {
                refused = Some(Error::NotFound(format!("post {post_id}")));
                return false;
            }
            if !s.pending_likes.insert(post_id) {
                refused = Some(Error::Busy("like"));
                return false;
            }
            was_liked = s.liked.contains(&post_id);
            true
        });
        if let Some(err) = refused {
            return Err(err);
        }

        let result = if was_liked {
            self.gateway.unlike(&token, viewer, post_id).await
        } else {
            self.gateway.like(&token, viewer, post_id).await
        };

        self.state.send_modify(|s| {
            s.pending_likes.remove(&post_id);
            if result.is_err() {
                return;
            }
            let post = s.items.iter_mut().find(|p| p.id == post_id);
            if was_liked {
                s.liked.remove(&post_id);
                if let Some(post) = post {
                    post.like_count = post.like_count.saturating_sub(1);
                }
            } else {
                s.liked.insert(post_id);
                if let Some(post) = post {
                    post.like_count += 1;
                }
            }
        });

        match result {
            Ok(()) => Ok(!was_liked),
            Err(e) => {
                tracing::warn!("Like toggle on {} failed: {}", post_id, e);
                Err(e)
            }
        }
    }

    /// Delete a post on the server, then drop it from the list
    pub async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let (_, token) = self.viewer()?;
        self.gateway.delete(&token, post_id).await?;

        self.state.send_modify(|s| {
            s.items.retain(|p| p.id != post_id);
            s.liked.remove(&post_id);
        });
        tracing::info!("Deleted post {}", post_id);
        Ok(())
    }

    fn viewer(&self) -> Result<(Uuid, String)> {
        let session = self.session.borrow();
        session
            .viewer()
            .map(|(id, token)| (id, token.to_string()))
            .ok_or(Error::Unauthenticated)
    }
}
