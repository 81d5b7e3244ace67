//! Session lifecycle: token persistence, identity and proactive refresh
//!
//! `SessionManager` owns the bearer token. It restores a persisted token at
//! startup, logs in and registers through the [`LoginGateway`], keeps the
//! authenticated [`User`] cached, and refreshes the token
//! [`REFRESH_LEAD_SECS`] before it expires. Every failure converges on
//! [`SessionManager::logout`], so a half-authenticated session is never
//! published.
//!
//! Each entry into a new session bumps a generation counter. Timers and
//! in-flight refreshes remember the generation they started under and are
//! discarded if the session moved on in the meantime.

pub mod clock;
pub mod timer;
pub mod token;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use crate::api::{LoginGateway, UserGateway};
use crate::auth::{CredentialStore, TOKEN_KEY};
use crate::error::{Error, Result};
use crate::models::{Credentials, Profile, User};

pub use clock::{Clock, SystemClock};
pub use timer::RefreshTimer;
pub use token::{Claims, REFRESH_LEAD_SECS, decode_token};

/// Where the session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Startup restore has not finished
    #[default]
    Unknown,
    /// Valid token and identity
    Authenticated,
    /// No usable session
    Unauthenticated,
}

/// Snapshot of the session published to the UI
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    status: SessionStatus,
    identity: Option<User>,
    token: Option<String>,
}

impl Session {
    /// Current status
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Authenticated user, if any
    pub const fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    /// Bearer token to attach to requests
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether the session is usable
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// The acting user id and bearer token, when authenticated
    pub fn viewer(&self) -> Option<(Uuid, &str)> {
        if !self.is_authenticated() {
            return None;
        }
        Some((self.identity.as_ref()?.id, self.token.as_deref()?))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("identity", &self.identity.as_ref().map(|u| &u.username))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

struct State {
    token: Option<String>,
    claims: Option<Claims>,
    identity: Option<User>,
    status: SessionStatus,
    timer: Option<RefreshTimer>,
    generation: u64,
}

impl State {
    fn snapshot(&self) -> Session {
        Session {
            status: self.status,
            identity: self.identity.clone(),
            token: self.token.clone(),
        }
    }
}

struct Inner<G, S, C> {
    gateway: G,
    store: S,
    clock: C,
    state: Mutex<State>,
    published: watch::Sender<Session>,
    auth_in_flight: AtomicBool,
}

/// Resets an in-flight flag when the operation ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool, what: &'static str) -> Result<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            tracing::debug!("{} skipped: another one is running", what);
            return Err(Error::Busy(what));
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the authentication token and the identity it belongs to
pub struct SessionManager<G, S, C = SystemClock> {
    inner: Arc<Inner<G, S, C>>,
}

impl<G, S, C> Clone for SessionManager<G, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, S> SessionManager<G, S>
where
    G: LoginGateway + UserGateway,
    S: CredentialStore,
{
    /// Create a manager using the system clock
    pub fn new(gateway: G, store: S) -> Self {
        Self::with_clock(gateway, store, SystemClock)
    }
}

impl<G, S, C> SessionManager<G, S, C>
where
    G: LoginGateway + UserGateway,
    S: CredentialStore,
    C: Clock,
{
    /// Create a manager with an explicit clock
    pub fn with_clock(gateway: G, store: S, clock: C) -> Self {
        let state = State {
            token: None,
            claims: None,
            identity: None,
            status: SessionStatus::Unknown,
            timer: None,
            generation: 0,
        };
        let (published, _) = watch::channel(state.snapshot());

        Self {
            inner: Arc::new(Inner {
                gateway,
                store,
                clock,
                state: Mutex::new(state),
                published,
                auth_in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Receive every published session snapshot
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.published.subscribe()
    }

    /// Latest published snapshot
    pub fn current(&self) -> Session {
        self.inner.published.borrow().clone()
    }

    /// Latest published status
    pub fn status(&self) -> SessionStatus {
        self.inner.published.borrow().status
    }

    /// Whether an auth operation (restore, login, register) is running
    pub fn is_loading(&self) -> bool {
        self.inner.auth_in_flight.load(Ordering::Acquire)
    }

    /// Restore the persisted session at startup.
    ///
    /// Ends `Authenticated` only if a stored token decodes, has not expired
    /// and resolves to a user; anything else logs out.
    pub async fn initialize(&self) -> SessionStatus {
        let Ok(_guard) = InFlight::begin(&self.inner.auth_in_flight, "session restore") else {
            return self.status();
        };

        match self.restore().await {
            Ok(user) => tracing::info!("Restored session for @{}", user.username),
            Err(e) => {
                tracing::info!("No session restored: {}", e);
                self.logout().await;
            }
        }

        self.status()
    }

    async fn restore(&self) -> Result<User> {
        let token = self
            .inner
            .store
            .get_item(TOKEN_KEY)?
            .ok_or(Error::Unauthenticated)?;
        self.establish(token, false).await
    }

    /// Log in with username and password
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        let _guard = InFlight::begin(&self.inner.auth_in_flight, "login")?;

        let result = async {
            credentials.validate()?;
            let token = self.inner.gateway.login(credentials).await?;
            self.establish(token, true).await
        }
        .await;

        self.settle("Login", result).await
    }

    /// Create an account and log into it
    pub async fn register(&self, profile: &Profile) -> Result<User> {
        let _guard = InFlight::begin(&self.inner.auth_in_flight, "registration")?;

        let result = async {
            profile.validate()?;
            let token = self.inner.gateway.register(profile).await?;
            self.establish(token, true).await
        }
        .await;

        self.settle("Registration", result).await
    }

    async fn settle(&self, what: &str, result: Result<User>) -> Result<User> {
        match result {
            Ok(user) => {
                tracing::info!("{} succeeded for @{}", what, user.username);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", what, e);
                self.logout().await;
                Err(e)
            }
        }
    }

    /// Persist, validate and adopt a freshly issued (or restored) token
    async fn establish(&self, token: String, persist: bool) -> Result<User> {
        if persist {
            self.inner.store.set_item(TOKEN_KEY, &token)?;
        }
        let claims = self.validate(&token)?;
        let identity = self.fetch_identity(&token).await?;

        let mut state = self.inner.state.lock().await;
        self.adopt(&mut state, token, claims, identity.clone());
        Ok(identity)
    }

    /// Drop the session: persisted token, cached identity and pending timer.
    ///
    /// Safe to call when already logged out.
    pub async fn logout(&self) {
        let mut state = self.inner.state.lock().await;
        self.clear(&mut state);
    }

    /// Arm the refresh timer for `token`, replacing any pending one.
    ///
    /// Returns whether a timer was armed; tokens already inside the refresh
    /// window (or undecodable) arm nothing.
    pub async fn schedule_refresh(&self, token: &str) -> bool {
        let Some(claims) = decode_token(token) else {
            tracing::debug!("Not scheduling refresh: token does not decode");
            return false;
        };
        let mut state = self.inner.state.lock().await;
        self.arm_refresh(&mut state, token, &claims)
    }

    /// Exchange `token` for a new one.
    ///
    /// Failure is terminal: the session is logged out and the error is
    /// returned as [`Error::RefreshFailed`]. A result that arrives after the
    /// session changed is discarded.
    pub async fn refresh(&self, token: &str) -> Result<()> {
        let generation = self.inner.state.lock().await.generation;

        match self.exchange(token).await {
            Ok((new_token, claims, identity)) => {
                let mut state = self.inner.state.lock().await;
                if state.generation != generation {
                    tracing::debug!("Session changed during refresh, discarding new token");
                    return Ok(());
                }
                if let Err(e) = self.inner.store.set_item(TOKEN_KEY, &new_token) {
                    tracing::warn!("Could not persist refreshed token: {}", e);
                    self.clear(&mut state);
                    return Err(Error::RefreshFailed(e.to_string()));
                }
                self.adopt(&mut state, new_token, claims, identity);
                tracing::info!("Session token refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                let mut state = self.inner.state.lock().await;
                if state.generation == generation {
                    self.clear(&mut state);
                }
                Err(Error::RefreshFailed(e.to_string()))
            }
        }
    }

    async fn exchange(&self, token: &str) -> Result<(String, Claims, User)> {
        let new_token = self.inner.gateway.refresh_token(token).await?;
        let claims = self.validate(&new_token)?;

        let cached = self.inner.state.lock().await.identity.clone();
        let identity = match cached {
            Some(user) if user.id == claims.subject_id => user,
            _ => self.fetch_identity(&new_token).await?,
        };

        Ok((new_token, claims, identity))
    }

    /// Refresh now if the token is inside the refresh window.
    ///
    /// Returns whether a refresh happened. An expired token logs out.
    pub async fn refresh_session_if_needed(&self) -> Result<bool> {
        let (token, claims, generation) = {
            let state = self.inner.state.lock().await;
            match (&state.token, state.claims) {
                (Some(token), Some(claims)) => (token.clone(), claims, state.generation),
                _ => return Err(Error::Unauthenticated),
            }
        };

        let now = self.inner.clock.now();
        if claims.is_expired(now) {
            tracing::info!("Session token expired");
            let mut state = self.inner.state.lock().await;
            if state.generation == generation {
                self.clear(&mut state);
            }
            return Err(Error::InvalidToken);
        }
        if !claims.needs_refresh(now) {
            return Ok(false);
        }

        self.refresh(&token).await?;
        Ok(true)
    }

    /// Resolve the user a token belongs to
    pub async fn fetch_identity(&self, token: &str) -> Result<User> {
        let claims = decode_token(token).ok_or(Error::InvalidToken)?;
        self.inner
            .gateway
            .get_by_id(token, claims.subject_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", claims.subject_id)))
    }

    /// Replace the cached identity after a profile edit.
    ///
    /// Ignored unless authenticated as that same user.
    pub async fn set_identity(&self, user: User) -> bool {
        let mut state = self.inner.state.lock().await;
        let same_subject = state.claims.is_some_and(|c| c.subject_id == user.id);
        if state.status != SessionStatus::Authenticated || !same_subject {
            return false;
        }
        state.identity = Some(user);
        self.publish(&state);
        true
    }

    /// Unix time the pending refresh fires at
    pub async fn refresh_due_at(&self) -> Option<i64> {
        let state = self.inner.state.lock().await;
        state
            .timer
            .as_ref()
            .filter(|t| t.is_pending())
            .map(RefreshTimer::due_at)
    }

    /// Number of refresh timers still waiting to fire (0 or 1)
    pub async fn pending_refreshes(&self) -> usize {
        let state = self.inner.state.lock().await;
        state.timer.iter().filter(|t| t.is_pending()).count()
    }

    fn validate(&self, token: &str) -> Result<Claims> {
        let claims = decode_token(token).ok_or(Error::InvalidToken)?;
        if claims.is_expired(self.inner.clock.now()) {
            return Err(Error::InvalidToken);
        }
        Ok(claims)
    }

    fn adopt(&self, state: &mut State, token: String, claims: Claims, identity: User) {
        state.generation += 1;
        self.arm_refresh(state, &token, &claims);
        state.token = Some(token);
        state.claims = Some(claims);
        state.identity = Some(identity);
        state.status = SessionStatus::Authenticated;
        self.publish(state);
    }

    fn clear(&self, state: &mut State) {
        if let Err(e) = self.inner.store.delete_item(TOKEN_KEY) {
            tracing::warn!("Could not remove stored token: {}", e);
        }
        if let Some(timer) = state.timer.take() {
            timer.cancel();
        }
        let was = state.status;
        state.generation += 1;
        state.token = None;
        state.claims = None;
        state.identity = None;
        state.status = SessionStatus::Unauthenticated;
        self.publish(state);
        if was == SessionStatus::Authenticated {
            tracing::info!("Logged out");
        }
    }

    fn publish(&self, state: &State) {
        self.inner.published.send_replace(state.snapshot());
    }

    fn arm_refresh(&self, state: &mut State, token: &str, claims: &Claims) -> bool {
        if let Some(previous) = state.timer.take() {
            tracing::debug!("Cancelling pending refresh due at {}", previous.due_at());
            previous.cancel();
        }

        let Some(delay) = claims.refresh_delay(self.inner.clock.now()) else {
            tracing::debug!("Token expires within the refresh lead time, no timer armed");
            return false;
        };

        let generation = state.generation;
        let due_at = claims.expires_at - REFRESH_LEAD_SECS;
        let weak = Arc::downgrade(&self.inner);
        let token = token.to_string();

        state.timer = Some(RefreshTimer::arm(delay, due_at, async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = SessionManager { inner };
            // Off the timer task: the refresh re-arms (and so aborts) this one
            tokio::spawn(async move {
                manager.on_timer(generation, token).await;
            });
        }));
        tracing::debug!("Refresh scheduled in {}s", delay.as_secs());
        true
    }

    async fn on_timer(&self, generation: u64, token: String) {
        {
            let state = self.inner.state.lock().await;
            if state.generation != generation || state.token.as_deref() != Some(token.as_str()) {
                tracing::debug!("Ignoring refresh timer from a superseded session");
                return;
            }
        }

        tracing::debug!("Refresh timer fired");
        if let Err(e) = self.refresh(&token).await {
            tracing::warn!("Scheduled refresh failed: {}", e);
        }
    }
}
