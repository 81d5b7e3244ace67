//! # ynet
//!
//! Client core for the y-net photo sharing network.
//!
//! ## Overview
//!
//! ynet holds the state a y-net client needs between screens: who is logged
//! in, the token that proves it, and the feed the user is scrolling through.
//! The UI layer drives it and renders the snapshots it publishes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI / CLI                             │
//! │      Drives the core and renders its watch snapshots        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┴───────────────────┐
//!          ▼                                       ▼
//! ┌─────────────────┐                     ┌─────────────────┐
//! │ SessionManager  │ ── session watch ─▶ │  FeedReconciler │
//! │                 │                     │                 │
//! │ • Login/Logout  │                     │ • Pagination    │
//! │ • JWT decode    │                     │ • Like state    │
//! │ • Refresh timer │                     │ • Delete        │
//! └─────────────────┘                     └─────────────────┘
//!          │                                       │
//!          └───────────────────┬───────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Config      │ │       API       │ │      Auth       │
//! │                 │ │                 │ │                 │
//! │ • Load/Save     │ │ • Gateways      │ │ • Encrypted     │
//! │ • API endpoint  │ │ • reqwest impl  │ │   token store   │
//! │ • Timeouts      │ │ • Bearer/call   │ │ • Memory store  │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Gateway traits and the HTTP client implementing them
//! - [`auth`] — Secure storage for the session token
//! - [`config`] — Configuration management
//! - [`feed`] — Paginated feed and like reconciliation
//! - [`models`] — Data models (User, Post, Comment, Credentials)
//! - [`session`] — Session state machine and token refresh
//!
//! ## Example
//!
//! ```no_run
//! use ynet::{ApiClient, Config, Credentials, FeedReconciler, SessionManager};
//! use ynet::auth::EncryptedFileStore;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let client = ApiClient::from_config(&config)?;
//! let session = SessionManager::new(client.clone(), EncryptedFileStore::open()?);
//!
//! session.initialize().await;
//! session.login(&Credentials::new("ana", "secret1")).await?;
//!
//! let feed = FeedReconciler::new(client, session.subscribe());
//! feed.initial_load(config.feed_page_size).await?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/ynet/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::similar_names)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod paths;
pub mod session;

#[cfg(test)]
#[allow(missing_docs)]
mod testutil;

// Re-export main types for convenience
pub use api::ApiClient;
pub use config::Config;
pub use error::{Error, Result};
pub use feed::{FeedReconciler, FeedState, LoadOutcome};
pub use models::{Comment, Credentials, Post, Profile, User};
pub use session::{Session, SessionManager, SessionStatus};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
