//! Opaque pagination cursor
//!
//! A cursor names the last post of the previous page as
//! `base64("<createdAt RFC3339>,<id>")`. The backend orders by
//! `created_at DESC, id DESC` and resumes strictly after that pair.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::models::Post;

/// Timestamp form used inside cursors: RFC3339 in UTC, fraction only as
/// precise as needed
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Cursor pointing just past `post`
pub fn encode_cursor(post: &Post) -> String {
    encode_position(post.created_at, post.id)
}

/// Cursor for an explicit `(createdAt, id)` position
pub fn encode_position(created_at: DateTime<Utc>, id: Uuid) -> String {
    STANDARD.encode(format!("{},{}", format_timestamp(created_at), id))
}

/// Read a cursor back into its position
pub fn decode_cursor(cursor: &str) -> Option<(DateTime<Utc>, Uuid)> {
    let bytes = STANDARD.decode(cursor).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (at, id) = text.split_once(',')?;
    let at = DateTime::parse_from_rfc3339(at).ok()?.with_timezone(&Utc);
    let id = Uuid::parse_str(id).ok()?;
    Some((at, id))
}
