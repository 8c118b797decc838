//! Common type aliases and time helpers.
//!
//! Query identifiers are caller-supplied opaque strings; when the caller
//! omits one we mint a UUIDv7, which sorts by creation time. Store, session,
//! customer and call identifiers are likewise opaque strings owned by the
//! caller.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type QueryId = String;
pub type CallId = String;
pub type StoreId = String;
pub type CustomerId = String;

/// Mint a server-side query id. UUIDv7 so ids are unique and monotonically
/// sortable by creation time.
pub fn new_query_id() -> QueryId {
    Uuid::now_v7().to_string()
}

/// Mint a call id for an llm_call event that arrived without one.
pub fn new_call_id() -> CallId {
    Uuid::new_v4().to_string()
}

/// Floor a timestamp to its epoch-hour bucket.
pub fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp() - ts.timestamp().rem_euclid(3600);
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(ts)
}

/// Abbreviate an id to its first 8 characters for readable logs.
pub fn abbrev(id: &str) -> &str {
    let end = id.char_indices().nth(8).map_or(id.len(), |(i, _)| i);
    &id[..end]
}
