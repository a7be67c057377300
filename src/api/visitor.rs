//! Anonymous visitor identification
//!
//! The pending-redirect marker is keyed by an opaque cookie value. Nothing
//! else about the visitor is tracked.

use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};
use uuid::Uuid;

pub const VISITOR_COOKIE: &str = "halk_visitor";

/// Visitor ID from the request's `Cookie` header, if present
pub fn from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == VISITOR_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Existing visitor ID, or a fresh one plus the `Set-Cookie` value to send back
pub fn resolve(headers: &HeaderMap) -> (String, Option<HeaderValue>) {
    if let Some(visitor_id) = from_headers(headers) {
        return (visitor_id, None);
    }

    let visitor_id = Uuid::new_v4().to_string();
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        VISITOR_COOKIE, visitor_id
    );
    // A UUID-based cookie is always a valid header value
    let header = HeaderValue::from_str(&cookie).ok();
    (visitor_id, header)
}
