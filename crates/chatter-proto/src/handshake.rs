//! WebSocket handshake helpers.
//!
//! Clients announce who they are with a `userId` query parameter on the
//! upgrade request. The parameter is optional: anonymous connections are
//! accepted but never appear in presence.

use crate::ids::UserId;

/// Query parameter carrying the connecting user's identity.
pub const IDENTITY_PARAM: &str = "userId";

/// Extract the identity from a request query string (without the leading `?`).
///
/// Returns `None` when the parameter is absent, empty, or not valid
/// percent-encoded UTF-8.
pub fn identity_from_query(query: Option<&str>) -> Option<UserId> {
    let query = query?;
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => (pair, ""),
        };
        if key != IDENTITY_PARAM {
            continue;
        }
        let decoded = urlencoding::decode(value).ok()?;
        let trimmed = decoded.trim();
        if trimmed.is_empty() || trimmed == "undefined" || trimmed == "null" {
            return None;
        }
        return Some(UserId::from(trimmed));
    }
    None
}

/// Extract the identity from a request path-and-query such as `/?userId=u1`.
pub fn identity_from_uri(path_and_query: &str) -> Option<UserId> {
    identity_from_query(path_and_query.split_once('?').map(|(_, q)| q))
}

/// Check an `Origin` header against an allow-list.
///
/// An empty list, or a list containing `*`, allows every origin including a
/// missing one. Otherwise the origin must be present and listed exactly.
pub fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    if allowed.is_empty() || allowed.iter().any(|a| a == "*") {
        return true;
    }
    match origin {
        Some(origin) => allowed.iter().any(|a| a == origin),
        None => false,
    }
}
