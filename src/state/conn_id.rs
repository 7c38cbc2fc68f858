//! Connection handle generation.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, server-assigned identifier for one live connection.
///
/// Format: node id (3 chars) + counter (at least 6 chars base36).
/// Example: "0RTAAAAAB"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(Arc<str>);

impl ConnId {
    /// Borrow the handle text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ConnId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

/// Generates connection handles. Handles are never reused within a process.
pub struct ConnIdGenerator {
    node_id: String,
    counter: AtomicU64,
}

impl ConnIdGenerator {
    /// Create a new generator for the given node id.
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Generate the next unique handle.
    pub fn next(&self) -> ConnId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        ConnId(Arc::from(format!("{}{}", self.node_id, base36_encode(n))))
    }
}

/// Encode a number as base36, zero-padded (with `A`) to at least 6 characters.
fn base36_encode(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const MIN_WIDTH: usize = 6;
    let mut digits = Vec::with_capacity(13);

    while n > 0 || digits.len() < MIN_WIDTH {
        digits.push(CHARS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}
