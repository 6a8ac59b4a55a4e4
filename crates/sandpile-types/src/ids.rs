//! Type-safe identifier wrappers around [`Uuid`].
//!
//! A session is the only entity that needs a globally unique identity: it
//! ties an export bundle back to the run that produced it. Avalanches are
//! identified by their position in the session's append-only log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one simulation session.
///
/// Uses UUID v7 (time-ordered) so exports sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
