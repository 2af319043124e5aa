//! Session history storage contract.
//!
//! A session store keeps one ordered, bounded message buffer per
//! [`SessionId`]. It exposes two access styles:
//!
//! - the *active session* style (`select` / `load` / `append`), where a single
//!   session is targeted until another one is selected;
//! - the *explicit id* style (`open` / `load_session` / `append_session`),
//!   used by the coordinator so concurrent requests for different sessions
//!   never race on the active pointer.
//!
//! Both styles operate on the same buffers.

use crate::error::MemoryError;
use crate::message::Message;
use std::fmt;
use std::num::NonZeroUsize;

/// Validated identifier of one conversation.
///
/// Ids are opaque to the store; the only rules are that they are not blank,
/// fit in [`SessionId::MAX_LENGTH`] bytes and contain no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

/// Reasons a session id can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidSessionId {
    /// Id is empty or only whitespace.
    Empty,
    /// Id exceeds the maximum length.
    TooLong(usize),
    /// Id contains control characters.
    ControlChars,
}

impl fmt::Display for InvalidSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidSessionId::Empty => write!(f, "Session id cannot be empty"),
            InvalidSessionId::TooLong(len) => write!(
                f,
                "Session id too long: {} bytes (max {})",
                len,
                SessionId::MAX_LENGTH
            ),
            InvalidSessionId::ControlChars => {
                write!(f, "Session id contains control characters")
            }
        }
    }
}

impl std::error::Error for InvalidSessionId {}

impl SessionId {
    /// Maximum allowed length in bytes.
    pub const MAX_LENGTH: usize = 4096;

    /// Validate and wrap a session id.
    ///
    /// ```rust
    /// use parley_core::memory::SessionId;
    ///
    /// let id = SessionId::new("user-42").unwrap();
    /// assert_eq!(id.as_str(), "user-42");
    /// assert!(SessionId::new("   ").is_err());
    /// ```
    pub fn new(id: &str) -> Result<Self, InvalidSessionId> {
        if id.trim().is_empty() {
            return Err(InvalidSessionId::Empty);
        }
        if id.len() > Self::MAX_LENGTH {
            return Err(InvalidSessionId::TooLong(id.len()));
        }
        if id.chars().any(char::is_control) {
            return Err(InvalidSessionId::ControlChars);
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// The `"default"` session.
impl Default for SessionId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for SessionId {
    type Error = InvalidSessionId;

    fn try_from(id: &str) -> Result<Self, Self::Error> {
        SessionId::new(id)
    }
}

impl TryFrom<String> for SessionId {
    type Error = InvalidSessionId;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        SessionId::new(&id)
    }
}

/// Window selection for [`SessionStore::load`].
///
/// `offset` counts back from the newest message: offset 0 is the most
/// recent window, offset 2 skips the two newest messages. A missing `limit`
/// returns everything older than the offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl LoadOptions {
    /// Whole buffer, oldest to newest.
    pub fn all() -> Self {
        Self::default()
    }

    /// The `limit` most recent messages.
    pub fn latest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Resolve the window against a buffer of `len` messages.
    ///
    /// Returns the half-open index range `start..end` counted from the oldest
    /// message. Out-of-range values clamp to an empty or shorter window.
    pub fn window(&self, len: usize) -> std::ops::Range<usize> {
        let end = len - self.offset.min(len);
        let start = match self.limit {
            Some(limit) => end - limit.min(end),
            None => 0,
        };
        start..end
    }
}

/// Bounded per-session message storage.
///
/// Implementations must evict strictly oldest-first once a buffer exceeds
/// [`SessionStore::capacity`], keep survivors in their original order, and
/// protect each session buffer independently so concurrent loads and appends
/// on the same id cannot lose or reorder entries.
pub trait SessionStore: Send + Sync {
    /// Maximum number of messages kept per session.
    fn capacity(&self) -> NonZeroUsize;

    /// Ensure a buffer exists for `id` without changing the active session.
    fn open(&self, id: &SessionId) -> Result<(), MemoryError>;

    /// Make `id` the active session, creating an empty buffer on first use.
    ///
    /// Selecting an existing session never clears it.
    fn select(&self, id: &SessionId) -> Result<(), MemoryError>;

    /// Currently active session, if any.
    fn active_session(&self) -> Option<SessionId>;

    /// Read a window of the given session. Unknown ids yield an empty list.
    fn load_session(&self, id: &SessionId, options: LoadOptions)
    -> Result<Vec<Message>, MemoryError>;

    /// Append to the given session, evicting the oldest entries on overflow.
    fn append_session(&self, id: &SessionId, messages: Vec<Message>) -> Result<(), MemoryError>;

    /// Read a window of the active session.
    ///
    /// Returns an empty list when no session has been selected.
    fn load(&self, options: LoadOptions) -> Result<Vec<Message>, MemoryError> {
        match self.active_session() {
            Some(id) => self.load_session(&id, options),
            None => Ok(Vec::new()),
        }
    }

    /// Append to the active session.
    ///
    /// Fails with [`MemoryError::SessionNotSelected`] when no session is
    /// active. Appending an empty list succeeds without side effects.
    fn append(&self, messages: Vec<Message>) -> Result<(), MemoryError> {
        let id = self
            .active_session()
            .ok_or(MemoryError::SessionNotSelected)?;
        self.append_session(&id, messages)
    }
}
