use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_core::{LoadOptions, MemoryError, Message, SessionId, SessionStore};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

type Buffer = Arc<RwLock<VecDeque<Message>>>;

/// Default number of messages retained per session.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Process-lifetime session store with a fixed-size window per session.
///
/// Each session owns a `VecDeque` behind its own `RwLock`, so traffic on one
/// session never blocks another and concurrent appends to the same session
/// are serialized without losing entries. When an append pushes a buffer
/// past capacity, the oldest messages are dropped until it fits.
///
/// Clones share the same underlying sessions.
///
/// # Example
///
/// ```rust
/// use parley_core::{LoadOptions, Message, SessionId, SessionStore};
/// use parley_memory::SlidingWindowMemory;
/// use std::num::NonZeroUsize;
///
/// let memory = SlidingWindowMemory::new(NonZeroUsize::new(2).unwrap());
/// memory.select(&SessionId::new("chat").unwrap()).unwrap();
/// memory
///     .append(vec![Message::user("a"), Message::user("b"), Message::user("c")])
///     .unwrap();
///
/// let history = memory.load(LoadOptions::all()).unwrap();
/// assert_eq!(history, vec![Message::user("b"), Message::user("c")]);
/// ```
#[derive(Clone)]
pub struct SlidingWindowMemory {
    capacity: NonZeroUsize,
    sessions: Arc<DashMap<SessionId, Buffer>>,
    active: Arc<RwLock<Option<SessionId>>>,
}

impl Default for SlidingWindowMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SlidingWindowMemory {
    /// Create an empty store keeping at most `capacity` messages per session.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            sessions: Arc::new(DashMap::new()),
            active: Arc::new(RwLock::new(None)),
        }
    }

    /// Number of messages currently stored for `id`.
    pub fn len(&self, id: &SessionId) -> usize {
        self.buffer(id)
            .map(|buffer| {
                buffer
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .len()
            })
            .unwrap_or(0)
    }

    /// Ids of every session opened so far, sorted.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    // Clone the buffer handle out so the map shard is not held while the
    // buffer lock is taken.
    fn buffer(&self, id: &SessionId) -> Option<Buffer> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

impl SessionStore for SlidingWindowMemory {
    fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    fn open(&self, id: &SessionId) -> Result<(), MemoryError> {
        if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
            slot.insert(Buffer::default());
            debug!(session = %id, "Created session buffer");
        }
        Ok(())
    }

    fn select(&self, id: &SessionId) -> Result<(), MemoryError> {
        self.open(id)?;
        let mut active = self
            .active
            .write()
            .map_err(|e| MemoryError::lock_poisoned(id.as_str(), e))?;
        *active = Some(id.clone());
        debug!(session = %id, "Selected session");
        Ok(())
    }

    fn active_session(&self) -> Option<SessionId> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn load_session(
        &self,
        id: &SessionId,
        options: LoadOptions,
    ) -> Result<Vec<Message>, MemoryError> {
        let Some(buffer) = self.buffer(id) else {
            return Ok(Vec::new());
        };
        let messages = buffer
            .read()
            .map_err(|e| MemoryError::lock_poisoned(id.as_str(), e))?;
        let window = options.window(messages.len());
        Ok(messages.range(window).cloned().collect())
    }

    fn append_session(&self, id: &SessionId, messages: Vec<Message>) -> Result<(), MemoryError> {
        let buffer = self.buffer(id).ok_or_else(|| MemoryError::UnknownSession {
            id: id.to_string(),
        })?;
        if messages.is_empty() {
            return Ok(());
        }

        let mut stored = buffer
            .write()
            .map_err(|e| MemoryError::lock_poisoned(id.as_str(), e))?;
        let appended = messages.len();
        stored.extend(messages);

        let overflow = stored.len().saturating_sub(self.capacity.get());
        if overflow > 0 {
            stored.drain(..overflow);
        }
        debug!(
            session = %id,
            appended,
            evicted = overflow,
            size = stored.len(),
            "Appended session messages"
        );
        Ok(())
    }
}
