/// All errors that can occur in this crate.
///
/// Backend failures and bad payloads are distinct variants so that callers
/// can tell "the backend is down" apart from "the stored data is bad" and
/// pick a recovery strategy per class.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The storage backend reported an I/O or connection failure.
    /// The operation that triggered it left the in-memory record unchanged,
    /// so the caller may retry.
    #[error("session storage backend error: {0}")]
    Storage(anyhow::Error),

    /// The session record could not be encoded for storage.
    #[error("session record could not be encoded: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The backend returned a payload that does not decode into a session
    /// record. This is never silently recovered into an empty session; the
    /// caller decides whether to discard the identifier and start fresh.
    #[error("corrupt session payload for identifier {id}: {source}")]
    CorruptSession {
        /// The identifier whose payload failed to decode.
        id: String,
        /// The decode failure.
        source: serde_json::Error,
    },
}

/// A malformed configuration value.
///
/// Configuration mistakes are programmer errors, so construction fails fast:
/// [`SessionStore::new`](crate::SessionStore::new) panics with this as the
/// message instead of returning it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed key lookup {lookup:?}: expected \"source:name\" with source one of \"cookie\", \"header\" or \"query\"")]
pub struct ConfigError {
    pub(crate) lookup: String,
}
