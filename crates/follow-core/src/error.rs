/// Top-level error type for the follow crates.
///
/// The two `Remote*` variants are recoverable at the operation boundary;
/// [`FollowError::Auth`] is fatal to the client that produced it.
#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    /// Credentials are missing, malformed, or were rejected by the store.
    #[error("Auth error: {0}")]
    Auth(String),

    /// A search, list or download call against the remote store failed.
    #[error("Remote query error: {0}")]
    RemoteQuery(String),

    /// A create or update call against the remote store failed.
    #[error("Remote write error: {0}")]
    RemoteWrite(String),

    /// A stored Markdown transcript could not be read back.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FollowError {
    /// Returns true for failures reported by the remote store itself.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteQuery(_) | Self::RemoteWrite(_))
    }
}

/// A convenience `Result` alias using [`FollowError`].
pub type FollowResult<T> = Result<T, FollowError>;
