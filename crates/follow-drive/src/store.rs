use async_trait::async_trait;
use follow_core::FollowResult;
use serde::{Deserialize, Serialize};

/// MIME type Drive uses to mark an entry as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type of uploaded session documents.
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";

/// A folder entry in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
}

/// A file entry in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Capabilities the session logger needs from a remote document store.
///
/// Lookups only ever see non-trashed entries and match names exactly.
/// Implementations report lookup and download failures as
/// [`follow_core::FollowError::RemoteQuery`] and create/update failures as
/// [`follow_core::FollowError::RemoteWrite`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Finds a folder by exact name anywhere in the store.
    async fn find_folder(&self, name: &str) -> FollowResult<Option<RemoteFolder>>;

    /// Creates a top-level folder.
    async fn create_folder(&self, name: &str) -> FollowResult<RemoteFolder>;

    /// Finds a direct child of `parent_id` by exact name.
    async fn find_file(&self, name: &str, parent_id: &str) -> FollowResult<Option<RemoteFile>>;

    /// Creates a file inside `parent_id` and uploads its content.
    async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> FollowResult<RemoteFile>;

    /// Replaces the content of an existing file. The id is unchanged.
    async fn update_file(
        &self,
        file_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> FollowResult<RemoteFile>;

    /// Downloads the raw content of a file.
    async fn download_file(&self, file_id: &str) -> FollowResult<Vec<u8>>;
}
