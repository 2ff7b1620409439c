use crate::auth::{self, CredentialMode};
use crate::config::DriveConfig;
use crate::drive::DriveStore;
use crate::store::{DocumentStore, MARKDOWN_MIME_TYPE};
use chrono::{Local, NaiveDate};
use follow_core::{
    document_name, parse_transcript, render, FollowError, FollowResult, Message, SessionRecord,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Lifecycle of a [`StoreClient`].
///
/// A client only exists once authentication has succeeded; a failed
/// [`StoreClient::authenticate`] returns an error and no client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Credentials accepted, target folder not looked up yet.
    Authenticated,
    /// Target folder id is known and cached.
    FolderResolved,
}

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Writes session transcripts as Markdown files into one remote folder.
///
/// The folder id is resolved once and cached for the lifetime of the
/// client. Writes to the same file name are serialized so the
/// lookup-then-create sequence cannot produce duplicates within a process.
pub struct StoreClient {
    store: Arc<dyn DocumentStore>,
    folder_name: String,
    folder_id: OnceCell<String>,
    file_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    today: Today,
}

impl StoreClient {
    /// Wraps an already-authenticated store, targeting the default folder.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_folder_name(store, crate::config::DEFAULT_FOLDER_NAME)
    }

    /// Wraps a store, targeting a custom folder name.
    pub fn with_folder_name(store: Arc<dyn DocumentStore>, folder_name: impl Into<String>) -> Self {
        Self {
            store,
            folder_name: folder_name.into(),
            folder_id: OnceCell::new(),
            file_locks: Mutex::new(HashMap::new()),
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Authenticates against Google Drive and returns a ready client.
    ///
    /// Fails with [`FollowError::Auth`] when the credential file is missing,
    /// malformed, or rejected. A failed client is never returned.
    pub async fn authenticate(
        credentials_path: impl AsRef<Path>,
        mode: CredentialMode,
        config: &DriveConfig,
    ) -> FollowResult<Self> {
        let http = reqwest::Client::new();
        let token = auth::authenticate(&http, credentials_path.as_ref(), mode)
            .await
            .inspect_err(|e| error!(error = %e, "Authentication failed"))?;
        let store = DriveStore::new(http, config, token);
        Ok(Self::with_folder_name(Arc::new(store), config.folder_name.clone()))
    }

    /// Replaces the clock used to date file names.
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn state(&self) -> ClientState {
        if self.folder_id.initialized() {
            ClientState::FolderResolved
        } else {
            ClientState::Authenticated
        }
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// Returns the id of the target folder, creating the folder if needed.
    ///
    /// The first successful result is cached and never re-queried, even if
    /// the folder is later removed remotely. Concurrent first callers wait
    /// on a single lookup.
    pub async fn resolve_follow_folder(&self) -> FollowResult<String> {
        let id = self
            .folder_id
            .get_or_try_init(|| async {
                let name = self.folder_name.as_str();
                match self.store.find_folder(name).await? {
                    Some(folder) => {
                        info!(folder_id = %folder.id, folder = %name, "Found existing folder");
                        Ok(folder.id)
                    }
                    None => {
                        let folder = self.store.create_folder(name).await?;
                        info!(folder_id = %folder.id, folder = %name, "Created new folder");
                        Ok::<_, FollowError>(folder.id)
                    }
                }
            })
            .await
            .inspect_err(|e| error!(error = %e, "Error finding/creating folder"))?;
        Ok(id.clone())
    }

    /// Logs a session, reporting remote failures as `Ok(None)`.
    ///
    /// Remote query and write errors are logged and swallowed; any other
    /// error is returned.
    pub async fn log_session(&self, session: &SessionRecord) -> FollowResult<Option<String>> {
        recover(self.try_log_session(session).await, "Error logging session")
    }

    /// Creates or overwrites today's document for `session`.
    ///
    /// The file name uses the current date, not `session.date`, so a
    /// session logged again after midnight lands in a new file.
    pub async fn try_log_session(&self, session: &SessionRecord) -> FollowResult<String> {
        let folder_id = self.resolve_follow_folder().await?;
        let filename = session.document_name((self.today)());
        let content = render(session);

        let entry = self.file_lock(&filename);
        let _guard = entry.lock.lock().await;
        self.upsert(&folder_id, &filename, content).await
    }

    /// Appends one message to today's document for `session_id`.
    ///
    /// Reports remote failures as `Ok(None)` like [`Self::log_session`].
    pub async fn append_to_session(
        &self,
        session_id: &str,
        message: Message,
    ) -> FollowResult<Option<String>> {
        recover(
            self.try_append_to_session(session_id, message).await,
            "Error appending to session",
        )
    }

    /// Downloads today's document, appends `message`, and writes it back.
    ///
    /// The existing header and feedback are kept. Without an existing
    /// document a new one is started, dated today.
    pub async fn try_append_to_session(
        &self,
        session_id: &str,
        message: Message,
    ) -> FollowResult<String> {
        let folder_id = self.resolve_follow_folder().await?;
        let today = (self.today)();
        let filename = document_name(today, session_id);

        let entry = self.file_lock(&filename);
        let _guard = entry.lock.lock().await;
        self.append_locked(&folder_id, &filename, session_id, today, message)
            .await
    }

    async fn append_locked(
        &self,
        folder_id: &str,
        filename: &str,
        session_id: &str,
        today: NaiveDate,
        message: Message,
    ) -> FollowResult<String> {
        match self.store.find_file(filename, folder_id).await? {
            Some(existing) => {
                let bytes = self.store.download_file(&existing.id).await?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| FollowError::Parse(format!("{filename} is not UTF-8: {e}")))?;
                let mut record = parse_transcript(&text)?;
                record.push(message);

                self.store
                    .update_file(&existing.id, MARKDOWN_MIME_TYPE, render(&record).into_bytes())
                    .await?;
                info!(file_id = %existing.id, filename = %filename, messages = record.messages.len(), "Appended to file");
                Ok(existing.id)
            }
            None => {
                let mut record = SessionRecord::new(session_id);
                record.date = Some(today.format("%Y-%m-%d").to_string());
                record.push(message);

                let file = self
                    .store
                    .create_file(
                        filename,
                        folder_id,
                        MARKDOWN_MIME_TYPE,
                        render(&record).into_bytes(),
                    )
                    .await?;
                info!(file_id = %file.id, filename = %filename, "Created file");
                Ok(file.id)
            }
        }
    }

    async fn upsert(&self, folder_id: &str, filename: &str, content: String) -> FollowResult<String> {
        match self.store.find_file(filename, folder_id).await? {
            Some(existing) => {
                self.store
                    .update_file(&existing.id, MARKDOWN_MIME_TYPE, content.into_bytes())
                    .await?;
                info!(file_id = %existing.id, filename = %filename, "Updated file");
                Ok(existing.id)
            }
            None => {
                let file = self
                    .store
                    .create_file(filename, folder_id, MARKDOWN_MIME_TYPE, content.into_bytes())
                    .await?;
                info!(file_id = %file.id, filename = %filename, "Created file");
                Ok(file.id)
            }
        }
    }

    fn file_lock(&self, filename: &str) -> FileLockEntry<'_> {
        let lock = self
            .file_locks
            .lock()
            .entry(filename.to_string())
            .or_default()
            .clone();
        FileLockEntry {
            locks: &self.file_locks,
            filename: filename.to_string(),
            lock,
        }
    }
}

/// A caller's share of a per-file lock.
///
/// Dropping it removes the map entry once no other caller shares it, so a
/// request abandoned mid-write (for example on timeout) leaves nothing behind.
struct FileLockEntry<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    filename: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for FileLockEntry<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // One reference is the map's, one is ours.
        if locks
            .get(&self.filename)
            .is_some_and(|lock| Arc::strong_count(lock) == 2)
        {
            locks.remove(&self.filename);
        }
    }
}

fn recover(result: FollowResult<String>, context: &str) -> FollowResult<Option<String>> {
    match result {
        Ok(id) => Ok(Some(id)),
        Err(e) if e.is_remote() => {
            error!(error = %e, "{context}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
