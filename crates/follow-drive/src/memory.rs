use crate::store::{DocumentStore, RemoteFile, RemoteFolder, FOLDER_MIME_TYPE};
use async_trait::async_trait;
use follow_core::{FollowError, FollowResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    name: String,
    parent: Option<String>,
    mime_type: String,
    content: Vec<u8>,
    trashed: bool,
}

/// In-process [`DocumentStore`].
///
/// Used for dry runs and tests. Failure switches make every query or every
/// write fail with the matching remote error.
pub struct MemoryStore {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    fail_queries: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_queries: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent lookup or download fail.
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent create or update fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Moves an entry to the trash. Returns false if the id is unknown.
    pub async fn trash(&self, id: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.trashed = true;
                true
            }
            None => false,
        }
    }

    /// Ids of all non-trashed folders with the given name.
    pub async fn folder_ids(&self, name: &str) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| !e.trashed && e.mime_type == FOLDER_MIME_TYPE && e.name == name)
            .map(|e| e.id.clone())
            .collect()
    }

    /// All non-trashed files with the given name, in creation order.
    pub async fn files_named(&self, name: &str) -> Vec<RemoteFile> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| !e.trashed && e.mime_type != FOLDER_MIME_TYPE && e.name == name)
            .map(|e| RemoteFile {
                id: e.id.clone(),
                name: e.name.clone(),
            })
            .collect()
    }

    /// Content of a file as UTF-8 text.
    pub async fn content(&self, id: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| String::from_utf8_lossy(&e.content).into_owned())
    }

    /// Parent folder id of an entry.
    pub async fn parent_of(&self, id: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.id == id)
            .and_then(|e| e.parent.clone())
    }

    fn next_id(&self) -> String {
        format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_query(&self) -> FollowResult<()> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(FollowError::RemoteQuery(
                "memory store: queries disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn check_write(&self) -> FollowResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FollowError::RemoteWrite(
                "memory store: writes disabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_folder(&self, name: &str) -> FollowResult<Option<RemoteFolder>> {
        self.check_query()?;
        // Let concurrent callers interleave between lookup and create.
        tokio::task::yield_now().await;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| !e.trashed && e.mime_type == FOLDER_MIME_TYPE && e.name == name)
            .map(|e| RemoteFolder {
                id: e.id.clone(),
                name: e.name.clone(),
            }))
    }

    async fn create_folder(&self, name: &str) -> FollowResult<RemoteFolder> {
        self.check_write()?;
        let id = self.next_id();
        self.entries.write().await.push(Entry {
            id: id.clone(),
            name: name.to_string(),
            parent: None,
            mime_type: FOLDER_MIME_TYPE.to_string(),
            content: Vec::new(),
            trashed: false,
        });
        Ok(RemoteFolder {
            id,
            name: name.to_string(),
        })
    }

    async fn find_file(&self, name: &str, parent_id: &str) -> FollowResult<Option<RemoteFile>> {
        self.check_query()?;
        tokio::task::yield_now().await;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| !e.trashed && e.name == name && e.parent.as_deref() == Some(parent_id))
            .map(|e| RemoteFile {
                id: e.id.clone(),
                name: e.name.clone(),
            }))
    }

    async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> FollowResult<RemoteFile> {
        self.check_write()?;
        let id = self.next_id();
        self.entries.write().await.push(Entry {
            id: id.clone(),
            name: name.to_string(),
            parent: Some(parent_id.to_string()),
            mime_type: mime_type.to_string(),
            content,
            trashed: false,
        });
        Ok(RemoteFile {
            id,
            name: name.to_string(),
        })
    }

    async fn update_file(
        &self,
        file_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> FollowResult<RemoteFile> {
        self.check_write()?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == file_id)
            .ok_or_else(|| FollowError::RemoteWrite(format!("file not found: {file_id}")))?;
        entry.mime_type = mime_type.to_string();
        entry.content = content;
        Ok(RemoteFile {
            id: entry.id.clone(),
            name: entry.name.clone(),
        })
    }

    async fn download_file(&self, file_id: &str) -> FollowResult<Vec<u8>> {
        self.check_query()?;
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.id == file_id)
            .map(|e| e.content.clone())
            .ok_or_else(|| FollowError::RemoteQuery(format!("file not found: {file_id}")))
    }
}
