use crate::auth::AccessToken;
use crate::config::DriveConfig;
use crate::store::{DocumentStore, RemoteFile, RemoteFolder, FOLDER_MIME_TYPE};
use async_trait::async_trait;
use follow_core::{FollowError, FollowResult};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde::Deserialize;
use tracing::debug;

/// Google Drive v3 REST backend.
pub struct DriveStore {
    http: reqwest::Client,
    base_url: String,
    token: AccessToken,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

impl DriveFile {
    fn into_remote(self, fallback_name: &str) -> RemoteFile {
        RemoteFile {
            id: self.id,
            name: self.name.unwrap_or_else(|| fallback_name.to_string()),
        }
    }
}

/// Quotes a value for use inside a Drive `q` string literal.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

impl DriveStore {
    pub fn new(http: reqwest::Client, config: &DriveConfig, token: AccessToken) -> Self {
        Self {
            http,
            base_url: config.base_url().to_string(),
            token,
        }
    }

    async fn search(&self, query: &str) -> FollowResult<Vec<DriveFile>> {
        let url = format!("{}/drive/v3/files", self.base_url);
        debug!(query = %query, "Drive search");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.bearer().await?)
            .query(&[
                ("q", query),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .send()
            .await
            .map_err(|e| FollowError::RemoteQuery(e.to_string()))?;

        let resp = ensure_success(resp, FollowError::RemoteQuery).await?;
        let list: FileList = resp
            .json()
            .await
            .map_err(|e| FollowError::RemoteQuery(e.to_string()))?;
        Ok(list.files)
    }

    /// Runs a resumable upload: the initiating request returns a session
    /// URI in `Location`, the content is then sent to that URI in one PUT.
    async fn resumable_upload(
        &self,
        init: reqwest::RequestBuilder,
        mime_type: &str,
        content: Vec<u8>,
        fallback_name: &str,
    ) -> FollowResult<RemoteFile> {
        let token = self.token.bearer().await?;

        let resp = init
            .bearer_auth(&token)
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", content.len())
            .send()
            .await
            .map_err(|e| FollowError::RemoteWrite(e.to_string()))?;
        let resp = ensure_success(resp, FollowError::RemoteWrite).await?;

        let session_uri = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                FollowError::RemoteWrite("upload session URI missing from response".to_string())
            })?;

        let resp = self
            .http
            .put(&session_uri)
            .bearer_auth(&token)
            .header(CONTENT_TYPE, mime_type)
            .body(content)
            .send()
            .await
            .map_err(|e| FollowError::RemoteWrite(e.to_string()))?;
        let resp = ensure_success(resp, FollowError::RemoteWrite).await?;

        let file: DriveFile = resp
            .json()
            .await
            .map_err(|e| FollowError::RemoteWrite(e.to_string()))?;
        Ok(file.into_remote(fallback_name))
    }
}

async fn ensure_success(
    resp: reqwest::Response,
    wrap: fn(String) -> FollowError,
) -> FollowResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(wrap(format!("Drive API error {status}: {body}")))
}

#[async_trait]
impl DocumentStore for DriveStore {
    async fn find_folder(&self, name: &str) -> FollowResult<Option<RemoteFolder>> {
        let query = format!(
            "name='{}' and mimeType='{FOLDER_MIME_TYPE}' and trashed=false",
            escape_query_literal(name)
        );
        let mut files = self.search(&query).await?;
        Ok((!files.is_empty()).then(|| {
            let file = files.remove(0).into_remote(name);
            RemoteFolder {
                id: file.id,
                name: file.name,
            }
        }))
    }

    async fn create_folder(&self, name: &str) -> FollowResult<RemoteFolder> {
        let url = format!("{}/drive/v3/files", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.token.bearer().await?)
            .query(&[("fields", "id, name")])
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
            }))
            .send()
            .await
            .map_err(|e| FollowError::RemoteWrite(e.to_string()))?;

        let resp = ensure_success(resp, FollowError::RemoteWrite).await?;
        let file: DriveFile = resp
            .json()
            .await
            .map_err(|e| FollowError::RemoteWrite(e.to_string()))?;
        let file = file.into_remote(name);
        Ok(RemoteFolder {
            id: file.id,
            name: file.name,
        })
    }

    async fn find_file(&self, name: &str, parent_id: &str) -> FollowResult<Option<RemoteFile>> {
        let query = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query_literal(name),
            escape_query_literal(parent_id)
        );
        let files = self.search(&query).await?;
        Ok(files.into_iter().next().map(|f| f.into_remote(name)))
    }

    async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> FollowResult<RemoteFile> {
        let url = format!("{}/upload/drive/v3/files", self.base_url);
        let init = self
            .http
            .post(&url)
            .query(&[("uploadType", "resumable"), ("fields", "id, name")])
            .json(&serde_json::json!({
                "name": name,
                "parents": [parent_id],
                "mimeType": mime_type,
            }));
        self.resumable_upload(init, mime_type, content, name).await
    }

    async fn update_file(
        &self,
        file_id: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> FollowResult<RemoteFile> {
        let url = format!("{}/upload/drive/v3/files/{file_id}", self.base_url);
        let init = self
            .http
            .patch(&url)
            .query(&[("uploadType", "resumable"), ("fields", "id, name")])
            .json(&serde_json::json!({}));
        self.resumable_upload(init, mime_type, content, "").await
    }

    async fn download_file(&self, file_id: &str) -> FollowResult<Vec<u8>> {
        let url = format!("{}/drive/v3/files/{file_id}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token.bearer().await?)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| FollowError::RemoteQuery(e.to_string()))?;

        let resp = ensure_success(resp, FollowError::RemoteQuery).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FollowError::RemoteQuery(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
