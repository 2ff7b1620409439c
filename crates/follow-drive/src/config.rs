use serde::{Deserialize, Serialize};

/// Folder every session document is written into.
pub const DEFAULT_FOLDER_NAME: &str = "follow";

/// Public Google APIs host.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";

/// OAuth scope limited to files this application created or opened.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Settings for talking to the Drive API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    #[serde(default = "default_folder_name")]
    pub folder_name: String,
    pub api_base_url: Option<String>,
}

fn default_folder_name() -> String {
    DEFAULT_FOLDER_NAME.to_string()
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            folder_name: default_folder_name(),
            api_base_url: None,
        }
    }
}

impl DriveConfig {
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .map_or(DEFAULT_API_BASE_URL, |url| url.trim_end_matches('/'))
    }
}
