use follow_core::Message;
use serde::{Deserialize, Serialize};

/// Body of `POST /append`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppendRequest {
    pub session_id: String,
    pub message: Message,
}

/// Successful response of `POST /log` and `POST /append`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogResponse {
    pub success: bool,
    pub file_id: String,
}

impl LogResponse {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            success: true,
            file_id: file_id.into(),
        }
    }
}

/// Error body returned with a 5xx status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub logger_ready: bool,
    /// `authenticated` or `folder_resolved`; absent without a logger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
