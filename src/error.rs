/// Errors surfaced by the tracker client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure: no response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the API, passed through verbatim.
    #[error("API error ({status}): {}", .body.message())]
    Api { status: u16, body: ApiErrorBody },

    /// Credentials could not be renewed. The caller should return to login.
    #[error("Session expired")]
    SessionExpired,

    /// The caller's cancellation signal fired before the operation finished.
    #[error("Request cancelled")]
    Cancelled,

    /// A successful response did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Session storage backend failed.
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any request was sent.
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl Error {
    /// `true` when the API itself rejected the call for lack of credentials (401).
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// HTTP status of an [`Error::Api`], if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Body of a non-2xx API response.
///
/// The API reports failures as `{"message": ...}` or `{"error": ...}`; anything
/// else is kept as raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorBody {
    Json(serde_json::Value),
    Text(String),
}

impl ApiErrorBody {
    pub(crate) fn from_text(text: String) -> Self {
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }

    /// Human-readable message, preferring the API's `message` then `error` fields.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Json(value) => ["message", "error"]
                .iter()
                .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
                .map_or_else(|| value.to_string(), str::to_owned),
            Self::Text(text) => text.clone(),
        }
    }
}
