use std::fmt;

/// Error types that can occur when calling LLM agents or market data providers.
#[derive(Debug)]
pub enum AdvisorError {
    /// HTTP request/response errors
    HttpError(String),
    /// Authentication and authorization errors
    AuthError(String),
    /// Invalid request parameters or format
    InvalidRequest(String),
    /// Errors returned by the upstream provider
    ProviderError(String),
    /// JSON serialization/deserialization errors
    JsonError(String),
    /// The provider answered but the payload carried no usable content
    EmptyResponse(String),
    /// All retry attempts were exhausted
    RetryExceeded {
        /// Number of attempts performed, including the first one
        attempts: usize,
        /// Stringified last error observed before giving up
        last_error: String,
    },
    /// Generic error
    Generic(String),
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisorError::HttpError(e) => write!(f, "HTTP Error: {}", e),
            AdvisorError::AuthError(e) => write!(f, "Auth Error: {}", e),
            AdvisorError::InvalidRequest(e) => write!(f, "Invalid Request: {}", e),
            AdvisorError::ProviderError(e) => write!(f, "Provider Error: {}", e),
            AdvisorError::JsonError(e) => write!(f, "JSON Parse Error: {}", e),
            AdvisorError::EmptyResponse(e) => write!(f, "Empty Response: {}", e),
            AdvisorError::RetryExceeded {
                attempts,
                last_error,
            } => write!(
                f,
                "Retry limit reached after {} attempts: {}",
                attempts, last_error
            ),
            AdvisorError::Generic(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for AdvisorError {}

/// Converts reqwest HTTP errors into AdvisorErrors
impl From<reqwest::Error> for AdvisorError {
    fn from(err: reqwest::Error) -> Self {
        AdvisorError::HttpError(err.to_string())
    }
}

/// Converts JSON parsing errors into AdvisorErrors
impl From<serde_json::Error> for AdvisorError {
    fn from(err: serde_json::Error) -> Self {
        AdvisorError::JsonError(err.to_string())
    }
}
