use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Reddit API error: {0}")]
    RedditApi(#[from] RedditApiError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Request failed: {message}")]
    RequestFailed {
        message: String,
        status_code: Option<u16>,
    },
}

impl CoreError {
    /// Whether the failed call is worth repeating on a later run.
    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_transient(),
            CoreError::Llm(e) => e.is_transient(),
            CoreError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum RedditApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Subreddit not found: {subreddit}")]
    SubredditNotFound { subreddit: String },

    #[error("Post not found: {post_id}")]
    PostNotFound { post_id: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Submission requires a flair in r/{subreddit}")]
    FlairRequired { subreddit: String },

    #[error("Submission rejected: {details}")]
    SubmissionRejected { details: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

impl RedditApiError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RedditApiError::RateLimitExceeded { .. }
                | RedditApiError::RequestTimeout
                | RedditApiError::ServerError { .. }
        )
    }
}

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("API key invalid or missing for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Provider service unavailable: {provider}")]
    ServiceUnavailable { provider: String },

    #[error("Request timeout for {provider}")]
    RequestTimeout { provider: String },

    #[error("No completion returned by {model}")]
    NoCompletion { model: String },

    #[error("Invalid response format from {provider}")]
    InvalidResponseFormat { provider: String },
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read ledger {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write ledger {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Ledger {path} is not a JSON string array: {reason}")]
    InvalidFormat { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
