//! Error types for the model clients.

/// Error type for embedding requests.
///
/// `Upstream` covers definitive service failures (a non-retryable HTTP
/// status, or retries exhausted); `Transport` covers connection-level
/// failures; `InvalidResponse` means the service answered 200 but the body
/// did not match the contract (missing vectors, count mismatch). All of
/// them are recoverable at the caller: the indexing pipeline defers the
/// file for a later retry and the query path degrades to an apology.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The embedding service rejected the request or stayed unavailable
    /// through every retry.
    #[error("embedding service error: {message}")]
    Upstream { message: String },

    /// The request never reached the service (DNS, connect, timeout).
    #[error("embedding transport error: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// The service answered, but the body did not match the API contract.
    #[error("invalid embedding response: {message}")]
    InvalidResponse { message: String },
}

impl EmbedError {
    /// Create an upstream-failure error with a custom message.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a malformed-response error with a custom message.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

/// Error type for generation requests. Mirrors [`EmbedError`] for the
/// chat-completion route.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The generation service rejected the request or stayed unavailable
    /// through every retry.
    #[error("generation service error: {message}")]
    Upstream { message: String },

    /// The request never reached the service.
    #[error("generation transport error: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    /// The service answered, but with no usable completion.
    #[error("invalid generation response: {message}")]
    InvalidResponse { message: String },
}

impl GenerateError {
    /// Create an upstream-failure error with a custom message.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a malformed-response error with a custom message.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
