/// Errors surfaced by a text-generation call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    #[error("Completion timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The provider answered but the body had no usable text.
    #[error("Malformed completion: {0}")]
    Malformed(String),

    /// The admission semaphore was closed (process shutting down).
    #[error("Gateway is closed")]
    Closed,
}
