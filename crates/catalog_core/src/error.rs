use thiserror::Error;

/// Failure of one page fetch.
///
/// Carries rendered messages rather than error sources so a single
/// in-flight result can be cloned out to every waiter coalesced onto the
/// same request. Failures are never cached; the caller retries by asking
/// the cache for the key again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure: connect, timeout, or a non-success status.
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be decoded into catalog records.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
