//! Pipeline error types.

use thiserror::Error;

/// Errors that abort a single request cycle. None of these crash the
/// process or affect other in-flight requests.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The configured origin plus the inbound path did not form a valid URL.
    #[error("invalid target URL: {0}")]
    InvalidTargetUrl(String),

    /// Network failure, timeout, or an unparseable upstream response.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Upstream sent a header line that cannot be split into name and value.
    /// Hard error: mis-parsed headers risk cookie and security header
    /// corruption, so best-effort recovery is rejected.
    #[error("can not parse header \"{0}\"")]
    MalformedHeader(String),

    /// The inbound body could not be read or decomposed.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),
}

impl ProxyError {
    /// Outward HTTP status for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::InvalidTargetUrl(_) => 500,
            ProxyError::UpstreamUnreachable(_) => 502,
            ProxyError::MalformedHeader(_) => 500,
            ProxyError::InvalidRequestBody(_) => 400,
        }
    }
}
