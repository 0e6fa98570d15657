//! Request-forward / response-rewrite pipeline.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → forwarder.rs (build outbound request, follow redirects)
//!     → headers.rs (classify each final-hop header: pass/rewrite/decode/drop)
//!     → decode.rs (gzip decode when signaled)
//!     → rewrite.rs (decorate leaf text nodes when body is HTML)
//!     → pipeline.rs (assemble outward status, headers, body)
//! ```

pub mod decode;
pub mod error;
pub mod forwarder;
pub mod headers;
pub mod pipeline;
pub mod rewrite;

pub use error::ProxyError;
pub use forwarder::{FilePart, InboundBody, InboundRequest, RequestForwarder, UpstreamResponse};
pub use headers::{classify_header, rewrite_cookie, HeaderDecision};
pub use pipeline::{is_response_code_ok, OutwardResponse, ProxyPipeline};
pub use rewrite::{HtmlTextTransformer, RewriteRules};
