//! HTTP surface of the proxy.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route, middleware)
//!     → request.rs (snapshot inbound request: method, headers, body parts)
//!     → proxy pipeline (forward, classify, decode, rewrite)
//!     → response.rs (outward status/headers/body, error mapping)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::HttpServer;
