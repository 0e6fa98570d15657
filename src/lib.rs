//! Rewriting Forward Proxy Library

pub mod config;
pub mod http;
pub mod observability;
pub mod proxy;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use proxy::{ProxyError, ProxyPipeline};
