//! Rewriting Forward Proxy
//!
//! A transparent forwarding proxy for a single fixed origin, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                 REWRITE PROXY                  │
//!                      │                                                │
//!  Client Request      │  ┌────────┐   ┌───────────┐   ┌────────────┐  │
//!  ────────────────────┼─▶│  http  │──▶│  inbound  │──▶│ forwarder  │──┼──▶ Origin
//!                      │  │ server │   │  capture  │   │ (redirects)│  │
//!                      │  └────────┘   └───────────┘   └─────┬──────┘  │
//!                      │                                     │         │
//!                      │                                     ▼         │
//!  Client Response     │  ┌────────┐   ┌───────────┐   ┌────────────┐  │
//!  ◀───────────────────┼──│outward │◀──│ html text │◀──│  header    │◀─┼──── Response
//!                      │  │response│   │ rewriter  │   │ classifier │  │
//!                      │  └────────┘   └───────────┘   └────────────┘  │
//!                      │                                                │
//!                      │  config (TOML + env) · logging · debug report  │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rewrite_proxy::config::loader::load_config;
use rewrite_proxy::config::schema::RewriteConfig;
use rewrite_proxy::config::ProxyConfig;
use rewrite_proxy::http::HttpServer;
use rewrite_proxy::proxy::forwarder::{InboundBody, InboundRequest};
use rewrite_proxy::proxy::rewrite::RewriteRules;
use rewrite_proxy::proxy::{decode, is_response_code_ok, ProxyPipeline};

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Forwarding proxy that rewrites response headers and HTML text for one origin", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Environment variables (TARGET_URL,
    /// DEBUG, IGNORE_COMPATIBILITY_CHECKS) override file values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Issue a single GET for PATH through the pipeline, print the body,
    /// and exit with 0 for a 2xx/3xx outcome or the numeric status code.
    #[arg(long, value_name = "PATH")]
    once: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    rewrite_proxy::observability::logging::init();
    tracing::info!("rewrite-proxy v0.1.0 starting");

    let config = load_config(cli.config.as_deref())?;
    tracing::info!(
        target_url = %config.upstream.target_url,
        bind_address = %config.listener.bind_address,
        debug = config.debug,
        "Configuration loaded"
    );

    if config.ignore_compatibility_checks {
        tracing::warn!("Compatibility checks skipped");
    } else {
        check_compatibility()?;
    }

    if let Some(path) = cli.once {
        std::process::exit(run_once(&config, &path).await);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Startup self-checks: gzip decoding must round-trip and the default
/// substitution rules must compile. Skipped with IGNORE_COMPATIBILITY_CHECKS.
fn check_compatibility() -> Result<(), Box<dyn std::error::Error>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let sample = b"compatibility probe";
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(sample)?;
    let compressed = encoder.finish()?;
    if decode::decode_body("gzip", compressed) != sample {
        return Err("gzip decoding is not functional".into());
    }

    RewriteRules::from_config(&RewriteConfig::default())?;
    Ok(())
}

/// One-shot mode: run a single GET through the pipeline and map the
/// outcome to a process exit code.
async fn run_once(config: &ProxyConfig, path: &str) -> i32 {
    let path_query = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    let pipeline = match ProxyPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("PROXY ERROR: {}", e);
            return 1;
        }
    };

    let inbound = InboundRequest {
        method: reqwest::Method::GET,
        path_query,
        headers: reqwest::header::HeaderMap::new(),
        caller_host: config.listener.bind_address.clone(),
        debug: config.debug,
        body: InboundBody::None,
    };

    match pipeline.handle(inbound).await {
        Ok(outward) => {
            if std::io::stdout().write_all(&outward.body).is_err() {
                return 1;
            }
            if is_response_code_ok(outward.status) {
                0
            } else {
                i32::from(outward.status)
            }
        }
        Err(e) => {
            eprintln!("PROXY ERROR: {}", e);
            i32::from(e.status_code())
        }
    }
}
