//! Response header classification and cookie rewriting.
//!
//! # Responsibilities
//! - Split a raw header blob, keeping only the final redirect hop's block
//! - Parse header lines on the first colon-space boundary
//! - Classify each header: pass through, rewrite cookie, decode trigger, drop
//! - Rewrite Set-Cookie domain/path for re-origin under the caller's host
//!
//! # Design Decisions
//! - Classification is a pure function of (name, value); no state
//! - Unknown headers are dropped, not forwarded (conservative default that
//!   keeps origin-internal caching/routing headers from leaking)
//! - `x-` prefixed names always pass through (extension point)
//! - A malformed line is a hard error, never skipped

use std::sync::LazyLock;

use regex::Regex;

use crate::proxy::error::ProxyError;

/// Inbound header names never forwarded to the origin. The outbound leg
/// negotiates its own host and encoding.
pub const SKIPPED_REQUEST_HEADERS: &[&str] = &["host", "accept-encoding"];

/// Response header names passed through unchanged.
const PASSTHROUGH_HEADERS: &[&str] = &["content-type", "content-language", "content-security", "server"];

static COOKIE_DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(domain\s*=\s*)[^;\s]+").expect("cookie domain pattern"));

static COOKIE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*;?\s*path\s*=\s*[^;\s]+").expect("cookie path pattern"));

/// Decision for one response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderDecision {
    /// Forward the header unchanged.
    PassThrough,
    /// Rewrite the cookie for the caller's host before forwarding.
    RewriteCookie,
    /// Decode the body with the named encoding; the header itself is not
    /// forwarded, the outward body is already decoded.
    TriggerDecode(String),
    /// Do not forward.
    Drop,
}

/// Whether an inbound request header is on the skip-list.
pub fn is_skipped_request_header(name: &str) -> bool {
    SKIPPED_REQUEST_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Classify one response header by name and value.
pub fn classify_header(name: &str, value: &str) -> HeaderDecision {
    let lowered_name = name.to_ascii_lowercase();

    if PASSTHROUGH_HEADERS.contains(&lowered_name.as_str()) || lowered_name.starts_with("x-") {
        return HeaderDecision::PassThrough;
    }

    if lowered_name == "set-cookie" {
        return HeaderDecision::RewriteCookie;
    }

    if lowered_name == "content-encoding" {
        return HeaderDecision::TriggerDecode(value.trim().to_ascii_lowercase());
    }

    HeaderDecision::Drop
}

/// Rewrite a Set-Cookie value for the caller's host: the `domain=` value is
/// replaced with the host prefixed by a dot (so subdomains match), and any
/// `path=` attribute is removed so the cookie defaults to the root path.
/// All other attributes are left untouched.
pub fn rewrite_cookie(value: &str, caller_host: &str) -> String {
    let rewritten = COOKIE_DOMAIN_RE.replace_all(value, |caps: &regex::Captures<'_>| {
        format!("{}.{}", &caps[1], caller_host)
    });
    COOKIE_PATH_RE.replace_all(&rewritten, "").into_owned()
}

/// Split a header line into (name, value) on the first colon-space boundary.
pub fn parse_header_line(line: &str) -> Result<(&str, &str), ProxyError> {
    let (name, rest) = line
        .split_once(':')
        .ok_or_else(|| ProxyError::MalformedHeader(line.to_string()))?;
    if name.is_empty() || !rest.starts_with([' ', '\t']) {
        return Err(ProxyError::MalformedHeader(line.to_string()));
    }
    Ok((name, rest.trim_start()))
}

/// Split a raw header blob into lines, keeping only the block following the
/// last `HTTP/` status-line marker. Redirect chains produce multiple blocks;
/// only the final response's headers may be inspected downstream.
pub fn split_header_block(blob: &str) -> Vec<String> {
    let mut results = Vec::new();
    for line in blob.split(['\r', '\n']) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            results.clear();
            continue;
        }
        results.push(line.to_string());
    }
    results
}
