//! Per-request orchestration.
//!
//! One pass per inbound request: forward, classify the final-hop headers,
//! decode the body when signaled, rewrite HTML text, emit. The outward
//! status and full header set are decided before any body byte is produced.
//! Every failure aborts only its own request.

use reqwest::header::{HeaderName, HeaderValue};

use crate::config::loader::ConfigError;
use crate::config::schema::ProxyConfig;
use crate::config::validation::ValidationError;
use crate::observability::debug::DebugReport;
use crate::proxy::decode;
use crate::proxy::error::ProxyError;
use crate::proxy::forwarder::{InboundRequest, RequestForwarder};
use crate::proxy::headers::{classify_header, parse_header_line, rewrite_cookie, HeaderDecision};
use crate::proxy::rewrite::{HtmlTextTransformer, RewriteRules};

/// The fully decided outward response: status, headers, body, in that order.
#[derive(Debug)]
pub struct OutwardResponse {
    pub status: u16,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Vec<u8>,
}

/// Composes forwarder, header classification, decoder, and HTML rewriter.
/// Holds no mutable state; concurrent requests share it via `Arc`.
pub struct ProxyPipeline {
    forwarder: RequestForwarder,
    transformer: HtmlTextTransformer,
}

impl ProxyPipeline {
    pub fn new(forwarder: RequestForwarder, transformer: HtmlTextTransformer) -> Self {
        Self { forwarder, transformer }
    }

    /// Build the pipeline from validated configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let forwarder = RequestForwarder::new(&config.upstream, &config.timeouts).map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "upstream.target_url".to_string(),
                message: e.to_string(),
            }])
        })?;
        let rules = RewriteRules::from_config(&config.rewrite).map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "rewrite.rules".to_string(),
                message: e.to_string(),
            }])
        })?;
        Ok(Self::new(forwarder, HtmlTextTransformer::new(rules)))
    }

    /// Run one request through the pipeline.
    pub async fn handle(&self, inbound: InboundRequest) -> Result<OutwardResponse, ProxyError> {
        tracing::debug!(method = %inbound.method, path = %inbound.path_query, "Forwarding request");
        let upstream = self.forwarder.forward(&inbound).await?;

        tracing::debug!(
            status = upstream.status,
            redirects = upstream.redirect_count,
            effective_url = %upstream.effective_url,
            "Upstream responded"
        );

        let (headers, pending_encoding) =
            classify_response_headers(&upstream.header_lines, &inbound.caller_host)?;

        let mut body = upstream.body.to_vec();
        if let Some(encoding) = pending_encoding {
            body = decode::decode_body(&encoding, body);
        }
        body = self.transformer.transform(body);

        if inbound.debug {
            let report = DebugReport {
                inbound_headers: &inbound.headers,
                request_header_lines: &upstream.request_header_lines,
                upstream_header_lines: &upstream.header_lines,
                outward_headers: &headers,
                effective_url: &upstream.effective_url,
                redirect_count: upstream.redirect_count,
            };
            let mut prefixed = report.render().into_bytes();
            prefixed.extend_from_slice(&body);
            body = prefixed;
        }

        Ok(OutwardResponse {
            status: upstream.outward_status(),
            headers,
            body,
        })
    }
}

/// Classify every final-hop header line, producing the outward header set
/// and the content encoding to decode, if any. Multiple Set-Cookie headers
/// stay distinct, never merged.
fn classify_response_headers(
    lines: &[String],
    caller_host: &str,
) -> Result<(Vec<(HeaderName, HeaderValue)>, Option<String>), ProxyError> {
    let mut headers = Vec::new();
    let mut pending_encoding = None;

    for line in lines {
        let (name, value) = parse_header_line(line)?;
        match classify_header(name, value) {
            HeaderDecision::PassThrough => {
                headers.push(owned_header(line, name, value)?);
            }
            HeaderDecision::RewriteCookie => {
                let rewritten = rewrite_cookie(value, caller_host);
                headers.push(owned_header(line, name, &rewritten)?);
            }
            HeaderDecision::TriggerDecode(encoding) => {
                // Signal only: the outward body is already decoded, so the
                // encoding claim must not be re-asserted.
                pending_encoding = Some(encoding);
            }
            HeaderDecision::Drop => {}
        }
    }

    Ok((headers, pending_encoding))
}

fn owned_header(line: &str, name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ProxyError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ProxyError::MalformedHeader(line.to_string()))?;
    let value =
        HeaderValue::from_str(value).map_err(|_| ProxyError::MalformedHeader(line.to_string()))?;
    Ok((name, value))
}

/// True for 2xx and 3xx outward statuses; drives the one-shot exit code.
pub fn is_response_code_ok(status: u16) -> bool {
    (200..=399).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_passthrough_and_drop() {
        let (headers, encoding) = classify_response_headers(
            &lines(&[
                "Content-Type: text/html; charset=utf-8",
                "Cache-Control: no-store",
                "X-Custom: kept",
                "Server: origin/1.0",
                "Date: Sat, 30 Aug 2026 00:00:00 GMT",
            ]),
            "proxy.local",
        )
        .unwrap();

        let names: Vec<_> = headers.iter().map(|(n, _)| n.as_str().to_string()).collect();
        assert_eq!(names, vec!["content-type", "x-custom", "server"]);
        assert!(encoding.is_none());
    }

    #[test]
    fn test_multiple_cookies_stay_distinct() {
        let (headers, _) = classify_response_headers(
            &lines(&[
                "Set-Cookie: a=1; domain=origin.example; path=/x",
                "Set-Cookie: b=2; Secure",
            ]),
            "proxy.local",
        )
        .unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].1.to_str().unwrap(), "a=1; domain=.proxy.local");
        assert_eq!(headers[1].1.to_str().unwrap(), "b=2; Secure");
    }

    #[test]
    fn test_gzip_signal_is_not_forwarded() {
        let (headers, encoding) = classify_response_headers(
            &lines(&["Content-Encoding: gzip", "Content-Type: text/html"]),
            "h",
        )
        .unwrap();

        assert_eq!(encoding.as_deref(), Some("gzip"));
        assert!(headers.iter().all(|(n, _)| n != "content-encoding"));
    }

    #[test]
    fn test_malformed_line_aborts() {
        let result = classify_response_headers(&lines(&["Server: ok", "broken line"]), "h");
        assert!(matches!(result, Err(ProxyError::MalformedHeader(_))));
    }

    #[test]
    fn test_response_code_ok_range() {
        assert!(is_response_code_ok(200));
        assert!(is_response_code_ok(302));
        assert!(!is_response_code_ok(199));
        assert!(!is_response_code_ok(404));
        assert!(!is_response_code_ok(502));
    }
}
