//! Outbound request construction and execution.
//!
//! # Responsibilities
//! - Build the target URL: origin base + inbound path and query
//! - Mirror the inbound request: method, filtered headers, body payload
//! - Re-encode POST form fields and file uploads as multipart form data
//! - Follow redirects, reporting the effective URL and hop count
//! - Surface only the final hop's header lines downstream
//!
//! # Design Decisions
//! - Redirects are followed manually (client policy: none) so the hop
//!   count and final-hop header block are observable
//! - 303 demotes any method but HEAD to GET; 301/302 demote POST to GET;
//!   307/308 keep method and body
//! - Entity framing headers are regenerated by the client, the body may
//!   have been re-encoded

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, EXPECT, LOCATION, TRANSFER_ENCODING};
use reqwest::{Client, Method, StatusCode};
use url::Url;

use crate::config::schema::{TimeoutConfig, UpstreamConfig};
use crate::proxy::error::ProxyError;
use crate::proxy::headers::is_skipped_request_header;

/// An inbound request snapshot, owned by one pipeline invocation.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path plus query exactly as received, starting with `/`.
    pub path_query: String,
    pub headers: HeaderMap,
    /// The caller-facing host, used for cookie domain rewriting.
    pub caller_host: String,
    /// Debug requested for this request (config flag or Proxy-Debug header).
    pub debug: bool,
    pub body: InboundBody,
}

/// Body payload mirrored to the origin.
#[derive(Debug, Clone)]
pub enum InboundBody {
    /// GET and other bodyless methods.
    None,
    /// PUT/PATCH: raw bytes, forwarded unchanged.
    Raw(Bytes),
    /// POST: form fields and uploads, re-encoded as multipart form data.
    Form {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

/// One uploaded file, keeping its original name and declared content type.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The final upstream response after redirects.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Raw header lines from the final hop only.
    pub header_lines: Vec<String>,
    pub body: Bytes,
    pub effective_url: Url,
    pub redirect_count: u32,
    /// Header lines sent to the target, for the debug report.
    pub request_header_lines: Vec<String>,
}

impl UpstreamResponse {
    /// A response with no usable status code becomes a generic 404 rather
    /// than propagating a meaningless zero code.
    pub fn outward_status(&self) -> u16 {
        if self.status == 0 {
            404
        } else {
            self.status
        }
    }
}

/// Issues outbound requests against the single configured origin.
pub struct RequestForwarder {
    client: Client,
    origin_base: String,
    max_redirects: u32,
}

impl RequestForwarder {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, ProxyError> {
        Url::parse(&upstream.target_url)
            .map_err(|e| ProxyError::InvalidTargetUrl(format!("'{}': {}", upstream.target_url, e)))?;

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .build()
            .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

        Ok(Self {
            client,
            origin_base: upstream.target_url.trim_end_matches('/').to_string(),
            max_redirects: upstream.max_redirects,
        })
    }

    /// Origin base + inbound path and query, validated as an absolute URL.
    pub fn target_url(&self, path_query: &str) -> Result<Url, ProxyError> {
        let concatenated = format!("{}{}", self.origin_base, path_query);
        Url::parse(&concatenated).map_err(|e| ProxyError::InvalidTargetUrl(format!("'{}': {}", concatenated, e)))
    }

    /// Execute the outbound request, following redirects up to the
    /// configured limit.
    pub async fn forward(&self, inbound: &InboundRequest) -> Result<UpstreamResponse, ProxyError> {
        let mut url = self.target_url(&inbound.path_query)?;
        let headers = filter_request_headers(&inbound.headers);
        let mut method = inbound.method.clone();
        let mut body = Some(&inbound.body);
        let mut redirect_count: u32 = 0;

        let request_header_lines = request_lines(&method, &inbound.path_query, &headers);

        loop {
            let mut builder = self.client.request(method.clone(), url.clone()).headers(headers.clone());
            builder = match body {
                Some(InboundBody::Raw(bytes)) => builder.body(bytes.clone()),
                Some(InboundBody::Form { fields, files }) => builder.multipart(build_form(fields, files)?),
                Some(InboundBody::None) | None => builder,
            };

            let response = builder
                .send()
                .await
                .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

            let status = response.status();
            if status.is_redirection() {
                if let Some(next) = redirect_target(&url, &response)? {
                    if redirect_count >= self.max_redirects {
                        return Err(ProxyError::UpstreamUnreachable(format!(
                            "more than {} redirects from '{}'",
                            self.max_redirects, self.origin_base
                        )));
                    }
                    redirect_count += 1;
                    tracing::debug!(status = %status, location = %next, hop = redirect_count, "Following redirect");

                    match status {
                        StatusCode::SEE_OTHER if method != Method::HEAD => {
                            method = Method::GET;
                            body = None;
                        }
                        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND if method == Method::POST => {
                            method = Method::GET;
                            body = None;
                        }
                        _ => {}
                    }
                    url = next;
                    continue;
                }
            }

            let header_lines = response
                .headers()
                .iter()
                .map(|(name, value)| header_line(name.as_str(), value))
                .collect();
            let effective_url = response.url().clone();
            let body_bytes = response
                .bytes()
                .await
                .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

            return Ok(UpstreamResponse {
                status: status.as_u16(),
                header_lines,
                body: body_bytes,
                effective_url,
                redirect_count,
                request_header_lines,
            });
        }
    }
}

/// Inbound headers minus the skip-list. Framing headers are left to the
/// client layer since the body may be re-encoded.
fn filter_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in inbound {
        if is_skipped_request_header(name.as_str()) {
            continue;
        }
        if name == CONTENT_LENGTH || name == CONTENT_TYPE || name == TRANSFER_ENCODING || name == CONNECTION || name == EXPECT {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn build_form(fields: &[(String, String)], files: &[FilePart]) -> Result<reqwest::multipart::Form, ProxyError> {
    let mut form = reqwest::multipart::Form::new();
    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }
    for file in files {
        let part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ProxyError::InvalidRequestBody(format!("file '{}': {}", file.field, e)))?;
        form = form.part(file.field.clone(), part);
    }
    Ok(form)
}

fn redirect_target(current: &Url, response: &reqwest::Response) -> Result<Option<Url>, ProxyError> {
    let Some(location) = response.headers().get(LOCATION).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    let next = current
        .join(location)
        .map_err(|e| ProxyError::InvalidTargetUrl(format!("redirect location '{}': {}", location, e)))?;
    Ok(Some(next))
}

fn header_line(name: &str, value: &HeaderValue) -> String {
    format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()))
}

fn request_lines(method: &Method, path_query: &str, headers: &HeaderMap) -> Vec<String> {
    let mut lines = vec![format!("{} {} HTTP/1.1", method, path_query)];
    lines.extend(headers.iter().map(|(name, value)| header_line(name.as_str(), value)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{TimeoutConfig, UpstreamConfig};

    fn forwarder(target: &str) -> Result<RequestForwarder, ProxyError> {
        let upstream = UpstreamConfig {
            target_url: target.to_string(),
            max_redirects: 10,
        };
        RequestForwarder::new(&upstream, &TimeoutConfig::default())
    }

    #[test]
    fn test_target_url_concatenation() {
        let f = forwarder("http://origin.example:8080").unwrap();
        let url = f.target_url("/story?id=1").unwrap();
        assert_eq!(url.as_str(), "http://origin.example:8080/story?id=1");
    }

    #[test]
    fn test_trailing_slash_on_base_is_normalized() {
        let f = forwarder("http://origin.example/").unwrap();
        let url = f.target_url("/a/b").unwrap();
        assert_eq!(url.as_str(), "http://origin.example/a/b");
    }

    #[test]
    fn test_invalid_base_is_rejected_at_construction() {
        assert!(matches!(forwarder("not a url"), Err(ProxyError::InvalidTargetUrl(_))));
    }

    #[test]
    fn test_skip_list_filters_host_and_accept_encoding() {
        let mut inbound = HeaderMap::new();
        inbound.insert("host", HeaderValue::from_static("proxy.local"));
        inbound.insert("accept-encoding", HeaderValue::from_static("gzip, br"));
        inbound.insert("user-agent", HeaderValue::from_static("test-agent"));
        inbound.insert("cookie", HeaderValue::from_static("sid=1"));

        let filtered = filter_request_headers(&inbound);
        assert!(filtered.get("host").is_none());
        assert!(filtered.get("accept-encoding").is_none());
        assert_eq!(filtered.get("user-agent").unwrap(), "test-agent");
        assert_eq!(filtered.get("cookie").unwrap(), "sid=1");
    }

    #[test]
    fn test_framing_headers_are_regenerated() {
        let mut inbound = HeaderMap::new();
        inbound.insert("content-length", HeaderValue::from_static("42"));
        inbound.insert("content-type", HeaderValue::from_static("multipart/form-data; boundary=old"));

        let filtered = filter_request_headers(&inbound);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_duplicate_headers_preserved_in_order() {
        let mut inbound = HeaderMap::new();
        inbound.append("x-tag", HeaderValue::from_static("one"));
        inbound.append("x-tag", HeaderValue::from_static("two"));

        let filtered = filter_request_headers(&inbound);
        let values: Vec<_> = filtered.get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["one", "two"]);
    }

    #[test]
    fn test_zero_status_maps_to_not_found() {
        let response = UpstreamResponse {
            status: 0,
            header_lines: Vec::new(),
            body: Bytes::new(),
            effective_url: Url::parse("http://origin.example/").unwrap(),
            redirect_count: 0,
            request_header_lines: Vec::new(),
        };
        assert_eq!(response.outward_status(), 404);
    }

    #[test]
    fn test_real_status_passes_through() {
        let response = UpstreamResponse {
            status: 503,
            header_lines: Vec::new(),
            body: Bytes::new(),
            effective_url: Url::parse("http://origin.example/").unwrap(),
            redirect_count: 0,
            request_header_lines: Vec::new(),
        };
        assert_eq!(response.outward_status(), 503);
    }
}
