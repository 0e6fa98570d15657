//! Human-readable per-request debug report.
//!
//! When debug mode is active (config flag or a `Proxy-Debug` request
//! header), this report is prepended to the response body: headers the
//! caller sent, headers forwarded to the target, redirect information, the
//! raw header block received, and the headers emitted to the caller.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

const HR: &str = "\n\n----------------------------------------------\n\n";

/// Borrowed view over one request cycle, rendered as plain text.
pub struct DebugReport<'a> {
    pub inbound_headers: &'a HeaderMap,
    pub request_header_lines: &'a [String],
    pub upstream_header_lines: &'a [String],
    pub outward_headers: &'a [(HeaderName, HeaderValue)],
    pub effective_url: &'a Url,
    pub redirect_count: u32,
}

impl DebugReport<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("Headers sent to proxy\n\n");
        for (name, value) in self.inbound_headers {
            out.push_str(&format!("{}: {}\n", name, String::from_utf8_lossy(value.as_bytes())));
        }
        out.push_str(HR);

        out.push_str("Headers sent to target\n\n");
        out.push_str(&self.request_header_lines.join("\n"));
        out.push_str(HR);

        if self.redirect_count > 0 {
            out.push_str(&format!(
                "Request was redirected {} time(s), final URL \"{}\"",
                self.redirect_count, self.effective_url
            ));
            out.push_str(HR);
        }

        out.push_str("Headers received from target\n\n");
        out.push_str(&self.upstream_header_lines.join("\n"));
        out.push_str(HR);

        out.push_str("Headers sent from proxy to client\n\n");
        for (name, value) in self.outward_headers {
            out.push_str(&format!("{}: {}\n", name, String::from_utf8_lossy(value.as_bytes())));
        }
        out.push_str(HR);

        out.push_str("Body sent from proxy to client\n\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_sections() {
        let mut inbound = HeaderMap::new();
        inbound.insert("user-agent", HeaderValue::from_static("test"));
        let request_lines = vec!["GET /x HTTP/1.1".to_string()];
        let upstream_lines = vec!["Content-Type: text/html".to_string()];
        let outward = vec![(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("text/html"),
        )];
        let url = Url::parse("http://origin.example/final").unwrap();

        let report = DebugReport {
            inbound_headers: &inbound,
            request_header_lines: &request_lines,
            upstream_header_lines: &upstream_lines,
            outward_headers: &outward,
            effective_url: &url,
            redirect_count: 2,
        };

        let text = report.render();
        assert!(text.contains("Headers sent to proxy"));
        assert!(text.contains("user-agent: test"));
        assert!(text.contains("GET /x HTTP/1.1"));
        assert!(text.contains("redirected 2 time(s)"));
        assert!(text.contains("Headers received from target"));
        assert!(text.contains("Body sent from proxy to client"));
    }

    #[test]
    fn test_no_redirect_section_without_redirects() {
        let inbound = HeaderMap::new();
        let url = Url::parse("http://origin.example/").unwrap();
        let report = DebugReport {
            inbound_headers: &inbound,
            request_header_lines: &[],
            upstream_header_lines: &[],
            outward_headers: &[],
            effective_url: &url,
            redirect_count: 0,
        };
        assert!(!report.render().contains("redirected"));
    }
}
