//! Inbound request capture.
//!
//! # Responsibilities
//! - Snapshot the inbound request into an owned `InboundRequest`
//! - Decompose POST bodies into form fields and file parts (multipart or
//!   urlencoded); keep PUT/PATCH bodies raw; other methods carry no body
//! - Record the caller host (cookie rewriting) and per-request debug
//!   override (`Proxy-Debug` header)
//!
//! # Design Decisions
//! - The snapshot is fully buffered; header decisions downstream must be
//!   complete before the outward body is emitted, so streaming buys nothing
//! - Capture failures are client errors (400), distinct from upstream ones

use axum::extract::{FromRequest, Multipart, Request};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use crate::proxy::error::ProxyError;
use crate::proxy::forwarder::{FilePart, InboundBody, InboundRequest};

/// Request header that enables debug output for a single request.
pub const PROXY_DEBUG_HEADER: &str = "proxy-debug";

/// Snapshot the inbound request. `debug_default` is the process-wide debug
/// flag; the `Proxy-Debug` header turns it on for this request alone.
pub async fn capture(
    request: Request,
    max_body_bytes: usize,
    debug_default: bool,
) -> Result<InboundRequest, ProxyError> {
    let method = request.method().clone();
    let path_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let headers = request.headers().clone();

    let caller_host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let debug = debug_default || headers.contains_key(PROXY_DEBUG_HEADER);

    let body = match method {
        Method::PUT | Method::PATCH => InboundBody::Raw(read_body(request, max_body_bytes).await?),
        Method::POST => capture_form(request, max_body_bytes).await?,
        _ => InboundBody::None,
    };

    Ok(InboundRequest {
        method,
        path_query,
        headers,
        caller_host,
        debug,
        body,
    })
}

async fn read_body(request: Request, max_body_bytes: usize) -> Result<bytes::Bytes, ProxyError> {
    axum::body::to_bytes(request.into_body(), max_body_bytes)
        .await
        .map_err(|e| ProxyError::InvalidRequestBody(e.to_string()))
}

/// Decompose a POST body into fields and files. Multipart and urlencoded
/// bodies populate the form; any other content type forwards as an empty
/// form, mirroring a CGI request parser that found nothing to decode.
async fn capture_form(request: Request, max_body_bytes: usize) -> Result<InboundBody, ProxyError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        return capture_multipart(request).await;
    }

    let mut fields = Vec::new();
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let body = read_body(request, max_body_bytes).await?;
        fields = url::form_urlencoded::parse(&body).into_owned().collect();
    }

    Ok(InboundBody::Form {
        fields,
        files: Vec::new(),
    })
}

async fn capture_multipart(request: Request) -> Result<InboundBody, ProxyError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ProxyError::InvalidRequestBody(e.to_string()))?;

    let mut fields = Vec::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::InvalidRequestBody(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(filename) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ProxyError::InvalidRequestBody(e.to_string()))?;
            files.push(FilePart {
                field: name,
                filename,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ProxyError::InvalidRequestBody(e.to_string()))?;
            fields.push((name, value));
        }
    }

    Ok(InboundBody::Form { fields, files })
}
