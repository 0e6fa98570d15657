//! Outward response assembly.
//!
//! # Responsibilities
//! - Convert the pipeline's decided status/headers/body into an Axum response
//! - Map pipeline errors to outward statuses with a plain-text error body
//!
//! # Design Decisions
//! - Error bodies carry the error kind and a short description, never
//!   internal stack detail; debug mode has its own dedicated report

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::proxy::error::ProxyError;
use crate::proxy::pipeline::OutwardResponse;

/// Build the success response: status first, then headers, then body.
pub fn into_response(outward: OutwardResponse) -> Response {
    let status = StatusCode::from_u16(outward.status).unwrap_or(StatusCode::NOT_FOUND);

    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in outward.headers {
            headers.append(name, value);
        }
    }

    match builder.body(Body::from(outward.body)) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to assemble outward response");
            (StatusCode::INTERNAL_SERVER_ERROR, "PROXY ERROR: response assembly failed").into_response()
        }
    }
}

/// Build the outward error response for a failed request cycle.
pub fn error_response(error: &ProxyError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("PROXY ERROR: {}", error)).into_response()
}
