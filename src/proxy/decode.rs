//! Transport content-encoding decoding.
//!
//! # Design Decisions
//! - Only gzip is decodable; any other signaled encoding passes the body
//!   through undecoded with a warning rather than failing the request
//! - A body that claims gzip but does not decode is also passed through,
//!   logged at warning level

use std::io::Read;

use flate2::read::GzDecoder;

/// Decode the body for the signaled content encoding. Returns the decoded
/// bytes for gzip, the input unchanged for anything else.
pub fn decode_body(encoding: &str, body: Vec<u8>) -> Vec<u8> {
    match encoding {
        "gzip" => match gzip_decode(&body) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "Body claims gzip but failed to decode, passing through");
                body
            }
        },
        "identity" | "" => body,
        other => {
            tracing::warn!(encoding = %other, "Unsupported content encoding, passing body through undecoded");
            body
        }
    }
}

fn gzip_decode(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(input);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
