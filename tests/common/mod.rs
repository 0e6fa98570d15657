//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use rewrite_proxy::{HttpServer, ProxyConfig};

/// Start a mock origin that serves the given raw responses, one per
/// connection in order, and records every raw request it receives.
pub async fn start_origin(responses: Vec<Vec<u8>>) -> (SocketAddr, Arc<Mutex<Vec<Vec<u8>>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let captured_writer = captured.clone();

    tokio::spawn(async move {
        let mut responses = responses.into_iter();
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let request = read_request(&mut socket).await;
                    captured_writer.lock().await.push(request);
                    let response = responses
                        .next()
                        .unwrap_or_else(|| http_response(200, &[("Content-Type", "text/plain")], b"ok"));
                    let _ = socket.write_all(&response).await;
                    let _ = socket.shutdown().await;
                }
                Err(_) => break,
            }
        }
    });

    (addr, captured)
}

/// Start the proxy against the given origin and return its address.
pub async fn start_proxy(origin: SocketAddr) -> SocketAddr {
    start_proxy_with(origin, |_| {}).await
}

/// Start the proxy with a config tweak applied before startup.
pub async fn start_proxy_with<F>(origin: SocketAddr, tweak: F) -> SocketAddr
where
    F: FnOnce(&mut ProxyConfig),
{
    let mut config = ProxyConfig::default();
    config.upstream.target_url = format!("http://{}", origin);
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    tweak(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    addr
}

/// Assemble a raw HTTP/1.1 response.
pub fn http_response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    };
    let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason).into_bytes();
    for (name, value) in headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(
        format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()).as_bytes(),
    );
    out.extend_from_slice(body);
    out
}

/// Gzip-compress a buffer.
#[allow(dead_code)]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Read one full request (headers plus Content-Length body) from a socket.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    buf
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
