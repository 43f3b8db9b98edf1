// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-rolled HTTP upstreams for failure modes wiremock cannot produce:
//! a chunked stream cut off mid-body, and a stream that goes silent.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const STREAM_HEADERS: &str = "HTTP/1.1 200 OK\r\n\
content-type: application/x-ndjson\r\n\
transfer-encoding: chunked\r\n\r\n";

/// Serves one request: answers with `lines` as chunks, then drops the
/// connection without the terminating chunk. Returns the base URL.
pub async fn truncating_ndjson_server(lines: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(STREAM_HEADERS.as_bytes()).await.unwrap();
        for line in lines {
            let chunk = format!("{:x}\r\n{line}\r\n", line.len());
            socket.write_all(chunk.as_bytes()).await.unwrap();
        }
        socket.flush().await.unwrap();
        // Dropping here ends the body without a zero-length chunk.
    });

    url
}

/// Serves one request: sends `lines` as chunks, then keeps the connection
/// open without writing anything else. Returns the base URL.
pub async fn stalling_ndjson_server(lines: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(STREAM_HEADERS.as_bytes()).await.unwrap();
        for line in lines {
            let chunk = format!("{:x}\r\n{line}\r\n", line.len());
            socket.write_all(chunk.as_bytes()).await.unwrap();
        }
        socket.flush().await.unwrap();
        std::future::pending::<()>().await;
    });

    url
}

/// Reads the request head and its `content-length` body so the peer never
/// sees a reset for unread bytes.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n");
        if let Some(end) = head_end {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
