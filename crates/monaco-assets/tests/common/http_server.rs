//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a single static body for every GET request and counts how many
//! requests it received, so tests can assert on network activity.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl TestServer {
    /// Base URL of the server, e.g. "http://127.0.0.1:12345".
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body` with 200 OK.
/// The server runs until the process exits.
pub fn serve(body: Vec<u8>) -> TestServer {
    serve_with_status(body, "200 OK")
}

/// Like `serve` but responds with an arbitrary status line (e.g. "404 Not Found").
pub fn serve_with_status(body: Vec<u8>, status: &'static str) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));

    let thread_hits = Arc::clone(&hits);
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let hits = Arc::clone(&thread_hits);
            thread::spawn(move || handle(stream, &body, status, &hits));
        }
    });

    TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        hits,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    status: &'static str,
    hits: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));

    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    if std::str::from_utf8(&buf[..n]).is_err() {
        return;
    }

    hits.fetch_add(1, Ordering::SeqCst);

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body);
}
