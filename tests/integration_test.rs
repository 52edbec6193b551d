//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio `Server` en 127.0.0.1:0 con un directorio
//! estático temporal y habla HTTP crudo por `TcpStream`.

use minihttpd::config::Config;
use minihttpd::server::{Server, ShutdownHandle};
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    runner: Option<JoinHandle<()>>,
    _dir: TempDir,
}

impl TestServer {
    fn start() -> Self {
        Self::with(|config| config)
    }

    fn with(adjust: impl FnOnce(Config) -> Config) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("static");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), "<h1>minihttpd</h1>").unwrap();
        fs::write(root.join("style.css"), "body { margin: 0 }").unwrap();
        fs::write(dir.path().join("secret.txt"), "do not serve").unwrap();

        let config = adjust(Config {
            port: 0,
            static_dir: root,
            read_timeout_ms: 5_000,
            ..Config::default()
        });

        let server = Server::bind(config).expect("bind");
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let runner = thread::spawn(move || server.run().expect("run"));

        Self {
            addr,
            shutdown,
            runner: Some(runner),
            _dir: dir,
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        stream
    }

    /// Envía `raw` y lee la respuesta completa
    fn send(&self, raw: &[u8]) -> String {
        let mut stream = self.connect();
        stream.write_all(raw).unwrap();
        read_all(&mut stream)
    }

    fn stop(&mut self) {
        self.shutdown.shutdown();
        if let Some(runner) = self.runner.take() {
            runner.join().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_all(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

fn json_body(response: &str) -> Value {
    serde_json::from_str(extract_body(response)).unwrap()
}

fn post_user(server: &TestServer, name: &str, email: &str) -> String {
    let body = format!(r#"{{"name":"{}","email":"{}"}}"#, name, email);
    let raw = format!(
        "POST /api/users HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    server.send(raw.as_bytes())
}

#[test]
fn test_health_endpoint() {
    let server = TestServer::start();
    let response = server.send(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", response);
    assert!(response.contains("Content-Type: application/json\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert_eq!(json_body(&response)["status"], "healthy");
}

#[test]
fn test_static_index_and_content_type() {
    let server = TestServer::start();

    let index = server.send(b"GET / HTTP/1.1\r\n\r\n");
    assert!(index.starts_with("HTTP/1.1 200 OK"));
    assert!(index.contains("Content-Type: text/html\r\n"));
    assert_eq!(extract_body(&index), "<h1>minihttpd</h1>");

    let css = server.send(b"GET /style.css HTTP/1.1\r\n\r\n");
    assert!(css.contains("Content-Type: text/css\r\n"));
}

#[test]
fn test_directory_traversal_is_contained() {
    let server = TestServer::start();

    let existing = server.send(b"GET /../secret.txt HTTP/1.1\r\n\r\n");
    assert!(existing.starts_with("HTTP/1.1 403 Forbidden"), "got: {}", existing);
    assert!(!existing.contains("do not serve"));

    let missing = server.send(b"GET /../../../etc/nothing-here HTTP/1.1\r\n\r\n");
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "got: {}", missing);
}

#[test]
fn test_cors_preflight() {
    let server = TestServer::start();
    let response = server.send(b"OPTIONS /anything HTTP/1.1\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Length: 0\r\n"));
    assert!(response.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(response.contains("Access-Control-Allow-Methods: GET, POST, PUT, DELETE, OPTIONS\r\n"));
    assert_eq!(extract_body(&response), "");
}

#[test]
fn test_method_not_allowed() {
    let server = TestServer::start();
    let response = server.send(b"PATCH /api/users/1 HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed"), "got: {}", response);
}

#[test]
fn test_malformed_request_gets_400() {
    let server = TestServer::start();

    let response = server.send(b"GET /\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "got: {}", response);

    let response = server.send(b"GET / HTTP/9.9\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
}

#[test]
fn test_oversized_path_gets_400() {
    let server = TestServer::start();
    let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(1500));
    let response = server.send(raw.as_bytes());
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "got: {}", response);
}

#[test]
fn test_user_lifecycle() {
    let server = TestServer::start();

    let created = post_user(&server, "Ada", "ada@example.com");
    assert!(created.starts_with("HTTP/1.1 201 Created"), "got: {}", created);
    assert!(created.contains("Access-Control-Allow-Origin: *\r\n"));
    let id = json_body(&created)["id"].as_u64().unwrap();

    // Dos lecturas seguidas devuelven exactamente el mismo body
    let path = format!("GET /api/users/{} HTTP/1.1\r\n\r\n", id);
    let first = server.send(path.as_bytes());
    let second = server.send(path.as_bytes());
    assert!(first.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(extract_body(&first), extract_body(&second));
    assert_eq!(json_body(&first)["name"], "Ada");

    let patch = r#"{"name":"Ada L"}"#;
    let update = format!(
        "PUT /api/users/{} HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        id,
        patch.len(),
        patch
    );
    let updated = server.send(update.as_bytes());
    assert!(updated.starts_with("HTTP/1.1 200 OK"), "got: {}", updated);

    let list = server.send(b"GET /api/users HTTP/1.1\r\n\r\n");
    assert_eq!(json_body(&list)[0]["name"], "Ada L");

    let delete = format!("DELETE /api/users/{} HTTP/1.1\r\n\r\n", id);
    assert!(server.send(delete.as_bytes()).starts_with("HTTP/1.1 204 No Content"));
    assert!(server.send(path.as_bytes()).starts_with("HTTP/1.1 404 Not Found"));
}

#[test]
fn test_metrics_count_every_response() {
    let server = TestServer::start();
    server.send(b"GET /health HTTP/1.1\r\n\r\n");
    server.send(b"GET /missing HTTP/1.1\r\n\r\n");
    server.send(b"BREW /pot HTTP/1.1\r\n\r\n");

    let response = server.send(b"GET /metrics HTTP/1.1\r\n\r\n");
    let metrics = json_body(&response);

    // El propio GET /metrics se registra después de responder
    assert_eq!(metrics["total_requests"], 3);
    assert_eq!(metrics["successful_requests"], 1);
    assert_eq!(metrics["error_requests"], 2);
}

#[test]
fn test_concurrent_clients() {
    let server = TestServer::with(|config| Config {
        workers: 4,
        queue_capacity: 64,
        ..config
    });

    let addr = server.addr;
    let clients: Vec<_> = (0..16)
        .map(|_| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
                stream.write_all(b"GET /health HTTP/1.1\r\n\r\n").unwrap();
                read_all(&mut stream)
            })
        })
        .collect();

    for client in clients {
        assert!(client.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }
}

// Con 1 worker ocupado y la cola llena, la conexión siguiente se cierra
// sin respuesta; las que ya estaban admitidas se atienden igual.
#[test]
fn test_admission_control_rejects_when_queue_full() {
    let server = TestServer::with(|config| Config {
        workers: 1,
        queue_capacity: 1,
        ..config
    });

    let mut busy = server.connect();
    thread::sleep(Duration::from_millis(150));
    let mut queued = server.connect();
    queued.write_all(b"GET /health HTTP/1.1\r\n\r\n").unwrap();
    thread::sleep(Duration::from_millis(150));

    let mut rejected = server.connect();
    let started = Instant::now();
    let mut buf = Vec::new();
    match rejected.read_to_end(&mut buf) {
        Ok(_) => {}
        Err(e) => assert!(
            !matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut),
            "rejected connection was left open"
        ),
    }
    assert!(buf.is_empty());
    assert!(started.elapsed() < Duration::from_secs(4));

    busy.write_all(b"GET /health HTTP/1.1\r\n\r\n").unwrap();
    assert!(read_all(&mut busy).starts_with("HTTP/1.1 200 OK"));
    assert!(read_all(&mut queued).starts_with("HTTP/1.1 200 OK"));
}

// Al apagar, lo que seguía en cola se cierra sin atender y el request en
// curso termina normalmente.
#[test]
fn test_shutdown_closes_queued_and_finishes_in_flight() {
    let mut server = TestServer::with(|config| Config {
        workers: 1,
        queue_capacity: 2,
        ..config
    });

    let mut in_flight = server.connect();
    thread::sleep(Duration::from_millis(150));
    let mut queued = server.connect();
    queued.write_all(b"GET /health HTTP/1.1\r\n\r\n").unwrap();
    thread::sleep(Duration::from_millis(150));

    server.shutdown.shutdown();
    thread::sleep(Duration::from_millis(150));

    let mut buf = Vec::new();
    let _ = queued.read_to_end(&mut buf);
    assert!(buf.is_empty(), "queued connection was processed");

    in_flight.write_all(b"GET /health HTTP/1.1\r\n\r\n").unwrap();
    assert!(read_all(&mut in_flight).starts_with("HTTP/1.1 200 OK"));

    server.stop();
    assert!(TcpStream::connect_timeout(&server.addr, Duration::from_millis(200)).is_err());
}
