//! End-to-end tests over real TCP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use minihttp::config::ServerConfig;
use minihttp::handlers::{json_handler, static_route};
use minihttp::http::request::Request;
use minihttp::http::response::Response;
use minihttp::router::Router;
use minihttp::server::Server;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn test_config(timeout_secs: f64, keep_alive: bool) -> ServerConfig {
    ServerConfig {
        ip: "127.0.0.1".to_string(),
        port: 0,
        timeout_secs,
        keep_alive,
        max_body_bytes: 1024 * 1024,
    }
}

fn hello_router() -> Router {
    let mut router = Router::new();
    router.get(
        "/hello",
        json_handler(|_| async { Ok::<_, anyhow::Error>(json!({ "user": "madokast" })) }),
    );
    router
}

async fn start(cfg: ServerConfig, router: Router) -> SocketAddr {
    let server = Server::bind(&cfg, router).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

/// Reads one full response using its Content-Length.
async fn read_response(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let length: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return buf;
            }
        }

        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "server closed before a full response");
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// True once the server has closed its side of the socket.
async fn closed_by_server(stream: &mut TcpStream, within: Duration) -> bool {
    let mut byte = [0u8; 1];
    matches!(
        tokio::time::timeout(within, stream.read(&mut byte)).await,
        Ok(Ok(0)) | Ok(Err(_))
    )
}

#[tokio::test]
async fn test_hello_json() {
    let addr = start(test_config(1.0, true), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let response = String::from_utf8(read_response(&mut stream).await).unwrap();

    assert_eq!(
        response,
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json; charset=utf-8\r\n\
         Content-Length: 20\r\n\
         Connection: keep-alive\r\n\
         \r\n\
         {\"user\": \"madokast\"}"
    );
}

#[tokio::test]
async fn test_unmatched_path_is_404_json() {
    let addr = start(test_config(1.0, true), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET /nope HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let response = read_response(&mut stream).await;
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 404 NOT FOUND\r\n"));
    let body = &text[text.find("\r\n\r\n").unwrap() + 4..];
    let body: Value = serde_json::from_str(body).unwrap();
    assert_eq!(body["method"], "GET");
    assert_eq!(body["path"], "/nope");
    assert_eq!(body["protocol"], "HTTP/1.1");
    assert_eq!(body["header"], json!({ "Host": "x" }));

    // The connection stays usable after a 404.
    stream
        .write_all(b"GET /hello HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let response = read_response(&mut stream).await;
    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_keep_alive_serves_sequential_requests() {
    let addr = start(test_config(1.0, true), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    for _ in 0..5 {
        stream
            .write_all(b"GET /hello HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.ends_with(br#"{"user": "madokast"}"#));
    }
}

#[tokio::test]
async fn test_keep_alive_disabled_closes_after_response() {
    let addr = start(test_config(1.0, false), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET /hello HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let response = String::from_utf8(read_response(&mut stream).await).unwrap();

    assert!(response.contains("Connection: close\r\n"));
    assert!(closed_by_server(&mut stream, Duration::from_millis(500)).await);
}

#[tokio::test]
async fn test_idle_timeout_while_body_expected() {
    let addr = start(test_config(0.1, true), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"GET /hello HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .unwrap();

    // Closed without any response bytes.
    let mut out = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut out)).await;
    assert!(matches!(read, Ok(Ok(0))));
    assert!(out.is_empty());

    // The listener keeps serving other connections.
    let mut other = TcpStream::connect(addr).await.unwrap();
    other.write_all(b"GET /hello HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(read_response(&mut other).await.starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn test_header_too_large_closes_without_response() {
    let addr = start(test_config(1.0, true), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut raw = b"GET /hello HTTP/1.1\r\nX-Big: ".to_vec();
    raw.extend(std::iter::repeat_n(b'a', 11 * 1024));
    // The server may close before reading everything.
    let _ = stream.write_all(&raw).await;

    let mut out = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut out)).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_malformed_request_line_closes_without_response() {
    let addr = start(test_config(1.0, true), hello_router()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"GET /hello\r\n\r\n").await.unwrap();

    let mut out = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut out)).await;
    assert!(matches!(read, Ok(Ok(0))));
}

#[tokio::test]
async fn test_last_registered_route_wins() {
    let mut router = Router::new();
    router.get("/foo", |_req: Request| async {
        Ok::<_, anyhow::Error>(Response::ok("A"))
    });
    router.get("/foo/bar", |_req: Request| async {
        Ok::<_, anyhow::Error>(Response::ok("B"))
    });
    let addr = start(test_config(1.0, true), router).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"GET /foo/bar HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(read_response(&mut stream).await.ends_with(b"\r\n\r\nB"));

    stream.write_all(b"GET /foo/other HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(read_response(&mut stream).await.ends_with(b"\r\n\r\nA"));
}

#[tokio::test]
async fn test_post_json_body() {
    let mut router = Router::new();
    router.post(
        "/hello2",
        json_handler(|obj: Option<Value>| async move {
            let name = obj
                .as_ref()
                .and_then(|o| o.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("default")
                .to_string();
            Ok::<_, anyhow::Error>(json!({ "hello": name }))
        }),
    );
    let addr = start(test_config(1.0, true), router).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let body = r#"{"name": "鹿目まどか"}"#;
    let request = format!(
        "POST /hello2 HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    // Split the request to exercise partial reads on the server.
    let (first, second) = request.as_bytes().split_at(30);
    stream.write_all(first).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(second).await.unwrap();

    let response = String::from_utf8(read_response(&mut stream).await).unwrap();
    assert!(response.ends_with(r#"{"hello": "鹿目まどか"}"#));
}

#[tokio::test]
async fn test_static_files_and_missing_file() {
    let root = std::env::temp_dir().join(format!("minihttp-static-{}", std::process::id()));
    std::fs::create_dir_all(root.join("js")).unwrap();
    std::fs::write(root.join("index.html"), "<h1>hi</h1>").unwrap();
    std::fs::write(root.join("js/app.js"), "let a = 1;").unwrap();
    std::fs::write(root.join("notes.txt"), "plain").unwrap();

    let mut router = Router::new();
    router.add_route(static_route("/resource", root.clone()));
    let addr = start(test_config(1.0, true), router).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"GET /resource/index.html HTTP/1.1\r\n\r\n").await.unwrap();
    let response = String::from_utf8(read_response(&mut stream).await).unwrap();
    assert!(response.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(response.ends_with("\r\n\r\n<h1>hi</h1>"));

    stream.write_all(b"GET /resource/js/app.js HTTP/1.1\r\n\r\n").await.unwrap();
    let response = String::from_utf8(read_response(&mut stream).await).unwrap();
    assert!(response.contains("Content-Type: application/x-javascript\r\n"));

    stream.write_all(b"GET /resource/notes.txt HTTP/1.1\r\n\r\n").await.unwrap();
    let response = String::from_utf8(read_response(&mut stream).await).unwrap();
    assert!(response.contains("Content-Type: application/octet-stream\r\n"));

    // Missing file: handler failure, 500 and the connection closes.
    stream.write_all(b"GET /resource/gone.html HTTP/1.1\r\n\r\n").await.unwrap();
    let response = String::from_utf8(read_response(&mut stream).await).unwrap();
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(closed_by_server(&mut stream, Duration::from_millis(500)).await);

    std::fs::remove_dir_all(&root).unwrap();
}
