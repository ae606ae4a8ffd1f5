//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderValue, Request, Response};
use label_proxy::config::{RelaySettings, RouteSpec};
use label_proxy::{ProxyServer, Registry, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

/// Route `label` to a backend listening on `addr`.
pub fn backend(label: &str, addr: SocketAddr, path_prefix: Option<&str>) -> RouteSpec {
    RouteSpec::Backend {
        label: label.to_string(),
        host: addr.ip().to_string(),
        port: addr.port(),
        path_prefix: path_prefix.map(str::to_string),
    }
}

/// Start the proxy on an ephemeral port.
pub async fn spawn_proxy(routes: Vec<RouteSpec>) -> (SocketAddr, Shutdown) {
    spawn_proxy_with(routes, RelaySettings::default()).await
}

pub async fn spawn_proxy_with(routes: Vec<RouteSpec>, relay: RelaySettings) -> (SocketAddr, Shutdown) {
    let registry = Arc::new(Registry::from_routes(&routes, &relay).unwrap());
    let server = ProxyServer::new(registry, &relay);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Backend that streams the request body back and reports what it received
/// in `x-echo-*` headers.
pub async fn start_echo_backend() -> SocketAddr {
    let app = axum::Router::new().fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(request: Request<Body>) -> Response<Body> {
    let (parts, body) = request.into_parts();
    let mut response = Response::new(body);
    let headers = response.headers_mut();

    headers.insert(
        "x-echo-method",
        HeaderValue::from_str(parts.method.as_str()).unwrap(),
    );
    headers.insert(
        "x-echo-uri",
        HeaderValue::from_str(&parts.uri.to_string()).unwrap(),
    );
    for (name, echoed) in [
        ("host", "x-echo-host"),
        ("x-test", "x-echo-x-test"),
        ("transfer-encoding", "x-echo-transfer-encoding"),
        ("content-length", "x-echo-content-length"),
    ] {
        if let Some(value) = parts.headers.get(name) {
            headers.insert(echoed, value.clone());
        }
    }
    response
}

/// Backend that streams `tick\n` forever; `dropped` fires once the
/// response body is dropped, i.e. the proxy went away.
pub async fn start_endless_backend() -> (SocketAddr, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

    let app = axum::Router::new().fallback(move || {
        let tx = tx.clone();
        async move {
            let guard = DropSignal(tx.lock().unwrap().take());
            let ticks = futures_util::stream::unfold(guard, |guard| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some((Ok::<_, Infallible>(Bytes::from_static(b"tick\n")), guard))
            });
            Body::from_stream(ticks)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, rx)
}

struct DropSignal(Option<oneshot::Sender<()>>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Raw TCP backend: captures each request as text, answers with `response`
/// and closes.
pub async fn start_raw_backend(response: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    (addr, rx)
}

/// Raw TCP backend that signals as soon as `marker` has arrived, then drains
/// the chunked request body and answers `200 ok`.
pub async fn start_marker_backend(marker: &'static str) -> (SocketAddr, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut seen = Some(tx);
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if text.contains(marker) {
                if let Some(tx) = seen.take() {
                    let _ = tx.send(());
                }
            }
            if text.ends_with("0\r\n\r\n") {
                break;
            }
        }
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .await;
        let _ = socket.shutdown().await;
    });
    (addr, rx)
}

/// Backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Read a request head and, when chunked, its body up to the last chunk.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_ascii_lowercase();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let chunked = text[..head_end].contains("transfer-encoding: chunked");
            if !chunked || text.ends_with("0\r\n\r\n") {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Send a raw HTTP/1.1 request and read the whole connection.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut buf))
        .await
        .expect("proxy did not close the connection")
        .unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}
