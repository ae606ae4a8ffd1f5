//! End-to-end routing behavior of the proxy listener.

use axum::http::StatusCode;
use label_proxy::config::RouteSpec;

mod common;

#[tokio::test]
async fn forwards_remainder_with_method_and_headers() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::spawn_proxy(vec![common::backend("media", backend, None)]).await;

    let res = common::client()
        .patch(format!("http://{}/media/shows/episode.mkv?season=2&x=", proxy))
        .header("x-test", "kept")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-echo-method"], "PATCH");
    assert_eq!(res.headers()["x-echo-uri"], "/shows/episode.mkv?season=2&x=");
    assert_eq!(res.headers()["x-echo-x-test"], "kept");
    // Host is forwarded verbatim, not rewritten to the backend address.
    assert_eq!(res.headers()["x-echo-host"], proxy.to_string().as_str());

    shutdown.trigger();
}

#[tokio::test]
async fn path_prefix_is_prepended() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::spawn_proxy(vec![
        common::backend("wiki", backend, Some("w/base")),
        common::backend("plain", backend, None),
    ])
    .await;

    let client = common::client();
    let res = client
        .get(format!("http://{}/wiki/Main_Page?action=view", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-echo-uri"], "/w/base/Main_Page?action=view");

    let res = client
        .get(format!("http://{}/plain/", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-echo-uri"], "/");

    shutdown.trigger();
}

#[tokio::test]
async fn bare_label_redirects_to_folder() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::spawn_proxy(vec![common::backend("media", backend, None)]).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/media?sort=name", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()["location"], "/media/?sort=name");

    let res = client.get(format!("http://{}/media", proxy)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()["location"], "/media/");

    shutdown.trigger();
}

#[tokio::test]
async fn root_redirects_to_configured_target() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::spawn_proxy(vec![
        common::backend("media", backend, None),
        RouteSpec::RootRedirect("media".into()),
    ])
    .await;

    let res = common::client()
        .get(format!("http://{}/", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()["location"], "/media");

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_label_is_not_found_and_proxy_keeps_serving() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::spawn_proxy(vec![common::backend("media", backend, None)]).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/nothing/here", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND, "no root redirect configured");

    let res = client
        .get(format!("http://{}/media/ok", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn backend_status_reason_and_headers_are_copied() {
    let (backend, _requests) = common::start_raw_backend(
        "HTTP/1.1 299 Custom Status\r\nContent-Length: 5\r\nX-Backend: raw\r\nConnection: close\r\n\r\nhello",
    )
    .await;
    let (proxy, shutdown) = common::spawn_proxy(vec![common::backend("raw", backend, None)]).await;

    let response = common::raw_request(
        proxy,
        "GET /raw/x HTTP/1.1\r\nHost: proxy.test\r\nConnection: close\r\n\r\n",
    )
    .await;
    let lower = response.to_ascii_lowercase();

    assert!(response.starts_with("HTTP/1.1 299 Custom Status\r\n"), "{}", response);
    assert!(lower.contains("x-backend: raw"));
    assert!(lower.contains("transfer-encoding: chunked"));
    assert!(!lower.contains("content-length"));
    assert!(response.contains("hello"));

    shutdown.trigger();
}

#[tokio::test]
async fn head_response_keeps_backend_length() {
    let (backend, mut requests) = common::start_raw_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 42\r\nConnection: close\r\n\r\n",
    )
    .await;
    let (proxy, shutdown) = common::spawn_proxy(vec![common::backend("raw", backend, None)]).await;

    let response = common::raw_request(
        proxy,
        "HEAD /raw/file.bin HTTP/1.1\r\nHost: proxy.test\r\nConnection: close\r\n\r\n",
    )
    .await;
    let lower = response.to_ascii_lowercase();

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{}", response);
    assert!(lower.contains("content-length: 42"), "{}", response);
    assert!(!lower.contains("transfer-encoding"));

    let seen = requests.recv().await.unwrap();
    assert!(seen.starts_with("HEAD /file.bin HTTP/1.1\r\n"), "{}", seen);

    shutdown.trigger();
}

#[tokio::test]
async fn asterisk_target_is_treated_as_folder() {
    let backend = common::start_echo_backend().await;
    let (proxy, shutdown) = common::spawn_proxy(vec![common::backend("media", backend, None)]).await;

    let response = common::raw_request(
        proxy,
        "OPTIONS * HTTP/1.1\r\nHost: proxy.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 303 See Other\r\n"), "{}", response);
    assert!(response.to_ascii_lowercase().contains("location: */"), "{}", response);

    shutdown.trigger();
}
