mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use attachment_gallery::loader::{
    AttachmentLoader, HttpPageSource, LoadError, LoaderConfig, PageOutcome, PageSource, Phase,
    RenderTarget, Trigger, Rect, Viewport,
};

fn gallery_loader(
    listing_url: &str,
) -> (
    AttachmentLoader<HttpPageSource, Arc<RenderTarget>>,
    Arc<RenderTarget>,
) {
    let source = HttpPageSource::new(listing_url).unwrap();
    let target = Arc::new(RenderTarget::new());
    let loader = AttachmentLoader::new(source, Arc::clone(&target), LoaderConfig::default());
    (loader, target)
}

#[tokio::test]
async fn test_http_source_fetches_page() {
    let server = common::TestServer::new();
    server.add_attachments(4);
    let base = server.spawn().await;

    let source = HttpPageSource::new(&format!("{base}/attachments/")).unwrap();
    let page = source.fetch_page(1, 2).await.unwrap();

    let urls: Vec<_> = page.iter().map(|a| a.url.clone()).collect();
    assert_eq!(
        urls,
        vec![format!("{base}/cdn/1.png"), format!("{base}/cdn/2.png")]
    );
    assert_eq!(page[0].filename.as_deref(), Some("1.png"));
}

#[tokio::test]
async fn test_loader_pages_through_gallery() {
    let server = common::TestServer::new();
    server.add_attachments(23);
    let base = server.spawn().await;
    let (loader, target) = gallery_loader(&format!("{base}/attachments/"));

    assert_eq!(
        loader.start().await.unwrap(),
        PageOutcome::Loaded { offset: 0, count: 10 }
    );

    let viewport = Viewport::new(800.0);
    let Trigger::Fetching(handle) = loader.on_scroll(Rect::marker(700.0), viewport) else {
        panic!("visible sentinel did not trigger a fetch");
    };
    handle.await.unwrap().unwrap();

    let last = loader.fetch_next_page().await.unwrap();
    assert_eq!(last, PageOutcome::Exhausted { offset: 20, count: 3 });
    assert_eq!(loader.phase(), Phase::Exhausted);

    let expected: Vec<String> = (0..23).map(|i| format!("{base}/cdn/{i}.png")).collect();
    assert_eq!(target.urls(), expected);
    assert!(target.is_ended());
}

#[tokio::test]
async fn test_rendered_urls_are_fetchable() {
    let server = common::TestServer::new();
    server.add_attachment("cat.png", 5);
    let base = server.spawn().await;
    let (loader, target) = gallery_loader(&format!("{base}/attachments/"));

    loader.start().await.unwrap();
    let url = target.urls().pop().unwrap();

    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(&resp.bytes().await.unwrap()[..], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_server_error_is_status_failure() {
    let app = Router::new().route(
        "/attachments/",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database is locked") }),
    );
    let base = common::spawn_router(app).await;
    let (loader, target) = gallery_loader(&format!("{base}/attachments/"));

    let err = loader.start().await.unwrap_err();

    assert_eq!(
        err,
        LoadError::Status {
            status: 500,
            body: "database is locked".into()
        }
    );
    assert!(!target.is_loading());
    assert!(target.error().is_some());
    assert_eq!(loader.offset(), 0);
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let app = Router::new().route(
        "/attachments/",
        get(|| async { "<html>502 Bad Gateway</html>" }),
    );
    let base = common::spawn_router(app).await;
    let (loader, _target) = gallery_loader(&format!("{base}/attachments/"));

    let err = loader.start().await.unwrap_err();
    assert!(matches!(err, LoadError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_records_without_url_are_invalid_response() {
    let app = Router::new().route(
        "/attachments/",
        get(|| async { axum::Json(serde_json::json!([{ "filename": "a.png" }])) }),
    );
    let base = common::spawn_router(app).await;
    let source = HttpPageSource::new(&format!("{base}/attachments/")).unwrap();

    let err = source.fetch_page(0, 10).await.unwrap_err();
    assert!(matches!(err, LoadError::InvalidResponse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (loader, target) = gallery_loader(&format!("http://127.0.0.1:{port}/attachments/"));
    let err = loader.start().await.unwrap_err();

    assert!(matches!(err, LoadError::Network(_)), "got {err:?}");
    assert!(!target.is_loading());
    assert_eq!(loader.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let app = Router::new().route(
        "/attachments/",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "[]"
        }),
    );
    let base = common::spawn_router(app).await;
    let source = HttpPageSource::new(&format!("{base}/attachments/")).unwrap();
    let target = Arc::new(RenderTarget::new());
    let config = LoaderConfig {
        fetch_timeout: Duration::from_millis(100),
        ..LoaderConfig::default()
    };
    let loader = AttachmentLoader::new(source, Arc::clone(&target), config);

    let err = loader.start().await.unwrap_err();

    assert_eq!(err, LoadError::Timeout(Duration::from_millis(100)));
    assert!(!target.is_loading());
}
