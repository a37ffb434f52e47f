#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use attachment_gallery::catalog;
use attachment_gallery::routes;
use attachment_gallery::state::AppState;

/// Gallery server over throwaway attachment and static directories.
/// Each instance is isolated, safe for parallel tests.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub fn new() -> Self {
        let root = catalog::temp_catalog_path();
        let attachments_path = root.join("attachments");
        let static_path = root.join("static");
        std::fs::create_dir_all(&attachments_path).expect("failed to create attachment dir");
        std::fs::create_dir_all(&static_path).expect("failed to create static dir");
        std::fs::write(
            static_path.join("index.html"),
            "<!doctype html><title>Attachments</title><ul id=\"attachments\"></ul>",
        )
        .expect("failed to write index.html");

        Self {
            state: AppState {
                attachments_path,
                static_path,
            },
        }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    pub fn attachments_path(&self) -> &Path {
        &self.state.attachments_path
    }

    /// Write an image file whose modification time is `age_secs` in the past.
    pub fn add_attachment(&self, filename: &str, age_secs: u64) -> PathBuf {
        let path = self.state.attachments_path.join(filename);
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n").expect("failed to write attachment");
        std::fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(SystemTime::now() - Duration::from_secs(age_secs)))
            .expect("failed to set attachment mtime");
        path
    }

    /// Add `count` attachments named `0.png`, `1.png`, ... with `0.png` the newest.
    pub fn add_attachments(&self, count: u64) {
        for i in 0..count {
            self.add_attachment(&format!("{i}.png"), 10 + i * 10);
        }
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns the base URL.
    pub async fn spawn(&self) -> String {
        spawn_router(self.router()).await
    }
}

pub async fn spawn_router(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", addr.port())
}

/// Parse a response body into a `serde_json::Value`.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract the `url` field of every record in a listing response.
pub fn urls(body: &serde_json::Value) -> Vec<String> {
    body.as_array()
        .expect("listing is not an array")
        .iter()
        .map(|a| a["url"].as_str().unwrap().to_string())
        .collect()
}
