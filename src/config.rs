use std::path::PathBuf;
use std::time::Duration;

use crate::loader::{LoaderConfig, VisibilityRule};

pub struct Config {
    pub port: u16,
    pub attachments_path: PathBuf,
    pub static_path: PathBuf,
    pub listing_url: String,
    pub loader: LoaderConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = LoaderConfig::default();

        let page_size = std::env::var("GALLERY_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.page_size);

        let fetch_timeout = std::env::var("GALLERY_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        let backoff_base = std::env::var("GALLERY_BACKOFF_BASE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff.base);

        let backoff_max = std::env::var("GALLERY_BACKOFF_MAX_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff.max);

        let (backoff_base, backoff_max) = if backoff_max < backoff_base {
            tracing::warn!(
                "GALLERY_BACKOFF_MAX_MS ({backoff_max:?}) is below GALLERY_BACKOFF_BASE_MS ({backoff_base:?}), using defaults"
            );
            (defaults.backoff.base, defaults.backoff.max)
        } else {
            (backoff_base, backoff_max)
        };

        let max_failures = std::env::var("GALLERY_MAX_FAILURES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.backoff.max_failures);

        let visibility = match std::env::var("GALLERY_VISIBILITY")
            .unwrap_or_else(|_| "contained".to_string())
            .to_lowercase()
            .as_str()
        {
            "bottom-edge" | "bottom_edge" => VisibilityRule::BottomEdge,
            _ => VisibilityRule::Contained,
        };

        let loader = LoaderConfig {
            page_size,
            fetch_timeout,
            visibility,
            backoff: crate::loader::backoff::Backoff {
                base: backoff_base,
                max: backoff_max,
                max_failures,
            },
        };

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            attachments_path: std::env::var("GALLERY_ATTACHMENTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/app/data/attachments")),
            static_path: std::env::var("GALLERY_STATIC_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./static")),
            listing_url: std::env::var("GALLERY_LISTING_URL")
                .unwrap_or_else(|_| "http://localhost:8000/attachments/".to_string()),
            loader,
        }
    }
}
