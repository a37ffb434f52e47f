use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};

use crate::models::attachment::Attachment;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Transport failure: connection refused, reset, DNS, body read error.
    Network(String),
    /// Listing endpoint answered with a non-2xx status.
    Status { status: u16, body: String },
    /// Body was not a JSON array of attachment records.
    InvalidResponse(String),
    Timeout(Duration),
    /// The loader was shut down while the request was in flight.
    Cancelled,
    InvalidUrl(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Network(e) => write!(f, "network error: {e}"),
            LoadError::Status { status, body } => {
                write!(f, "server returned {status}: {body}")
            }
            LoadError::InvalidResponse(e) => write!(f, "invalid listing response: {e}"),
            LoadError::Timeout(after) => write!(f, "request timed out after {after:?}"),
            LoadError::Cancelled => write!(f, "request cancelled"),
            LoadError::InvalidUrl(e) => write!(f, "invalid listing url: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Network(e.to_string())
    }
}

/// Fetches one page of the attachment listing.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        skip: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Attachment>, LoadError>> + Send;
}

impl<T: PageSource> PageSource for Arc<T> {
    fn fetch_page(
        &self,
        skip: u64,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Attachment>, LoadError>> + Send {
        (**self).fetch_page(skip, limit)
    }
}

/// `PageSource` backed by `GET {listing_url}?skip={skip}&limit={limit}`.
pub struct HttpPageSource {
    client: Client,
    listing_url: Url,
}

impl HttpPageSource {
    pub fn new(listing_url: &str) -> Result<Self, LoadError> {
        let listing_url =
            Url::parse(listing_url).map_err(|e| LoadError::InvalidUrl(e.to_string()))?;
        let client = Client::builder()
            .user_agent(concat!("attachment-gallery/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            listing_url,
        })
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }
}

impl PageSource for HttpPageSource {
    async fn fetch_page(&self, skip: u64, limit: u64) -> Result<Vec<Attachment>, LoadError> {
        let resp = self
            .client
            .get(self.listing_url.clone())
            .query(&[("skip", skip), ("limit", limit)])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LoadError::Status { status, body });
        }

        let bytes = resp.bytes().await?;
        let mut items: Vec<Attachment> = serde_json::from_slice(&bytes)
            .map_err(|e| LoadError::InvalidResponse(e.to_string()))?;

        for item in &mut items {
            item.url = resolve_url(&self.listing_url, &item.url);
        }

        Ok(items)
    }
}

/// Resolve a possibly relative attachment url against the listing url.
fn resolve_url(base: &Url, url: &str) -> String {
    match base.join(url) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => url.to_string(),
    }
}
