//! Incremental attachment loader.
//!
//! Pages through the attachment listing as the sentinel scrolls into view and
//! appends every item to a [`Renderer`]. One fetch is outstanding at a time;
//! scroll triggers that arrive while a fetch is in flight are dropped, explicit
//! [`AttachmentLoader::fetch_next_page`] calls queue behind it. The cursor only
//! advances when a page has been rendered, so a failed page is re-requested at
//! the same offset.

pub mod backoff;
pub mod render;
pub mod source;
pub mod viewport;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::models::attachment::Attachment;

pub use backoff::Backoff;
pub use render::{ListItem, RenderTarget, Renderer};
pub use source::{HttpPageSource, LoadError, PageSource};
pub use viewport::{Rect, Viewport, VisibilityRule};

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub page_size: u64,
    pub fetch_timeout: Duration,
    pub visibility: VisibilityRule,
    pub backoff: Backoff,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            fetch_timeout: Duration::from_secs(10),
            visibility: VisibilityRule::default(),
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    /// A short page was returned; no further requests are issued.
    Exhausted,
}

/// Why a trigger did not start a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotVisible,
    InFlight,
    Exhausted,
    BackingOff,
    /// Too many consecutive failures; only [`AttachmentLoader::retry`] resumes.
    AwaitingRetry,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Loaded { offset: u64, count: usize },
    /// The page was rendered and was the last one.
    Exhausted { offset: u64, count: usize },
    Skipped(Skip),
}

#[derive(Debug)]
pub enum Trigger {
    Fetching(JoinHandle<Result<PageOutcome, LoadError>>),
    Ignored(Skip),
}

impl Trigger {
    pub fn is_fetching(&self) -> bool {
        matches!(self, Trigger::Fetching(_))
    }
}

struct Cursor {
    offset: u64,
    phase: Phase,
    failures: u32,
    retry_at: Option<Instant>,
    closed: bool,
}

/// Owns the `Fetching` phase from [`AttachmentLoader::begin`] until the page
/// settles. Dropping it unsettled (the fetch future was dropped, or the task
/// was aborted) puts the loader back to `Idle` so the same offset is requested
/// again.
struct PendingFetch<S: PageSource, R: Renderer> {
    loader: AttachmentLoader<S, R>,
    offset: u64,
    settled: bool,
}

impl<S: PageSource, R: Renderer> Drop for PendingFetch<S, R> {
    fn drop(&mut self) {
        let shared = &self.loader.shared;
        if !self.settled {
            {
                let mut cursor = self.loader.cursor();
                if cursor.phase == Phase::Fetching {
                    cursor.phase = Phase::Idle;
                }
            }
            shared.renderer.set_loading(false);
            tracing::debug!(
                "attachment fetch at skip={} dropped before it settled",
                self.offset
            );
        }
        shared.settled.notify_waiters();
    }
}

struct Shared<S, R> {
    source: S,
    renderer: R,
    config: LoaderConfig,
    cursor: Mutex<Cursor>,
    settled: Notify,
    cancel: watch::Sender<bool>,
}

pub struct AttachmentLoader<S, R> {
    shared: Arc<Shared<S, R>>,
}

impl<S, R> Clone for AttachmentLoader<S, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: PageSource, R: Renderer> AttachmentLoader<S, R> {
    pub fn new(source: S, renderer: R, mut config: LoaderConfig) -> Self {
        config.page_size = config.page_size.max(1);
        if config.fetch_timeout.is_zero() {
            config.fetch_timeout = LoaderConfig::default().fetch_timeout;
        }
        let (cancel, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                source,
                renderer,
                config,
                cursor: Mutex::new(Cursor {
                    offset: 0,
                    phase: Phase::Idle,
                    failures: 0,
                    retry_at: None,
                    closed: false,
                }),
                settled: Notify::new(),
                cancel,
            }),
        }
    }

    /// Load the first page without waiting for a scroll.
    pub async fn start(&self) -> Result<PageOutcome, LoadError> {
        tracing::debug!(
            "starting attachment loader, page size {}",
            self.shared.config.page_size
        );
        self.fetch_next_page().await
    }

    /// Scroll handler. Cheap enough to call on every scroll event; spawns the
    /// fetch when the sentinel is visible and the loader is idle.
    pub fn on_scroll(&self, sentinel: Rect, viewport: Viewport) -> Trigger {
        if !self.shared.config.visibility.is_visible(sentinel, viewport) {
            return Trigger::Ignored(Skip::NotVisible);
        }
        match self.begin(false) {
            Ok(fetch) => Trigger::Fetching(tokio::spawn(fetch.run())),
            Err(skip) => Trigger::Ignored(skip),
        }
    }

    /// Fetch the next page, waiting for any in-flight fetch to settle first.
    /// Ignores the backoff window.
    pub async fn fetch_next_page(&self) -> Result<PageOutcome, LoadError> {
        loop {
            let settled = self.shared.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();

            match self.begin(true) {
                Ok(fetch) => return fetch.run().await,
                Err(Skip::InFlight) => settled.await,
                Err(skip) => return Ok(PageOutcome::Skipped(skip)),
            }
        }
    }

    /// Clear failure state and fetch again.
    pub async fn retry(&self) -> Result<PageOutcome, LoadError> {
        {
            let mut cursor = self.cursor();
            cursor.failures = 0;
            cursor.retry_at = None;
        }
        self.fetch_next_page().await
    }

    /// Tear the loader down, cancelling any in-flight request.
    pub fn shutdown(&self) {
        self.cursor().closed = true;
        self.shared.cancel.send_replace(true);
        self.shared.settled.notify_waiters();
        tracing::debug!("attachment loader shut down");
    }

    pub fn offset(&self) -> u64 {
        self.cursor().offset
    }

    pub fn phase(&self) -> Phase {
        self.cursor().phase
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.cursor().failures
    }

    pub fn page_size(&self) -> u64 {
        self.shared.config.page_size
    }

    pub fn renderer(&self) -> &R {
        &self.shared.renderer
    }

    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        self.shared.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move `Idle -> Fetching` and hand back the fetch owning that phase.
    fn begin(&self, explicit: bool) -> Result<PendingFetch<S, R>, Skip> {
        let mut cursor = self.cursor();
        if cursor.closed {
            return Err(Skip::Closed);
        }
        match cursor.phase {
            Phase::Fetching => return Err(Skip::InFlight),
            Phase::Exhausted => return Err(Skip::Exhausted),
            Phase::Idle => {}
        }
        if !explicit {
            if self.shared.config.backoff.is_halted(cursor.failures) {
                return Err(Skip::AwaitingRetry);
            }
            if cursor.retry_at.is_some_and(|at| Instant::now() < at) {
                return Err(Skip::BackingOff);
            }
        }
        cursor.phase = Phase::Fetching;
        Ok(PendingFetch {
            loader: self.clone(),
            offset: cursor.offset,
            settled: false,
        })
    }

    fn complete(&self, offset: u64, items: &[Attachment]) -> PageOutcome {
        let renderer = &self.shared.renderer;
        renderer.clear_error();
        for item in items {
            renderer.append(item);
        }

        let page_size = self.shared.config.page_size;
        let count = items.len();
        let exhausted = (count as u64) < page_size;
        {
            let mut cursor = self.cursor();
            cursor.offset = offset + page_size;
            cursor.failures = 0;
            cursor.retry_at = None;
            cursor.phase = if exhausted {
                Phase::Exhausted
            } else {
                Phase::Idle
            };
        }

        if exhausted {
            renderer.show_end();
            tracing::info!("attachment listing exhausted, last page had {count} item(s) at skip={offset}");
            PageOutcome::Exhausted { offset, count }
        } else {
            tracing::debug!("rendered {count} attachment(s) from skip={offset}");
            PageOutcome::Loaded { offset, count }
        }
    }

    fn fail(&self, offset: u64, error: LoadError) -> LoadError {
        let (failures, delay, halted) = {
            let mut cursor = self.cursor();
            cursor.failures = cursor.failures.saturating_add(1);
            let delay = self.shared.config.backoff.delay(cursor.failures);
            cursor.retry_at = Some(Instant::now() + delay);
            cursor.phase = Phase::Idle;
            (
                cursor.failures,
                delay,
                self.shared.config.backoff.is_halted(cursor.failures),
            )
        };

        self.shared.renderer.show_error(&error);
        if halted {
            tracing::warn!(
                "attachment fetch at skip={offset} failed ({failures} in a row), waiting for retry: {error}"
            );
        } else {
            tracing::warn!(
                "attachment fetch at skip={offset} failed ({failures} in a row), backing off {delay:?}: {error}"
            );
        }
        error
    }

    fn abandon(&self) -> Result<PageOutcome, LoadError> {
        self.cursor().phase = Phase::Idle;
        Err(LoadError::Cancelled)
    }
}

impl<S: PageSource, R: Renderer> PendingFetch<S, R> {
    async fn run(mut self) -> Result<PageOutcome, LoadError> {
        let loader = self.loader.clone();
        let shared = &loader.shared;
        let offset = self.offset;
        let page_size = shared.config.page_size;
        let timeout = shared.config.fetch_timeout;
        let mut cancel = shared.cancel.subscribe();

        shared.renderer.set_loading(true);
        tracing::debug!("fetching attachments skip={offset} limit={page_size}");

        let result = tokio::select! {
            res = tokio::time::timeout(timeout, shared.source.fetch_page(offset, page_size)) => {
                res.unwrap_or(Err(LoadError::Timeout(timeout)))
            }
            _ = cancel.wait_for(|cancelled| *cancelled) => Err(LoadError::Cancelled),
        };
        shared.renderer.set_loading(false);

        let closed = loader.cursor().closed;
        let outcome = match result {
            Ok(_) if closed => loader.abandon(),
            Ok(items) => Ok(loader.complete(offset, &items)),
            Err(LoadError::Cancelled) => loader.abandon(),
            Err(e) => Err(loader.fail(offset, e)),
        };

        self.settled = true;
        outcome
    }
}
