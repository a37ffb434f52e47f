use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use attachment_gallery::config::Config;
use attachment_gallery::loader::{
    AttachmentLoader, HttpPageSource, LoadError, PageOutcome, Rect, Renderer, Skip, Trigger,
    Viewport,
};
use attachment_gallery::models::attachment::Attachment;

/// Page through an attachment gallery in the terminal. Enter scrolls one
/// screen, `r` retries after a failure, `q` quits.
#[derive(Parser)]
#[command(name = "gallery-browse", version)]
struct Args {
    /// Listing endpoint, e.g. http://localhost:8000/attachments/
    #[arg(long)]
    url: Option<String>,

    /// Attachments requested per page
    #[arg(long)]
    page_size: Option<u64>,

    /// Lines per screen
    #[arg(long, default_value_t = 20)]
    rows: u64,
}

/// Prints each attachment as a numbered line.
struct TerminalRenderer {
    lines: AtomicU64,
}

impl TerminalRenderer {
    fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }
}

impl Renderer for TerminalRenderer {
    fn append(&self, attachment: &Attachment) {
        let n = self.lines.fetch_add(1, Ordering::Relaxed) + 1;
        match &attachment.filename {
            Some(name) => println!("  {n:>5}  {}  \x1b[2m{name}\x1b[0m", attachment.url),
            None => println!("  {n:>5}  {}", attachment.url),
        }
    }

    fn set_loading(&self, visible: bool) {
        if visible {
            eprint!("  \x1b[2mloading…\x1b[0m\r");
        } else {
            eprint!("          \r");
        }
        let _ = std::io::stderr().flush();
    }

    fn show_error(&self, error: &LoadError) {
        eprintln!("  \x1b[31m! {error}\x1b[0m  \x1b[2m(press r to retry)\x1b[0m");
    }

    fn clear_error(&self) {}

    fn show_end(&self) {
        println!("  \x1b[2m— end of gallery —\x1b[0m");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attachment_gallery=warn".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let listing_url = args.url.unwrap_or(config.listing_url);
    let mut loader_config = config.loader;
    if let Some(page_size) = args.page_size.filter(|n| *n > 0) {
        loader_config.page_size = page_size;
    }
    let rows = args.rows.max(1);

    let source = match HttpPageSource::new(&listing_url) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("gallery-browse: {e}");
            std::process::exit(2);
        }
    };
    let renderer = Arc::new(TerminalRenderer {
        lines: AtomicU64::new(0),
    });
    let loader = AttachmentLoader::new(source, Arc::clone(&renderer), loader_config);

    eprintln!("  \x1b[2mbrowsing\x1b[0m {listing_url}");
    report(loader.start().await);

    let viewport = Viewport::new(rows as f64);
    let mut scroll_top: u64 = 0;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("failed to read stdin: {e}");
                break;
            }
        };

        match line.trim() {
            "q" => break,
            "r" => report(loader.retry().await),
            _ => {
                let rendered = renderer.lines();
                scroll_top = (scroll_top + rows).min(rendered);
                let sentinel = Rect::marker((rendered - scroll_top) as f64);
                match loader.on_scroll(sentinel, viewport) {
                    Trigger::Fetching(handle) => match handle.await {
                        Ok(result) => report(result),
                        Err(e) => tracing::error!("fetch task failed: {e}"),
                    },
                    Trigger::Ignored(Skip::Exhausted) => {
                        eprintln!("  \x1b[2mno more attachments\x1b[0m")
                    }
                    Trigger::Ignored(Skip::BackingOff) => {
                        eprintln!("  \x1b[2mwaiting before the next attempt\x1b[0m")
                    }
                    Trigger::Ignored(Skip::AwaitingRetry) => {
                        eprintln!("  \x1b[33mtoo many failures, press r to retry\x1b[0m")
                    }
                    Trigger::Ignored(skip) => tracing::debug!("scroll ignored: {skip:?}"),
                }
            }
        }
    }

    loader.shutdown();
}

fn report(result: Result<PageOutcome, LoadError>) {
    match result {
        Ok(outcome) => tracing::debug!("page outcome: {outcome:?}"),
        Err(e) => tracing::debug!("page failed: {e}"),
    }
}
