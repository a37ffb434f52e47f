use tokio::net::TcpListener;
use tokio::signal;

use attachment_gallery::config::Config;
use attachment_gallery::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attachment_gallery=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    if let Err(e) = tokio::fs::create_dir_all(&config.attachments_path).await {
        tracing::error!(
            "failed to create attachment directory {:?}: {:?}",
            config.attachments_path,
            e
        );
    }

    let state = AppState {
        attachments_path: config.attachments_path,
        static_path: config.static_path,
    };
    let app = attachment_gallery::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("gallery server stopped");
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36mattachment-gallery\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m          {}", config.port);
    eprintln!(
        "  \x1b[2mattachments\x1b[0m   {}",
        config.attachments_path.display()
    );
    eprintln!("  \x1b[2mstatic\x1b[0m        {}", config.static_path.display());
    eprintln!("  \x1b[2mpage size\x1b[0m     {}", config.loader.page_size);
    eprintln!();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
