mod attachments;
mod health;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the gallery router: the listing endpoint, the gallery page and its
/// assets, and the attachment files themselves.
pub fn router(state: AppState) -> Router {
    let index = ServeFile::new(state.static_path.join("index.html"));
    let static_service = ServeDir::new(&state.static_path);
    let cdn_service = ServeDir::new(&state.attachments_path);

    Router::new()
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        .route("/attachments", get(attachments::list_attachments))
        .route("/attachments/", get(attachments::list_attachments))
        .route_service("/", index)
        .nest_service("/static", static_service)
        .nest_service("/cdn", cdn_service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
