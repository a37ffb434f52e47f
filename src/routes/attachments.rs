use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::catalog::{self, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::AppError;
use crate::models::attachment::Attachment;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListAttachmentsQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list_attachments(
    State(state): State<AppState>,
    query: Result<Query<ListAttachmentsQuery>, QueryRejection>,
) -> Result<Json<Vec<Attachment>>, AppError> {
    let Query(params) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let attachments = catalog::list_attachments(&state.attachments_path, skip, limit).await?;
    tracing::debug!(
        "listed {} attachment(s) skip={skip} limit={limit}",
        attachments.len()
    );
    Ok(Json(attachments))
}
