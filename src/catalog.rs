use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::AppError;
use crate::models::attachment::Attachment;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// Everything but the RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// URL under which `/cdn` serves a saved attachment.
pub fn cdn_url(filename: &str) -> String {
    format!("/cdn/{}", utf8_percent_encode(filename, PATH_SEGMENT))
}

/// Map a filename to its image content type, or `None` if it is not an image
/// the gallery shows.
pub fn image_content_type(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// List saved attachments newest first, skipping `skip` and returning at most
/// `limit` records. Ties on modification time are ordered by filename. A
/// directory that does not exist yet holds no attachments.
pub async fn list_attachments(
    dir: &Path,
    skip: u64,
    limit: u64,
) -> Result<Vec<Attachment>, AppError> {
    let mut entries = scan(dir).await?;
    entries.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| a.filename.cmp(&b.filename))
    });

    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    Ok(entries.into_iter().skip(skip).take(limit).collect())
}

async fn scan(dir: &Path) -> Result<Vec<Attachment>, AppError> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("attachment directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let filename = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(name) => {
                tracing::debug!("skipping non-utf8 attachment filename {:?}", name);
                continue;
            }
        };
        let Some(content_type) = image_content_type(&filename) else {
            continue;
        };
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            continue;
        }
        let created: Option<DateTime<Utc>> = metadata.modified().ok().map(DateTime::from);

        entries.push(Attachment {
            url: cdn_url(&filename),
            id: Some(stem(&filename).to_string()),
            content_type: Some(content_type.to_string()),
            size: Some(metadata.len()),
            created,
            emoji: None,
            filename: Some(filename),
        });
    }

    Ok(entries)
}

fn stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
}

/// A fresh, not yet created directory under the system temp dir.
pub fn temp_catalog_path() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("attachment-gallery-test-{}", uuid::Uuid::new_v4()));
    path
}
