use std::sync::{Arc, Mutex, MutexGuard};

use crate::loader::source::LoadError;
use crate::models::attachment::Attachment;

/// Surface the loader draws into. Calls arrive from whichever task owns the
/// current fetch, one fetch at a time.
pub trait Renderer: Send + Sync + 'static {
    /// Append one image entry to the end of the list.
    fn append(&self, attachment: &Attachment);

    fn set_loading(&self, visible: bool);

    /// Show an inline, user-visible failure message.
    fn show_error(&self, error: &LoadError);

    fn clear_error(&self);

    /// Called once when the collection has no further pages.
    fn show_end(&self) {}
}

impl<T: Renderer> Renderer for Arc<T> {
    fn append(&self, attachment: &Attachment) {
        (**self).append(attachment)
    }

    fn set_loading(&self, visible: bool) {
        (**self).set_loading(visible)
    }

    fn show_error(&self, error: &LoadError) {
        (**self).show_error(error)
    }

    fn clear_error(&self) {
        (**self).clear_error()
    }

    fn show_end(&self) {
        (**self).show_end()
    }
}

/// A rendered list entry wrapping one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub image_url: String,
}

#[derive(Debug, Default)]
struct Surface {
    items: Vec<ListItem>,
    loading: bool,
    error: Option<String>,
    ended: bool,
}

/// In-memory append-only render target.
#[derive(Debug, Default)]
pub struct RenderTarget {
    surface: Mutex<Surface>,
}

impl RenderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    fn surface(&self) -> MutexGuard<'_, Surface> {
        self.surface.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn items(&self) -> Vec<ListItem> {
        self.surface().items.clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.surface()
            .items
            .iter()
            .map(|i| i.image_url.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.surface().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.surface().loading
    }

    pub fn error(&self) -> Option<String> {
        self.surface().error.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.surface().ended
    }
}

impl Renderer for RenderTarget {
    fn append(&self, attachment: &Attachment) {
        self.surface().items.push(ListItem {
            image_url: attachment.url.clone(),
        });
    }

    fn set_loading(&self, visible: bool) {
        self.surface().loading = visible;
    }

    fn show_error(&self, error: &LoadError) {
        self.surface().error = Some(error.to_string());
    }

    fn clear_error(&self) {
        self.surface().error = None;
    }

    fn show_end(&self) {
        self.surface().ended = true;
    }
}
