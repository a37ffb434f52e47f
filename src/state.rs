use std::path::PathBuf;

#[derive(Clone)]
pub struct AppState {
    /// Directory the bot saves attachment files into.
    pub attachments_path: PathBuf,
    /// Directory holding `index.html` and the gallery assets.
    pub static_path: PathBuf,
}
