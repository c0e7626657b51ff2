use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct Settings {
    pub base_path: Option<PathBuf>,
    pub items: Vec<PathBuf>,
    pub trash_roots: Vec<PathBuf>,
}
