use std::path::PathBuf;

use crate::{error::AppError, settings::Settings};

pub const TRASH_FOLDER: &str = ".Trash";
pub const INFO_FOLDER: &str = "info";
pub const FILES_FOLDER: &str = "files";

/// A location enabled to hold trashed content. Metadata lives in the info
/// folder, the content itself in the sibling files folder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrashRoot {
    pub root_path: PathBuf,
    pub relative_data_folder: PathBuf,
}

impl TrashRoot {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            relative_data_folder: PathBuf::from(TRASH_FOLDER),
        }
    }

    pub fn trash_folder(&self) -> PathBuf {
        self.root_path.join(&self.relative_data_folder)
    }

    pub fn info_folder(&self) -> PathBuf {
        self.trash_folder().join(INFO_FOLDER)
    }

    pub fn files_folder(&self) -> PathBuf {
        self.trash_folder().join(FILES_FOLDER)
    }
}

/// Resolves the trash roots enabled for this batch. Explicitly configured
/// roots win over the defaults under home and downloads.
pub fn enabled_trash_roots(settings: &Settings) -> Result<Vec<TrashRoot>, AppError> {
    if !settings.trash_roots.is_empty() {
        return Ok(settings
            .trash_roots
            .iter()
            .map(|path| TrashRoot::new(path.clone()))
            .collect());
    }

    let home = match dirs::home_dir() {
        Some(it) => it,
        None => return Err(AppError::TrashRootResolutionFailed),
    };

    let mut roots = vec![TrashRoot::new(home)];
    if let Some(downloads) = dirs::download_dir() {
        roots.push(TrashRoot::new(downloads));
    }

    Ok(roots)
}

mod test {
    #[test]
    fn enabled_trash_roots_with_configured_paths() {
        use std::path::PathBuf;

        let settings = crate::settings::Settings {
            trash_roots: vec![PathBuf::from("/media/usb"), PathBuf::from("/home/user")],
            ..Default::default()
        };

        let roots = super::enabled_trash_roots(&settings).unwrap();

        assert_eq!(2, roots.len());
        assert_eq!(PathBuf::from("/media/usb"), roots[0].root_path);
        assert_eq!(PathBuf::from("/media/usb/.Trash"), roots[0].trash_folder());
        assert_eq!(
            PathBuf::from("/media/usb/.Trash/info"),
            roots[0].info_folder()
        );
        assert_eq!(
            PathBuf::from("/media/usb/.Trash/files"),
            roots[0].files_folder()
        );
    }
}
