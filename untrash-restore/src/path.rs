use std::path::{Path, PathBuf};

use crate::trashroots::TrashRoot;

pub const METADATA_SUFFIX: &str = ".trashinfo";

/// Returns the file name without the metadata suffix or None when the
/// location does not reference a metadata file.
pub fn strip_metadata_suffix(location: &Path) -> Option<String> {
    let file_name = location.file_name()?.to_str()?;
    let stripped = file_name.strip_suffix(METADATA_SUFFIX)?;
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}

/// Matches the location's parent against the enabled roots by prefix.
pub fn find_enclosing_root<'a>(roots: &'a [TrashRoot], location: &Path) -> Option<&'a TrashRoot> {
    let parent = location.parent()?;
    roots
        .iter()
        .find(|root| parent.starts_with(root.info_folder()))
}

/// Derives the trashed content location from the metadata location: the
/// sibling files folder holds the content under the same base name.
pub fn trashed_content_path(root: &TrashRoot, location: &Path) -> Option<PathBuf> {
    let name = strip_metadata_suffix(location)?;
    Some(root.files_folder().join(name))
}

/// Resolves a recorded restore path as absolute under the matched root.
pub fn restore_target(root: &TrashRoot, restore_path: &Path) -> PathBuf {
    match restore_path.strip_prefix("/") {
        Ok(relative) => root.root_path.join(relative),
        Err(_) => root.root_path.join(restore_path),
    }
}

pub fn make_relative(base: &Path, path: &Path) -> Option<PathBuf> {
    pathdiff::diff_paths(path, base)
}

mod test {
    #[test]
    fn strip_metadata_suffix_variants() {
        use std::path::Path;

        assert_eq!(
            Some("notes.txt".to_string()),
            super::strip_metadata_suffix(Path::new("/home/user/.Trash/info/notes.txt.trashinfo"))
        );
        assert_eq!(
            Some(".direnv".to_string()),
            super::strip_metadata_suffix(Path::new("/home/user/.Trash/info/.direnv.trashinfo"))
        );
        assert_eq!(
            None,
            super::strip_metadata_suffix(Path::new("/home/user/.Trash/info/notes.txt"))
        );
        assert_eq!(
            None,
            super::strip_metadata_suffix(Path::new("/home/user/.Trash/info/.trashinfo"))
        );
    }

    #[test]
    fn find_enclosing_root_by_prefix() {
        use std::path::{Path, PathBuf};

        use crate::trashroots::TrashRoot;

        let roots = vec![
            TrashRoot::new(PathBuf::from("/home/user")),
            TrashRoot::new(PathBuf::from("/home/user/Downloads")),
        ];

        let location = Path::new("/home/user/Downloads/.Trash/info/movie.mkv.trashinfo");
        let root = super::find_enclosing_root(&roots, location).unwrap();
        assert_eq!(PathBuf::from("/home/user/Downloads"), root.root_path);

        let location = Path::new("/home/user/.Trash/info/notes.txt.trashinfo");
        let root = super::find_enclosing_root(&roots, location).unwrap();
        assert_eq!(PathBuf::from("/home/user"), root.root_path);

        let location = Path::new("/media/usb/.Trash/info/notes.txt.trashinfo");
        assert!(super::find_enclosing_root(&roots, location).is_none());

        let location = Path::new("/home/user/.Trash/files/notes.txt");
        assert!(super::find_enclosing_root(&roots, location).is_none());
    }

    #[test]
    fn trashed_content_path_is_sibling_of_metadata() {
        use std::path::{Path, PathBuf};

        use crate::trashroots::TrashRoot;

        let root = TrashRoot::new(PathBuf::from("/home/user"));
        let location = Path::new("/home/user/.Trash/info/notes.txt.trashinfo");

        assert_eq!(
            Some(PathBuf::from("/home/user/.Trash/files/notes.txt")),
            super::trashed_content_path(&root, location)
        );
        assert_eq!(
            None,
            super::trashed_content_path(&root, Path::new("/home/user/.Trash/info/notes.txt"))
        );
    }

    #[test]
    fn restore_target_resolves_under_root() {
        use std::path::{Path, PathBuf};

        use crate::trashroots::TrashRoot;

        let root = TrashRoot::new(PathBuf::from("/home/user"));

        assert_eq!(
            PathBuf::from("/home/user/Documents/notes.txt"),
            super::restore_target(&root, Path::new("/Documents/notes.txt"))
        );
    }

    #[test]
    fn make_relative_round_trip() {
        use std::path::{Path, PathBuf};

        let base = Path::new("/home/user");
        let path = Path::new("/home/user/Documents/notes.txt");

        let relative = super::make_relative(base, path).unwrap();
        assert_eq!(PathBuf::from("Documents/notes.txt"), relative);
        assert_eq!(path, base.join(relative));
    }
}
