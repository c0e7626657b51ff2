use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;
use tokio::{fs::File, io::AsyncReadExt};

pub const METADATA_HEADER: &str = "[Trash Info]";
pub const DELETION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Record describing a single trashed entry: where it came from and when
/// it was deleted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrashInfo {
    pub restore_path: PathBuf,
    pub deleted_at: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Deletion date has an invalid format")]
    InvalidDeletionDate(#[from] chrono::ParseError),
    #[error("Metadata is missing the deletion date")]
    MissingDeletionDate,
    #[error("Metadata does not start with the trash info header")]
    MissingHeader,
    #[error("Metadata is missing the restore path")]
    MissingRestorePath,
    #[error("Reading metadata failed")]
    ReadFailed(#[from] std::io::Error),
}

/// Parses an already opened metadata file into its restore path and
/// deletion date. The caller owns the open so open errors stay its own.
pub async fn parse(mut file: File) -> Result<TrashInfo, ParseError> {
    let mut content = String::new();
    file.read_to_string(&mut content).await?;

    parse_content(&content)
}

fn parse_content(content: &str) -> Result<TrashInfo, ParseError> {
    let mut lines = content.lines().map(|line| line.trim_end_matches('\r'));
    match lines.find(|line| !line.trim().is_empty()) {
        Some(line) if line.trim() == METADATA_HEADER => (),
        _ => return Err(ParseError::MissingHeader),
    }

    // first occurrence of a key wins
    let mut restore_path = None;
    let mut deleted_at = None;
    for line in lines {
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "Path" if restore_path.is_none() => restore_path = Some(value.to_string()),
                "DeletionDate" if deleted_at.is_none() => deleted_at = Some(value.to_string()),
                _ => (),
            }
        }
    }

    let restore_path = match restore_path {
        Some(it) => PathBuf::from(it),
        None => return Err(ParseError::MissingRestorePath),
    };

    let deleted_at = match deleted_at {
        Some(it) => NaiveDateTime::parse_from_str(it.trim(), DELETION_DATE_FORMAT)?,
        None => return Err(ParseError::MissingDeletionDate),
    };

    Ok(TrashInfo {
        restore_path,
        deleted_at,
    })
}

mod test {
    #[test]
    fn parse_content_with_valid_metadata() {
        use std::path::PathBuf;

        let content = "[Trash Info]\nPath=/Documents/notes.txt\nDeletionDate=2024-02-21T18:31:44\n";
        let info = super::parse_content(content).unwrap();

        assert_eq!(PathBuf::from("/Documents/notes.txt"), info.restore_path);
        assert_eq!(
            "2024-02-21 18:31:44",
            info.deleted_at.format("%Y-%m-%d %H:%M:%S").to_string()
        );
    }

    #[test]
    fn parse_content_with_crlf_line_endings() {
        use std::path::PathBuf;

        let content =
            "[Trash Info]\r\nPath=/Documents/notes.txt\r\nDeletionDate=2024-02-21T18:31:44\r\n";
        let info = super::parse_content(content).unwrap();

        assert_eq!(PathBuf::from("/Documents/notes.txt"), info.restore_path);
    }

    #[test]
    fn parse_content_first_key_occurrence_wins() {
        use std::path::PathBuf;

        let content = "[Trash Info]\nPath=/first.txt\nPath=/second.txt\nDeletionDate=2024-02-21T18:31:44\nDeletionDate=2025-01-01T00:00:00\n";
        let info = super::parse_content(content).unwrap();

        assert_eq!(PathBuf::from("/first.txt"), info.restore_path);
        assert_eq!(
            "2024-02-21",
            info.deleted_at.format("%Y-%m-%d").to_string()
        );
    }

    #[test]
    fn parse_content_without_header() {
        let content = "Path=/Documents/notes.txt\nDeletionDate=2024-02-21T18:31:44\n";
        let result = super::parse_content(content);

        assert!(matches!(result, Err(super::ParseError::MissingHeader)));
    }

    #[test]
    fn parse_content_without_restore_path() {
        let content = "[Trash Info]\nDeletionDate=2024-02-21T18:31:44\n";
        let result = super::parse_content(content);

        assert!(matches!(
            result,
            Err(super::ParseError::MissingRestorePath)
        ));
    }

    #[test]
    fn parse_content_without_deletion_date() {
        let content = "[Trash Info]\nPath=/Documents/notes.txt\n";
        let result = super::parse_content(content);

        assert!(matches!(
            result,
            Err(super::ParseError::MissingDeletionDate)
        ));
    }

    #[test]
    fn parse_content_with_invalid_deletion_date() {
        let content = "[Trash Info]\nPath=/Documents/notes.txt\nDeletionDate=yesterday\n";
        let result = super::parse_content(content);

        assert!(matches!(
            result,
            Err(super::ParseError::InvalidDeletionDate(_))
        ));
    }
}
