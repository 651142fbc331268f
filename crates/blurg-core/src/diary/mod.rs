//! Diary backends.
//!
//! A diary is either a directory of entry files ([`LocalDiary`]) or a pointer
//! to a diary held by a server ([`RemoteDiary`]). [`Diary`] picks the variant
//! once, when the diary is opened, from the presence of the `remote` metadata
//! file.

mod local;
mod remote;

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::models::{Entry, EntryId};

pub use local::{
    entry_file_name, parse_entry_file_name, validate_author, validate_entry_size, LocalDiary,
};
pub use remote::{RemoteClient, RemoteDiary, RemoteMetadata, DEFAULT_HTTP_TIMEOUT};

/// Marker file whose presence makes a diary directory remote.
pub const REMOTE_METADATA_FILE: &str = "remote";
/// Built-in local diary used when nothing else is selected.
pub const DEFAULT_DIARY_NAME: &str = "default";
/// Registry config file living next to the diary directories.
pub const CONFIG_FILE_NAME: &str = "config";

/// Trait for diary entry storage operations
pub trait EntryStore {
    /// Name of the diary
    fn name(&self) -> &str;

    /// Store a new entry and return its id
    fn add(&self, text: &str, timestamp: NaiveDateTime, author: &str) -> Result<EntryId>;

    /// Remove one entry; `NotFound` when no entry has that id
    fn remove(&self, id: EntryId) -> Result<()>;

    /// All entries in id order, optionally only those by `author`
    fn list(&self, author: Option<&str>) -> Result<Vec<Entry>>;

    /// Destroy the diary and everything in it
    fn delete(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiaryKind {
    Local,
    Remote,
}

/// A diary with its backend resolved
#[derive(Debug, Clone)]
pub enum Diary {
    Local(LocalDiary),
    Remote(RemoteDiary),
}

impl Diary {
    /// Open the diary stored at `path` without creating anything.
    pub fn open(name: &str, path: impl Into<PathBuf>, client: &RemoteClient) -> Self {
        let path = path.into();
        if is_remote_dir(&path) {
            Self::Remote(RemoteDiary::new(name, path, client.clone()))
        } else {
            Self::Local(LocalDiary::new(name, path))
        }
    }

    pub const fn kind(&self) -> DiaryKind {
        match self {
            Self::Local(_) => DiaryKind::Local,
            Self::Remote(_) => DiaryKind::Remote,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Local(diary) => diary.path(),
            Self::Remote(diary) => diary.path(),
        }
    }

    pub const fn as_remote(&self) -> Option<&RemoteDiary> {
        match self {
            Self::Remote(diary) => Some(diary),
            Self::Local(_) => None,
        }
    }
}

impl EntryStore for Diary {
    fn name(&self) -> &str {
        match self {
            Self::Local(diary) => diary.name(),
            Self::Remote(diary) => diary.name(),
        }
    }

    fn add(&self, text: &str, timestamp: NaiveDateTime, author: &str) -> Result<EntryId> {
        match self {
            Self::Local(diary) => diary.add(text, timestamp, author),
            Self::Remote(diary) => diary.add(text, timestamp, author),
        }
    }

    fn remove(&self, id: EntryId) -> Result<()> {
        match self {
            Self::Local(diary) => diary.remove(id),
            Self::Remote(diary) => diary.remove(id),
        }
    }

    fn list(&self, author: Option<&str>) -> Result<Vec<Entry>> {
        match self {
            Self::Local(diary) => diary.list(author),
            Self::Remote(diary) => diary.list(author),
        }
    }

    fn delete(&self) -> Result<()> {
        match self {
            Self::Local(diary) => diary.delete(),
            Self::Remote(diary) => diary.delete(),
        }
    }
}

pub fn is_remote_dir(path: &Path) -> bool {
    path.join(REMOTE_METADATA_FILE).is_file()
}

/// Reject names that are reserved or cannot be used as a directory name.
pub fn validate_diary_name(name: &str) -> Result<()> {
    if name == CONFIG_FILE_NAME {
        return Err(Error::InvalidName(format!(
            "Cannot name a diary \"{CONFIG_FILE_NAME}\""
        )));
    }
    if name.trim().is_empty() {
        return Err(Error::InvalidName("diary name cannot be blank".to_string()));
    }
    if name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidName(format!(
            "\"{name}\" is not a usable diary name"
        )));
    }
    Ok(())
}

/// Names allowed to become remote: anything valid except the default diary.
pub fn validate_remote_name(name: &str) -> Result<()> {
    validate_diary_name(name)?;
    if name == DEFAULT_DIARY_NAME {
        return Err(Error::InvalidName(format!(
            "You can't make a remote diary called \"{DEFAULT_DIARY_NAME}\""
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn client() -> RemoteClient {
        RemoteClient::new(DEFAULT_HTTP_TIMEOUT).unwrap()
    }

    #[test]
    fn open_resolves_backend_from_metadata_file() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("plain");
        std::fs::create_dir(&local).unwrap();
        assert_eq!(Diary::open("plain", &local, &client()).kind(), DiaryKind::Local);

        let remote = dir.path().join("shared");
        std::fs::create_dir(&remote).unwrap();
        std::fs::write(
            remote.join(REMOTE_METADATA_FILE),
            "url:http://localhost\nkey:k\nusername:u\n",
        )
        .unwrap();
        let diary = Diary::open("shared", &remote, &client());
        assert_eq!(diary.kind(), DiaryKind::Remote);
        assert!(diary.as_remote().is_some());
    }

    #[test]
    fn local_variant_dispatches_to_files() {
        let dir = TempDir::new().unwrap();
        LocalDiary::create("plain", dir.path().join("plain")).unwrap();
        let diary = Diary::open("plain", dir.path().join("plain"), &client());
        let when = NaiveDate::from_ymd_opt(2021, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let id = diary.add("hello", when, "alice").unwrap();
        assert_eq!(diary.list(None).unwrap()[0].id, id);
        diary.remove(id).unwrap();
        assert!(diary.list(None).unwrap().is_empty());
        assert_eq!(diary.name(), "plain");
    }

    #[test]
    fn reserved_and_malformed_names_are_invalid() {
        for name in ["config", "", "  ", ".hidden", "a/b", "a\\b"] {
            assert_eq!(
                validate_diary_name(name).unwrap_err().kind(),
                ErrorKind::InvalidName,
                "{name:?}"
            );
        }
        assert!(validate_diary_name("default").is_ok());
        assert!(validate_diary_name("work-log").is_ok());
        assert_eq!(
            validate_remote_name("default").unwrap_err().kind(),
            ErrorKind::InvalidName
        );
        assert!(validate_remote_name("work-log").is_ok());
    }
}
