//! Flat-file diary storage.
//!
//! Each entry is one file named `{id}-{author}${YYYYMMDDHHMM}.txt` holding the
//! entry text plus a trailing newline. The next id is recomputed from a
//! directory scan on every add, so two processes adding to the same diary at
//! once can pick the same id; only a single writer is supported.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use super::EntryStore;
use crate::error::{Error, Result};
use crate::models::{truncate_to_minute, Entry, EntryId, MAX_ENTRY_BYTES};

const ENTRY_EXTENSION: &str = ".txt";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// A diary stored as a directory of entry files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDiary {
    name: String,
    path: PathBuf,
}

impl LocalDiary {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Open the diary, creating its directory when missing.
    pub fn create(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let diary = Self::new(name, path);
        fs::create_dir_all(&diary.path)?;
        Ok(diary)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// `1 + max(existing ids)`, or 1 for an empty diary.
    pub fn next_id(&self) -> Result<EntryId> {
        let max = self
            .records()?
            .into_iter()
            .map(|record| record.id)
            .max();
        match max {
            None => Ok(EntryId::FIRST),
            Some(max) => max.next().ok_or_else(|| {
                Error::InvalidInput(format!("diary \"{}\" has no entry ids left", self.name))
            }),
        }
    }

    /// Store a new entry and return it as it will be listed.
    pub fn add_entry(&self, text: &str, timestamp: NaiveDateTime, author: &str) -> Result<Entry> {
        validate_author(author)?;
        validate_entry_size(text)?;
        let id = self.next_id()?;
        let entry = Entry::new(id, format!("{text}\n"), timestamp, author);
        self.write_record(&entry)?;
        tracing::debug!(diary = %self.name, id = %id, "Added local entry");
        Ok(entry)
    }

    /// Write an entry under its existing id, byte-for-byte.
    ///
    /// Used to restore a diary after a failed promotion.
    pub fn insert(&self, entry: &Entry) -> Result<()> {
        validate_author(&entry.author)?;
        if self.find_record(entry.id)?.is_some() {
            return Err(Error::AlreadyExists(format!("entry {}", entry.id)));
        }
        self.write_record(entry)
    }

    fn write_record(&self, entry: &Entry) -> Result<()> {
        let file_name = entry_file_name(entry.id, &entry.author, entry.timestamp);
        fs::write(self.path.join(file_name), &entry.text)?;
        Ok(())
    }

    fn find_record(&self, id: EntryId) -> Result<Option<Record>> {
        Ok(self.records()?.into_iter().find(|record| record.id == id))
    }

    /// Parsed entry file names, ordered by id.
    fn records(&self) -> Result<Vec<Record>> {
        let dir = match fs::read_dir(&self.path) {
            Ok(dir) => dir,
            Err(error) if error.kind() == IoErrorKind::NotFound => {
                return Err(Error::NotFound(format!("diary directory {}", self.path.display())));
            }
            Err(error) => return Err(error.into()),
        };

        let mut records = Vec::new();
        for item in dir {
            let item = item?;
            let file_name = item.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.ends_with(ENTRY_EXTENSION) {
                continue;
            }
            match parse_entry_file_name(file_name) {
                Some((id, author, timestamp)) => records.push(Record {
                    id,
                    author,
                    timestamp,
                    path: item.path(),
                }),
                None => {
                    tracing::warn!(diary = %self.name, file = file_name, "Skipping malformed entry file");
                }
            }
        }
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}

impl EntryStore for LocalDiary {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, text: &str, timestamp: NaiveDateTime, author: &str) -> Result<EntryId> {
        self.add_entry(text, timestamp, author).map(|entry| entry.id)
    }

    fn remove(&self, id: EntryId) -> Result<()> {
        let record = self
            .find_record(id)?
            .ok_or_else(|| Error::NotFound(format!("No such entry {id}")))?;
        fs::remove_file(&record.path)?;
        tracing::debug!(diary = %self.name, id = %id, "Removed local entry");
        Ok(())
    }

    fn list(&self, author: Option<&str>) -> Result<Vec<Entry>> {
        self.records()?
            .into_iter()
            .filter(|record| author.map_or(true, |wanted| record.author == wanted))
            .map(|record| {
                let text = fs::read_to_string(&record.path)?;
                Ok(Entry::new(record.id, text, record.timestamp, record.author))
            })
            .collect()
    }

    fn delete(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                tracing::debug!(diary = %self.name, "Deleted local diary");
                Ok(())
            }
            Err(error) if error.kind() == IoErrorKind::NotFound => {
                Err(Error::NotFound(format!("diary \"{}\"", self.name)))
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[derive(Debug)]
struct Record {
    id: EntryId,
    author: String,
    timestamp: NaiveDateTime,
    path: PathBuf,
}

/// Reject authors that cannot be encoded in an entry file name.
pub fn validate_author(author: &str) -> Result<()> {
    if author.is_empty() {
        return Err(Error::InvalidInput("author must not be empty".to_string()));
    }
    if author.contains(['$', '/', '\\', '\n', '\r', '\0']) {
        return Err(Error::InvalidInput(format!(
            "author {author:?} contains a reserved character"
        )));
    }
    Ok(())
}

/// Reject entry text longer than [`MAX_ENTRY_BYTES`].
pub fn validate_entry_size(text: &str) -> Result<()> {
    if text.len() > MAX_ENTRY_BYTES {
        return Err(Error::InvalidInput(format!(
            "entry is {} bytes, the limit is {MAX_ENTRY_BYTES}",
            text.len()
        )));
    }
    Ok(())
}

pub fn entry_file_name(id: EntryId, author: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{id}-{author}${}{ENTRY_EXTENSION}",
        truncate_to_minute(timestamp).format(FILE_TIMESTAMP_FORMAT)
    )
}

/// Split `{id}-{author}${timestamp}.txt` into its parts.
pub fn parse_entry_file_name(file_name: &str) -> Option<(EntryId, String, NaiveDateTime)> {
    let stem = file_name.strip_suffix(ENTRY_EXTENSION)?;
    let (id, rest) = stem.split_once('-')?;
    let (author, stamp) = rest.rsplit_once('$')?;
    if stamp.len() != 12 || !stamp.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let id = id.parse::<EntryId>().ok()?;
    let timestamp = NaiveDateTime::parse_from_str(stamp, FILE_TIMESTAMP_FORMAT).ok()?;
    Some((id, author.to_string(), timestamp))
}
