//! Remote diary client.
//!
//! A remote diary is a local directory holding only a `remote` metadata file
//! (`url`, `key`, `username`). The metadata is re-read before every request so
//! edits made by other tools take effect immediately. All entry data lives on
//! the server.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{validate_entry_size, EntryStore, REMOTE_METADATA_FILE};
use crate::error::{Error, Result};
use crate::kvfile::KeyValueFile;
use crate::models::{Entry, EntryId, ENTRY_DATE_FORMAT};
use crate::protocol::{
    InitForm, InitResponse, ListReply, LogForm, StatusResponse, ERROR_BAD_ID, ERROR_NO_DIARY,
    INIT_PATH, LIST_PATH, LOG_PATH, RM_PATH, VERIFY_PATH, WIPE_PATH,
};
use crate::util::compact_text;

/// Default request timeout for diary servers.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

const KEY_URL: &str = "url";
const KEY_KEY: &str = "key";
const KEY_USERNAME: &str = "username";

/// Connection details stored in a remote diary's `remote` file
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub url: String,
    pub key: String,
    pub username: String,
}

impl fmt::Debug for RemoteMetadata {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteMetadata")
            .field("url", &self.url)
            .field("key", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

impl RemoteMetadata {
    pub fn load(path: &Path) -> Result<Self> {
        let file = KeyValueFile::read(path)?.map_err(|error| {
            Error::ConfigCorrupt(format!("{}: {error}", path.display()))
        })?;
        let field = |name: &str| {
            file.get(name)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
                .ok_or_else(|| {
                    Error::ConfigCorrupt(format!("{} is missing `{name}`", path.display()))
                })
        };
        Ok(Self {
            url: field(KEY_URL)?.trim_end_matches('/').to_string(),
            key: field(KEY_KEY)?,
            username: field(KEY_USERNAME)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = KeyValueFile::default();
        file.set(KEY_URL, &self.url);
        file.set(KEY_KEY, &self.key);
        file.set(KEY_USERNAME, &self.username);
        file.write(path)?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }
}

/// Blocking HTTP client for the diary protocol
#[derive(Clone, Debug)]
pub struct RemoteClient {
    http: Client,
}

impl RemoteClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Remote(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { http })
    }

    /// Ask the server to create (or reopen) a diary.
    pub fn init(&self, url: &str, diaryname: &str, username: &str) -> Result<InitResponse> {
        let form = InitForm {
            diaryname: diaryname.to_string(),
            username: username.to_string(),
        };
        let response = self.http.post(format!("{url}{INIT_PATH}")).form(&form).send()?;
        if !response.status().is_success() {
            let status = read_status(response)?;
            return Err(Error::Remote(format!(
                "diary creation refused: {}",
                status.describe()
            )));
        }
        let init = read_json::<InitResponse>(response)?;
        tracing::info!(url, diary = diaryname, created = init.created, "Registered remote diary");
        Ok(init)
    }

    /// Check a key and return the diary name the server holds for it.
    pub fn verify(&self, url: &str, key: &str) -> Result<String> {
        let response = authorized(self.http.get(format!("{url}{VERIFY_PATH}")), key).send()?;
        let status = read_status(response)?;
        match status.diaryname {
            Some(name) if status.is_ok() => Ok(name),
            _ => Err(Error::InvalidKey),
        }
    }

    pub fn log(
        &self,
        metadata: &RemoteMetadata,
        text: &str,
        timestamp: NaiveDateTime,
        author: &str,
    ) -> Result<EntryId> {
        let form = LogForm {
            text: text.to_string(),
            username: author.to_string(),
            date: Some(timestamp.format(ENTRY_DATE_FORMAT).to_string()),
        };
        let response = authorized(
            self.http.post(metadata.endpoint(LOG_PATH)),
            &metadata.key,
        )
        .form(&form)
        .send()?;
        let status = read_status(response)?;
        if !status.is_ok() {
            return Err(Error::Remote(format!(
                "Error upon creating entry: {}",
                status.describe()
            )));
        }
        status
            .id
            .and_then(EntryId::new)
            .ok_or_else(|| Error::Remote("server did not report the new entry id".to_string()))
    }

    pub fn remove(&self, metadata: &RemoteMetadata, id: EntryId) -> Result<()> {
        let response = authorized(
            self.http
                .delete(metadata.endpoint(&format!("{RM_PATH}/{id}"))),
            &metadata.key,
        )
        .send()?;
        let status = read_status(response)?;
        if status.is_ok() {
            Ok(())
        } else if status.has_error_type(ERROR_BAD_ID) {
            Err(Error::NotFound(format!("No such entry {id}")))
        } else {
            Err(Error::Remote(status.describe()))
        }
    }

    pub fn list(&self, metadata: &RemoteMetadata) -> Result<Vec<Entry>> {
        let response = authorized(self.http.get(metadata.endpoint(LIST_PATH)), &metadata.key)
            .send()?;
        match read_json::<ListReply>(response)? {
            ListReply::Entries { result } => result
                .into_iter()
                .map(|wire| wire.into_entry().map_err(Error::Remote))
                .collect(),
            ListReply::Status(status) => Err(Error::Remote(status.describe())),
        }
    }

    pub fn wipe(&self, metadata: &RemoteMetadata) -> Result<()> {
        let response = authorized(self.http.delete(metadata.endpoint(WIPE_PATH)), &metadata.key)
            .send()?;
        let status = read_status(response)?;
        if status.is_ok() {
            Ok(())
        } else if status.has_error_type(ERROR_NO_DIARY) {
            tracing::warn!(url = %metadata.url, "Remote diary was already gone");
            Ok(())
        } else {
            Err(Error::Remote(status.describe()))
        }
    }
}

fn authorized(request: RequestBuilder, key: &str) -> RequestBuilder {
    request
        .basic_auth(key, Some(""))
        .header(reqwest::header::ACCEPT, "application/json")
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text()?;
    serde_json::from_str::<T>(&body).map_err(|error| {
        if status.is_success() {
            Error::Remote(format!("unexpected server payload: {error}"))
        } else {
            Error::Remote(format!("HTTP {}: {}", status.as_u16(), compact_text(&body)))
        }
    })
}

fn read_status(response: Response) -> Result<StatusResponse> {
    read_json::<StatusResponse>(response)
}

/// A diary whose entries live on a diary server
#[derive(Debug, Clone)]
pub struct RemoteDiary {
    name: String,
    path: PathBuf,
    client: RemoteClient,
}

impl RemoteDiary {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, client: RemoteClient) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            client,
        }
    }

    /// Write the local pointer for a diary that already exists on a server.
    pub fn create_pointer(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        metadata: &RemoteMetadata,
        client: RemoteClient,
    ) -> Result<Self> {
        let diary = Self::new(name, path, client);
        fs::create_dir_all(&diary.path)?;
        metadata.save(&diary.metadata_path())?;
        Ok(diary)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(REMOTE_METADATA_FILE)
    }

    pub fn metadata(&self) -> Result<RemoteMetadata> {
        RemoteMetadata::load(&self.metadata_path())
    }

    pub fn key(&self) -> Result<String> {
        Ok(self.metadata()?.key)
    }

    /// Remove the local pointer without contacting the server.
    pub fn forget(&self) -> Result<()> {
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}

impl EntryStore for RemoteDiary {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&self, text: &str, timestamp: NaiveDateTime, author: &str) -> Result<EntryId> {
        validate_entry_size(text)?;
        let metadata = self.metadata()?;
        let author = if author.is_empty() {
            metadata.username.as_str()
        } else {
            author
        };
        let id = self.client.log(&metadata, text, timestamp, author)?;
        tracing::debug!(diary = %self.name, id = %id, "Added remote entry");
        Ok(id)
    }

    fn remove(&self, id: EntryId) -> Result<()> {
        let metadata = self.metadata()?;
        self.client.remove(&metadata, id)?;
        tracing::debug!(diary = %self.name, id = %id, "Removed remote entry");
        Ok(())
    }

    fn list(&self, author: Option<&str>) -> Result<Vec<Entry>> {
        let metadata = self.metadata()?;
        let mut entries = self.client.list(&metadata)?;
        if let Some(author) = author {
            entries.retain(|entry| entry.author == author);
        }
        Ok(entries)
    }

    fn delete(&self) -> Result<()> {
        let metadata = self.metadata()?;
        self.client.wipe(&metadata)?;
        self.forget()?;
        tracing::info!(diary = %self.name, "Wiped remote diary");
        Ok(())
    }
}
