//! Diary registry.
//!
//! Tracks the diaries under the base directory, which one is current, and
//! moves diaries between local and remote storage. Nothing is cached: every
//! call re-reads the config file and reopens the diaries it touches.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ClientSettings;
use crate::diary::{
    validate_author, validate_diary_name, validate_entry_size, validate_remote_name, Diary,
    DiaryKind, EntryStore, LocalDiary, RemoteClient, RemoteDiary, RemoteMetadata,
    CONFIG_FILE_NAME, DEFAULT_DIARY_NAME,
};
use crate::error::{Error, ErrorKind, Result};
use crate::feed::{FeedQueue, DEFAULT_FEED_CAPACITY};
use crate::kvfile::KeyValueFile;
use crate::models::{now_minute, Entry, EntryId};
use crate::protocol::InitResponse;
use crate::util::normalize_server_url;

const CURRENT_DIARY_KEY: &str = "diary_name";

/// Known diaries split by backend, each sorted by name
#[derive(Debug, Default)]
pub struct DiaryListing {
    pub local: Vec<Diary>,
    pub remote: Vec<Diary>,
}

#[derive(Debug)]
pub struct Registry {
    settings: ClientSettings,
    client: RemoteClient,
}

impl Registry {
    /// Open the registry, creating the base directory and config on first
    /// use. A current diary that no longer exists falls back to `default`.
    pub fn open(settings: ClientSettings) -> Result<Self> {
        let client = RemoteClient::new(settings.http_timeout)?;
        let registry = Self { settings, client };
        fs::create_dir_all(registry.base_dir())?;

        let config_path = registry.config_path();
        if !config_path.exists() {
            let mut config = KeyValueFile::default();
            config.set(CURRENT_DIARY_KEY, DEFAULT_DIARY_NAME);
            config.write(&config_path)?;
            tracing::debug!(path = %config_path.display(), "Created registry config");
        }

        let current = registry.current_name()?;
        if !registry.exists(&current) {
            if current != DEFAULT_DIARY_NAME {
                tracing::warn!(diary = %current, "Current diary is missing, falling back to default");
            }
            registry.reset_to_default()?;
        }
        Ok(registry)
    }

    pub fn base_dir(&self) -> &Path {
        &self.settings.base_dir
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn diary_path(&self, name: &str) -> PathBuf {
        self.base_dir().join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.diary_path(name).is_dir()
    }

    pub fn current_name(&self) -> Result<String> {
        let config = self.read_config()?;
        let name = config
            .get(CURRENT_DIARY_KEY)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::ConfigCorrupt(format!(
                    "{} has no `{CURRENT_DIARY_KEY}` line",
                    self.config_path().display()
                ))
            })?;
        validate_diary_name(name)
            .map_err(|error| Error::ConfigCorrupt(format!("current diary: {error}")))?;
        Ok(name.to_string())
    }

    pub fn current(&self) -> Result<Diary> {
        let name = self.current_name()?;
        self.open_diary(&name)
    }

    /// Open an existing diary by name.
    pub fn open_diary(&self, name: &str) -> Result<Diary> {
        validate_diary_name(name)?;
        if !self.exists(name) {
            return Err(Error::NotFound(format!("No such diary \"{name}\"")));
        }
        Ok(Diary::open(name, self.diary_path(name), &self.client))
    }

    pub fn diaries(&self) -> Result<DiaryListing> {
        let mut names = Vec::new();
        for item in fs::read_dir(self.base_dir())? {
            let item = item?;
            if !item.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = item.file_name().to_str().map(ToString::to_string) else {
                continue;
            };
            if validate_diary_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();

        let mut listing = DiaryListing::default();
        for name in names {
            let diary = Diary::open(&name, self.diary_path(&name), &self.client);
            match diary.kind() {
                DiaryKind::Local => listing.local.push(diary),
                DiaryKind::Remote => listing.remote.push(diary),
            }
        }
        Ok(listing)
    }

    /// Make `name` current, creating an empty local diary if needed.
    pub fn switch(&self, name: &str) -> Result<Diary> {
        validate_diary_name(name)?;
        if !self.exists(name) {
            LocalDiary::create(name, self.diary_path(name))?;
            tracing::info!(diary = name, "Created local diary");
        }
        self.set_current(name)?;
        self.open_diary(name)
    }

    /// Log to the current diary.
    ///
    /// Without an author, local diaries use the configured author and remote
    /// diaries use the username they were connected with.
    pub fn log(&self, text: &str, author: Option<&str>) -> Result<(Diary, EntryId)> {
        let diary = self.current()?;
        let author = match (author.filter(|author| !author.is_empty()), diary.kind()) {
            (Some(author), _) => author,
            (None, DiaryKind::Local) => self.settings.author.as_str(),
            (None, DiaryKind::Remote) => "",
        };
        let id = diary
            .add(text, now_minute(), author)
            .map_err(|error| error.in_diary(diary.name()))?;
        Ok((diary, id))
    }

    /// Create a diary on a server and a local pointer to it. Returns the key.
    ///
    /// A diary the server already holds for this name and user is attached
    /// as is.
    pub fn create_remote(&self, name: &str, url: &str, username: &str) -> Result<String> {
        self.register_remote(name, url, username).map(|init| init.key)
    }

    fn register_remote(&self, name: &str, url: &str, username: &str) -> Result<InitResponse> {
        validate_remote_name(name)?;
        if self.exists(name) {
            return Err(Error::AlreadyExists(format!(
                "Diary \"{name}\" already exists locally; wipe it first"
            )));
        }
        let url = server_url(url)?;
        validate_author(username)?;

        let init = self.client.init(&url, name, username)?;
        let metadata = RemoteMetadata {
            url,
            key: init.key.clone(),
            username: username.to_string(),
        };
        RemoteDiary::create_pointer(name, self.diary_path(name), &metadata, self.client.clone())?;
        tracing::info!(diary = name, "Created remote diary pointer");
        Ok(init)
    }

    /// Attach an existing remote diary by key. Returns the diary name the
    /// server holds for the key.
    pub fn connect(&self, url: &str, username: &str, key: &str) -> Result<String> {
        let url = server_url(url)?;
        validate_author(username)?;

        let name = self.client.verify(&url, key)?;
        validate_remote_name(&name)?;
        if self.exists(&name) {
            return Err(Error::AlreadyExists(format!(
                "Diary \"{name}\" already exists locally; wipe it first"
            )));
        }
        let metadata = RemoteMetadata {
            url,
            key: key.to_string(),
            username: username.to_string(),
        };
        RemoteDiary::create_pointer(&name, self.diary_path(&name), &metadata, self.client.clone())?;
        tracing::info!(diary = %name, "Connected remote diary");
        Ok(name)
    }

    /// Move a local diary to a server, keeping authors and timestamps.
    ///
    /// The server diary must be new: promoting onto a diary the server
    /// already holds fails with `AlreadyExists` and leaves it untouched. On
    /// any failure the local diary is restored with its original ids.
    pub fn promote(&self, name: &str, url: &str, username: &str) -> Result<String> {
        validate_remote_name(name)?;
        let local = match self.open_diary(name)? {
            Diary::Local(local) => local,
            Diary::Remote(_) => {
                return Err(Error::InvalidInput(format!(
                    "\"{name}\" is not a local diary"
                )));
            }
        };
        let url = server_url(url)?;
        validate_author(username)?;

        let entries = local.list(None).map_err(|error| error.in_diary(name))?;
        for entry in &entries {
            validate_entry_size(entry.body()).map_err(|error| error.in_diary(name))?;
        }
        local.delete().map_err(|error| error.in_diary(name))?;

        let init = match self.register_remote(name, &url, username) {
            Ok(init) => init,
            Err(error) => {
                tracing::warn!(diary = name, %error, "Remote creation failed, restoring local diary");
                self.restore_local(name, &entries)?;
                return Err(promotion_error(error).in_diary(name));
            }
        };

        let remote = RemoteDiary::new(name, self.diary_path(name), self.client.clone());
        if !init.created {
            tracing::warn!(diary = name, "Server already holds this diary, restoring local diary");
            remote.forget()?;
            self.restore_local(name, &entries)?;
            return Err(Error::AlreadyExists(format!(
                "the server already has a diary \"{name}\" for {username}"
            ))
            .in_diary(name));
        }

        for entry in &entries {
            if let Err(error) = remote.add(entry.body(), entry.timestamp, &entry.author) {
                tracing::warn!(diary = name, id = %entry.id, %error, "Upload failed, restoring local diary");
                if let Err(wipe_error) = remote.delete() {
                    tracing::warn!(diary = name, error = %wipe_error, "Could not wipe partial remote diary");
                    if remote.path().exists() {
                        remote.forget()?;
                    }
                }
                self.restore_local(name, &entries)?;
                return Err(promotion_error(error).in_diary(name));
            }
        }

        tracing::info!(diary = name, entries = entries.len(), "Promoted diary");
        Ok(init.key)
    }

    /// Move a remote diary back to local files. Ids are reassigned from 1 in
    /// the server's order.
    pub fn demote(&self, name: &str) -> Result<()> {
        let remote = match self.open_diary(name)? {
            Diary::Remote(remote) => remote,
            Diary::Local(_) => {
                return Err(Error::InvalidInput(format!(
                    "\"{name}\" is not a remote diary"
                )));
            }
        };

        let entries = remote.list(None).map_err(|error| error.in_diary(name))?;
        remote.delete().map_err(|error| error.in_diary(name))?;

        let local = LocalDiary::create(name, self.diary_path(name))?;
        for entry in &entries {
            local
                .add(entry.body(), entry.timestamp, &entry.author)
                .map_err(|error| error.in_diary(name))?;
        }
        tracing::info!(diary = name, entries = entries.len(), "Demoted diary");
        Ok(())
    }

    /// Remove a diary. Deleting the current diary makes `default` current.
    pub fn delete(&self, name: &str) -> Result<()> {
        let diary = self.open_diary(name)?;
        diary.delete().map_err(|error| error.in_diary(name))?;
        tracing::info!(diary = name, "Deleted diary");

        if self.current_name()? == name {
            self.reset_to_default()?;
        }
        Ok(())
    }

    /// Secret key of a remote diary.
    pub fn key(&self, name: &str) -> Result<String> {
        match self.open_diary(name)? {
            Diary::Remote(remote) => remote.key().map_err(|error| error.in_diary(name)),
            Diary::Local(_) => Err(Error::InvalidInput(format!(
                "\"{name}\" is not a remote diary"
            ))),
        }
    }

    /// Up to `limit` entries from every diary, oldest first, each tagged with
    /// its diary name. Diaries whose server cannot be reached are skipped.
    pub fn feed(&self, limit: usize) -> Result<Vec<Entry>> {
        let listing = self.diaries()?;
        let mut queue = FeedQueue::new(DEFAULT_FEED_CAPACITY);
        let mut dropped = 0_usize;

        for diary in listing.local.iter().chain(&listing.remote) {
            let entries = match diary.list(None) {
                Ok(entries) => entries,
                Err(error) if error.kind() == ErrorKind::Remote => {
                    tracing::warn!(diary = diary.name(), %error, "Skipping diary in feed");
                    continue;
                }
                Err(error) => return Err(error.in_diary(diary.name())),
            };
            for entry in entries {
                if !queue.push(entry.in_diary(diary.name())) {
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            tracing::warn!(dropped, capacity = queue.capacity(), "Feed queue full");
        }
        Ok(queue.drain_oldest(limit))
    }

    fn config_path(&self) -> PathBuf {
        self.base_dir().join(CONFIG_FILE_NAME)
    }

    fn read_config(&self) -> Result<KeyValueFile> {
        let path = self.config_path();
        KeyValueFile::read(&path)?
            .map_err(|error| Error::ConfigCorrupt(format!("{}: {error}", path.display())))
    }

    fn set_current(&self, name: &str) -> Result<()> {
        let mut config = self.read_config()?;
        config.set(CURRENT_DIARY_KEY, name);
        config.write(&self.config_path())?;
        tracing::debug!(diary = name, "Set current diary");
        Ok(())
    }

    fn reset_to_default(&self) -> Result<()> {
        if !self.exists(DEFAULT_DIARY_NAME) {
            LocalDiary::create(DEFAULT_DIARY_NAME, self.diary_path(DEFAULT_DIARY_NAME))?;
        }
        self.set_current(DEFAULT_DIARY_NAME)
    }

    fn restore_local(&self, name: &str, entries: &[Entry]) -> Result<()> {
        let local = LocalDiary::create(name, self.diary_path(name))?;
        for entry in entries {
            local.insert(entry).map_err(|error| error.in_diary(name))?;
        }
        tracing::info!(diary = name, entries = entries.len(), "Restored local diary");
        Ok(())
    }
}

fn server_url(url: &str) -> Result<String> {
    normalize_server_url(url)
        .ok_or_else(|| Error::InvalidInput(format!("\"{url}\" is not a server address")))
}

/// Promotion failures surface as remote errors whatever went wrong.
fn promotion_error(error: Error) -> Error {
    match error.kind() {
        ErrorKind::Remote => error,
        _ => Error::Remote(format!("Failed to create remote diary: {error}")),
    }
}
