//! Client settings.
//!
//! Resolves where diaries live, how long to wait for a diary server and which
//! author to stamp on new entries. Values come from the environment through a
//! lookup closure so resolution can be tested without touching process state.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::diary::validate_author;
use crate::util::normalize_text_option;

pub const HOME_ENV: &str = "BLURG_HOME";
pub const HTTP_TIMEOUT_ENV: &str = "BLURG_HTTP_TIMEOUT_SECS";
pub const AUTHOR_ENV: &str = "BLURG_AUTHOR";

const DEFAULT_DIR_NAME: &str = ".blurg";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const FALLBACK_AUTHOR: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Directory holding the registry config and one directory per diary
    pub base_dir: PathBuf,
    pub http_timeout: Duration,
    /// Author used when a command does not name one
    pub author: String,
}

impl ClientSettings {
    /// Resolve settings from the process environment.
    ///
    /// `base_dir` overrides `BLURG_HOME`; `home` is the user's home directory,
    /// used for the `~/.blurg` default.
    pub fn from_env(base_dir: Option<PathBuf>, home: Option<PathBuf>) -> Result<Self, String> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned(), base_dir, home)
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        base_dir: Option<PathBuf>,
        home: Option<PathBuf>,
    ) -> Result<Self, String> {
        let base_dir = match base_dir {
            Some(dir) => dir,
            None => match normalize_text_option(lookup(HOME_ENV)) {
                Some(dir) => PathBuf::from(dir),
                None => home
                    .map(|home| home.join(DEFAULT_DIR_NAME))
                    .ok_or_else(|| {
                        format!("cannot locate a home directory; set {HOME_ENV} or --base-dir")
                    })?,
            },
        };

        let timeout_secs = match normalize_text_option(lookup(HTTP_TIMEOUT_ENV)) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| format!("{HTTP_TIMEOUT_ENV} must be an integer in [1, 120]"))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if !(1..=120).contains(&timeout_secs) {
            return Err(format!("{HTTP_TIMEOUT_ENV} must be in [1, 120]"));
        }

        let author = normalize_text_option(lookup(AUTHOR_ENV))
            .or_else(|| normalize_text_option(lookup("USER")))
            .or_else(|| normalize_text_option(lookup("USERNAME")))
            .unwrap_or_else(|| FALLBACK_AUTHOR.to_string());
        validate_author(&author).map_err(|error| format!("{AUTHOR_ENV}: {error}"))?;

        Ok(Self {
            base_dir,
            http_timeout: Duration::from_secs(timeout_secs),
            author,
        })
    }

    /// Settings rooted at `base_dir` with default timeout and author.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            author: FALLBACK_AUTHOR.to_string(),
        }
    }
}
