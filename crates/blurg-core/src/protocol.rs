//! Wire types shared by the remote diary client and the protocol server.
//!
//! Requests are form-encoded; responses are JSON objects carrying a `result`
//! field. Every authenticated request sends the diary key as the basic-auth
//! user name with an empty password.

use serde::{Deserialize, Serialize};

use crate::models::{parse_entry_date, Entry, EntryId, MAX_ENTRY_BYTES};

pub const INIT_PATH: &str = "/init";
pub const VERIFY_PATH: &str = "/verify";
pub const WIPE_PATH: &str = "/wipe";
pub const LOG_PATH: &str = "/log";
pub const LIST_PATH: &str = "/list";
pub const RM_PATH: &str = "/rm";

/// Largest request body a server accepts: a full-size entry with every byte
/// percent-encoded, plus room for the other form fields.
pub const MAX_REQUEST_BYTES: usize = 3 * MAX_ENTRY_BYTES + 16 * 1024;

pub const RESULT_OK: &str = "ok";
pub const RESULT_ERROR: &str = "error";

/// No entry with the requested id.
pub const ERROR_BAD_ID: &str = "bad_id";
/// Key missing or its signature does not verify.
pub const ERROR_BAD_KEY: &str = "bad_key";
/// Key is genuine but its diary was wiped.
pub const ERROR_NO_DIARY: &str = "no_diary";
/// Reserved or malformed diary name.
pub const ERROR_BAD_NAME: &str = "bad_name";
/// Missing or malformed form fields.
pub const ERROR_BAD_REQUEST: &str = "bad_request";
pub const ERROR_INTERNAL: &str = "internal";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitForm {
    pub diaryname: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogForm {
    pub text: String,
    pub username: String,
    /// `MM-DD-YYYY HH:MM`; the server stamps the current time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    pub key: String,
    /// False when the key names a diary the server already held.
    #[serde(default)]
    pub created: bool,
}

/// `{result: "ok" | "error", ...}` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub result: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diaryname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            result: RESULT_OK.to_string(),
            ..Self::default()
        }
    }

    /// Bare `{result: "error"}`, as `/verify` answers for unusable keys.
    pub fn failed() -> Self {
        Self {
            result: RESULT_ERROR.to_string(),
            ..Self::default()
        }
    }

    pub fn error(error_type: &str) -> Self {
        Self {
            result: RESULT_ERROR.to_string(),
            error_type: Some(error_type.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.result == RESULT_OK
    }

    pub fn has_error_type(&self, error_type: &str) -> bool {
        self.error_type.as_deref() == Some(error_type)
    }

    /// Human readable reason for a non-ok response.
    pub fn describe(&self) -> String {
        match (&self.error_type, &self.message) {
            (Some(kind), Some(message)) => format!("{kind}: {message}"),
            (Some(kind), None) => kind.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => format!("server answered {:?}", self.result),
        }
    }
}

/// One entry as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub id: u64,
    pub text: String,
    pub date: String,
    pub username: String,
}

impl WireEntry {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            id: entry.id.get(),
            text: entry.text.clone(),
            date: entry.date_str(),
            username: entry.author.clone(),
        }
    }

    pub fn into_entry(self) -> Result<Entry, String> {
        let id = EntryId::new(self.id).ok_or_else(|| "entry id 0 is not valid".to_string())?;
        let timestamp = parse_entry_date(&self.date)
            .map_err(|error| format!("entry {id} has bad date {:?}: {error}", self.date))?;
        Ok(Entry::new(id, self.text, timestamp, self.username))
    }
}

/// Reply to `GET /list`: either the entry array or an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListReply {
    Entries { result: Vec<WireEntry> },
    Status(StatusResponse),
}
